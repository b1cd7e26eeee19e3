//! Incremental record construction.

use std::panic::AssertUnwindSafe;
use std::ptr::NonNull;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, StringArray, UInt32Array, UInt8Array, UnionArray};
use arrow::buffer::{Buffer, ScalarBuffer};
use arrow::datatypes::{Field, UnionFields};
use fastformat_arena::BufferRef;
use fastformat_core::ImageError;
use indexmap::IndexMap;

use crate::record::ArrowRecord;

/// Builds an [`ArrowRecord`] column by column.
///
/// Columns keep the order they were pushed in. Pushing a name twice
/// replaces the earlier column but keeps its position.
#[derive(Debug, Default)]
pub struct RecordBuilder {
    columns: IndexMap<String, ArrayRef>,
    buffers: IndexMap<String, BufferRef>,
}

impl RecordBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an Arrow column.
    pub fn push_column(mut self, name: &str, column: ArrayRef) -> Self {
        self.buffers.shift_remove(name);
        self.columns.insert(name.to_owned(), column);
        self
    }

    /// Add a one-element `UInt32` column.
    pub fn push_u32(self, name: &str, value: u32) -> Self {
        self.push_column(name, Arc::new(UInt32Array::from_value(value, 1)))
    }

    /// Add a one-element `Utf8` column.
    pub fn push_utf8(self, name: &str, value: &str) -> Self {
        self.push_column(name, Arc::new(StringArray::from(vec![value])))
    }

    /// Add a `UInt8` column over `buffer`'s bytes, without copying.
    ///
    /// The Arrow child keeps its own reference to `buffer`, so the bytes
    /// stay valid for every Arrow consumer the record is handed to.
    pub fn push_bytes(self, name: &str, buffer: BufferRef) -> Self {
        let values = UInt8Array::new(ScalarBuffer::from(arrow_buffer(&buffer)), None);
        let mut this = self.push_column(name, Arc::new(values));
        this.buffers.insert(name.to_owned(), buffer);
        this
    }

    /// Finish the record as a dense union with one field per column.
    pub fn finish(self) -> Result<ArrowRecord, ImageError> {
        let mut fields = Vec::with_capacity(self.columns.len());
        let mut children = Vec::with_capacity(self.columns.len());
        let mut ids = IndexMap::with_capacity(self.columns.len());
        for (index, (name, column)) in self.columns.into_iter().enumerate() {
            let type_id = i8::try_from(index).map_err(|_| ImageError::SchemaMismatch {
                reason: format!("too many columns: a union holds at most {}", i8::MAX),
            })?;
            let field = Field::new(name.as_str(), column.data_type().clone(), false);
            fields.push((type_id, Arc::new(field)));
            children.push(column);
            ids.insert(name, type_id);
        }
        let fields: UnionFields = fields.into_iter().collect();
        let type_ids = ScalarBuffer::<i8>::from(Vec::new());
        let offsets = ScalarBuffer::<i32>::from(Vec::new());
        let array = UnionArray::try_new(fields, type_ids, Some(offsets), children).map_err(|e| {
            ImageError::SchemaMismatch {
                reason: e.to_string(),
            }
        })?;
        Ok(ArrowRecord::from_parts(array, ids, self.buffers))
    }
}

/// Arrow buffer over `buffer`'s bytes, owning one reference to it.
#[allow(unsafe_code)]
fn arrow_buffer(buffer: &BufferRef) -> Buffer {
    let ptr = NonNull::new(buffer.as_ptr().cast_mut()).unwrap_or(NonNull::dangling());
    let len = buffer.len();
    let owner = Arc::new(AssertUnwindSafe(buffer.clone()));
    // SAFETY: `owner` keeps the buffer alive, and a BufferRef's address and
    // length never change while any reference exists. The Arrow side only
    // reads, and because `owner` is a second reference the arena never
    // hands out the bytes mutably while the Arrow buffer is alive.
    unsafe { Buffer::from_custom_allocation(ptr, len, owner) }
}
