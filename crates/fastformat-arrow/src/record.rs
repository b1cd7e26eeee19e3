//! Columnar records backed by an Arrow dense union.

use std::sync::Arc;

use arrow::array::{Array, ArrayData, ArrayRef, StringArray, UInt32Array, UInt8Array, UnionArray};
use arrow::datatypes::DataType;
use fastformat_arena::{BufferArena, BufferRef};
use fastformat_core::ImageError;
use indexmap::IndexMap;

use crate::builder::RecordBuilder;

/// An Arrow `UnionArray` whose children are named columns.
///
/// Each union field is one column; the union itself has no rows, so the
/// children carry all values. This is the layout dora nodes exchange and
/// what pyarrow sees after [`to_data`](Self::to_data).
///
/// `UInt8` columns are also available as arena buffers through
/// [`bytes_column`](Self::bytes_column), sharing memory with the Arrow
/// child. Cloning a record retains those buffers.
#[derive(Clone, Debug)]
pub struct ArrowRecord {
    array: UnionArray,
    columns: IndexMap<String, i8>,
    buffers: IndexMap<String, BufferRef>,
}

impl ArrowRecord {
    pub(crate) fn from_parts(
        array: UnionArray,
        columns: IndexMap<String, i8>,
        buffers: IndexMap<String, BufferRef>,
    ) -> Self {
        Self {
            array,
            columns,
            buffers,
        }
    }

    /// Start building a record.
    pub fn builder() -> RecordBuilder {
        RecordBuilder::new()
    }

    /// Wrap Arrow data produced elsewhere without copying.
    ///
    /// The data must be a valid union array. Each `UInt8` child is adopted
    /// into the shared arena as a read-only buffer that keeps the Arrow
    /// memory alive, so images made from it never write to bytes another
    /// Arrow consumer may be reading.
    pub fn try_from_data(data: ArrayData) -> Result<Self, ImageError> {
        if !matches!(data.data_type(), DataType::Union(..)) {
            return Err(ImageError::SchemaMismatch {
                reason: format!("expected a union array, got {}", data.data_type()),
            });
        }
        data.validate_full().map_err(|e| ImageError::SchemaMismatch {
            reason: e.to_string(),
        })?;
        let array = UnionArray::from(data);
        let DataType::Union(fields, _) = array.data_type() else {
            return Err(ImageError::SchemaMismatch {
                reason: "union array lost its union type".into(),
            });
        };

        let mut columns = IndexMap::new();
        let mut buffers = IndexMap::new();
        for (type_id, field) in fields.iter() {
            let child = array.child(type_id);
            if let Some(bytes) = child.as_any().downcast_ref::<UInt8Array>() {
                let shared = BufferArena::shared().adopt_shared(bytes.values().inner().clone());
                buffers.insert(field.name().clone(), shared);
            }
            columns.insert(field.name().clone(), type_id);
        }
        Ok(Self::from_parts(array, columns, buffers))
    }

    /// The Arrow array, for handing to Arrow consumers.
    pub fn to_data(&self) -> ArrayData {
        self.array.to_data()
    }

    /// The underlying union.
    pub fn as_union(&self) -> &UnionArray {
        &self.array
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Column by name.
    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.columns.get(name).map(|&id| self.array.child(id))
    }

    /// `(name, type)` pairs in union field order.
    pub fn schema(&self) -> Vec<(&str, &DataType)> {
        self.columns
            .iter()
            .map(|(name, &id)| (name.as_str(), self.array.child(id).data_type()))
            .collect()
    }

    fn lookup(&self, name: &str) -> Result<&ArrayRef, ImageError> {
        self.column(name).ok_or_else(|| ImageError::SchemaMismatch {
            reason: format!("missing column '{name}'"),
        })
    }

    fn typed<T: Array + 'static>(&self, name: &str, expected: DataType) -> Result<&T, ImageError> {
        let column = self.lookup(name)?;
        column
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| ImageError::SchemaMismatch {
                reason: format!(
                    "column '{name}' is {}, expected {expected}",
                    column.data_type()
                ),
            })
    }

    /// Values of a `UInt32` column.
    pub fn u32_column(&self, name: &str) -> Result<&[u32], ImageError> {
        Ok(&self.typed::<UInt32Array>(name, DataType::UInt32)?.values()[..])
    }

    /// A `Utf8` column.
    pub fn utf8_column(&self, name: &str) -> Result<&StringArray, ImageError> {
        self.typed::<StringArray>(name, DataType::Utf8)
    }

    /// Buffer behind a `UInt8` column.
    pub fn bytes_column(&self, name: &str) -> Result<&BufferRef, ImageError> {
        self.typed::<UInt8Array>(name, DataType::UInt8)?;
        self.buffers
            .get(name)
            .ok_or_else(|| ImageError::SchemaMismatch {
                reason: format!("column '{name}' has no byte buffer"),
            })
    }

    /// The single value of a one-element `UInt32` column.
    pub fn u32_scalar(&self, name: &str) -> Result<u32, ImageError> {
        match self.u32_column(name)? {
            [value] => Ok(*value),
            values => Err(single_value_expected(name, values.len())),
        }
    }

    /// The single value of a one-element `Utf8` column, `None` if null.
    pub fn utf8_scalar_opt(&self, name: &str) -> Result<Option<&str>, ImageError> {
        let column = self.utf8_column(name)?;
        if column.len() != 1 {
            return Err(single_value_expected(name, column.len()));
        }
        Ok(column.is_valid(0).then(|| column.value(0)))
    }

    /// The single value of a one-element, non-null `Utf8` column.
    pub fn utf8_scalar(&self, name: &str) -> Result<&str, ImageError> {
        self.utf8_scalar_opt(name)?
            .ok_or_else(|| ImageError::SchemaMismatch {
                reason: format!("column '{name}' is null"),
            })
    }
}

impl From<ArrowRecord> for ArrayData {
    fn from(record: ArrowRecord) -> Self {
        record.array.into_data()
    }
}

impl TryFrom<ArrayData> for ArrowRecord {
    type Error = ImageError;

    fn try_from(data: ArrayData) -> Result<Self, Self::Error> {
        Self::try_from_data(data)
    }
}

impl From<ArrowRecord> for ArrayRef {
    fn from(record: ArrowRecord) -> Self {
        Arc::new(record.array)
    }
}

fn single_value_expected(name: &str, len: usize) -> ImageError {
    ImageError::SchemaMismatch {
        reason: format!("column '{name}' has {len} values, expected 1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ArrowRecord {
        let buffer = BufferArena::default().copy_from_slice(&[1, 2, 3]).unwrap();
        ArrowRecord::builder()
            .push_u32("width", 1)
            .push_utf8("encoding", "RGB8")
            .push_bytes("data", buffer)
            .finish()
            .unwrap()
    }

    #[test]
    fn schema_keeps_insertion_order() {
        assert_eq!(
            sample().schema(),
            vec![
                ("width", &DataType::UInt32),
                ("encoding", &DataType::Utf8),
                ("data", &DataType::UInt8),
            ]
        );
    }

    #[test]
    fn typed_lookups() {
        let record = sample();
        assert_eq!(record.u32_scalar("width").unwrap(), 1);
        assert_eq!(record.utf8_scalar("encoding").unwrap(), "RGB8");
        assert_eq!(record.bytes_column("data").unwrap().as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn missing_column_is_schema_mismatch() {
        let err = sample().u32_column("height").unwrap_err();
        assert_eq!(
            err,
            ImageError::SchemaMismatch {
                reason: "missing column 'height'".into()
            }
        );
    }

    #[test]
    fn wrong_type_is_schema_mismatch() {
        let err = sample().utf8_column("width").unwrap_err();
        assert!(err.to_string().contains("is UInt32, expected Utf8"));
    }

    #[test]
    fn clone_retains_buffer() {
        let record = sample();
        let before = record.bytes_column("data").unwrap().ref_count();
        let copy = record.clone();
        let a = record.bytes_column("data").unwrap();
        let b = copy.bytes_column("data").unwrap();
        assert!(BufferRef::ptr_eq(a, b));
        assert_eq!(a.ref_count(), before + 1);
    }

    #[test]
    fn byte_column_shares_memory_with_arrow_child() {
        let record = sample();
        let buffer = record.bytes_column("data").unwrap();
        let child = record.column("data").unwrap();
        let child = child.as_any().downcast_ref::<UInt8Array>().unwrap();
        assert_eq!(child.values().as_ptr(), buffer.as_ptr());
    }

    #[test]
    fn imported_bytes_are_shared_and_read_only() {
        let record = sample();
        let addr = record.bytes_column("data").unwrap().as_ptr();
        let imported = ArrowRecord::try_from(record.to_data()).unwrap();
        let buffer = imported.bytes_column("data").unwrap();
        assert_eq!(buffer.as_ptr(), addr);
        assert!(buffer.is_read_only());
        assert_eq!(imported.u32_scalar("width").unwrap(), 1);
    }

    #[test]
    fn non_union_data_is_rejected() {
        let data = UInt8Array::from(vec![1u8, 2]).into_data();
        let err = ArrowRecord::try_from(data).unwrap_err();
        assert!(err.to_string().contains("expected a union array"));
    }

    #[test]
    fn null_utf8_scalar() {
        let record = ArrowRecord::builder()
            .push_column("name", Arc::new(StringArray::from(vec![None::<&str>])))
            .finish()
            .unwrap();
        assert_eq!(record.utf8_scalar_opt("name").unwrap(), None);
        assert!(record.utf8_scalar("name").is_err());
    }
}
