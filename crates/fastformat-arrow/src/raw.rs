//! Borrowed views into a record's pixel buffer.

use fastformat_arena::BufferRef;
use fastformat_core::ImageSchema;
use fastformat_image::TypedImage;

/// The pixel bytes of a record together with their parsed schema.
///
/// Borrows the record, so neither this value nor any view made from it
/// can outlive the record. Holding a `RawData` does not change the
/// buffer's reference count.
#[derive(Clone, Debug)]
pub struct RawData<'r> {
    buffer: &'r BufferRef,
    view: TypedImage<'r>,
}

impl<'r> RawData<'r> {
    pub(crate) fn new(buffer: &'r BufferRef, view: TypedImage<'r>) -> Self {
        Self { buffer, view }
    }

    /// Start address of the pixel bytes.
    pub fn as_ptr(&self) -> *const u8 {
        self.buffer.as_ptr()
    }

    /// Length of the pixel bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Always false: image records carry at least one pixel.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The pixel bytes, for as long as the record is borrowed.
    pub fn bytes(&self) -> &'r [u8] {
        self.buffer.as_slice()
    }

    /// Geometry, layout and name read from the record.
    pub fn schema(&self) -> &ImageSchema {
        self.view.schema()
    }

    pub(crate) fn buffer(&self) -> &'r BufferRef {
        self.buffer
    }

    pub(crate) fn view(&self) -> &TypedImage<'r> {
        &self.view
    }
}
