//! C-compatible status codes.
//!
//! [`FfStatus`] is a `repr(i32)` enum covering every error condition a C
//! caller can observe. Conversions from the Rust error types are provided.

use fastformat_arena::ArenaError;
use fastformat_core::ImageError;

/// C-compatible status code returned by all FFI functions.
///
/// `Ok` = 0, all errors are negative. Values are ABI-stable.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FfStatus {
    /// Success.
    Ok = 0,
    /// Handle was never issued.
    InvalidHandle = -1,
    /// Pixel data length does not match `width * height * channels`.
    InvalidBufferLength = -2,
    /// No transform exists between the two color spaces.
    UnsupportedConversion = -3,
    /// Record metadata is missing, mistyped or inconsistent.
    SchemaMismatch = -4,
    /// Handle was consumed by a moving operation.
    UseAfterMove = -5,
    /// Handle (or the record a view depends on) was destroyed.
    UseAfterFree = -6,
    /// Borrowed memory cannot be handed off as owned.
    OwnershipViolation = -7,
    /// Buffer memory could not be obtained.
    AllocationFailure = -8,
    /// An argument is null, out of range, or otherwise invalid.
    InvalidArgument = -9,
    /// Caller-provided buffer is too small.
    BufferTooSmall = -10,
    /// Internal error (e.g. poisoned mutex after a prior panic).
    InternalError = -11,
    /// A Rust panic was caught at the FFI boundary.
    Panicked = -128,
}

impl From<&ImageError> for FfStatus {
    fn from(e: &ImageError) -> Self {
        match e {
            ImageError::InvalidBufferLength { .. } => FfStatus::InvalidBufferLength,
            ImageError::UnsupportedConversion { .. } => FfStatus::UnsupportedConversion,
            ImageError::SchemaMismatch { .. } => FfStatus::SchemaMismatch,
            ImageError::UseAfterMove => FfStatus::UseAfterMove,
            ImageError::UseAfterFree => FfStatus::UseAfterFree,
            ImageError::OwnershipViolation => FfStatus::OwnershipViolation,
            ImageError::AllocationFailure { .. } => FfStatus::AllocationFailure,
        }
    }
}

impl From<ImageError> for FfStatus {
    fn from(e: ImageError) -> Self {
        FfStatus::from(&e)
    }
}

impl From<&ArenaError> for FfStatus {
    fn from(_e: &ArenaError) -> Self {
        FfStatus::AllocationFailure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastformat_core::ColorSpace;

    #[test]
    fn status_code_values_are_stable() {
        assert_eq!(FfStatus::Ok as i32, 0);
        assert_eq!(FfStatus::InvalidHandle as i32, -1);
        assert_eq!(FfStatus::InvalidBufferLength as i32, -2);
        assert_eq!(FfStatus::UnsupportedConversion as i32, -3);
        assert_eq!(FfStatus::SchemaMismatch as i32, -4);
        assert_eq!(FfStatus::UseAfterMove as i32, -5);
        assert_eq!(FfStatus::UseAfterFree as i32, -6);
        assert_eq!(FfStatus::OwnershipViolation as i32, -7);
        assert_eq!(FfStatus::AllocationFailure as i32, -8);
        assert_eq!(FfStatus::InvalidArgument as i32, -9);
        assert_eq!(FfStatus::BufferTooSmall as i32, -10);
        assert_eq!(FfStatus::InternalError as i32, -11);
    }

    #[test]
    fn panicked_status_is_negative_128() {
        assert_eq!(FfStatus::Panicked as i32, -128);
    }

    #[test]
    fn image_error_to_status() {
        assert_eq!(
            FfStatus::from(&ImageError::InvalidBufferLength {
                width: 1,
                height: 1,
                color_space: ColorSpace::Rgb8,
                actual: 2
            }),
            FfStatus::InvalidBufferLength
        );
        assert_eq!(
            FfStatus::from(&ImageError::UnsupportedConversion {
                from: ColorSpace::Rgb8,
                to: ColorSpace::Gray8
            }),
            FfStatus::UnsupportedConversion
        );
        assert_eq!(
            FfStatus::from(&ImageError::SchemaMismatch { reason: "x".into() }),
            FfStatus::SchemaMismatch
        );
        assert_eq!(
            FfStatus::from(&ImageError::UseAfterMove),
            FfStatus::UseAfterMove
        );
        assert_eq!(
            FfStatus::from(&ImageError::UseAfterFree),
            FfStatus::UseAfterFree
        );
        assert_eq!(
            FfStatus::from(&ImageError::OwnershipViolation),
            FfStatus::OwnershipViolation
        );
        assert_eq!(
            FfStatus::from(&ImageError::AllocationFailure { requested: 8 }),
            FfStatus::AllocationFailure
        );
    }

    #[test]
    fn arena_error_to_status() {
        assert_eq!(
            FfStatus::from(&ArenaError::OutOfMemory { requested: 1 }),
            FfStatus::AllocationFailure
        );
    }
}
