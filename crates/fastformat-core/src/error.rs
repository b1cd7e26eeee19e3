//! Error types for the fastformat interchange core.
//!
//! One enum covers every failure the image, arrow and FFI layers can
//! report. Each variant maps one-to-one onto a C status code in
//! `fastformat-ffi`, and from there onto a Python exception.

use std::error::Error;
use std::fmt;

use crate::color_space::ColorSpace;

/// Errors returned by image construction, conversion and interchange.
///
/// All validation runs before any allocation or mutation commits, so an
/// `Err` always leaves the caller's prior state intact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageError {
    /// Pixel data length disagrees with `width * height * channels`, or
    /// the geometry is zero-sized or overflows.
    InvalidBufferLength {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
        /// Requested pixel layout.
        color_space: ColorSpace,
        /// Length of the supplied data in bytes.
        actual: usize,
    },
    /// No transform table entry exists for this layout pair.
    UnsupportedConversion {
        /// Source layout.
        from: ColorSpace,
        /// Requested target layout.
        to: ColorSpace,
    },
    /// An interchange record is missing a column, carries the wrong column
    /// type, or its metadata disagrees with its pixel data.
    SchemaMismatch {
        /// Human-readable description of the mismatch.
        reason: String,
    },
    /// The handle was consumed by a previous `into_*` operation.
    UseAfterMove,
    /// The handle was destroyed, or the record a view borrows from was.
    UseAfterFree,
    /// A borrowed handle was asked to transfer ownership it does not hold.
    OwnershipViolation,
    /// Backing memory could not be obtained.
    AllocationFailure {
        /// Number of bytes requested.
        requested: usize,
    },
}

impl ImageError {
    /// Whether retrying the same call can succeed once the caller has
    /// freed memory elsewhere. Every other kind is deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AllocationFailure { .. })
    }
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBufferLength {
                width,
                height,
                color_space,
                actual,
            } => {
                let expected = (*width as usize)
                    .checked_mul(*height as usize)
                    .and_then(|n| n.checked_mul(color_space.channels()));
                match expected {
                    Some(0) => write!(
                        f,
                        "zero-sized {color_space} image ({width}x{height}) is not allowed"
                    ),
                    Some(expected) => write!(
                        f,
                        "{width}x{height} {color_space} needs {expected} bytes, got {actual}"
                    ),
                    None => write!(
                        f,
                        "{width}x{height} {color_space} overflows the addressable size"
                    ),
                }
            }
            Self::UnsupportedConversion { from, to } => {
                write!(f, "no conversion from {from} to {to}")
            }
            Self::SchemaMismatch { reason } => write!(f, "schema mismatch: {reason}"),
            Self::UseAfterMove => write!(f, "handle used after being consumed"),
            Self::UseAfterFree => write!(f, "handle used after being destroyed"),
            Self::OwnershipViolation => {
                write!(f, "borrowed handle cannot transfer ownership")
            }
            Self::AllocationFailure { requested } => {
                write!(f, "allocation of {requested} bytes failed")
            }
        }
    }
}

impl Error for ImageError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_length_reports_expected_bytes() {
        let err = ImageError::InvalidBufferLength {
            width: 2,
            height: 2,
            color_space: ColorSpace::Rgb8,
            actual: 5,
        };
        assert_eq!(err.to_string(), "2x2 RGB8 needs 12 bytes, got 5");
    }

    #[test]
    fn zero_sized_message() {
        let err = ImageError::InvalidBufferLength {
            width: 0,
            height: 4,
            color_space: ColorSpace::Gray8,
            actual: 0,
        };
        assert!(err.to_string().contains("zero-sized"));
    }

    #[test]
    fn only_allocation_failure_is_retryable() {
        assert!(ImageError::AllocationFailure { requested: 1 }.is_retryable());
        assert!(!ImageError::UseAfterMove.is_retryable());
        assert!(!ImageError::OwnershipViolation.is_retryable());
    }
}
