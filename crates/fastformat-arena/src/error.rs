//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use fastformat_core::ImageError;

/// Errors that can occur while obtaining buffer memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The system allocator returned null, or the request cannot be
    /// described as a valid layout.
    OutOfMemory {
        /// Number of bytes requested.
        requested: usize,
    },
    /// Serving the request would exceed the arena's `max_live_bytes`.
    LimitExceeded {
        /// Number of bytes requested.
        requested: usize,
        /// Bytes live at the time of the request.
        live: usize,
        /// Configured cap.
        limit: usize,
    },
}

impl ArenaError {
    /// Number of bytes the failed request asked for.
    pub fn requested(&self) -> usize {
        match self {
            Self::OutOfMemory { requested } | Self::LimitExceeded { requested, .. } => *requested,
        }
    }
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { requested } => {
                write!(f, "out of memory allocating {requested} bytes")
            }
            Self::LimitExceeded {
                requested,
                live,
                limit,
            } => write!(
                f,
                "arena limit exceeded: requested {requested} bytes with {live} live, limit {limit}"
            ),
        }
    }
}

impl Error for ArenaError {}

impl From<ArenaError> for ImageError {
    fn from(e: ArenaError) -> Self {
        ImageError::AllocationFailure {
            requested: e.requested(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_to_allocation_failure() {
        let e = ArenaError::LimitExceeded {
            requested: 10,
            live: 95,
            limit: 100,
        };
        assert_eq!(
            ImageError::from(e),
            ImageError::AllocationFailure { requested: 10 }
        );
    }

    #[test]
    fn display_mentions_limit() {
        let e = ArenaError::LimitExceeded {
            requested: 10,
            live: 95,
            limit: 100,
        };
        assert!(e.to_string().contains("limit 100"));
    }
}
