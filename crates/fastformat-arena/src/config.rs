//! Arena configuration parameters.

use std::error::Error;
use std::fmt;

/// Configuration for a [`BufferArena`](crate::BufferArena).
///
/// Validated at construction; all values are immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Alignment of arena-allocated buffers in bytes.
    ///
    /// Default: 64 (one cache line, and wide enough for any SIMD load).
    /// Must be a power of two no larger than [`ArenaConfig::MAX_ALIGNMENT`].
    /// Adopted memory keeps whatever alignment it arrived with.
    pub alignment: usize,

    /// Upper bound on bytes held live by this arena, or `None` for no cap.
    ///
    /// Checked before allocating; a request that would cross the cap fails
    /// with `AllocationFailure` and allocates nothing. Adopted memory
    /// counts towards the live total but is never refused, since adopting
    /// allocates nothing.
    pub max_live_bytes: Option<usize>,
}

impl ArenaConfig {
    /// Default buffer alignment.
    pub const DEFAULT_ALIGNMENT: usize = 64;

    /// Largest accepted alignment (one page).
    pub const MAX_ALIGNMENT: usize = 4096;

    /// Config with a cap on live bytes and default alignment.
    pub fn with_limit(max_live_bytes: usize) -> Self {
        Self {
            max_live_bytes: Some(max_live_bytes),
            ..Self::default()
        }
    }

    /// Check that every field is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.alignment.is_power_of_two() || self.alignment > Self::MAX_ALIGNMENT {
            return Err(ConfigError::InvalidAlignment {
                alignment: self.alignment,
            });
        }
        if self.max_live_bytes == Some(0) {
            return Err(ConfigError::ZeroLimit);
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            alignment: Self::DEFAULT_ALIGNMENT,
            max_live_bytes: None,
        }
    }
}

/// Arena configuration rejected by [`ArenaConfig::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Alignment is zero, not a power of two, or above the maximum.
    InvalidAlignment {
        /// The rejected alignment.
        alignment: usize,
    },
    /// `max_live_bytes` is `Some(0)`, which would refuse every allocation.
    ZeroLimit,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAlignment { alignment } => write!(
                f,
                "alignment {alignment} must be a power of two <= {}",
                ArenaConfig::MAX_ALIGNMENT
            ),
            Self::ZeroLimit => write!(f, "max_live_bytes must be non-zero"),
        }
    }
}

impl Error for ConfigError {}
