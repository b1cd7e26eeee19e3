//! Owned/borrowed tagging for handles that expose memory.

use std::fmt;

/// Whether dropping a handle releases a buffer reference.
///
/// The integer discriminant is the tag written to C callers.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// The handle holds one buffer reference and releases it on drop.
    Owned = 0,
    /// The handle views memory owned elsewhere and releases nothing.
    Borrowed = 1,
}

impl Ownership {
    /// Whether this handle may transfer its reference to a foreign owner.
    pub fn can_hand_off(self) -> bool {
        self == Self::Owned
    }
}

impl fmt::Display for Ownership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owned => f.write_str("owned"),
            Self::Borrowed => f.write_str("borrowed"),
        }
    }
}
