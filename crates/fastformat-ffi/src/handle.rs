//! Slot+generation handle table for FFI lifetime management.
//!
//! Handles given to C callers are `u64` values that index a slot and carry
//! the slot's generation at issue time. A slot moves through three states:
//!
//! ```text
//! Live ──take──▶ Moved ──remove──▶ Vacant (generation + 1)
//!   └─────────────remove──────────────┘
//! ```
//!
//! Lookups tell apart a handle that was never issued, one whose value was
//! consumed, and one that was destroyed, so stale handles report an error
//! instead of reaching freed memory. Double-destroy is a safe error.

use crate::status::FfStatus;

/// Handle encoding: upper 32 bits = slot index, lower 32 bits = generation.
///
/// Generations start at 1, so 0 is never a valid handle.
fn encode(slot: u32, generation: u32) -> u64 {
    ((slot as u64) << 32) | (generation as u64)
}

fn decode(handle: u64) -> (u32, u32) {
    let slot = (handle >> 32) as u32;
    let generation = handle as u32;
    (slot, generation)
}

/// Why a handle lookup failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum HandleError {
    /// Never issued by this table.
    Invalid,
    /// Issued, then consumed by a moving operation.
    Moved,
    /// Issued, then destroyed.
    Released,
}

impl From<HandleError> for FfStatus {
    fn from(e: HandleError) -> Self {
        match e {
            HandleError::Invalid => FfStatus::InvalidHandle,
            HandleError::Moved => FfStatus::UseAfterMove,
            HandleError::Released => FfStatus::UseAfterFree,
        }
    }
}

enum SlotState<T> {
    Live(T),
    Moved,
    Vacant,
}

struct Slot<T> {
    generation: u32,
    state: SlotState<T>,
}

/// A slot+generation handle table mapping `u64` handles to owned values.
///
/// Reuses vacant slots via a free list. Generation counters increment on
/// removal, making stale handles detectable without UB.
pub(crate) struct HandleTable<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
}

impl<T> HandleTable<T> {
    /// Create an empty handle table.
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Insert a value and return its handle.
    pub fn insert(&mut self, value: T) -> u64 {
        if let Some(slot_idx) = self.free_list.pop() {
            let slot = &mut self.slots[slot_idx as usize];
            slot.state = SlotState::Live(value);
            encode(slot_idx, slot.generation)
        } else {
            let slot_idx = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 1,
                state: SlotState::Live(value),
            });
            encode(slot_idx, 1)
        }
    }

    /// Slot for `handle` if its generation is current.
    fn slot(&self, handle: u64) -> Result<&Slot<T>, HandleError> {
        let (slot_idx, generation) = decode(handle);
        let slot = self
            .slots
            .get(slot_idx as usize)
            .ok_or(HandleError::Invalid)?;
        check_generation(slot.generation, generation)?;
        Ok(slot)
    }

    fn slot_mut(&mut self, handle: u64) -> Result<&mut Slot<T>, HandleError> {
        let (slot_idx, generation) = decode(handle);
        let slot = self
            .slots
            .get_mut(slot_idx as usize)
            .ok_or(HandleError::Invalid)?;
        check_generation(slot.generation, generation)?;
        Ok(slot)
    }

    /// Get an immutable reference to the value behind a live handle.
    pub fn get(&self, handle: u64) -> Result<&T, HandleError> {
        match &self.slot(handle)?.state {
            SlotState::Live(value) => Ok(value),
            SlotState::Moved => Err(HandleError::Moved),
            SlotState::Vacant => Err(HandleError::Invalid),
        }
    }

    /// Move the value out, leaving the handle `Moved`.
    ///
    /// The slot stays allocated until [`remove`](Self::remove) so the
    /// caller's handle keeps reporting `Moved` rather than `Invalid`.
    pub fn take(&mut self, handle: u64) -> Result<T, HandleError> {
        let slot = self.slot_mut(handle)?;
        match std::mem::replace(&mut slot.state, SlotState::Moved) {
            SlotState::Live(value) => Ok(value),
            other => {
                let err = match other {
                    SlotState::Moved => HandleError::Moved,
                    _ => HandleError::Invalid,
                };
                slot.state = other;
                Err(err)
            }
        }
    }

    /// Put a value back behind a handle that [`take`](Self::take) moved.
    ///
    /// Used when a consuming operation fails after taking its input.
    pub fn restore(&mut self, handle: u64, value: T) -> Result<(), HandleError> {
        let slot = self.slot_mut(handle)?;
        match slot.state {
            SlotState::Moved => {
                slot.state = SlotState::Live(value);
                Ok(())
            }
            SlotState::Live(_) => Err(HandleError::Invalid),
            SlotState::Vacant => Err(HandleError::Invalid),
        }
    }

    /// Destroy a handle, returning its value if it was still live.
    ///
    /// Removing a `Moved` handle is legal and yields `Ok(None)`.
    /// Increments the generation counter and adds the slot to the free list.
    /// If the generation wraps to 0, the slot is permanently retired (not
    /// returned to the free list) to prevent ABA handle resurrection.
    pub fn remove(&mut self, handle: u64) -> Result<Option<T>, HandleError> {
        let (slot_idx, _) = decode(handle);
        let slot = self.slot_mut(handle)?;
        let value = match std::mem::replace(&mut slot.state, SlotState::Vacant) {
            SlotState::Live(value) => Some(value),
            SlotState::Moved => None,
            SlotState::Vacant => return Err(HandleError::Invalid),
        };
        slot.generation = slot.generation.wrapping_add(1);
        if slot.generation != 0 {
            self.free_list.push(slot_idx);
        }
        Ok(value)
    }
}

/// Compare a handle's generation against its slot's.
///
/// Older generations were destroyed; newer ones were never issued.
fn check_generation(current: u32, requested: u32) -> Result<(), HandleError> {
    if requested == 0 {
        return Err(HandleError::Invalid);
    }
    match requested.cmp(&current) {
        std::cmp::Ordering::Equal => Ok(()),
        std::cmp::Ordering::Less => Err(HandleError::Released),
        std::cmp::Ordering::Greater => Err(HandleError::Invalid),
    }
}
