use std::mem;

use crate::{MlErr, Result};

/// Host-resident storage for the parameter states visited during an outer epoch.
///
/// Every state is copied into one contiguous buffer reserved up front, so the memory an outer
/// epoch needs is known, and failing to obtain it is reported, before training starts.
#[derive(Debug)]
pub struct IterateArena {
    buf: Vec<f32>,
    state_len: usize,
    capacity: usize,
}

impl IterateArena {
    /// Creates a new `IterateArena`.
    ///
    /// # Arguments
    /// * `state_len` - The amount of parameters in one state.
    /// * `capacity` - The maximum amount of states held at once.
    ///
    /// # Errors
    /// `MlErr::Allocation` if the buffer cannot be reserved.
    pub fn with_capacity(state_len: usize, capacity: usize) -> Result<Self> {
        let total = state_len.saturating_mul(capacity);
        let mut buf = Vec::new();

        buf.try_reserve_exact(total)
            .map_err(|source| MlErr::Allocation {
                bytes: total.saturating_mul(mem::size_of::<f32>()),
                source,
            })?;

        Ok(Self {
            buf,
            state_len,
            capacity,
        })
    }

    /// Copies `state` in as the newest iterate.
    ///
    /// # Returns
    /// The step index of the stored state.
    pub fn push(&mut self, state: &[f32]) -> Result<usize> {
        if state.len() != self.state_len {
            return Err(MlErr::SizeMismatch {
                what: "iterate state",
                got: state.len(),
                expected: self.state_len,
            });
        }

        if self.len() == self.capacity {
            return Err(MlErr::ArenaFull {
                capacity: self.capacity,
            });
        }

        self.buf.extend_from_slice(state);
        Ok(self.len() - 1)
    }

    /// Returns the state stored at step `index`.
    pub fn get(&self, index: usize) -> Option<&[f32]> {
        if index >= self.len() {
            return None;
        }

        let start = index * self.state_len;
        Some(&self.buf[start..start + self.state_len])
    }

    pub fn last(&self) -> Option<&[f32]> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// Drops every state, keeping the reserved memory.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn len(&self) -> usize {
        if self.state_len == 0 {
            return 0;
        }

        self.buf.len() / self.state_len
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Size in bytes of the reserved buffer.
    pub fn bytes(&self) -> usize {
        self.buf.capacity() * mem::size_of::<f32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_are_indexed_by_step() {
        let mut arena = IterateArena::with_capacity(2, 3).unwrap();

        assert_eq!(arena.push(&[1.0, 2.0]).unwrap(), 0);
        assert_eq!(arena.push(&[3.0, 4.0]).unwrap(), 1);

        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(0).unwrap(), [1.0, 2.0]);
        assert_eq!(arena.last().unwrap(), [3.0, 4.0]);
        assert!(arena.get(2).is_none());
    }

    #[test]
    fn pushing_past_capacity_fails() {
        let mut arena = IterateArena::with_capacity(1, 1).unwrap();

        arena.push(&[1.0]).unwrap();

        assert!(matches!(
            arena.push(&[2.0]),
            Err(MlErr::ArenaFull { capacity: 1 })
        ));
    }

    #[test]
    fn clear_keeps_the_reservation() {
        let mut arena = IterateArena::with_capacity(4, 2).unwrap();
        let bytes = arena.bytes();
        assert!(bytes >= 4 * 2 * 4);

        arena.push(&[0.0; 4]).unwrap();
        arena.clear();

        assert!(arena.is_empty());
        assert!(arena.last().is_none());
        assert_eq!(arena.bytes(), bytes);
    }

    #[test]
    fn wrong_state_length_is_rejected() {
        let mut arena = IterateArena::with_capacity(3, 2).unwrap();
        assert!(arena.push(&[0.0; 2]).is_err());
    }

    #[test]
    fn impossible_reservation_is_a_resource_error() {
        let res = IterateArena::with_capacity(usize::MAX / 2, 4);
        assert!(matches!(res, Err(MlErr::Allocation { .. })));
    }
}
