//! Reference count of attach requests to the managed runtime
//!
//! The count and the transition callbacks run under one lock, so a 0→1
//! attach and a 1→0 detach can never interleave between threads.

use crate::errors::ImbalanceError;
use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct AttachState {
    count: Mutex<usize>,
}

impl AttachState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        *self.count.lock()
    }

    pub fn is_attached(&self) -> bool {
        self.count() > 0
    }

    /// Increment the count, running `on_first` on the 0→1 transition
    ///
    /// If `on_first` fails the count is left untouched.
    pub fn acquire<E>(&self, on_first: impl FnOnce() -> Result<(), E>) -> Result<(), E> {
        let mut count = self.count.lock();
        if *count == 0 {
            on_first()?;
        }
        *count += 1;
        Ok(())
    }

    /// Decrement the count, running `on_last` on the 1→0 transition
    pub fn release(&self, on_last: impl FnOnce()) -> Result<(), ImbalanceError> {
        let mut count = self.count.lock();
        match *count {
            0 => Err(ImbalanceError),
            1 => {
                on_last();
                *count = 0;
                Ok(())
            }
            _ => {
                *count -= 1;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_transitions_fire_once() {
        let state = AttachState::new();
        let firsts = Cell::new(0);
        let lasts = Cell::new(0);

        for _ in 0..3 {
            state
                .acquire(|| {
                    firsts.set(firsts.get() + 1);
                    Ok::<(), ()>(())
                })
                .unwrap();
        }
        assert_eq!(state.count(), 3);

        for _ in 0..3 {
            state.release(|| lasts.set(lasts.get() + 1)).unwrap();
        }
        assert_eq!(state.count(), 0);
        assert_eq!(firsts.get(), 1);
        assert_eq!(lasts.get(), 1);
    }

    #[test]
    fn test_failed_first_acquire_rolls_back() {
        let state = AttachState::new();
        let result = state.acquire(|| Err("vm unavailable"));
        assert_eq!(result, Err("vm unavailable"));
        assert_eq!(state.count(), 0);
        assert!(!state.is_attached());
    }

    #[test]
    fn test_release_at_zero_is_imbalance() {
        let state = AttachState::new();
        assert_eq!(state.release(|| {}), Err(ImbalanceError));
        assert_eq!(state.count(), 0);
    }
}
