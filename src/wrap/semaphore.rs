//! Counting semaphore.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// A bounded counting semaphore.
///
/// `acquire` blocks while no permit is free; `release` never blocks.
/// Waiters are woken in whatever order the platform condition variable
/// provides.
#[derive(Debug)]
pub struct Semaphore {
    available: Mutex<usize>,
    freed: Condvar,
    capacity: usize,
}

impl Semaphore {
    /// Create a semaphore with `capacity` permits, all free.
    pub fn new(capacity: usize) -> Self {
        Self {
            available: Mutex::new(capacity),
            freed: Condvar::new(),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.available.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a permit, blocking until one is free.
    pub fn acquire(&self) {
        let mut available = self.lock();
        while *available == 0 {
            available = self.freed.wait(available).unwrap_or_else(PoisonError::into_inner);
        }
        *available -= 1;
    }

    /// Take a permit if one is free right now.
    pub fn try_acquire(&self) -> bool {
        let mut available = self.lock();
        if *available == 0 {
            return false;
        }
        *available -= 1;
        true
    }

    /// Return a permit.
    ///
    /// Releasing more permits than were acquired has no effect; the count
    /// never exceeds the capacity.
    pub fn release(&self) {
        let mut available = self.lock();
        if *available < self.capacity {
            *available += 1;
        }
        drop(available);
        self.freed.notify_one();
    }

    /// Number of free permits.
    pub fn available(&self) -> usize {
        *self.lock()
    }

    /// Total number of permits.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
