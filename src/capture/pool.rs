// SPDX-License-Identifier: GPL-3.0-only

//! Finite capture buffer pool
//!
//! Models the fixed set of buffers a camera HAL cycles through. A frame holds one
//! slot from acquire until its release guard fires. When every slot is out the
//! source has to drop new frames, which is what a leaked frame looks like in
//! practice: capture silently stalls.

use crate::frame::ReleaseGuard;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub capacity: usize,
    pub outstanding: usize,
    pub acquired: u64,
    pub released: u64,
    /// Acquire attempts refused because the pool was empty
    pub exhausted: u64,
}

#[derive(Debug)]
struct PoolInner {
    capacity: usize,
    outstanding: AtomicUsize,
    acquired: AtomicU64,
    released: AtomicU64,
    exhausted: AtomicU64,
}

#[derive(Debug, Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                capacity: capacity.max(1),
                outstanding: AtomicUsize::new(0),
                acquired: AtomicU64::new(0),
                released: AtomicU64::new(0),
                exhausted: AtomicU64::new(0),
            }),
        }
    }

    /// Take a buffer slot; `None` when all are in flight
    pub fn try_acquire(&self) -> Option<ReleaseGuard> {
        let capacity = self.inner.capacity;
        let taken = self
            .inner
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < capacity).then_some(n + 1)
            });

        if taken.is_err() {
            self.inner.exhausted.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        self.inner.acquired.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);
        Some(ReleaseGuard::new(move || {
            inner.outstanding.fetch_sub(1, Ordering::AcqRel);
            inner.released.fetch_add(1, Ordering::Relaxed);
        }))
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.inner.capacity,
            outstanding: self.inner.outstanding.load(Ordering::Acquire),
            acquired: self.inner.acquired.load(Ordering::Relaxed),
            released: self.inner.released.load(Ordering::Relaxed),
            exhausted: self.inner.exhausted.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhaustion_and_return() {
        let pool = BufferPool::new(2);
        let a = pool.try_acquire().unwrap();
        let _b = pool.try_acquire().unwrap();
        assert!(pool.try_acquire().is_none());
        assert_eq!(pool.stats().exhausted, 1);

        drop(a);
        assert!(pool.try_acquire().is_some());

        let stats = pool.stats();
        assert_eq!(stats.acquired, 3);
        assert_eq!(stats.released, 2);
        assert_eq!(stats.outstanding, 1);
    }
}
