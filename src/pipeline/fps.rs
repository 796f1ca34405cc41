// SPDX-License-Identifier: GPL-3.0-only

//! Frame rate accounting over a sliding window of display timestamps
//!
//! Only frames that reach the display side are sampled, so a stream of failing
//! frames reads as a falling rate. A window whose newest sample is older than
//! [`FPS_STALE_AFTER`] reads as 0.

use crate::constants::FPS_STALE_AFTER;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::trace;

/// Fixed-capacity ring of frame arrival times
#[derive(Debug, Clone)]
pub struct FrameRateSample {
    samples: VecDeque<Instant>,
    capacity: usize,
}

impl FrameRateSample {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record an arrival, evicting the oldest sample when full
    pub fn push(&mut self, at: Instant) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(at);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn last(&self) -> Option<Instant> {
        self.samples.back().copied()
    }

    /// [`fps`](Self::fps), or 0 when nothing arrived within `stale_after` of `now`
    pub fn fps_at(&self, now: Instant, stale_after: Duration) -> f32 {
        match self.last() {
            Some(last) if now.saturating_duration_since(last) <= stale_after => self.fps(),
            _ => 0.0,
        }
    }

    /// `(n - 1) / (last - first)`, or 0 with fewer than two samples
    pub fn fps(&self) -> f32 {
        let (Some(first), Some(last)) = (self.samples.front(), self.samples.back()) else {
            return 0.0;
        };
        if self.samples.len() < 2 {
            return 0.0;
        }
        let span = last.duration_since(*first).as_secs_f32();
        if span <= 0.0 {
            return 0.0;
        }
        (self.samples.len() - 1) as f32 / span
    }
}

type FpsCallback = Arc<dyn Fn(f32) + Send + Sync>;

/// Shared FPS ring plus periodic reporting to registered callbacks
///
/// The processing thread is the only writer; readers take the lock briefly.
#[derive(Clone)]
pub struct FpsTracker {
    inner: Arc<Mutex<TrackerInner>>,
    callbacks: Arc<Mutex<Vec<FpsCallback>>>,
    report_interval: Duration,
}

struct TrackerInner {
    ring: FrameRateSample,
    last_report: Option<Instant>,
}

impl FpsTracker {
    pub fn new(window: usize, report_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TrackerInner {
                ring: FrameRateSample::new(window),
                last_report: None,
            })),
            callbacks: Arc::new(Mutex::new(Vec::new())),
            report_interval,
        }
    }

    pub fn on_update(&self, callback: impl Fn(f32) + Send + Sync + 'static) {
        self.callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::new(callback));
    }

    /// Record a displayed frame and report if the interval has elapsed
    pub fn record(&self, at: Instant) {
        let report = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.ring.push(at);
            let due = inner
                .last_report
                .is_none_or(|last| at.duration_since(last) >= self.report_interval);
            if due {
                inner.last_report = Some(at);
                Some(inner.ring.fps())
            } else {
                None
            }
        };

        if let Some(fps) = report {
            trace!(fps, "FPS report");
            // Callbacks may register further callbacks
            let callbacks = self.callbacks.lock().unwrap_or_else(|e| e.into_inner()).clone();
            for callback in callbacks {
                callback(fps);
            }
        }
    }

    pub fn current(&self) -> f32 {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .ring
            .fps_at(Instant::now(), FPS_STALE_AFTER)
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.ring.clear();
        inner.last_report = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_cold_start_is_zero() {
        let mut ring = FrameRateSample::new(10);
        assert_eq!(ring.fps(), 0.0);
        ring.push(Instant::now());
        assert_eq!(ring.fps(), 0.0);
    }

    #[test]
    fn test_steady_rate() {
        let start = Instant::now();
        let mut ring = FrameRateSample::new(30);
        for i in 0..11 {
            ring.push(start + Duration::from_millis(i * 50));
        }
        // 10 intervals over 0.5s
        assert!((ring.fps() - 20.0).abs() < 0.01);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let start = Instant::now();
        let mut ring = FrameRateSample::new(3);
        // Slow start, then fast frames
        ring.push(start);
        ring.push(start + Duration::from_secs(1));
        ring.push(start + Duration::from_millis(1100));
        ring.push(start + Duration::from_millis(1200));
        assert_eq!(ring.len(), 3);
        assert!((ring.fps() - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_stale_window_reads_zero() {
        let start = Instant::now();
        let mut ring = FrameRateSample::new(10);
        for i in 0..5 {
            ring.push(start + Duration::from_millis(i * 40));
        }
        let last = start + Duration::from_millis(160);
        let stale_after = Duration::from_secs(1);

        assert!((ring.fps_at(last, stale_after) - 25.0).abs() < 0.01);
        assert!(ring.fps_at(last + Duration::from_millis(900), stale_after) > 0.0);
        assert_eq!(ring.fps_at(last + Duration::from_secs(2), stale_after), 0.0);
    }

    #[test]
    fn test_callback_may_register_another() {
        let tracker = FpsTracker::new(4, Duration::ZERO);
        let nested = Arc::new(AtomicUsize::new(0));
        let registrar = tracker.clone();
        let counter = Arc::clone(&nested);
        tracker.on_update(move |_| {
            let counter = Arc::clone(&counter);
            registrar.on_update(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        });

        let start = Instant::now();
        tracker.record(start);
        tracker.record(start + Duration::from_millis(10));
        // The first report registered one callback, the second ran it and added another
        assert_eq!(nested.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tracker_reports_on_interval() {
        let tracker = FpsTracker::new(10, Duration::from_millis(100));
        let reports = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reports);
        tracker.on_update(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let start = Instant::now();
        for i in 0..10 {
            tracker.record(start + Duration::from_millis(i * 25));
        }
        // t = 0, 100, 200
        assert_eq!(reports.load(Ordering::SeqCst), 3);
        assert!(tracker.current() > 0.0);

        tracker.reset();
        assert_eq!(tracker.current(), 0.0);
    }
}
