// SPDX-License-Identifier: GPL-3.0-only

//! Processing thread draining a [`LatestSlot`]
//!
//! The thread sleeps on the slot's wake signal, so both a new value and a stop
//! request wake it at once. [`SlotWorker::stop`] joins: once it returns, no handler
//! call is running and none will start. A panicking handler loses the value it was
//! given, never the thread.

use super::slot::LatestSlot;
use crate::errors::PipelineError;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Backstop for the wake signal; stop requests never rely on it
const IDLE_WAIT: Duration = Duration::from_secs(1);

pub struct SlotWorker {
    name: String,
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    wake: Box<dyn Fn() + Send + Sync>,
}

impl SlotWorker {
    /// Run `handler` on a named thread for every value taken from `slot`
    pub fn spawn<T, F>(
        name: &str,
        slot: Arc<LatestSlot<T>>,
        mut handler: F,
    ) -> Result<Self, PipelineError>
    where
        T: Send + 'static,
        F: FnMut(T) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let thread_slot = Arc::clone(&slot);
        let thread_name = name.to_string();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                // The flag is stored before the wake, so a stop is never missed
                while thread_running.load(Ordering::Acquire) {
                    if let Some(value) = thread_slot.wait_take(IDLE_WAIT) {
                        if panic::catch_unwind(AssertUnwindSafe(|| handler(value))).is_err() {
                            error!(name = %thread_name, "Slot handler panicked, value dropped");
                        }
                    }
                }
            })
            .map_err(|e| PipelineError::Spawn(e.to_string()))?;

        debug!(name, "Slot worker started");
        Ok(Self {
            name: name.to_string(),
            handle: Some(handle),
            running,
            wake: Box::new(move || slot.notify()),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Wake the thread, let it finish the value in hand and join it
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.running.store(false, Ordering::Release);
        (self.wake)();
        if handle.join().is_err() {
            warn!(name = %self.name, "Slot worker panicked");
        } else {
            debug!(name = %self.name, "Slot worker joined");
        }
    }
}

impl Drop for SlotWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
