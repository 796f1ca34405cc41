// SPDX-License-Identifier: GPL-3.0-only

//! Single-slot "latest value wins" mailbox
//!
//! Producers never block: `put` replaces whatever is waiting. The wake signal is a
//! bounded(1) channel so any number of puts between two takes coalesce into one
//! wakeup.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use std::sync::Mutex;
use std::time::Duration;

pub struct LatestSlot<T> {
    value: Mutex<Option<T>>,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = bounded(1);
        Self {
            value: Mutex::new(None),
            wake_tx,
            wake_rx,
        }
    }

    /// Store `value`, returning the one it superseded
    pub fn put(&self, value: T) -> Option<T> {
        let previous = self
            .value
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(value);
        // Full means a wakeup is already pending
        let _ = self.wake_tx.try_send(());
        previous
    }

    /// Take the waiting value, if any
    pub fn take(&self) -> Option<T> {
        self.value.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    /// Take the waiting value, blocking up to `timeout` for one to arrive
    pub fn wait_take(&self, timeout: Duration) -> Option<T> {
        if let Some(value) = self.take() {
            return Some(value);
        }
        match self.wake_rx.recv_timeout(timeout) {
            Ok(()) => self.take(),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Wake signal, for use in `select!` alongside other channels
    pub fn wake_receiver(&self) -> &Receiver<()> {
        &self.wake_rx
    }

    /// Nudge any waiter without storing a value
    pub fn notify(&self) {
        let _ = self.wake_tx.try_send(());
    }

    pub fn is_empty(&self) -> bool {
        self.value
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
