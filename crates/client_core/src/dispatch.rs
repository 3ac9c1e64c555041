//! The single point through which UI-visible outputs are delivered.
//!
//! Worker tasks never touch UI-owned state directly. They hand a job to a
//! [`UiDispatcher`], and the UI side decides where that job runs.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};

pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

pub trait UiDispatcher: Send + Sync + 'static {
    fn dispatch(&self, job: UiJob);
}

/// Runs jobs on the calling worker. Useful headless and in tests.
pub struct ImmediateDispatcher;

impl UiDispatcher for ImmediateDispatcher {
    fn dispatch(&self, job: UiJob) {
        job();
    }
}

pub struct ChannelDispatcher {
    tx: Sender<UiJob>,
}

/// UI-thread end of a [`ChannelDispatcher`].
pub struct UiQueue {
    rx: Receiver<UiJob>,
}

pub fn ui_channel(capacity: usize) -> (ChannelDispatcher, UiQueue) {
    let (tx, rx) = bounded(capacity);
    (ChannelDispatcher { tx }, UiQueue { rx })
}

impl UiDispatcher for ChannelDispatcher {
    fn dispatch(&self, job: UiJob) {
        match self.tx.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!("ui dispatch queue is full; dropping output");
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("ui dispatch queue disconnected; dropping output");
            }
        }
    }
}

impl UiQueue {
    /// Runs every queued job without blocking. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Blocks up to `timeout` for one job. `false` on timeout or once every
    /// dispatcher is gone.
    pub fn run_next_timeout(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(job) => {
                job();
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
