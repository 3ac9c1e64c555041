//! Stream operators for the username pipeline, each an explicit state machine
//! driven by the owning task's `select!` loop.

use std::{future::Future, time::Duration};

use futures::{future::BoxFuture, FutureExt};
use tokio::time::Instant;

/// Holds the latest value until `window` passes without another push.
#[derive(Debug)]
pub struct Debounce<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debounce<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Replaces any pending value and re-arms the timer.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.window));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if *deadline <= now => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }

    /// Releases the pending value regardless of the timer (source completed).
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}

#[derive(Debug, Default)]
pub struct DistinctUntilChanged<T> {
    last: Option<T>,
}

impl<T: PartialEq + Clone> DistinctUntilChanged<T> {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Returns the value when it differs from the last admitted one.
    pub fn admit(&mut self, value: T) -> Option<T> {
        if self.last.as_ref() == Some(&value) {
            return None;
        }
        self.last = Some(value.clone());
        Some(value)
    }
}

/// At most one in-flight future; switching drops the previous one.
///
/// Every switch bumps a generation counter and results are tagged with the
/// generation that started them, so a caller can reject anything that is not
/// [`SwitchLatest::accepts`]-current.
pub struct SwitchLatest<T> {
    generation: u64,
    in_flight: Option<(u64, BoxFuture<'static, T>)>,
}

impl<T> Default for SwitchLatest<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SwitchLatest<T> {
    pub fn new() -> Self {
        Self {
            generation: 0,
            in_flight: None,
        }
    }

    /// Starts `fut` as the current operation. Returns the new generation and the
    /// generation of the operation it superseded, if one was still running.
    pub fn switch<F>(&mut self, fut: F) -> (u64, Option<u64>)
    where
        F: Future<Output = T> + Send + 'static,
    {
        self.generation += 1;
        let superseded = self
            .in_flight
            .replace((self.generation, fut.boxed()))
            .map(|(generation, _)| generation);
        (self.generation, superseded)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn accepts(&self, generation: u64) -> bool {
        generation == self.generation
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none()
    }

    /// Drops the in-flight operation; its result can no longer surface.
    pub fn cancel(&mut self) -> Option<u64> {
        self.in_flight.take().map(|(generation, _)| generation)
    }

    /// Resolves with the current operation's output. Pending forever when idle.
    ///
    /// Cancel-safe: dropping this future leaves the operation in place.
    pub async fn next(&mut self) -> (u64, T) {
        let Some((generation, fut)) = self.in_flight.as_mut() else {
            return std::future::pending().await;
        };
        let generation = *generation;
        let output = fut.await;
        self.in_flight = None;
        (generation, output)
    }
}
