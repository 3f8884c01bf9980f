//! Background retry timer for failed fetches.
//!
//! A [`RetryTimer`] is either idle or armed. Arming spawns one task that
//! invokes the tick callback every interval until the timer is cancelled or
//! dropped. Arming an already armed timer does nothing, so a client never
//! runs more than one retry loop.

use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub type RetryFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Callback run on every tick of an armed timer.
pub type RetryCallback = Arc<dyn Fn() -> RetryFuture + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Idle,
    Armed,
}

pub struct RetryTimer {
    interval: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RetryTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            handle: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Arm the timer. Returns `false` if it was already armed or the
    /// interval is zero.
    ///
    /// The first tick fires one full interval after arming. Must be called
    /// from within a Tokio runtime.
    pub fn arm(&self, on_tick: RetryCallback) -> bool {
        if self.interval.is_zero() {
            tracing::warn!("Retry timer not armed: interval is zero");
            return false;
        }

        let mut handle = self.handle.lock();
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }

        let interval = self.interval;
        *handle = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                on_tick().await;
            }
        }));

        tracing::debug!("Retry timer armed with interval {:?}", interval);
        true
    }

    /// Cancel the timer. Returns `true` if it was armed.
    ///
    /// A tick that is mid-flight is aborted at its next suspension point.
    pub fn cancel(&self) -> bool {
        match self.handle.lock().take() {
            Some(handle) => {
                let was_running = !handle.is_finished();
                handle.abort();
                if was_running {
                    tracing::debug!("Retry timer cancelled");
                }
                was_running
            }
            None => false,
        }
    }

    pub fn state(&self) -> RetryState {
        if self.is_armed() {
            RetryState::Armed
        } else {
            RetryState::Idle
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for RetryTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}
