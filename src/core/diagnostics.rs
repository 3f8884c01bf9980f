//! Structured diagnostics.
//!
//! The client never surfaces fetch or persistence failures to the caller of
//! `start`/`set_user`. Instead every notable step is reported as a
//! [`Diagnostic`] to a [`DiagnosticObserver`]. The default observer forwards
//! to `tracing`.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ErrorCode, SkylabError};
use crate::types::VariantSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    FetchStarted {
        generation: u64,
        timeout: Duration,
    },
    FetchSucceeded {
        generation: u64,
        variants: usize,
    },
    FetchFailed {
        generation: u64,
        code: ErrorCode,
        message: String,
    },
    /// A newer fetch started before this one completed; its result was dropped.
    FetchSuperseded {
        generation: u64,
    },
    RetryArmed {
        interval: Duration,
    },
    RetryAlreadyArmed,
    /// Retries were requested but the interval or per-retry timeout is zero.
    RetryUnavailable {
        interval: Duration,
        timeout: Duration,
    },
    RetryTick,
    RetryCancelled,
    StorageLoadFailed {
        code: ErrorCode,
        message: String,
    },
    StorageSaveFailed {
        code: ErrorCode,
        message: String,
    },
    VariantResolved {
        flag_key: String,
        value: Option<String>,
        source: VariantSource,
    },
}

impl DiagnosticEvent {
    pub fn level(&self) -> Level {
        match self {
            DiagnosticEvent::FetchFailed { .. } => Level::Error,
            DiagnosticEvent::StorageLoadFailed { .. }
            | DiagnosticEvent::StorageSaveFailed { .. }
            | DiagnosticEvent::RetryUnavailable { .. } => Level::Warn,
            DiagnosticEvent::FetchSucceeded { .. } | DiagnosticEvent::RetryArmed { .. } => {
                Level::Info
            }
            _ => Level::Debug,
        }
    }

    pub(crate) fn fetch_failed(generation: u64, error: &SkylabError) -> Self {
        DiagnosticEvent::FetchFailed {
            generation,
            code: error.code,
            message: error.sanitized_message(),
        }
    }

    pub(crate) fn storage_load_failed(error: &SkylabError) -> Self {
        DiagnosticEvent::StorageLoadFailed {
            code: error.code,
            message: error.sanitized_message(),
        }
    }

    pub(crate) fn storage_save_failed(error: &SkylabError) -> Self {
        DiagnosticEvent::StorageSaveFailed {
            code: error.code,
            message: error.sanitized_message(),
        }
    }
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticEvent::FetchStarted { generation, timeout } => {
                write!(f, "fetch #{} started (timeout {:?})", generation, timeout)
            }
            DiagnosticEvent::FetchSucceeded { generation, variants } => {
                write!(f, "fetch #{} stored {} variants", generation, variants)
            }
            DiagnosticEvent::FetchFailed {
                generation,
                code,
                message,
            } => write!(f, "fetch #{} failed: [{}] {}", generation, code, message),
            DiagnosticEvent::FetchSuperseded { generation } => {
                write!(f, "fetch #{} superseded, result discarded", generation)
            }
            DiagnosticEvent::RetryArmed { interval } => {
                write!(f, "retrying fetch every {:?}", interval)
            }
            DiagnosticEvent::RetryAlreadyArmed => write!(f, "retry interval already in progress"),
            DiagnosticEvent::RetryUnavailable { interval, timeout } => write!(
                f,
                "retry not scheduled: interval {:?}, timeout {:?}",
                interval, timeout
            ),
            DiagnosticEvent::RetryTick => write!(f, "retry fetch"),
            DiagnosticEvent::RetryCancelled => write!(f, "retry interval cancelled"),
            DiagnosticEvent::StorageLoadFailed { code, message } => {
                write!(f, "failed to load stored variants: [{}] {}", code, message)
            }
            DiagnosticEvent::StorageSaveFailed { code, message } => {
                write!(f, "failed to save variants: [{}] {}", code, message)
            }
            DiagnosticEvent::VariantResolved {
                flag_key,
                value,
                source,
            } => write!(
                f,
                "variant for flag {} is {:?} ({:?})",
                flag_key, value, source
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub level: Level,
    pub timestamp: DateTime<Utc>,
    pub event: DiagnosticEvent,
}

impl Diagnostic {
    pub fn new(event: DiagnosticEvent) -> Self {
        Self {
            level: event.level(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Receives every diagnostic emitted by a client.
///
/// Called synchronously on the task that produced the event; keep it cheap.
pub trait DiagnosticObserver: Send + Sync {
    fn on_event(&self, diagnostic: &Diagnostic);
}

/// Forwards diagnostics to `tracing` at their level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl DiagnosticObserver for TracingObserver {
    fn on_event(&self, diagnostic: &Diagnostic) {
        let event = &diagnostic.event;
        match diagnostic.level {
            Level::Debug => tracing::debug!("[Skylab] {}", event),
            Level::Info => tracing::info!("[Skylab] {}", event),
            Level::Warn => tracing::warn!("[Skylab] {}", event),
            Level::Error => tracing::error!("[Skylab] {}", event),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl DiagnosticObserver for NoopObserver {
    fn on_event(&self, _diagnostic: &Diagnostic) {}
}

pub type SharedObserver = Arc<dyn DiagnosticObserver>;
