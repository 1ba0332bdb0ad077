/*
 * observer.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Observation hooks for per-file pipeline runs.
 */

use std::path::Path;

use crate::stage::error::StageFailure;
use crate::translate::TranslatedError;

/// Verbosity of a free-form observer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
}

/// Hooks into per-file processing. Every method defaults to doing
/// nothing, so implementations override only what they care about.
pub trait PipelineObserver: Send + Sync {
    fn on_file_start(&self, _sequence: u64, _path: Option<&Path>) {}

    fn on_stage_start(&self, _stage: &str, _sequence: u64) {}

    fn on_stage_complete(&self, _stage: &str, _sequence: u64) {}

    fn on_stage_error(&self, _stage: &str, _sequence: u64, _failure: &StageFailure) {}

    fn on_file_emitted(&self, _sequence: u64, _path: Option<&Path>) {}

    fn on_file_failed(&self, _sequence: u64, _path: Option<&Path>, _error: &TranslatedError) {}

    /// Free-form event from inside a stage; see [`trace_event!`](crate::trace_event).
    fn on_event(&self, _level: EventLevel, _message: &str) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Observer that forwards everything to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_stage_start(&self, stage: &str, sequence: u64) {
        tracing::debug!(stage, sequence, "stage start");
    }

    fn on_stage_complete(&self, stage: &str, sequence: u64) {
        tracing::debug!(stage, sequence, "stage complete");
    }

    fn on_stage_error(&self, stage: &str, sequence: u64, failure: &StageFailure) {
        tracing::debug!(stage, sequence, error = %failure, "stage error");
    }

    fn on_file_emitted(&self, sequence: u64, path: Option<&Path>) {
        tracing::info!(sequence, path = ?path, "file emitted");
    }

    fn on_file_failed(&self, sequence: u64, path: Option<&Path>, error: &TranslatedError) {
        tracing::warn!(sequence, path = ?path, error = %error, "file failed");
    }

    fn on_event(&self, level: EventLevel, message: &str) {
        match level {
            EventLevel::Debug => tracing::debug!("{message}"),
            EventLevel::Info => tracing::info!("{message}"),
            EventLevel::Warn => tracing::warn!("{message}"),
        }
    }
}

/// Emit a free-form observer event from inside a stage.
#[macro_export]
macro_rules! trace_event {
    ($ctx:expr, $level:expr, $($arg:tt)*) => {
        $ctx.observer.on_event($level, &format!($($arg)*))
    };
}
