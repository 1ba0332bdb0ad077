/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Shared read-only context for a pipeline run.
 */

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::resolve::{CallerSetting, OptionResolver};
use crate::stage::observer::{NoopObserver, PipelineObserver};

/// Everything stages may consult besides the task itself. One per run;
/// read-only while files are in flight.
pub struct RunContext {
    /// The run's working directory, the default resolution root.
    pub base: PathBuf,
    pub resolver: OptionResolver,
    /// How the caller configured units and options.
    pub setting: Arc<CallerSetting>,
    pub observer: Arc<dyn PipelineObserver>,
}

impl RunContext {
    pub fn new(
        base: impl Into<PathBuf>,
        resolver: OptionResolver,
        setting: Arc<CallerSetting>,
    ) -> Self {
        RunContext {
            base: base.into(),
            resolver,
            setting,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("base", &self.base)
            .field("setting", &self.setting)
            .finish()
    }
}
