/*
 * traits.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The per-file stage trait and the phase ladder stages climb.
 */

use std::fmt;

use async_trait::async_trait;

use crate::stage::context::RunContext;
use crate::stage::error::StageFailure;
use crate::stage::task::FileTask;

/// The phases a file moves through, in order. Every stage advances the
/// task to its own phase; the pipeline refuses stage sequences that would
/// run phases backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FilePhase {
    Received,
    Extracting,
    Resolving,
    Transforming,
    MergingMap,
    Reinserting,
    Emitting,
}

impl FilePhase {
    pub fn label(&self) -> &'static str {
        match self {
            FilePhase::Received => "received",
            FilePhase::Extracting => "extracting",
            FilePhase::Resolving => "resolving",
            FilePhase::Transforming => "transforming",
            FilePhase::MergingMap => "merging-map",
            FilePhase::Reinserting => "reinserting",
            FilePhase::Emitting => "emitting",
        }
    }
}

impl fmt::Display for FilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One step of per-file processing.
///
/// Stages own a single phase and receive the task after every earlier
/// phase has completed. A failing stage ends the file's run; the failure
/// is translated and emitted on the error side, and other files are
/// unaffected.
#[async_trait]
pub trait FileStage: Send + Sync {
    /// Stage name for logs and internal errors.
    fn name(&self) -> &str;

    /// The phase this stage advances the task to.
    fn phase(&self) -> FilePhase;

    async fn run(&self, task: FileTask, ctx: &RunContext) -> Result<FileTask, StageFailure>;
}
