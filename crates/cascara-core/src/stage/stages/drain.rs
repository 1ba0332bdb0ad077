/*
 * drain.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Buffers incrementally delivered file contents.
 */

use async_trait::async_trait;

use crate::stage::context::RunContext;
use crate::stage::error::StageFailure;
use crate::stage::observer::EventLevel;
use crate::stage::task::FileTask;
use crate::stage::traits::{FilePhase, FileStage};
use crate::trace_event;

/// Drains incremental content into a buffer. Transformation needs the
/// whole document, so streamed files are buffered up front; buffered and
/// empty files pass through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrainStage;

impl DrainStage {
    pub fn new() -> Self {
        DrainStage
    }
}

#[async_trait]
impl FileStage for DrainStage {
    fn name(&self) -> &str {
        "drain"
    }

    fn phase(&self) -> FilePhase {
        FilePhase::Received
    }

    async fn run(&self, mut task: FileTask, ctx: &RunContext) -> Result<FileTask, StageFailure> {
        if task.record.is_streamed() {
            task.record.drain().await?;
            trace_event!(
                ctx,
                EventLevel::Debug,
                "drained incremental contents for {:?}",
                task.record.path
            );
        }
        Ok(task)
    }
}
