/*
 * resolve.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Resolves the unit chain and options for one file.
 */

use async_trait::async_trait;

use crate::stage::context::RunContext;
use crate::stage::error::StageFailure;
use crate::stage::observer::EventLevel;
use crate::stage::task::FileTask;
use crate::stage::traits::{FilePhase, FileStage};
use crate::trace_event;

/// Asks the [`OptionResolver`](crate::resolve::OptionResolver) for this
/// file's unit chain and final options. Passthrough tasks skip resolution
/// entirely, including configuration discovery.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveStage;

impl ResolveStage {
    pub fn new() -> Self {
        ResolveStage
    }
}

#[async_trait]
impl FileStage for ResolveStage {
    fn name(&self) -> &str {
        "resolve"
    }

    fn phase(&self) -> FilePhase {
        FilePhase::Resolving
    }

    async fn run(&self, mut task: FileTask, ctx: &RunContext) -> Result<FileTask, StageFailure> {
        if task.passthrough {
            return Ok(task);
        }
        let resolved = ctx.resolver.resolve(&task.record, &ctx.setting).await?;
        trace_event!(
            ctx,
            EventLevel::Debug,
            "resolved {} unit(s)",
            resolved.units.len()
        );
        task.resolved = Some(resolved);
        Ok(task)
    }
}
