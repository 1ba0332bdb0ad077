/*
 * transform.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Runs each style document through the engine.
 */

use async_trait::async_trait;

use crate::engine::{runner, StyleDialect, StyleDocument};
use crate::stage::context::RunContext;
use crate::stage::error::StageFailure;
use crate::stage::observer::EventLevel;
use crate::stage::task::FileTask;
use crate::stage::traits::{FilePhase, FileStage};
use crate::trace_event;

/// Awaits one engine run per style document.
///
/// Files without extracted regions are transformed whole, as a single
/// document whose dialect follows the file extension. Documents are
/// processed in region order; the first failing document aborts the file.
/// There is no timeout and no retry — a slow chain is awaited, a failing
/// one fails the file once.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformStage;

impl TransformStage {
    pub fn new() -> Self {
        TransformStage
    }
}

#[async_trait]
impl FileStage for TransformStage {
    fn name(&self) -> &str {
        "transform"
    }

    fn phase(&self) -> FilePhase {
        FilePhase::Transforming
    }

    async fn run(&self, mut task: FileTask, ctx: &RunContext) -> Result<FileTask, StageFailure> {
        if task.passthrough {
            return Ok(task);
        }
        let Some(resolved) = task.resolved.clone() else {
            return Err(StageFailure::Internal {
                stage: "transform",
                message: "options were not resolved before transformation".to_string(),
            });
        };

        let documents = if task.regions.is_empty() {
            let Some(content) = task.record.contents_str() else {
                return Err(StageFailure::Internal {
                    stage: "transform",
                    message: "contents not buffered before transformation".to_string(),
                });
            };
            vec![StyleDocument::new(
                content.into_owned(),
                task.record.path.clone(),
                StyleDialect::from_path(task.record.path.as_deref()),
            )]
        } else {
            std::mem::take(&mut task.regions)
        };

        for document in documents {
            let result = runner::run(document, resolved.units.as_ref(), &resolved.options).await?;
            task.results.push(result);
        }
        trace_event!(
            ctx,
            EventLevel::Debug,
            "transformed {} document(s)",
            task.results.len()
        );
        Ok(task)
    }
}
