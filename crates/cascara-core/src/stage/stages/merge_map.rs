/*
 * merge_map.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Composes the engine's map onto a pre-existing one.
 */

use async_trait::async_trait;

use crate::mapbridge::{self, RegionOffset};
use crate::stage::context::RunContext;
use crate::stage::error::StageFailure;
use crate::stage::observer::EventLevel;
use crate::stage::task::FileTask;
use crate::stage::traits::{FilePhase, FileStage};
use crate::trace_event;

/// Runs only for files that arrived with a source map attached (a map
/// session). Composes the engine's emitted map onto the existing one so
/// final positions trace through both; when the engine emitted none, the
/// existing map rides through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeMapStage;

impl MergeMapStage {
    pub fn new() -> Self {
        MergeMapStage
    }
}

#[async_trait]
impl FileStage for MergeMapStage {
    fn name(&self) -> &str {
        "merge-map"
    }

    fn phase(&self) -> FilePhase {
        FilePhase::MergingMap
    }

    async fn run(&self, mut task: FileTask, ctx: &RunContext) -> Result<FileTask, StageFailure> {
        if task.passthrough {
            return Ok(task);
        }
        let Some(existing) = &task.record.source_map else {
            return Ok(task);
        };
        let Some(engine_map) = task.results.first().and_then(|r| r.map.as_ref()) else {
            return Ok(task);
        };

        let region = region_offset(&task);
        let merged = mapbridge::merge(existing, engine_map, region, task.record.path.as_deref())?;
        if task.results.len() > 1 {
            trace_event!(
                ctx,
                EventLevel::Warn,
                "multiple style regions; the document map follows the first"
            );
        }
        task.merged_map = Some(merged);
        Ok(task)
    }
}

/// Placement of the first extracted region, when extraction happened.
fn region_offset(task: &FileTask) -> Option<RegionOffset> {
    let extraction = task.extraction.as_ref()?;
    let region = extraction.regions().first()?;
    let lines = task
        .record
        .contents_str()
        .map(|content| content[region.start..region.end].matches('\n').count() as u32 + 1)
        .unwrap_or(1);
    Some(RegionOffset {
        line: region.line,
        lines,
    })
}
