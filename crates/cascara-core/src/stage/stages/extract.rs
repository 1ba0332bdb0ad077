/*
 * extract.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Locates style regions and builds their documents.
 */

use async_trait::async_trait;

use crate::engine::{StyleDialect, StyleDocument};
use crate::extract::extract;
use crate::stage::context::RunContext;
use crate::stage::error::StageFailure;
use crate::stage::observer::EventLevel;
use crate::stage::task::FileTask;
use crate::stage::traits::{FilePhase, FileStage};
use crate::trace_event;

/// Runs style-region extraction over the buffered contents.
///
/// Plain style files produce no extraction and flow on whole. Markup
/// files get one [`StyleDocument`] per region, each with a dialect picked
/// from the tag's `lang` attribute when present; markup with zero regions
/// is marked passthrough so the file is re-emitted unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractStage;

impl ExtractStage {
    pub fn new() -> Self {
        ExtractStage
    }
}

#[async_trait]
impl FileStage for ExtractStage {
    fn name(&self) -> &str {
        "extract"
    }

    fn phase(&self) -> FilePhase {
        FilePhase::Extracting
    }

    async fn run(&self, mut task: FileTask, ctx: &RunContext) -> Result<FileTask, StageFailure> {
        let Some(content) = task.record.contents_str() else {
            return Err(StageFailure::Internal {
                stage: "extract",
                message: "contents not buffered before extraction".to_string(),
            });
        };
        let content = content.into_owned();

        let extraction = extract(&content, task.record.path.as_deref());
        if !extraction.is_markup() {
            return Ok(task);
        }

        if extraction.is_empty() {
            task.passthrough = true;
            trace_event!(ctx, EventLevel::Debug, "no style regions; passing through");
        } else {
            trace_event!(
                ctx,
                EventLevel::Debug,
                "extracted {} style region(s)",
                extraction.len()
            );
            let default_dialect = StyleDialect::from_path(task.record.path.as_deref());
            for region in extraction.regions() {
                let dialect =
                    StyleDialect::from_lang(region.lang.as_deref()).unwrap_or(default_dialect);
                task.regions.push(StyleDocument::new(
                    content[region.start..region.end].to_string(),
                    task.record.path.clone(),
                    dialect,
                ));
            }
        }
        task.extraction = Some(extraction);
        Ok(task)
    }
}
