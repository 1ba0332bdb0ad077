/*
 * reinsert.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Writes transformed text and the result report back into the file.
 */

use async_trait::async_trait;

use crate::engine::WarningLog;
use crate::extract::reinsert;
use crate::file::EngineReport;
use crate::stage::context::RunContext;
use crate::stage::error::StageFailure;
use crate::stage::observer::EventLevel;
use crate::stage::task::FileTask;
use crate::stage::traits::{FilePhase, FileStage};
use crate::trace_event;

/// The final assembly step.
///
/// Splices region results back into markup (non-style bytes preserved
/// exactly), or replaces the whole contents for plain style files; then
/// attaches the [`EngineReport`] side channel and the file's outgoing
/// source map. Passthrough tasks re-emit their contents untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReinsertStage;

impl ReinsertStage {
    pub fn new() -> Self {
        ReinsertStage
    }
}

#[async_trait]
impl FileStage for ReinsertStage {
    fn name(&self) -> &str {
        "reinsert"
    }

    fn phase(&self) -> FilePhase {
        FilePhase::Reinserting
    }

    async fn run(&self, mut task: FileTask, ctx: &RunContext) -> Result<FileTask, StageFailure> {
        if task.passthrough {
            trace_event!(ctx, EventLevel::Debug, "passthrough; contents untouched");
            return Ok(task);
        }
        let Some(resolved) = task.resolved.take() else {
            return Err(StageFailure::Internal {
                stage: "reinsert",
                message: "resolved options missing at reinsertion".to_string(),
            });
        };
        if task.results.is_empty() {
            return Err(StageFailure::Internal {
                stage: "reinsert",
                message: "no transformation results to emit".to_string(),
            });
        }

        let combined = WarningLog::new();
        for result in &task.results {
            combined.extend_from(result.warnings());
        }
        for line in combined.render() {
            trace_event!(ctx, EventLevel::Warn, "{line}");
        }

        let first_map = task.results.first().and_then(|r| r.map.clone());

        let content = match &task.extraction {
            Some(extraction) if !extraction.is_empty() => {
                let Some(original) = task.record.contents_str() else {
                    return Err(StageFailure::Internal {
                        stage: "reinsert",
                        message: "contents not buffered at reinsertion".to_string(),
                    });
                };
                let replacements: Vec<String> =
                    task.results.iter().map(|r| r.content.clone()).collect();
                reinsert(&original, extraction, &replacements)
            }
            _ => task
                .results
                .first()
                .map(|r| r.content.clone())
                .unwrap_or_default(),
        };

        task.record.report = Some(EngineReport::new(
            content.clone(),
            resolved.options,
            combined,
        ));
        task.record.set_contents(content);

        if let Some(merged) = task.merged_map.take() {
            task.record.source_map = Some(merged);
        } else if task.record.source_map.is_none() {
            task.record.source_map = first_map;
        }
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::units::DoubleDeclarationsUnit;
    use crate::engine::UnitChain;
    use crate::file::FileRecord;
    use crate::registry::UnitRegistry;
    use crate::resolve::{CallerOptions, CallerSetting, MapSetting, OptionResolver};
    use crate::stage::stages::{ExtractStage, MergeMapStage, ResolveStage, TransformStage};
    use std::sync::Arc;

    fn context(setting: CallerSetting) -> RunContext {
        RunContext::new(
            "/work",
            OptionResolver::new("/work", Arc::new(UnitRegistry::builtin())),
            Arc::new(setting),
        )
    }

    async fn through_reinsert(record: FileRecord, setting: CallerSetting) -> FileTask {
        let ctx = context(setting);
        let task = FileTask::new(record, 0);
        let task = ExtractStage::new().run(task, &ctx).await.unwrap();
        let task = ResolveStage::new().run(task, &ctx).await.unwrap();
        let task = TransformStage::new().run(task, &ctx).await.unwrap();
        let task = MergeMapStage::new().run(task, &ctx).await.unwrap();
        ReinsertStage::new().run(task, &ctx).await.unwrap()
    }

    #[tokio::test]
    async fn whole_file_contents_are_replaced() {
        let record = FileRecord::buffered("/proj/app.css", "/proj", "a { color: black }");
        let setting = CallerSetting::units(UnitChain::new().with(Box::new(DoubleDeclarationsUnit)));
        let task = through_reinsert(record, setting).await;
        let contents = task.record.contents_str().unwrap().into_owned();
        assert_eq!(contents.matches("color:").count(), 2);

        let report = task.record.report.as_ref().unwrap();
        assert_eq!(report.content, contents);
        assert!(report.warnings().is_empty());
    }

    #[tokio::test]
    async fn markup_keeps_non_style_bytes() {
        let content = "<html>\n<style>a { color: red }</style>\n<p>text</p>\n\
            <style>b { top: 0 }</style>\n</html>";
        let record = FileRecord::buffered("/proj/page.html", "/proj", content);
        let setting = CallerSetting::units(UnitChain::new().with(Box::new(DoubleDeclarationsUnit)));
        let task = through_reinsert(record, setting).await;
        let out = task.record.contents_str().unwrap().into_owned();
        assert!(out.starts_with("<html>\n<style>"));
        assert!(out.contains("<p>text</p>"));
        assert!(out.ends_with("</style>\n</html>"));
        assert_eq!(out.matches("color:").count(), 2);
        assert_eq!(out.matches("top:").count(), 2);
    }

    #[tokio::test]
    async fn requested_map_is_attached_to_the_record() {
        let record = FileRecord::buffered("/proj/app.css", "/proj", "a { color: red }");
        let options = CallerOptions {
            map: Some(MapSetting::session()),
            ..Default::default()
        };
        let task = through_reinsert(
            record,
            CallerSetting::with_options(UnitChain::new(), options),
        )
        .await;
        let map = task.record.source_map.as_ref().unwrap();
        assert!(map.as_json().contains("mappings"));
    }

    #[tokio::test]
    async fn passthrough_leaves_the_record_alone() {
        let record = FileRecord::buffered("/proj/page.html", "/proj", "<html><body/></html>");
        let task = through_reinsert(record, CallerSetting::Discover).await;
        assert_eq!(
            task.record.contents_str().as_deref(),
            Some("<html><body/></html>")
        );
        assert!(task.record.report.is_none());
    }
}
