/*
 * pipeline.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The ordered stage sequence every file runs through.
 */

use std::fmt;

use crate::stage::context::RunContext;
use crate::stage::error::{PipelineValidationError, StageFailure};
use crate::stage::stages::{
    DrainStage, ExtractStage, MergeMapStage, ReinsertStage, ResolveStage, TransformStage,
};
use crate::stage::task::FileTask;
use crate::stage::traits::{FilePhase, FileStage};

/// A validated sequence of per-file stages.
pub struct FilePipeline {
    stages: Vec<Box<dyn FileStage>>,
}

impl FilePipeline {
    /// Build a pipeline from an explicit stage sequence. Sequences that
    /// would run the phase machine backwards are rejected here, not at
    /// run time.
    pub fn new(stages: Vec<Box<dyn FileStage>>) -> Result<Self, PipelineValidationError> {
        if stages.is_empty() {
            return Err(PipelineValidationError::Empty);
        }
        for pair in stages.windows(2) {
            if pair[1].phase() < pair[0].phase() {
                return Err(PipelineValidationError::OutOfOrder {
                    earlier: pair[0].name().to_string(),
                    earlier_phase: pair[0].phase(),
                    later: pair[1].name().to_string(),
                    later_phase: pair[1].phase(),
                });
            }
        }
        Ok(FilePipeline { stages })
    }

    /// The standard sequence: drain, extract, resolve, transform, merge
    /// maps, reinsert.
    pub fn standard() -> Self {
        FilePipeline {
            stages: vec![
                Box::new(DrainStage::new()),
                Box::new(ExtractStage::new()),
                Box::new(ResolveStage::new()),
                Box::new(TransformStage::new()),
                Box::new(MergeMapStage::new()),
                Box::new(ReinsertStage::new()),
            ],
        }
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run one task through every stage in order. The first failure ends
    /// the run; per-file steps are strictly sequential.
    pub async fn run(&self, mut task: FileTask, ctx: &RunContext) -> Result<FileTask, StageFailure> {
        for stage in &self.stages {
            let sequence = task.sequence;
            task.phase = stage.phase();
            ctx.observer.on_stage_start(stage.name(), sequence);
            match stage.run(task, ctx).await {
                Ok(next) => {
                    ctx.observer.on_stage_complete(stage.name(), sequence);
                    task = next;
                }
                Err(failure) => {
                    ctx.observer.on_stage_error(stage.name(), sequence, &failure);
                    return Err(failure);
                }
            }
        }
        task.phase = FilePhase::Emitting;
        Ok(task)
    }
}

impl fmt::Debug for FilePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct PhaseStage {
        name: &'static str,
        phase: FilePhase,
    }

    #[async_trait]
    impl FileStage for PhaseStage {
        fn name(&self) -> &str {
            self.name
        }

        fn phase(&self) -> FilePhase {
            self.phase
        }

        async fn run(&self, task: FileTask, _ctx: &RunContext) -> Result<FileTask, StageFailure> {
            Ok(task)
        }
    }

    #[test]
    fn standard_pipeline_has_the_full_ladder() {
        let pipeline = FilePipeline::standard();
        assert_eq!(
            pipeline.stage_names(),
            vec!["drain", "extract", "resolve", "transform", "merge-map", "reinsert"]
        );
    }

    #[test]
    fn empty_pipeline_is_rejected() {
        let err = FilePipeline::new(Vec::new()).unwrap_err();
        assert_eq!(err, PipelineValidationError::Empty);
    }

    #[test]
    fn backwards_phases_are_rejected() {
        let stages: Vec<Box<dyn FileStage>> = vec![
            Box::new(PhaseStage {
                name: "late",
                phase: FilePhase::Transforming,
            }),
            Box::new(PhaseStage {
                name: "early",
                phase: FilePhase::Extracting,
            }),
        ];
        let err = FilePipeline::new(stages).unwrap_err();
        match err {
            PipelineValidationError::OutOfOrder {
                earlier,
                later,
                later_phase,
                ..
            } => {
                assert_eq!(earlier, "late");
                assert_eq!(later, "early");
                assert_eq!(later_phase, FilePhase::Extracting);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn repeated_phases_are_allowed() {
        let stages: Vec<Box<dyn FileStage>> = vec![
            Box::new(PhaseStage {
                name: "first",
                phase: FilePhase::Transforming,
            }),
            Box::new(PhaseStage {
                name: "second",
                phase: FilePhase::Transforming,
            }),
        ];
        assert!(FilePipeline::new(stages).is_ok());
    }
}
