/*
 * mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Per-file processing stages and the pipeline that runs them.
 */

//! The per-file stage machine.
//!
//! Every file climbs the same phase ladder: received, extracting,
//! resolving, transforming, merging-map, reinserting, emitting. Each
//! [`FileStage`] owns one phase; [`FilePipeline`] validates the sequence
//! and runs it, reporting progress to a [`PipelineObserver`].

pub mod context;
pub mod error;
pub mod observer;
pub mod pipeline;
pub mod stages;
pub mod task;
pub mod traits;

pub use context::RunContext;
pub use error::{PipelineValidationError, StageFailure};
pub use observer::{EventLevel, NoopObserver, PipelineObserver, TracingObserver};
pub use pipeline::FilePipeline;
pub use task::FileTask;
pub use traits::{FilePhase, FileStage};
