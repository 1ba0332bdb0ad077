//! Streaming CSS transformation for build pipelines
//!
//! This crate adapts a CSS transformation engine to streaming build
//! pipelines: in-flight file objects go in, transformed file objects come
//! out in the same order, and a failing file surfaces one translated
//! error instead of stopping the stream.
//!
//! # Architecture
//!
//! Processing is organized around these key types:
//!
//! - [`StreamAdapter`] - Order-preserving async entry point over channels
//! - [`FilePipeline`] - The fixed per-file stage sequence (drain, extract,
//!   resolve, transform, merge-map, reinsert)
//! - [`CallerSetting`] - How transformation units and options are supplied:
//!   explicitly, through a deferred callback, or by configuration discovery
//! - [`UnitChain`] / [`TransformationUnit`] - The engine's ordered
//!   transformation passes
//! - [`FileRecord`] - The pipeline's view of one in-flight file
//!
//! # Example
//!
//! ```ignore
//! use cascara_core::engine::units::MinifyUnit;
//! use cascara_core::{AdapterOptions, CallerSetting, FileRecord, StreamAdapter, UnitChain};
//!
//! let setting = CallerSetting::units(UnitChain::new().with(Box::new(MinifyUnit)));
//! let adapter = StreamAdapter::new(AdapterOptions::new("/project").with_setting(setting))?;
//!
//! let records = vec![FileRecord::buffered(
//!     "/project/app.scss",
//!     "/project",
//!     "a { color: red }",
//! )];
//! let (outcomes, summary) = adapter.process_all(records).await;
//! ```

pub mod adapter;
pub mod discover;
pub mod engine;
pub mod error;
pub mod extract;
pub mod file;
pub mod mapbridge;
pub mod registry;
pub mod resolve;
pub mod stage;
pub mod translate;

// Re-export commonly used types
pub use adapter::{AdapterOptions, FileFailure, FileOutcome, RunSummary, StreamAdapter};
pub use engine::{
    EngineError, StyleDialect, StyleDocument, TransformResult, TransformationUnit, UnitChain,
    UnitContext, Warning, WarningLog,
};
pub use error::{CascaraError, Result};
pub use file::{EngineReport, FileContents, FileRecord, MapPayload};
pub use registry::UnitRegistry;
pub use resolve::{
    CallerConfig, CallerOptions, CallerSetting, DeferredConfig, EngineOptions, MapOptions,
    MapSetting, OptionResolver, ResolveError, ResolvedConfig,
};
pub use stage::{
    EventLevel, FilePhase, FilePipeline, FileStage, FileTask, NoopObserver, PipelineObserver,
    RunContext, StageFailure, TracingObserver,
};
pub use translate::{FailureKind, TranslatedError, translate};
