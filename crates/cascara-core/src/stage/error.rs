/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Failures inside a file's run, and pipeline wiring errors.
 */

use thiserror::Error;

use crate::engine::EngineError;
use crate::mapbridge::BridgeError;
use crate::resolve::ResolveError;
use crate::stage::traits::FilePhase;

/// Failure while processing one file. Caught at the file boundary,
/// translated, and emitted as that file's single error event; the stream
/// keeps going.
#[derive(Error, Debug)]
pub enum StageFailure {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("failed to drain incremental contents")]
    Drain(#[from] std::io::Error),

    /// A stage's own preconditions were violated (glue failure, not a
    /// user error).
    #[error("{stage}: {message}")]
    Internal {
        stage: &'static str,
        message: String,
    },
}

/// Invalid stage wiring, reported when a pipeline is built rather than
/// when it runs.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PipelineValidationError {
    #[error("pipeline has no stages")]
    Empty,

    #[error("stage '{later}' ({later_phase}) cannot run after '{earlier}' ({earlier_phase})")]
    OutOfOrder {
        earlier: String,
        earlier_phase: FilePhase,
        later: String,
        later_phase: FilePhase,
    },
}
