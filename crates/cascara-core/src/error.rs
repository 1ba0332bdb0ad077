/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Top-level error type for cascara-core.
 */

//! Top-level error type.

use thiserror::Error;

use crate::resolve::ResolveError;
use crate::stage::PipelineValidationError;

/// Errors surfaced by the crate's outer API, which today means building a
/// [`StreamAdapter`](crate::adapter::StreamAdapter).
///
/// Per-file failures inside a running pipeline never take this shape; they
/// are caught at the file boundary and emitted as
/// [`TranslatedError`](crate::translate::TranslatedError) events instead.
#[derive(Error, Debug)]
pub enum CascaraError {
    /// A custom stage sequence was wired out of machine order.
    #[error(transparent)]
    Validation(#[from] PipelineValidationError),

    /// An explicitly named configuration file could not be loaded.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Result type alias using [`CascaraError`].
pub type Result<T> = std::result::Result<T, CascaraError>;
