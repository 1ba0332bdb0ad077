/*
 * task.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Per-file state threaded through the stage pipeline.
 */

use crate::engine::{StyleDocument, TransformResult};
use crate::extract::Extraction;
use crate::file::{FileRecord, MapPayload};
use crate::resolve::ResolvedConfig;
use crate::stage::traits::FilePhase;

/// One file's in-flight state. Each stage fills in its own slice; nothing
/// here is shared between concurrently processed files.
#[derive(Debug)]
pub struct FileTask {
    pub record: FileRecord,
    /// Arrival position in the input stream, used to emit in order.
    pub sequence: u64,
    pub phase: FilePhase,
    /// Set when the file needs no transformation at all (markup with zero
    /// style regions); later stages skip such tasks untouched.
    pub passthrough: bool,
    pub extraction: Option<Extraction>,
    /// One document per style region, or a single whole-file document for
    /// plain style files.
    pub regions: Vec<StyleDocument>,
    pub resolved: Option<ResolvedConfig>,
    /// One result per entry in `regions`, same order.
    pub results: Vec<TransformResult>,
    /// Composed source map, when the file arrived with one and the engine
    /// emitted one.
    pub merged_map: Option<MapPayload>,
}

impl FileTask {
    pub fn new(record: FileRecord, sequence: u64) -> Self {
        FileTask {
            record,
            sequence,
            phase: FilePhase::Received,
            passthrough: false,
            extraction: None,
            regions: Vec::new(),
            resolved: None,
            results: Vec::new(),
            merged_map: None,
        }
    }
}
