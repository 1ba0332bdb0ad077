/*
 * mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The standard per-file stages.
 */

mod drain;
mod extract;
mod merge_map;
mod reinsert;
mod resolve;
mod transform;

pub use drain::DrainStage;
pub use extract::ExtractStage;
pub use merge_map::MergeMapStage;
pub use reinsert::ReinsertStage;
pub use resolve::ResolveStage;
pub use transform::TransformStage;
