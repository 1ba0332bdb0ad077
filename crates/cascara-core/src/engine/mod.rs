/*
 * mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The CSS transformation engine.
 */

//! The transformation engine: style documents, the unit chain that rewrites
//! them, and the runner that gates, transforms, and serializes.

mod dialect;
pub mod document;
pub mod runner;
pub mod unit;
pub mod units;

pub use document::{StyleDialect, StyleDocument};
pub use runner::{EngineError, TransformResult};
pub use unit::{TransformationUnit, UnitChain, UnitContext, Warning, WarningLog};
