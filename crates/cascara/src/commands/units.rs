/*
 * units.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Units command implementation
 */

//! Units command implementation.
//!
//! Lists the transformation units built into the registry, in the order
//! configuration files may name them.

use anyhow::Result;
use cascara_core::UnitRegistry;

pub fn execute() -> Result<()> {
    let registry = UnitRegistry::builtin();
    for name in registry.names() {
        println!("{name}");
    }
    Ok(())
}
