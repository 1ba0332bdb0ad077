/*
 * discover.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Configuration-file discovery and loading.
 */

//! Configuration-file discovery.
//!
//! When the caller supplies no units, each file's directory is walked
//! upward until a `cascara.yml` (or sibling spelling) is found. The file
//! names units in order, optionally with per-unit options, plus processing
//! options folded over the per-file defaults by the resolver.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::engine::UnitChain;
use crate::registry::UnitRegistry;
use crate::resolve::{CallerOptions, MapSetting, ResolveError};

/// Configuration file names, tried in this order in each directory.
pub const CONFIG_FILE_NAMES: &[&str] = &["cascara.yml", "cascara.yaml", ".cascararc.yaml"];

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    plugins: Vec<RawUnit>,
    #[serde(default)]
    options: RawOptions,
}

/// A unit entry: either a bare name or a `name: options` table.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawUnit {
    Name(String),
    Table(IndexMap<String, serde_yaml::Value>),
}

#[derive(Debug, Default, Deserialize)]
struct RawOptions {
    from: Option<PathBuf>,
    to: Option<PathBuf>,
    map: Option<MapSetting>,
    #[serde(flatten)]
    extra: IndexMap<String, serde_yaml::Value>,
}

/// A located and loaded configuration file.
#[derive(Debug, Clone)]
pub struct DiscoveredConfig {
    /// Where the configuration was found.
    pub path: PathBuf,
    pub units: Arc<UnitChain>,
    pub options: CallerOptions,
}

/// Walk from `start` upward and load the first configuration file found.
/// Returns `Ok(None)` when no ancestor directory has one.
pub fn discover(
    start: &Path,
    registry: &UnitRegistry,
) -> Result<Option<DiscoveredConfig>, ResolveError> {
    for dir in start.ancestors() {
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return load_file(&candidate, registry).map(Some);
            }
        }
    }
    Ok(None)
}

/// Load one configuration file, building its unit chain from `registry`.
pub fn load_file(path: &Path, registry: &UnitRegistry) -> Result<DiscoveredConfig, ResolveError> {
    let text = std::fs::read_to_string(path).map_err(|source| ResolveError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: RawConfig =
        serde_yaml::from_str(&text).map_err(|source| ResolveError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut units = UnitChain::new();
    for entry in &raw.plugins {
        match entry {
            RawUnit::Name(name) => units.push(registry.build(name, &serde_yaml::Value::Null)?),
            RawUnit::Table(table) => {
                for (name, value) in table {
                    units.push(registry.build(name, value)?);
                }
            }
        }
    }

    Ok(DiscoveredConfig {
        path: path.to_path_buf(),
        units: Arc::new(units),
        options: CallerOptions {
            from: raw.options.from,
            to: raw.options.to,
            map: raw.options.map,
            extra: raw.options.extra,
        },
    })
}
