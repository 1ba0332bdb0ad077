/*
 * resolve.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Per-file resolution of transformation units and processing options.
 */

//! Per-file option resolution.
//!
//! Callers hand the adapter one [`CallerSetting`]: an explicit unit chain
//! with options, a deferred callback that produces one, or nothing — in
//! which case a configuration file is discovered per file. Whatever the
//! source, [`OptionResolver`] folds the supplied options over per-file
//! defaults and produces one immutable [`ResolvedConfig`] that the engine
//! consumes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::discover;
use crate::engine::UnitChain;
use crate::file::FileRecord;
use crate::registry::UnitRegistry;

/// The `map` processing option: a plain switch, or detailed options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MapSetting {
    Flag(bool),
    Options(MapOptions),
}

/// Detailed source-map options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapOptions {
    /// Append a `sourceMappingURL` comment to the output.
    #[serde(default = "default_true")]
    pub annotation: bool,
    /// Embed the map in the annotation instead of referencing a file.
    #[serde(default)]
    pub inline: bool,
}

fn default_true() -> bool {
    true
}

impl Default for MapSetting {
    fn default() -> Self {
        MapSetting::Flag(false)
    }
}

impl MapSetting {
    /// The setting forced when a file already carries a source map: build
    /// a map for the session to merge, but write no annotation.
    pub fn session() -> Self {
        MapSetting::Options(MapOptions {
            annotation: false,
            inline: false,
        })
    }

    /// Whether a source map should be built at all.
    pub fn wants_map(&self) -> bool {
        !matches!(self, MapSetting::Flag(false))
    }

    /// Whether the output should carry a `sourceMappingURL` comment.
    pub fn annotation(&self) -> bool {
        match self {
            MapSetting::Flag(enabled) => *enabled,
            MapSetting::Options(options) => options.annotation,
        }
    }

    /// Whether the annotation embeds the map as a data URI instead of
    /// naming a sidecar file. A bare `map: true` keeps the sidecar form.
    pub fn inline(&self) -> bool {
        match self {
            MapSetting::Flag(_) => false,
            MapSetting::Options(options) => options.inline,
        }
    }
}

/// Final per-file processing options handed to the engine. Never mutated
/// after resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineOptions {
    /// Source path, for error labels and source-map `sources`.
    pub from: Option<PathBuf>,
    /// Destination path, for the annotation comment.
    pub to: Option<PathBuf>,
    pub map: MapSetting,
    /// Pass-through keys forwarded to the engine verbatim.
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl EngineOptions {
    pub(crate) fn filename(&self) -> String {
        self.from
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }

    /// The `minify` pass-through key, when set truthily.
    pub fn minify(&self) -> bool {
        self.extra
            .get("minify")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

/// Options as a caller (or a configuration file) supplies them. `None`
/// fields fall back to the per-file defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallerOptions {
    pub from: Option<PathBuf>,
    pub to: Option<PathBuf>,
    pub map: Option<MapSetting>,
    pub extra: IndexMap<String, serde_yaml::Value>,
}

/// What a settings callback sees: the per-file defaults plus the file
/// itself, before any override is applied.
#[derive(Debug)]
pub struct ResolveContext<'a> {
    /// The resolver's working directory.
    pub cwd: &'a Path,
    /// Default source path: the file's own path.
    pub from: Option<PathBuf>,
    /// Default destination path: same as `from`.
    pub to: Option<PathBuf>,
    /// Default map setting.
    pub map: MapSetting,
    pub file: &'a FileRecord,
}

/// A settings callback: inspects the per-file context and returns the
/// units and options to use for that file.
#[async_trait]
pub trait DeferredConfig: Send + Sync {
    async fn resolve(&self, ctx: &ResolveContext<'_>) -> anyhow::Result<CallerConfig>;
}

/// Units plus options, as produced by a callback or a configuration file.
#[derive(Debug, Clone)]
pub struct CallerConfig {
    pub units: Arc<UnitChain>,
    pub options: CallerOptions,
}

/// How the caller configured the adapter.
pub enum CallerSetting {
    /// Nothing supplied: discover a configuration file per file.
    Discover,
    /// An explicit unit chain, with optional option overrides.
    Explicit {
        units: Arc<UnitChain>,
        options: CallerOptions,
    },
    /// A callback invoked per file with a [`ResolveContext`].
    Deferred(Box<dyn DeferredConfig>),
}

impl CallerSetting {
    pub fn units(units: UnitChain) -> Self {
        CallerSetting::Explicit {
            units: Arc::new(units),
            options: CallerOptions::default(),
        }
    }

    pub fn with_options(units: UnitChain, options: CallerOptions) -> Self {
        CallerSetting::Explicit {
            units: Arc::new(units),
            options,
        }
    }

    pub fn deferred(config: impl DeferredConfig + 'static) -> Self {
        CallerSetting::Deferred(Box::new(config))
    }
}

impl Default for CallerSetting {
    fn default() -> Self {
        CallerSetting::Discover
    }
}

impl fmt::Debug for CallerSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallerSetting::Discover => write!(f, "Discover"),
            CallerSetting::Explicit { units, options } => f
                .debug_struct("Explicit")
                .field("units", &units.names())
                .field("options", options)
                .finish(),
            CallerSetting::Deferred(_) => write!(f, "Deferred(..)"),
        }
    }
}

/// The resolver's output: the unit chain to run and the final options.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub units: Arc<UnitChain>,
    pub options: EngineOptions,
}

/// Failure while resolving a file's configuration.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("unknown transformation unit '{name}'")]
    UnknownUnit { name: String },
    #[error("no configuration file found above {}", root.display())]
    ConfigNotFound { root: PathBuf },
    #[error("failed to read configuration at {}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration at {}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid options for unit '{name}': {message}")]
    UnitOptions { name: String, message: String },
    #[error("settings callback failed")]
    Callback(#[source] anyhow::Error),
}

/// Resolves the unit chain and processing options for each file.
#[derive(Debug)]
pub struct OptionResolver {
    cwd: PathBuf,
    registry: Arc<UnitRegistry>,
}

impl OptionResolver {
    pub fn new(cwd: impl Into<PathBuf>, registry: Arc<UnitRegistry>) -> Self {
        OptionResolver {
            cwd: cwd.into(),
            registry,
        }
    }

    /// Resolve one file against the caller's setting.
    ///
    /// Defaults are per file: `from` and `to` are the file's path and no
    /// map is built — unless the file already carries a source map, in
    /// which case the map setting is forced to the session form and, like
    /// `from`, protected from overrides.
    pub async fn resolve(
        &self,
        file: &FileRecord,
        setting: &CallerSetting,
    ) -> Result<ResolvedConfig, ResolveError> {
        let protect = file.source_map.is_some();
        let defaults = defaults_for(file, protect);

        match setting {
            CallerSetting::Explicit { units, options } => Ok(ResolvedConfig {
                units: units.clone(),
                options: apply(defaults, options, protect),
            }),
            CallerSetting::Deferred(callback) => {
                let ctx = ResolveContext {
                    cwd: &self.cwd,
                    from: defaults.from.clone(),
                    to: defaults.to.clone(),
                    map: defaults.map.clone(),
                    file,
                };
                let config = callback
                    .resolve(&ctx)
                    .await
                    .map_err(ResolveError::Callback)?;
                Ok(ResolvedConfig {
                    units: config.units,
                    options: apply(defaults, &config.options, protect),
                })
            }
            CallerSetting::Discover => {
                let root = file.dir().to_path_buf();
                let discovered = discover::discover(&root, &self.registry)?
                    .ok_or(ResolveError::ConfigNotFound { root })?;
                tracing::debug!(
                    config = %discovered.path.display(),
                    "resolved configuration by discovery"
                );
                Ok(ResolvedConfig {
                    units: discovered.units,
                    options: apply(defaults, &discovered.options, protect),
                })
            }
        }
    }
}

fn defaults_for(file: &FileRecord, protect: bool) -> EngineOptions {
    let from = file.path.clone();
    EngineOptions {
        to: from.clone(),
        from,
        map: if protect {
            MapSetting::session()
        } else {
            MapSetting::default()
        },
        extra: IndexMap::new(),
    }
}

/// Fold supplied options over the defaults. `from` and `map` are skipped
/// when the file's own source map protects them; `to` and pass-through
/// keys always apply.
fn apply(mut options: EngineOptions, supplied: &CallerOptions, protect: bool) -> EngineOptions {
    if !protect {
        if let Some(from) = &supplied.from {
            options.from = Some(from.clone());
        }
        if let Some(map) = &supplied.map {
            options.map = map.clone();
        }
    }
    if let Some(to) = &supplied.to {
        options.to = Some(to.clone());
    }
    options
        .extra
        .extend(supplied.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    options
}
