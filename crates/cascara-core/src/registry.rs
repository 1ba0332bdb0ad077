/*
 * registry.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Named transformation units, buildable from configuration values.
 */

//! The unit registry maps the names that appear in configuration files to
//! factories that build [`TransformationUnit`] values, parsing any per-unit
//! options along the way.

use std::fmt;

use indexmap::IndexMap;

use crate::engine::units::{
    DoubleDeclarationsUnit, IdentityUnit, MinifyUnit, RewriteUrlsOptions, RewriteUrlsUnit,
};
use crate::engine::TransformationUnit;
use crate::resolve::ResolveError;

type UnitFactory =
    Box<dyn Fn(&serde_yaml::Value) -> Result<Box<dyn TransformationUnit>, ResolveError> + Send + Sync>;

/// Registry of buildable transformation units.
pub struct UnitRegistry {
    factories: IndexMap<String, UnitFactory>,
}

impl UnitRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        UnitRegistry {
            factories: IndexMap::new(),
        }
    }

    /// The built-in units.
    pub fn builtin() -> Self {
        let mut registry = UnitRegistry::new();
        registry.register("minify", |_| Ok(Box::new(MinifyUnit)));
        registry.register("identity", |_| Ok(Box::new(IdentityUnit)));
        registry.register("rewrite-urls", |options| {
            let parsed: RewriteUrlsOptions =
                serde_yaml::from_value(options.clone()).map_err(|e| ResolveError::UnitOptions {
                    name: "rewrite-urls".to_string(),
                    message: e.to_string(),
                })?;
            Ok(Box::new(RewriteUrlsUnit::new(parsed)))
        });
        registry.register("double-declarations", |_| Ok(Box::new(DoubleDeclarationsUnit)));
        registry
    }

    /// Register a factory under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&serde_yaml::Value) -> Result<Box<dyn TransformationUnit>, ResolveError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// Build the unit registered under `name` with the given options value
    /// (`Null` when the configuration supplied none).
    pub fn build(
        &self,
        name: &str,
        options: &serde_yaml::Value,
    ) -> Result<Box<dyn TransformationUnit>, ResolveError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ResolveError::UnknownUnit {
                name: name.to_string(),
            })?;
        factory(options)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        UnitRegistry::new()
    }
}

impl fmt::Debug for UnitRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitRegistry")
            .field("units", &self.names())
            .finish()
    }
}
