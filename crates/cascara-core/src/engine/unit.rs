/*
 * unit.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The transformation-unit trait and the chain that runs units in order.
 */

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::engine::document::StyleDocument;
use crate::engine::runner::EngineError;

/// A non-fatal message produced while transforming a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    /// Name of the unit that raised the warning, if any. Parser warnings
    /// have no unit.
    pub unit: Option<String>,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(unit) = &self.unit {
            write!(f, "[{unit}] ")?;
        }
        write!(f, "{}", self.message)?;
        if let (Some(line), Some(column)) = (self.line, self.column) {
            write!(f, " at {line}:{column}")?;
        }
        Ok(())
    }
}

/// Shared accumulator for warnings. Cloning shares the underlying log, so
/// units, the parser, and the caller all append to one list.
#[derive(Debug, Clone, Default)]
pub struct WarningLog {
    entries: Arc<Mutex<Vec<Warning>>>,
}

impl WarningLog {
    pub fn new() -> Self {
        WarningLog::default()
    }

    pub fn push(&self, warning: Warning) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(warning);
        }
    }

    /// Append every warning from `other` to this log.
    pub fn extend_from(&self, other: &WarningLog) {
        let drained = match other.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(_) => return,
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.extend(drained);
        }
    }

    /// Render each warning to a display line.
    pub fn render(&self) -> Vec<String> {
        match self.entries.lock() {
            Ok(entries) => entries.iter().map(|w| w.to_string()).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-run context handed to each unit.
#[derive(Debug, Clone)]
pub struct UnitContext {
    /// Log for non-fatal messages. Warnings never stop the chain.
    pub warnings: WarningLog,
    /// The file the document came from, when known.
    pub from: Option<PathBuf>,
}

impl UnitContext {
    pub fn new(warnings: WarningLog, from: Option<PathBuf>) -> Self {
        UnitContext { warnings, from }
    }

    /// Convenience for units that only need to append a message.
    pub fn warn(&self, unit: &str, message: impl Into<String>) {
        self.warnings.push(Warning {
            message: message.into(),
            line: None,
            column: None,
            unit: Some(unit.to_string()),
        });
    }
}

/// One step of the transformation chain.
///
/// Units receive the document after it has passed the syntax gate, so they
/// may assume `doc.text` parses. A unit that fails aborts the file; the
/// error is reported with the unit's name attached.
#[async_trait]
pub trait TransformationUnit: Send + Sync {
    /// Stable name used in configuration files and error messages.
    fn name(&self) -> &str;

    async fn apply(&self, doc: &mut StyleDocument, ctx: &UnitContext) -> anyhow::Result<()>;
}

impl fmt::Debug for dyn TransformationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TransformationUnit").field(&self.name()).finish()
    }
}

/// An ordered chain of transformation units applied to one document.
#[derive(Default)]
pub struct UnitChain {
    units: Vec<Box<dyn TransformationUnit>>,
}

impl UnitChain {
    pub fn new() -> Self {
        UnitChain::default()
    }

    pub fn push(&mut self, unit: Box<dyn TransformationUnit>) {
        self.units.push(unit);
    }

    /// Builder form of [`push`](UnitChain::push).
    pub fn with(mut self, unit: Box<dyn TransformationUnit>) -> Self {
        self.push(unit);
        self
    }

    pub fn extend(&mut self, units: impl IntoIterator<Item = Box<dyn TransformationUnit>>) {
        self.units.extend(units);
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.units.iter().map(|u| u.name()).collect()
    }

    /// Run every unit in order. The first failure wins and is tagged with
    /// the failing unit's name.
    pub(crate) async fn execute(
        &self,
        doc: &mut StyleDocument,
        ctx: &UnitContext,
    ) -> Result<(), EngineError> {
        for unit in &self.units {
            tracing::debug!(unit = unit.name(), "applying transformation unit");
            unit.apply(doc, ctx).await.map_err(|source| EngineError::Unit {
                unit: unit.name().to_string(),
                source,
            })?;
        }
        Ok(())
    }
}

impl fmt::Debug for UnitChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitChain")
            .field("units", &self.names())
            .finish()
    }
}
