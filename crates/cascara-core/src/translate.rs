/*
 * translate.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Translation of per-file failures into one stable error shape.
 */

//! Failure translation.
//!
//! Every failed file emits exactly one [`TranslatedError`]: a stable,
//! inspectable shape (kind name, message, position fields) that consumers
//! can branch on without knowing which internal layer failed.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::engine::EngineError;
use crate::resolve::ResolveError;
use crate::stage::StageFailure;

/// Stable failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The engine could not parse the content.
    Syntax,
    /// A requested transformation unit could not be located.
    Resolution,
    /// Configuration discovery failed for some other reason.
    ConfigDiscovery,
    /// Anything else thrown by a unit or by the adapter's own glue.
    Plugin,
}

impl FailureKind {
    /// The stable name consumers branch on.
    pub fn name(&self) -> &'static str {
        match self {
            FailureKind::Syntax => "SyntaxError",
            FailureKind::Resolution => "ResolutionError",
            FailureKind::ConfigDiscovery => "ConfigDiscoveryError",
            FailureKind::Plugin => "GenericPluginError",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The single error event emitted for a failed file.
#[derive(Debug, Clone)]
pub struct TranslatedError {
    pub kind: FailureKind,
    pub message: String,
    /// The failing file, when known.
    pub file: Option<PathBuf>,
    /// 1-based position, for syntax failures.
    pub line: Option<u32>,
    pub column: Option<u32>,
    /// Annotated source excerpt, for syntax failures.
    pub snippet: Option<String>,
    /// The component the failure belongs to: a unit name or a glue label.
    pub component: Option<String>,
    /// Whether a backtrace would add nothing and should be hidden.
    pub trace_suppressed: bool,
}

impl TranslatedError {
    /// Render for display: the message, then the annotated excerpt when
    /// there is one.
    pub fn render(&self) -> String {
        match &self.snippet {
            Some(snippet) => format!("{}\n\n{}\n", self.message, snippet),
            None => self.message.clone(),
        }
    }
}

impl fmt::Display for TranslatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl std::error::Error for TranslatedError {}

/// Translate one per-file failure. Nothing is swallowed: every failure
/// maps to exactly one translated error for the emit step.
pub fn translate(failure: &StageFailure, path: Option<&Path>) -> TranslatedError {
    match failure {
        StageFailure::Engine(engine) => translate_engine(engine, path),
        StageFailure::Resolve(resolve) => translate_resolve(resolve, path),
        StageFailure::Bridge(bridge) => generic(chain_message(bridge), "source-map bridge", path),
        StageFailure::Drain(io) => generic(
            format!("failed to drain incremental contents: {io}"),
            "drain",
            path,
        ),
        StageFailure::Internal { stage, message } => generic(message.clone(), stage, path),
    }
}

fn translate_engine(error: &EngineError, path: Option<&Path>) -> TranslatedError {
    match error {
        EngineError::Syntax {
            reason,
            file,
            line,
            column,
            snippet,
        } => TranslatedError {
            kind: FailureKind::Syntax,
            message: format!("{reason} at {line}:{column}"),
            file: file.clone().or_else(|| path.map(Path::to_path_buf)),
            line: Some(*line),
            column: Some(*column),
            snippet: snippet.clone(),
            component: None,
            trace_suppressed: true,
        },
        EngineError::Dialect { message, file } => TranslatedError {
            kind: FailureKind::Syntax,
            message: message.clone(),
            file: file.clone().or_else(|| path.map(Path::to_path_buf)),
            line: None,
            column: None,
            snippet: None,
            component: None,
            trace_suppressed: true,
        },
        EngineError::Unit { unit, source } => generic(
            format!("transformation unit '{unit}' failed: {source:#}"),
            unit,
            path,
        ),
        EngineError::Print { .. } | EngineError::Map { .. } => {
            generic(error.to_string(), "engine", path)
        }
    }
}

fn translate_resolve(error: &ResolveError, path: Option<&Path>) -> TranslatedError {
    match error {
        // A missing unit keeps its original message, and a backtrace may
        // actually help locate the requesting config.
        ResolveError::UnknownUnit { .. } => TranslatedError {
            kind: FailureKind::Resolution,
            message: error.to_string(),
            file: path.map(Path::to_path_buf),
            line: None,
            column: None,
            snippet: None,
            component: None,
            trace_suppressed: false,
        },
        ResolveError::ConfigNotFound { .. }
        | ResolveError::ConfigRead { .. }
        | ResolveError::ConfigParse { .. } => TranslatedError {
            kind: FailureKind::ConfigDiscovery,
            message: chain_message(error),
            file: path.map(Path::to_path_buf),
            line: None,
            column: None,
            snippet: None,
            component: Some("config discovery".to_string()),
            trace_suppressed: true,
        },
        ResolveError::UnitOptions { name, .. } => generic(error.to_string(), name, path),
        ResolveError::Callback(source) => generic(
            format!("settings callback failed: {source:#}"),
            "settings callback",
            path,
        ),
    }
}

fn generic(message: String, component: &str, path: Option<&Path>) -> TranslatedError {
    TranslatedError {
        kind: FailureKind::Plugin,
        message,
        file: path.map(Path::to_path_buf),
        line: None,
        column: None,
        snippet: None,
        component: Some(component.to_string()),
        trace_suppressed: true,
    }
}

/// Join an error's message with its source chain.
fn chain_message(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Annotated source excerpt around a 1-based position: up to two lines of
/// leading context, the offending line marked, and a caret under the
/// column.
pub(crate) fn code_frame(source: &str, line: u32, column: u32) -> String {
    let line = line.max(1) as usize;
    let column = column.max(1) as usize;
    let lines: Vec<&str> = source.lines().collect();
    if line > lines.len() {
        return String::new();
    }
    let first = line.saturating_sub(2).max(1);
    let width = line.to_string().len();
    let mut out = String::new();
    for number in first..=line {
        let marker = if number == line { ">" } else { " " };
        out.push_str(&format!("{marker} {number:>width$} | {}\n", lines[number - 1]));
    }
    out.push_str(&format!("  {:>width$} | {}^", "", " ".repeat(column - 1)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(FailureKind::Syntax.name(), "SyntaxError");
        assert_eq!(FailureKind::Resolution.name(), "ResolutionError");
        assert_eq!(FailureKind::ConfigDiscovery.name(), "ConfigDiscoveryError");
        assert_eq!(FailureKind::Plugin.name(), "GenericPluginError");
    }

    #[test]
    fn code_frame_marks_the_offending_line() {
        let frame = code_frame("a net\nbad line\n", 2, 3);
        assert_eq!(frame, "  1 | a net\n> 2 | bad line\n    |   ^");
    }

    #[test]
    fn code_frame_past_the_end_is_empty() {
        assert_eq!(code_frame("one line\n", 9, 1), "");
    }

    #[test]
    fn syntax_errors_render_with_the_frame() {
        let failure = StageFailure::Engine(EngineError::Syntax {
            reason: "Unexpected token".to_string(),
            file: Some("/proj/app.css".into()),
            line: 2,
            column: 3,
            snippet: Some(code_frame("a net\nbad line\n", 2, 3)),
        });
        let translated = translate(&failure, Some(Path::new("/proj/app.css")));
        assert_eq!(translated.kind, FailureKind::Syntax);
        assert_eq!((translated.line, translated.column), (Some(2), Some(3)));
        assert!(translated.trace_suppressed);
        insta::assert_snapshot!(translated.render(), @r###"
        Unexpected token at 2:3

          1 | a net
        > 2 | bad line
            |   ^
        "###);
    }

    #[test]
    fn unknown_units_keep_their_message_and_stack() {
        let failure = StageFailure::Resolve(ResolveError::UnknownUnit {
            name: "cascara-nothing".to_string(),
        });
        let translated = translate(&failure, None);
        assert_eq!(translated.kind, FailureKind::Resolution);
        assert_eq!(
            translated.message,
            "unknown transformation unit 'cascara-nothing'"
        );
        assert!(!translated.trace_suppressed);
        assert!(translated.component.is_none());
    }

    #[test]
    fn config_failures_carry_the_cause_chain() {
        let parse_error = serde_yaml::from_str::<serde_yaml::Value>("a: [unclosed").unwrap_err();
        let failure = StageFailure::Resolve(ResolveError::ConfigParse {
            path: "/proj/cascara.yml".into(),
            source: parse_error,
        });
        let translated = translate(&failure, Some(Path::new("/proj/app.css")));
        assert_eq!(translated.kind, FailureKind::ConfigDiscovery);
        assert!(translated.message.starts_with("failed to parse configuration"));
        assert!(translated.message.contains(": "));
        assert!(translated.trace_suppressed);
    }

    #[test]
    fn unit_failures_name_the_unit() {
        let failure = StageFailure::Engine(EngineError::Unit {
            unit: "rewrite-urls".to_string(),
            source: anyhow::anyhow!("bad prefix"),
        });
        let translated = translate(&failure, None);
        assert_eq!(translated.kind, FailureKind::Plugin);
        assert_eq!(translated.component.as_deref(), Some("rewrite-urls"));
        assert!(translated.message.contains("bad prefix"));
    }

    #[test]
    fn glue_failures_are_generic_plugin_errors() {
        let failure = StageFailure::Internal {
            stage: "reinsert",
            message: "no transformation results to emit".to_string(),
        };
        let translated = translate(&failure, Some(Path::new("/proj/app.css")));
        assert_eq!(translated.kind, FailureKind::Plugin);
        assert_eq!(translated.component.as_deref(), Some("reinsert"));
        assert_eq!(translated.file.as_deref(), Some(Path::new("/proj/app.css")));
    }
}
