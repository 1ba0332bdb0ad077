/*
 * runner.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The engine entry point: gate, transform, serialize.
 */

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use base64::prelude::*;
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use parcel_sourcemap::SourceMap;
use thiserror::Error;

use crate::engine::dialect::compile_scss;
use crate::engine::document::{StyleDialect, StyleDocument};
use crate::engine::unit::{UnitChain, UnitContext, Warning, WarningLog};
use crate::file::MapPayload;
use crate::resolve::EngineOptions;
use crate::translate::code_frame;

/// Failure inside one engine run. Everything here aborts the document that
/// caused it; other documents in the stream keep flowing.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The input failed the syntax gate before any unit ran. Positions are
    /// 1-based.
    #[error("{reason} at {line}:{column}")]
    Syntax {
        reason: String,
        file: Option<PathBuf>,
        line: u32,
        column: u32,
        snippet: Option<String>,
    },
    /// The document's dialect could not be compiled to CSS.
    #[error("{message}")]
    Dialect {
        message: String,
        file: Option<PathBuf>,
    },
    /// A transformation unit returned an error.
    #[error("transformation unit '{unit}' failed: {source}")]
    Unit {
        unit: String,
        #[source]
        source: anyhow::Error,
    },
    /// The chain's output could not be serialized.
    #[error("failed to serialize stylesheet: {message}")]
    Print { message: String },
    /// Source-map generation failed.
    #[error("failed to build source map: {message}")]
    Map { message: String },
}

/// The output of one engine run over one style document.
#[derive(Debug)]
pub struct TransformResult {
    /// Serialized stylesheet, annotation comment included when requested.
    pub content: String,
    /// Source map for `content`, when one was requested.
    pub map: Option<MapPayload>,
    warnings: WarningLog,
}

impl TransformResult {
    pub fn warnings(&self) -> &WarningLog {
        &self.warnings
    }
}

/// Run one style document through the unit chain.
///
/// The document is compiled to CSS if it is SCSS, checked by the syntax
/// gate, handed to each unit in order, and finally serialized. No file
/// I/O happens here; the caller owns where the text came from and where
/// the result goes.
pub async fn run(
    mut doc: StyleDocument,
    chain: &UnitChain,
    options: &EngineOptions,
) -> Result<TransformResult, EngineError> {
    if doc.dialect == StyleDialect::Scss {
        doc.text = compile_scss(&doc.text, doc.path.as_deref())?;
        doc.dialect = StyleDialect::Css;
    }

    let warnings = WarningLog::new();
    syntax_gate(&doc.text, options, &warnings)?;

    let ctx = UnitContext::new(warnings.clone(), options.from.clone());
    chain.execute(&mut doc, &ctx).await?;

    let (content, map) = serialize(&doc, options)?;
    Ok(TransformResult {
        content,
        map,
        warnings,
    })
}

/// Reject unparsable input before any unit sees it. Recoverable parser
/// complaints become warnings instead.
fn syntax_gate(
    text: &str,
    options: &EngineOptions,
    warnings: &WarningLog,
) -> Result<(), EngineError> {
    let collected = Arc::new(RwLock::new(Vec::new()));
    match StyleSheet::parse(
        text,
        ParserOptions {
            filename: options.filename(),
            error_recovery: false,
            warnings: Some(collected.clone()),
            ..Default::default()
        },
    ) {
        Ok(_) => {}
        Err(err) => {
            // ErrorLocation lines are 0-based; report 1-based like editors do.
            let (line, column) = err
                .loc
                .as_ref()
                .map(|loc| (loc.line + 1, loc.column))
                .unwrap_or((1, 1));
            let snippet = code_frame(text, line, column);
            return Err(EngineError::Syntax {
                reason: err.kind.to_string(),
                file: options.from.clone(),
                line,
                column,
                snippet: (!snippet.is_empty()).then_some(snippet),
            });
        }
    }
    if let Ok(parser_warnings) = collected.read() {
        for w in parser_warnings.iter() {
            warnings.push(Warning {
                message: w.kind.to_string(),
                line: w.loc.as_ref().map(|loc| loc.line + 1),
                column: w.loc.as_ref().map(|loc| loc.column),
                unit: None,
            });
        }
    }
    Ok(())
}

/// Print the transformed document, building a source map alongside when
/// the options ask for one.
fn serialize(
    doc: &StyleDocument,
    options: &EngineOptions,
) -> Result<(String, Option<MapPayload>), EngineError> {
    let mut source_map = if options.map.wants_map() {
        let mut map = SourceMap::new("/");
        let index = map.add_source(&options.filename());
        map.set_source_content(index as usize, &doc.text)
            .map_err(|e| EngineError::Map {
                message: format!("{e:?}"),
            })?;
        Some(map)
    } else {
        None
    };

    let minify = doc.minify || options.minify();
    let mut content = {
        let sheet = StyleSheet::parse(
            &doc.text,
            ParserOptions {
                filename: options.filename(),
                ..Default::default()
            },
        )
        .map_err(|e| EngineError::Print {
            message: format!("unit output no longer parses: {}", e.kind),
        })?;
        sheet
            .to_css(PrinterOptions {
                minify,
                source_map: source_map.as_mut(),
                ..Default::default()
            })
            .map_err(|e| EngineError::Print {
                message: e.kind.to_string(),
            })?
            .code
    };

    let payload = match source_map {
        Some(mut map) => {
            let json = map.to_json(None).map_err(|e| EngineError::Map {
                message: format!("{e:?}"),
            })?;
            Some(MapPayload::from_json(json))
        }
        None => None,
    };

    if options.map.annotation() {
        if let Some(map) = &payload {
            if options.map.inline() {
                let encoded = BASE64_STANDARD.encode(map.as_json());
                content.push_str(&format!(
                    "\n/*# sourceMappingURL=data:application/json;base64,{encoded} */"
                ));
                // The map now lives in the content itself.
                return Ok((content, None));
            }
            if let Some(name) = options
                .to
                .as_ref()
                .and_then(|to| to.file_name())
                .and_then(|n| n.to_str())
            {
                content.push_str(&format!("\n/*# sourceMappingURL={name}.map */"));
            }
        }
    }

    Ok((content, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::units::{DoubleDeclarationsUnit, MinifyUnit};
    use crate::resolve::{MapOptions, MapSetting};
    use async_trait::async_trait;
    use std::path::Path;

    fn css_doc(text: &str) -> StyleDocument {
        StyleDocument::new(text, None, StyleDialect::Css)
    }

    fn options() -> EngineOptions {
        EngineOptions::default()
    }

    #[test]
    fn empty_chain_reprints_the_input() {
        let chain = UnitChain::new();
        let result =
            pollster::block_on(run(css_doc("a { color: red }"), &chain, &options())).unwrap();
        assert!(result.content.contains("color: red"));
        assert!(result.map.is_none());
        assert!(result.warnings().is_empty());
    }

    #[test]
    fn doubling_chain_doubles_then_quadruples() {
        let chain = UnitChain::new().with(Box::new(DoubleDeclarationsUnit));
        let result =
            pollster::block_on(run(css_doc("a { color: red }"), &chain, &options())).unwrap();
        assert_eq!(result.content.matches("color:").count(), 2);

        let chain = UnitChain::new()
            .with(Box::new(DoubleDeclarationsUnit))
            .with(Box::new(DoubleDeclarationsUnit));
        let result =
            pollster::block_on(run(css_doc("a { color: red }"), &chain, &options())).unwrap();
        assert_eq!(result.content.matches("color:").count(), 4);
    }

    #[test]
    fn unparsable_input_fails_the_gate() {
        let chain = UnitChain::new();
        let err = pollster::block_on(run(css_doc("} a { color: red }"), &chain, &options()))
            .unwrap_err();
        match err {
            EngineError::Syntax {
                line,
                column,
                reason,
                snippet,
                ..
            } => {
                assert_eq!((line, column), (1, 1));
                assert!(!reason.is_empty());
                assert!(snippet.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn scss_documents_compile_before_the_gate() {
        let chain = UnitChain::new();
        let doc = StyleDocument::new("a { b { color: red; } }", None, StyleDialect::Scss);
        let result = pollster::block_on(run(doc, &chain, &options())).unwrap();
        assert!(result.content.contains("a b"));
    }

    #[test]
    fn minify_unit_compresses_the_output() {
        let chain = UnitChain::new().with(Box::new(MinifyUnit));
        let result = pollster::block_on(run(
            css_doc("a {\n  color: red;\n}\n"),
            &chain,
            &options(),
        ))
        .unwrap();
        assert!(!result.content.contains('\n'));
    }

    #[test]
    fn map_request_produces_a_payload() {
        let chain = UnitChain::new();
        let opts = EngineOptions {
            from: Some("/src/app.css".into()),
            map: MapSetting::Flag(true),
            ..Default::default()
        };
        let result = pollster::block_on(run(css_doc("a { color: red }"), &chain, &opts)).unwrap();
        let map = result.map.as_ref().unwrap();
        assert!(map.as_json().contains("mappings"));
        assert!(map.as_json().contains("/src/app.css"));
        // No `to` path, so no annotation comment.
        assert!(!result.content.contains("sourceMappingURL"));
    }

    #[test]
    fn annotation_comment_names_the_destination() {
        let chain = UnitChain::new();
        let opts = EngineOptions {
            from: Some("/src/app.css".into()),
            to: Some("/dist/app.css".into()),
            map: MapSetting::Flag(true),
            ..Default::default()
        };
        let result = pollster::block_on(run(css_doc("a { color: red }"), &chain, &opts)).unwrap();
        assert!(result.content.contains("sourceMappingURL=app.css.map"));
    }

    #[test]
    fn inline_maps_ride_inside_the_annotation() {
        let chain = UnitChain::new();
        let opts = EngineOptions {
            from: Some("/src/app.css".into()),
            to: Some("/dist/app.css".into()),
            map: MapSetting::Options(MapOptions {
                annotation: true,
                inline: true,
            }),
            ..Default::default()
        };
        let result = pollster::block_on(run(css_doc("a { color: red }"), &chain, &opts)).unwrap();
        assert!(result
            .content
            .contains("sourceMappingURL=data:application/json;base64,"));
        // The payload was consumed by the annotation.
        assert!(result.map.is_none());
    }

    #[test]
    fn suppressed_annotation_still_builds_the_map() {
        let chain = UnitChain::new();
        let opts = EngineOptions {
            from: Some("/src/app.css".into()),
            to: Some("/dist/app.css".into()),
            map: MapSetting::session(),
            ..Default::default()
        };
        let result = pollster::block_on(run(css_doc("a { color: red }"), &chain, &opts)).unwrap();
        assert!(result.map.is_some());
        assert!(!result.content.contains("sourceMappingURL"));
    }

    struct YieldingWarnUnit;

    #[async_trait]
    impl crate::engine::unit::TransformationUnit for YieldingWarnUnit {
        fn name(&self) -> &str {
            "yielding-warn"
        }

        async fn apply(
            &self,
            _doc: &mut StyleDocument,
            ctx: &UnitContext,
        ) -> anyhow::Result<()> {
            tokio::task::yield_now().await;
            ctx.warn("yielding-warn", "something looked off");
            Ok(())
        }
    }

    #[tokio::test]
    async fn unit_warnings_surface_in_the_result() {
        let chain = UnitChain::new().with(Box::new(YieldingWarnUnit));
        let result = run(css_doc("a { color: red }"), &chain, &options())
            .await
            .unwrap();
        let rendered = result.warnings().render();
        assert_eq!(rendered, vec!["[yielding-warn] something looked off"]);
    }

    #[test]
    fn syntax_errors_name_the_file() {
        let chain = UnitChain::new();
        let opts = EngineOptions {
            from: Some("/src/app.css".into()),
            ..Default::default()
        };
        let err =
            pollster::block_on(run(css_doc("} nope"), &chain, &opts)).unwrap_err();
        match err {
            EngineError::Syntax { file, .. } => {
                assert_eq!(file.as_deref(), Some(Path::new("/src/app.css")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
