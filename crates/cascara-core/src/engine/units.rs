/*
 * units.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Built-in transformation units.
 */

use std::convert::Infallible;

use async_trait::async_trait;
use lightningcss::rules::CssRule;
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::values::url::Url;
use lightningcss::visit_types;
use lightningcss::visitor::{Visit, VisitTypes, Visitor};
use serde::Deserialize;

use crate::engine::document::StyleDocument;
use crate::engine::unit::{TransformationUnit, UnitContext};

/// Parse the document, run an infallible visitor over the tree, and write
/// the serialized result back. Units run after the syntax gate, so a parse
/// failure here means an earlier unit produced invalid CSS.
fn rewrite<V>(doc: &mut StyleDocument, visitor: &mut V) -> anyhow::Result<()>
where
    V: for<'i> Visitor<'i, Error = Infallible>,
{
    let filename = doc
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let code = {
        let mut sheet = StyleSheet::parse(
            &doc.text,
            ParserOptions {
                filename,
                ..Default::default()
            },
        )
        .map_err(|e| anyhow::anyhow!("reparse failed: {}", e.kind))?;
        sheet.visit(visitor).map_err(|e| match e {})?;
        sheet
            .to_css(PrinterOptions::default())
            .map_err(|e| anyhow::anyhow!("serialize failed: {}", e.kind))?
            .code
    };
    doc.text = code;
    Ok(())
}

/// Requests compressed serialization. The flag is honored when the engine
/// prints the final document, so later units still see readable CSS.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinifyUnit;

#[async_trait]
impl TransformationUnit for MinifyUnit {
    fn name(&self) -> &str {
        "minify"
    }

    async fn apply(&self, doc: &mut StyleDocument, _ctx: &UnitContext) -> anyhow::Result<()> {
        doc.minify = true;
        Ok(())
    }
}

/// Leaves the document untouched. Useful as a configuration placeholder
/// and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityUnit;

#[async_trait]
impl TransformationUnit for IdentityUnit {
    fn name(&self) -> &str {
        "identity"
    }

    async fn apply(&self, _doc: &mut StyleDocument, _ctx: &UnitContext) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Options for [`RewriteUrlsUnit`], as they appear in configuration files.
#[derive(Debug, Clone, Deserialize)]
pub struct RewriteUrlsOptions {
    pub from: String,
    pub to: String,
}

/// Rewrites every `url()` whose target starts with `from` to start with
/// `to` instead. Non-matching urls pass through unchanged.
#[derive(Debug, Clone)]
pub struct RewriteUrlsUnit {
    from: String,
    to: String,
}

impl RewriteUrlsUnit {
    pub fn new(options: RewriteUrlsOptions) -> Self {
        RewriteUrlsUnit {
            from: options.from,
            to: options.to,
        }
    }
}

struct UrlPrefixRewriter<'a> {
    from: &'a str,
    to: &'a str,
    rewritten: usize,
}

impl<'a, 'i> Visitor<'i> for UrlPrefixRewriter<'a> {
    type Error = Infallible;

    fn visit_types(&self) -> VisitTypes {
        visit_types!(URLS)
    }

    fn visit_url(&mut self, url: &mut Url<'i>) -> Result<(), Self::Error> {
        let replacement = url
            .url
            .strip_prefix(self.from)
            .map(|rest| format!("{}{}", self.to, rest));
        if let Some(replacement) = replacement {
            url.url = replacement.into();
            self.rewritten += 1;
        }
        Ok(())
    }
}

#[async_trait]
impl TransformationUnit for RewriteUrlsUnit {
    fn name(&self) -> &str {
        "rewrite-urls"
    }

    async fn apply(&self, doc: &mut StyleDocument, _ctx: &UnitContext) -> anyhow::Result<()> {
        let mut visitor = UrlPrefixRewriter {
            from: &self.from,
            to: &self.to,
            rewritten: 0,
        };
        rewrite(doc, &mut visitor)?;
        tracing::debug!(rewritten = visitor.rewritten, "rewrote url prefixes");
        Ok(())
    }
}

/// Repeats every declaration in every style rule once. Mostly a fixture
/// for exercising the pipeline, since doubled output is easy to assert on.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleDeclarationsUnit;

struct DeclarationDoubler;

impl<'i> Visitor<'i> for DeclarationDoubler {
    type Error = Infallible;

    fn visit_types(&self) -> VisitTypes {
        visit_types!(RULES)
    }

    fn visit_rule(&mut self, rule: &mut CssRule<'i>) -> Result<(), Self::Error> {
        if let CssRule::Style(style) = rule {
            let repeated = style.declarations.declarations.clone();
            style.declarations.declarations.extend(repeated);
            let important = style.declarations.important_declarations.clone();
            style.declarations.important_declarations.extend(important);
        }
        Ok(())
    }
}

#[async_trait]
impl TransformationUnit for DoubleDeclarationsUnit {
    fn name(&self) -> &str {
        "double-declarations"
    }

    async fn apply(&self, doc: &mut StyleDocument, _ctx: &UnitContext) -> anyhow::Result<()> {
        rewrite(doc, &mut DeclarationDoubler)
    }
}
