/*
 * extract.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Style-region extraction from markup files.
 */

//! Style-region extraction from markup files.
//!
//! Markup-like files (`.html`, `.vue`, ...) carry their CSS inside `<style>`
//! tags. [`extract`] locates those regions so each one can be transformed
//! independently; [`reinsert`] splices the transformed text back, leaving
//! every non-style byte exactly as it was.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches a `<style ...>...</style>` element. Capture 1 is the attribute
/// text, capture 2 the region body. Unterminated tags do not match.
static STYLE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<style\b([^>]*)>(.*?)</style\s*>").expect("Invalid style tag pattern")
});

/// Matches a `lang="..."` (or single-quoted) attribute inside a style tag.
static LANG_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\blang\s*=\s*["']([^"']*)["']"#).expect("Invalid lang attribute pattern")
});

/// File extensions treated as markup wrappers around embedded CSS.
const MARKUP_EXTENSIONS: &[&str] = &["html", "htm", "xml", "svg", "vue"];

/// One embedded style region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRegion {
    /// Byte offset where the region body starts (just after `>`).
    pub start: usize,
    /// Byte offset one past the end of the region body.
    pub end: usize,
    /// Value of the tag's `lang` attribute, lowercased, when present.
    pub lang: Option<String>,
    /// 0-based line of the region start within the outer document.
    pub line: u32,
}

/// The ordered style regions found in one file's content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    markup: bool,
    regions: Vec<StyleRegion>,
}

impl Extraction {
    /// An extraction for content that is not markup at all.
    pub fn not_markup() -> Self {
        Extraction::default()
    }

    /// Whether the content was recognized as markup (by extension or by a
    /// root-level style tag), independent of how many regions were found.
    pub fn is_markup(&self) -> bool {
        self.markup
    }

    pub fn regions(&self) -> &[StyleRegion] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Whether a path's extension marks it as markup.
pub fn is_markup_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            MARKUP_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Content sniff: markup starts with a tag. CSS never begins with `<`.
fn sniff_markup(content: &str) -> bool {
    content.trim_start().starts_with('<') && content.contains("<style")
}

/// Locate the style regions in `content`.
///
/// Files are recognized as markup by extension or by content sniffing; for
/// everything else the extraction is empty and the whole file is ordinary
/// CSS content. Malformed or unterminated style tags never fail — they
/// simply do not match.
pub fn extract(content: &str, path: Option<&Path>) -> Extraction {
    let markup = path.is_some_and(is_markup_path) || sniff_markup(content);
    if !markup {
        return Extraction::not_markup();
    }

    let mut regions = Vec::new();
    for caps in STYLE_TAG.captures_iter(content) {
        let (Some(attrs), Some(body)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let lang = LANG_ATTR
            .captures(attrs.as_str())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_ascii_lowercase());
        regions.push(StyleRegion {
            start: body.start(),
            end: body.end(),
            lang,
            line: line_of(content, body.start()),
        });
    }

    Extraction {
        markup: true,
        regions,
    }
}

/// Splice `replacements` back into the spans recorded by `extraction`,
/// preserving all non-style content byte-for-byte. Replacements pair with
/// regions in document order.
pub fn reinsert(original: &str, extraction: &Extraction, replacements: &[String]) -> String {
    let mut out = String::with_capacity(original.len());
    let mut cursor = 0;
    for (region, replacement) in extraction.regions().iter().zip(replacements) {
        out.push_str(&original[cursor..region.start]);
        out.push_str(replacement);
        cursor = region.end;
    }
    out.push_str(&original[cursor..]);
    out
}

/// 0-based line number of a byte offset. Offsets come from regex matches,
/// so they always sit on a character boundary.
fn line_of(content: &str, offset: usize) -> u32 {
    content[..offset].matches('\n').count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_REGIONS: &str = "<html><head>\n<style>a { color: red }</style>\n\
        </head><body>\n<style lang=\"scss\">b { color: blue }</style>\n</body></html>";

    #[test]
    fn css_content_is_not_markup() {
        let extraction = extract("a { color: red }", Some(Path::new("/p/a.css")));
        assert!(!extraction.is_markup());
        assert!(extraction.is_empty());
    }

    #[test]
    fn markup_without_style_tags_has_no_regions() {
        let extraction = extract("<html><body>hi</body></html>", Some(Path::new("/p/a.html")));
        assert!(extraction.is_markup());
        assert!(extraction.is_empty());
    }

    #[test]
    fn finds_regions_in_document_order() {
        let extraction = extract(TWO_REGIONS, Some(Path::new("/p/a.html")));
        assert_eq!(extraction.len(), 2);
        let regions = extraction.regions();
        assert!(regions[0].start < regions[1].start);
        assert_eq!(&TWO_REGIONS[regions[0].start..regions[0].end], "a { color: red }");
        assert_eq!(&TWO_REGIONS[regions[1].start..regions[1].end], "b { color: blue }");
        assert_eq!(regions[0].lang, None);
        assert_eq!(regions[1].lang.as_deref(), Some("scss"));
        assert_eq!(regions[0].line, 1);
        assert_eq!(regions[1].line, 3);
    }

    #[test]
    fn sniffs_markup_without_a_path() {
        let extraction = extract("<div><style>a{}</style></div>", None);
        assert!(extraction.is_markup());
        assert_eq!(extraction.len(), 1);
    }

    #[test]
    fn unterminated_tag_matches_nothing() {
        let extraction = extract("<html><style>a { color: red }", Some(Path::new("/p/a.html")));
        assert!(extraction.is_markup());
        assert!(extraction.is_empty());
    }

    #[test]
    fn reinsert_with_identity_is_the_original() {
        let extraction = extract(TWO_REGIONS, Some(Path::new("/p/a.html")));
        let identity: Vec<String> = extraction
            .regions()
            .iter()
            .map(|r| TWO_REGIONS[r.start..r.end].to_string())
            .collect();
        assert_eq!(reinsert(TWO_REGIONS, &extraction, &identity), TWO_REGIONS);
    }

    #[test]
    fn reinsert_preserves_non_style_bytes() {
        let extraction = extract(TWO_REGIONS, Some(Path::new("/p/a.html")));
        let replacements = vec!["X".to_string(), "Y".to_string()];
        let out = reinsert(TWO_REGIONS, &extraction, &replacements);
        assert_eq!(
            out,
            "<html><head>\n<style>X</style>\n</head><body>\n<style lang=\"scss\">Y</style>\n</body></html>"
        );
    }

    #[test]
    fn uppercase_and_attribute_tags_match() {
        let content = "<STYLE type='text/css'>a{}</STYLE>";
        let extraction = extract(content, Some(Path::new("/p/a.htm")));
        assert_eq!(extraction.len(), 1);
        assert_eq!(extraction.regions()[0].lang, None);
    }
}
