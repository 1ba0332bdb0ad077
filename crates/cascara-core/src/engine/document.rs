/*
 * document.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The in-flight stylesheet handed from unit to unit.
 */

use std::path::{Path, PathBuf};

/// Source dialect of a style document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StyleDialect {
    #[default]
    Css,
    Scss,
}

impl StyleDialect {
    /// Dialect named by a `lang` attribute, when recognized.
    pub fn from_lang(lang: Option<&str>) -> Option<StyleDialect> {
        match lang {
            Some("scss" | "sass") => Some(StyleDialect::Scss),
            Some("css") => Some(StyleDialect::Css),
            _ => None,
        }
    }

    /// Dialect implied by a file extension. Anything unrecognized is CSS.
    pub fn from_path(path: Option<&Path>) -> StyleDialect {
        let ext = path
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("scss" | "sass") => StyleDialect::Scss,
            _ => StyleDialect::Css,
        }
    }
}

/// One unit of style text flowing through the transformation chain.
///
/// Units mutate the document in place: rewrite `text`, or flip `minify` to
/// request compressed serialization. The document owns its text, so a unit
/// may hold it across await points.
#[derive(Debug, Clone)]
pub struct StyleDocument {
    /// Current style source. Starts as the extracted (or whole-file) text
    /// and carries each unit's output forward.
    pub text: String,
    /// Originating file, when known. Used for error labels.
    pub path: Option<PathBuf>,
    /// Dialect of `text`. SCSS documents are compiled to CSS before the
    /// unit chain runs.
    pub dialect: StyleDialect,
    /// Serialize compressed instead of pretty.
    pub minify: bool,
}

impl StyleDocument {
    pub fn new(text: impl Into<String>, path: Option<PathBuf>, dialect: StyleDialect) -> Self {
        StyleDocument {
            text: text.into(),
            path,
            dialect,
            minify: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lang_attribute_wins_over_unknown() {
        assert_eq!(StyleDialect::from_lang(Some("scss")), Some(StyleDialect::Scss));
        assert_eq!(StyleDialect::from_lang(Some("css")), Some(StyleDialect::Css));
        assert_eq!(StyleDialect::from_lang(Some("less")), None);
        assert_eq!(StyleDialect::from_lang(None), None);
    }

    #[test]
    fn path_extension_selects_dialect() {
        assert_eq!(
            StyleDialect::from_path(Some(Path::new("/p/theme.scss"))),
            StyleDialect::Scss
        );
        assert_eq!(
            StyleDialect::from_path(Some(Path::new("/p/site.css"))),
            StyleDialect::Css
        );
        assert_eq!(StyleDialect::from_path(None), StyleDialect::Css);
    }
}
