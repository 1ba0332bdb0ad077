/*
 * dialect.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * SCSS-to-CSS compilation ahead of the unit chain.
 */

use std::path::Path;

use crate::engine::runner::EngineError;

/// Compile an SCSS document to plain CSS.
///
/// Regions marked `lang="scss"` (or files with an `.scss`/`.sass`
/// extension) go through this before the syntax gate, so the rest of the
/// engine only ever sees CSS.
pub(crate) fn compile_scss(source: &str, path: Option<&Path>) -> Result<String, EngineError> {
    grass::from_string(source.to_string(), &grass::Options::default()).map_err(|e| {
        EngineError::Dialect {
            message: e.to_string(),
            file: path.map(|p| p.to_path_buf()),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_rules_flatten() {
        let css = compile_scss("a { b { color: red; } }", None).unwrap();
        assert!(css.contains("a b"));
        assert!(css.contains("color: red"));
    }

    #[test]
    fn bad_scss_reports_the_file() {
        let err = compile_scss("a { color: $missing; }", Some(Path::new("/p/a.scss"))).unwrap_err();
        match err {
            EngineError::Dialect { message, file } => {
                assert!(!message.is_empty());
                assert_eq!(file.as_deref(), Some(Path::new("/p/a.scss")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
