/*
 * mapbridge.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Composition of engine source maps onto pre-existing ones.
 */

//! Source-map composition for files that arrive with a map already
//! attached (a caller-side map session). The engine's emitted map traces
//! output positions back to the text it was given; composing it onto the
//! pre-existing map makes final positions trace all the way back through
//! every earlier transformation.

use std::path::Path;

use parcel_sourcemap::{OriginalLocation, SourceMap};
use thiserror::Error;

use crate::file::MapPayload;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("failed to parse source map: {0}")]
    Parse(String),
    #[error("failed to compose source maps: {0}")]
    Compose(String),
}

/// Where an extracted style region sits inside its outer document. Both
/// values are in lines of the region's input text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionOffset {
    /// 0-based line of the region start within the outer document.
    pub line: u32,
    /// Number of lines the region's input text spans.
    pub lines: u32,
}

/// Compose `engine` onto `existing`.
///
/// When the transformed text was an extracted region rather than the whole
/// document, `region` shifts both sides of the engine map into outer-
/// document coordinates first. `file` names the merged map's output file.
pub fn merge(
    existing: &MapPayload,
    engine: &MapPayload,
    region: Option<RegionOffset>,
    file: Option<&Path>,
) -> Result<MapPayload, BridgeError> {
    let mut engine_map = SourceMap::from_json("/", engine.as_json())
        .map_err(|e| BridgeError::Parse(format!("{e:?}")))?;
    let mut previous = SourceMap::from_json("/", existing.as_json())
        .map_err(|e| BridgeError::Parse(format!("{e:?}")))?;

    if let Some(offset) = region.filter(|o| o.line > 0) {
        lift_into_outer(&mut engine_map, offset, file)?;
    }

    engine_map
        .extends(&mut previous)
        .map_err(|e| BridgeError::Compose(format!("{e:?}")))?;
    let json = engine_map
        .to_json(None)
        .map_err(|e| BridgeError::Compose(format!("{e:?}")))?;

    Ok(MapPayload::from_json(name_output_file(json, file)?))
}

/// Shift a region-relative map into outer-document coordinates: original
/// positions via a synthetic line-for-line map, generated positions via a
/// plain line offset. Reinsertion leaves everything before the region
/// untouched, so the same line offset serves both sides.
fn lift_into_outer(
    engine_map: &mut SourceMap,
    offset: RegionOffset,
    file: Option<&Path>,
) -> Result<(), BridgeError> {
    let label = file
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<embedded>".to_string());
    let mut lift = SourceMap::new("/");
    let source = lift.add_source(&label);
    for line in 0..offset.lines.max(1) {
        lift.add_mapping(
            line,
            0,
            Some(OriginalLocation {
                original_line: line + offset.line,
                original_column: 0,
                source,
                name: None,
            }),
        );
    }
    engine_map
        .extends(&mut lift)
        .map_err(|e| BridgeError::Compose(format!("{e:?}")))?;
    engine_map
        .offset_lines(0, offset.line as i64)
        .map_err(|e| BridgeError::Compose(format!("{e:?}")))?;
    Ok(())
}

/// Record the output file's name in the merged payload.
fn name_output_file(json: String, file: Option<&Path>) -> Result<String, BridgeError> {
    let name = file.and_then(|f| f.file_name()).and_then(|n| n.to_str());
    let Some(name) = name else {
        return Ok(json);
    };
    let mut value: serde_json::Value =
        serde_json::from_str(&json).map_err(|e| BridgeError::Compose(e.to_string()))?;
    if let Some(object) = value.as_object_mut() {
        object.insert(
            "file".to_string(),
            serde_json::Value::String(name.to_string()),
        );
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_map(source: &str, content: &str, lines: u32) -> MapPayload {
        let mut map = SourceMap::new("/");
        let index = map.add_source(source);
        map.set_source_content(index as usize, content).unwrap();
        for line in 0..lines {
            map.add_mapping(
                line,
                0,
                Some(OriginalLocation {
                    original_line: line,
                    original_column: 0,
                    source: index,
                    name: None,
                }),
            );
        }
        MapPayload::from_json(map.to_json(None).unwrap())
    }

    #[test]
    fn whole_file_merge_traces_to_the_earliest_source() {
        let existing = identity_map("app.scss", "a\n  color: red\n", 2);
        let engine = identity_map("app.css", "a { color: red }\n", 1);
        let merged = merge(&existing, &engine, None, Some(Path::new("/dist/app.css"))).unwrap();
        assert!(merged.sources().iter().any(|s| s.contains("app.scss")));
        assert_eq!(merged.file().as_deref(), Some("app.css"));
    }

    #[test]
    fn region_offset_shifts_generated_lines() {
        let existing = identity_map("page.html", "<html>\n<style>\na{}\n</style>\n</html>\n", 5);
        let engine = identity_map("region.css", "a{}\n", 1);
        let merged = merge(
            &existing,
            &engine,
            Some(RegionOffset { line: 2, lines: 1 }),
            Some(Path::new("/dist/page.html")),
        )
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(merged.as_json()).unwrap();
        let mappings = value["mappings"].as_str().unwrap();
        assert!(
            mappings.starts_with(";;"),
            "expected two empty generated lines, got {mappings:?}"
        );
        assert!(merged.sources().iter().any(|s| s.contains("page.html")));
    }

    #[test]
    fn unparsable_map_is_a_parse_error() {
        let good = identity_map("app.css", "a{}\n", 1);
        let bad = MapPayload::from_json("not json at all");
        let err = merge(&bad, &good, None, None).unwrap_err();
        assert!(matches!(err, BridgeError::Parse(_)));
    }
}
