/*
 * file.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * In-flight file objects and their source-map payloads.
 */

//! In-flight file objects.
//!
//! A [`FileRecord`] is the unit of work flowing through the stream adapter:
//! an optionally-named blob of content, an optional pre-existing source map
//! (the caller's map session), and, after processing, a side-channel
//! [`EngineReport`] describing what the engine did to it.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::engine::WarningLog;
use crate::resolve::EngineOptions;

/// File content in one of three delivery shapes.
///
/// Incremental content must be drained into a buffer before the pipeline can
/// extract or transform anything; transformation requires the whole document.
pub enum FileContents {
    /// No content at all (directory marker or placeholder). Skips the pipeline.
    Empty,
    /// Fully buffered bytes.
    Buffered(Vec<u8>),
    /// A lazily-drained byte stream.
    Incremental(Box<dyn AsyncRead + Send + Sync + Unpin>),
}

impl fmt::Debug for FileContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileContents::Empty => write!(f, "Empty"),
            FileContents::Buffered(bytes) => write!(f, "Buffered({} bytes)", bytes.len()),
            FileContents::Incremental(_) => write!(f, "Incremental(..)"),
        }
    }
}

/// An opaque source-map payload (standard JSON map: `version`, `sources`,
/// `mappings`, `file`, ...).
///
/// The payload is carried verbatim; only the bridge interprets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapPayload {
    json: String,
}

impl MapPayload {
    /// Wrap a JSON source-map string.
    pub fn from_json(json: impl Into<String>) -> Self {
        MapPayload { json: json.into() }
    }

    /// The raw JSON text.
    pub fn as_json(&self) -> &str {
        &self.json
    }

    /// The map's `file` field, if present.
    pub fn file(&self) -> Option<String> {
        self.field_str("file")
    }

    /// The map's `sources` entries.
    pub fn sources(&self) -> Vec<String> {
        serde_json::from_str::<serde_json::Value>(&self.json)
            .ok()
            .and_then(|v| {
                v.get("sources").map(|s| {
                    s.as_array()
                        .map(|a| {
                            a.iter()
                                .filter_map(|e| e.as_str().map(str::to_string))
                                .collect()
                        })
                        .unwrap_or_default()
                })
            })
            .unwrap_or_default()
    }

    fn field_str(&self, name: &str) -> Option<String> {
        serde_json::from_str::<serde_json::Value>(&self.json)
            .ok()
            .and_then(|v| v.get(name).and_then(|f| f.as_str().map(str::to_string)))
    }
}

/// Side-channel result annex attached to a successfully processed file.
#[derive(Debug, Clone)]
pub struct EngineReport {
    /// The final content written back into the file.
    pub content: String,
    /// The processing options the engine actually ran with.
    pub opts: EngineOptions,
    warnings: WarningLog,
}

impl EngineReport {
    pub(crate) fn new(content: String, opts: EngineOptions, warnings: WarningLog) -> Self {
        EngineReport {
            content,
            opts,
            warnings,
        }
    }

    /// Render the accumulated warnings to strings, in emission order.
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.render()
    }
}

/// A file object moving through the stream adapter.
///
/// Created upstream, mutated in place by the pipeline (content and source
/// map are replaced after transformation), and republished downstream.
#[derive(Debug)]
pub struct FileRecord {
    /// Absolute path identity. Anonymous files have none.
    pub path: Option<PathBuf>,
    /// Base directory used to make paths relative (output layout, logs).
    pub base: PathBuf,
    /// The content in its current delivery shape.
    pub contents: FileContents,
    /// Pre-existing source map, when the caller is in a map session.
    pub source_map: Option<MapPayload>,
    /// Result annex, attached after a successful run.
    pub report: Option<EngineReport>,
}

impl FileRecord {
    /// A file with fully buffered content.
    pub fn buffered(
        path: impl Into<PathBuf>,
        base: impl Into<PathBuf>,
        contents: impl Into<Vec<u8>>,
    ) -> Self {
        FileRecord {
            path: Some(path.into()),
            base: base.into(),
            contents: FileContents::Buffered(contents.into()),
            source_map: None,
            report: None,
        }
    }

    /// A file with no content at all.
    pub fn empty(path: impl Into<PathBuf>, base: impl Into<PathBuf>) -> Self {
        FileRecord {
            path: Some(path.into()),
            base: base.into(),
            contents: FileContents::Empty,
            source_map: None,
            report: None,
        }
    }

    /// An anonymous file: content with no path identity.
    pub fn anonymous(base: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        FileRecord {
            path: None,
            base: base.into(),
            contents: FileContents::Buffered(contents.into()),
            source_map: None,
            report: None,
        }
    }

    /// A file whose content arrives as an incremental byte stream.
    pub fn incremental(
        path: impl Into<PathBuf>,
        base: impl Into<PathBuf>,
        reader: Box<dyn AsyncRead + Send + Sync + Unpin>,
    ) -> Self {
        FileRecord {
            path: Some(path.into()),
            base: base.into(),
            contents: FileContents::Incremental(reader),
            source_map: None,
            report: None,
        }
    }

    /// Attach a pre-existing source map, entering a map session.
    pub fn with_source_map(mut self, map: MapPayload) -> Self {
        self.source_map = Some(map);
        self
    }

    /// True when the file carries no content at all.
    pub fn is_null(&self) -> bool {
        matches!(self.contents, FileContents::Empty)
    }

    /// True when the content has not been buffered yet.
    pub fn is_streamed(&self) -> bool {
        matches!(self.contents, FileContents::Incremental(_))
    }

    /// The directory configuration discovery starts from: the file's own
    /// directory, falling back to the base directory for anonymous files.
    pub fn dir(&self) -> &Path {
        self.path
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(&self.base)
    }

    /// The path relative to the base directory, when it applies.
    pub fn relative_path(&self) -> Option<&Path> {
        self.path.as_deref().and_then(|p| p.strip_prefix(&self.base).ok())
    }

    /// Buffered content bytes, if content has been buffered.
    pub fn buffered_bytes(&self) -> Option<&[u8]> {
        match &self.contents {
            FileContents::Buffered(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Buffered content decoded as UTF-8 (lossy).
    ///
    /// Returns `None` for empty files and for streams that have not been
    /// drained yet.
    pub fn contents_str(&self) -> Option<Cow<'_, str>> {
        self.buffered_bytes().map(String::from_utf8_lossy)
    }

    /// Replace the content with a buffered string.
    pub fn set_contents(&mut self, text: String) {
        self.contents = FileContents::Buffered(text.into_bytes());
    }

    /// Drain incremental content into a buffer. No-op for other shapes.
    pub async fn drain(&mut self) -> std::io::Result<()> {
        match std::mem::replace(&mut self.contents, FileContents::Empty) {
            FileContents::Incremental(mut reader) => {
                let mut buffer = Vec::new();
                reader.read_to_end(&mut buffer).await?;
                self.contents = FileContents::Buffered(buffer);
            }
            other => self.contents = other,
        }
        Ok(())
    }
}
