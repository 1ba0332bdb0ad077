/*
 * process.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Process command implementation
 */

//! Process command implementation.
//!
//! This module implements the `cascara process` command: it collects
//! style and markup files from the given inputs, runs them through the
//! stream adapter in arrival order, and writes transformed outputs
//! (plus source-map sidecars when requested) under the output directory.
//!
//! Unit selection follows the same precedence as the library: an explicit
//! configuration file, then `--unit` flags, then per-directory discovery.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info};
use walkdir::WalkDir;

use cascara_core::{
    AdapterOptions, CallerOptions, CallerSetting, FileOutcome, FileRecord, MapOptions, MapPayload,
    MapSetting, StreamAdapter, TracingObserver, UnitChain, UnitRegistry, discover,
};

/// File extensions accepted as direct style inputs.
const STYLE_EXTENSIONS: &[&str] = &["css", "scss", "sass"];

/// File extensions treated as markup (style tags are extracted).
const MARKUP_EXTENSIONS: &[&str] = &["html", "htm", "xml", "svg", "vue"];

/// Arguments for the process command
#[derive(Debug)]
pub struct ProcessArgs {
    /// Input files or directories
    pub inputs: Vec<String>,
    /// Output directory
    pub out_dir: String,
    /// Explicit configuration file (skips discovery)
    pub config: Option<String>,
    /// Transformation units to run, in order (skips discovery)
    pub units: Vec<String>,
    /// Write source-map sidecars next to outputs
    pub map: bool,
    /// Number of files processed concurrently
    pub concurrency: usize,
}

/// Execute the process command
pub fn execute(args: ProcessArgs) -> Result<()> {
    // The adapter spawns one task per in-flight file, so it needs a real
    // tokio runtime rather than pollster::block_on.
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_process(args))
}

async fn run_process(args: ProcessArgs) -> Result<()> {
    let base = std::env::current_dir().context("Failed to get current directory")?;
    let registry = Arc::new(UnitRegistry::builtin());
    let setting = build_setting(&args, &registry)?;

    let records = collect_records(&args.inputs, &base)?;
    if records.is_empty() {
        anyhow::bail!("No style or markup inputs found");
    }
    info!(files = records.len(), "Processing");

    let adapter = StreamAdapter::new(
        AdapterOptions::new(base)
            .with_setting(setting)
            .with_registry(registry)
            .with_observer(Arc::new(TracingObserver))
            .with_concurrency(args.concurrency),
    )?;
    let (outcomes, summary) = adapter.process_all(records).await;

    write_outputs(&outcomes, Path::new(&args.out_dir))?;

    info!(emitted = summary.emitted, failed = summary.failed, "Done");
    if summary.failed > 0 {
        anyhow::bail!("{} file(s) failed to process", summary.failed);
    }
    Ok(())
}

/// Build the caller setting from CLI flags.
fn build_setting(args: &ProcessArgs, registry: &UnitRegistry) -> Result<CallerSetting> {
    if let Some(config) = &args.config {
        let loaded = discover::load_file(Path::new(config), registry)
            .with_context(|| format!("Failed to load configuration {config}"))?;
        debug!(config = %loaded.path.display(), "Using explicit configuration");
        return Ok(CallerSetting::Explicit {
            units: loaded.units,
            options: apply_map_flag(loaded.options, args.map),
        });
    }

    if !args.units.is_empty() {
        let mut chain = UnitChain::new();
        for name in &args.units {
            let unit = registry
                .build(name, &serde_yaml::Value::Null)
                .with_context(|| format!("Unknown transformation unit '{name}'"))?;
            chain.push(unit);
        }
        let options = apply_map_flag(CallerOptions::default(), args.map);
        return Ok(CallerSetting::with_options(chain, options));
    }

    Ok(CallerSetting::Discover)
}

/// `--map` asks for an external sidecar with an annotation pointing at it,
/// unless the configuration already chose a map setting.
fn apply_map_flag(mut options: CallerOptions, map: bool) -> CallerOptions {
    if map && options.map.is_none() {
        options.map = Some(MapSetting::Options(MapOptions {
            annotation: true,
            inline: false,
        }));
    }
    options
}

fn is_style_input(path: &Path) -> bool {
    let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let extension = extension.to_ascii_lowercase();
    STYLE_EXTENSIONS.contains(&extension.as_str()) || MARKUP_EXTENSIONS.contains(&extension.as_str())
}

/// Collect input records. Directories are walked in name order so runs
/// are deterministic; single files are taken as-is.
fn collect_records(inputs: &[String], cwd: &Path) -> Result<Vec<FileRecord>> {
    let mut sources: Vec<(PathBuf, PathBuf)> = Vec::new();
    for input in inputs {
        let path = cwd.join(input);
        if path.is_dir() {
            let root = fs::canonicalize(&path)
                .with_context(|| format!("Failed to resolve input directory {input}"))?;
            for entry in WalkDir::new(&root).sort_by_file_name() {
                let entry = entry?;
                if entry.file_type().is_file() && is_style_input(entry.path()) {
                    sources.push((entry.into_path(), root.clone()));
                }
            }
        } else if path.is_file() {
            let file = fs::canonicalize(&path)
                .with_context(|| format!("Failed to resolve input file {input}"))?;
            let parent = file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| cwd.to_path_buf());
            sources.push((file, parent));
        } else {
            anyhow::bail!("Input path does not exist: {}", path.display());
        }
    }

    let mut records = Vec::with_capacity(sources.len());
    for (path, base) in sources {
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read input file {}", path.display()))?;
        debug!(path = %path.display(), "Collected input");
        let record = match read_sidecar_map(&path) {
            Some(map) => FileRecord::buffered(&path, base, contents).with_source_map(map),
            None => FileRecord::buffered(&path, base, contents),
        };
        records.push(record);
    }
    Ok(records)
}

/// A sibling `<name>.map` file re-enters the pipeline as the file's
/// upstream source map.
fn read_sidecar_map(path: &Path) -> Option<MapPayload> {
    let name = path.file_name().and_then(|n| n.to_str())?;
    let sidecar = path.with_file_name(format!("{name}.map"));
    let json = fs::read_to_string(&sidecar).ok()?;
    debug!(sidecar = %sidecar.display(), "Attached upstream source map");
    Some(MapPayload::from_json(json))
}

fn write_outputs(outcomes: &[FileOutcome], out_dir: &Path) -> Result<()> {
    for outcome in outcomes {
        match outcome {
            FileOutcome::Emitted(record) => {
                if record.is_null() {
                    continue;
                }
                let destination = out_dir.join(output_name(record));
                if let Some(parent) = destination.parent() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create output directory {}", parent.display())
                    })?;
                }
                let bytes = record.buffered_bytes().unwrap_or_default();
                fs::write(&destination, bytes).with_context(|| {
                    format!("Failed to write output file {}", destination.display())
                })?;
                if let Some(map) = &record.source_map {
                    if let Some(sidecar) = sidecar_path(&destination) {
                        fs::write(&sidecar, map.as_json()).with_context(|| {
                            format!("Failed to write source map {}", sidecar.display())
                        })?;
                    }
                }
                info!(output = %destination.display(), "Wrote");
            }
            FileOutcome::Failed(failure) => {
                error!(path = ?failure.path, "{}", failure.error.render());
            }
        }
    }
    Ok(())
}

/// Output layout mirrors the record's base-relative path; records from
/// outside any base keep just their file name.
fn output_name(record: &FileRecord) -> PathBuf {
    if let Some(relative) = record.relative_path() {
        return relative.to_path_buf();
    }
    record
        .path
        .as_deref()
        .and_then(Path::file_name)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("output.css"))
}

fn sidecar_path(destination: &Path) -> Option<PathBuf> {
    let name = destination.file_name()?.to_str()?;
    Some(destination.with_file_name(format!("{name}.map")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args_with(units: Vec<String>, config: Option<String>, map: bool) -> ProcessArgs {
        ProcessArgs {
            inputs: vec![],
            out_dir: "dist".to_string(),
            config,
            units,
            map,
            concurrency: 1,
        }
    }

    #[test]
    fn test_is_style_input() {
        assert!(is_style_input(Path::new("app.css")));
        assert!(is_style_input(Path::new("app.SCSS")));
        assert!(is_style_input(Path::new("page.html")));
        assert!(is_style_input(Path::new("icon.svg")));
        assert!(!is_style_input(Path::new("readme.md")));
        assert!(!is_style_input(Path::new("Makefile")));
    }

    #[test]
    fn test_unit_flags_build_explicit_setting() {
        let registry = UnitRegistry::builtin();
        let args = args_with(vec!["minify".to_string(), "identity".to_string()], None, false);

        let setting = build_setting(&args, &registry).unwrap();
        let CallerSetting::Explicit { units, options } = setting else {
            panic!("expected explicit setting");
        };
        assert_eq!(units.names(), vec!["minify", "identity"]);
        assert!(options.map.is_none());
    }

    #[test]
    fn test_unknown_unit_flag_is_an_error() {
        let registry = UnitRegistry::builtin();
        let args = args_with(vec!["no-such-unit".to_string()], None, false);
        assert!(build_setting(&args, &registry).is_err());
    }

    #[test]
    fn test_map_flag_requests_annotated_sidecar() {
        let registry = UnitRegistry::builtin();
        let args = args_with(vec!["minify".to_string()], None, true);

        let setting = build_setting(&args, &registry).unwrap();
        let CallerSetting::Explicit { options, .. } = setting else {
            panic!("expected explicit setting");
        };
        assert_eq!(
            options.map,
            Some(MapSetting::Options(MapOptions {
                annotation: true,
                inline: false,
            }))
        );
    }

    #[test]
    fn test_config_file_builds_explicit_setting() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("cascara.yml");
        fs::write(&config, "plugins:\n  - minify\n").unwrap();

        let registry = UnitRegistry::builtin();
        let args = args_with(vec![], Some(config.display().to_string()), false);

        let setting = build_setting(&args, &registry).unwrap();
        let CallerSetting::Explicit { units, .. } = setting else {
            panic!("expected explicit setting");
        };
        assert_eq!(units.names(), vec!["minify"]);
    }

    #[test]
    fn test_no_flags_fall_back_to_discovery() {
        let registry = UnitRegistry::builtin();
        let args = args_with(vec![], None, false);
        let setting = build_setting(&args, &registry).unwrap();
        assert!(matches!(setting, CallerSetting::Discover));
    }

    #[test]
    fn test_sidecar_map_is_attached_when_present() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("app.css");
        fs::write(&input, "a { color: red }").unwrap();
        assert!(read_sidecar_map(&input).is_none());

        let sidecar = dir.path().join("app.css.map");
        fs::write(&sidecar, r#"{"version":3,"sources":[],"mappings":""}"#).unwrap();
        let map = read_sidecar_map(&input).unwrap();
        assert!(map.as_json().contains("\"version\":3"));
    }

    #[test]
    fn test_output_name_keeps_base_relative_layout() {
        let record = FileRecord::buffered("/proj/styles/deep/app.css", "/proj/styles", "a{}");
        assert_eq!(output_name(&record), PathBuf::from("deep/app.css"));

        let stray = FileRecord::buffered("/elsewhere/other.css", "/proj/styles", "a{}");
        assert_eq!(output_name(&stray), PathBuf::from("other.css"));
    }
}
