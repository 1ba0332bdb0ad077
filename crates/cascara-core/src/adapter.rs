/*
 * adapter.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The stream adapter: feeds files through the pipeline in arrival order.
 */

//! The caller-facing stream adapter.
//!
//! Files come in on a channel, run through the stage pipeline as
//! independent async tasks (up to a configured number in flight), and
//! leave on an output channel in arrival order. A failing file emits one
//! translated error outcome and never stops the stream.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::discover;
use crate::file::FileRecord;
use crate::registry::UnitRegistry;
use crate::resolve::{CallerSetting, OptionResolver};
use crate::stage::{FilePipeline, FileStage, FileTask, NoopObserver, PipelineObserver, RunContext};
use crate::translate::{self, TranslatedError};
use crate::Result;

/// Configuration for a [`StreamAdapter`].
pub struct AdapterOptions {
    base: PathBuf,
    setting: CallerSetting,
    registry: Arc<UnitRegistry>,
    observer: Arc<dyn PipelineObserver>,
    concurrency: usize,
    stages: Option<Vec<Box<dyn FileStage>>>,
    config_file: Option<PathBuf>,
}

impl AdapterOptions {
    /// Defaults: configuration discovery, the built-in unit registry, no
    /// observer, one file in flight at a time.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        AdapterOptions {
            base: base.into(),
            setting: CallerSetting::Discover,
            registry: Arc::new(UnitRegistry::builtin()),
            observer: Arc::new(NoopObserver),
            concurrency: 1,
            stages: None,
            config_file: None,
        }
    }

    pub fn with_setting(mut self, setting: CallerSetting) -> Self {
        self.setting = setting;
        self
    }

    pub fn with_registry(mut self, registry: Arc<UnitRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// How many files may be in flight at once. Emission stays in arrival
    /// order regardless.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Replace the standard stage sequence. The sequence is validated when
    /// the adapter is built.
    pub fn with_stages(mut self, stages: Vec<Box<dyn FileStage>>) -> Self {
        self.stages = Some(stages);
        self
    }

    /// Load units and options from this configuration file instead of
    /// discovering one per file. Overrides any setting supplied through
    /// [`with_setting`](AdapterOptions::with_setting).
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }
}

/// What the adapter emits for one input file.
#[derive(Debug)]
pub enum FileOutcome {
    /// The file, transformed (or re-emitted unchanged for null contents
    /// and region-free markup).
    Emitted(FileRecord),
    /// The file's single translated failure. No partial output exists.
    Failed(FileFailure),
}

#[derive(Debug)]
pub struct FileFailure {
    pub path: Option<PathBuf>,
    pub error: TranslatedError,
}

/// Counts for one adapter run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub emitted: u64,
    pub failed: u64,
}

impl RunSummary {
    fn count(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Emitted(_) => self.emitted += 1,
            FileOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Order-preserving async adapter around the per-file pipeline.
#[derive(Debug)]
pub struct StreamAdapter {
    pipeline: Arc<FilePipeline>,
    ctx: Arc<RunContext>,
    concurrency: usize,
}

impl StreamAdapter {
    pub fn new(options: AdapterOptions) -> Result<Self> {
        let AdapterOptions {
            base,
            setting,
            registry,
            observer,
            concurrency,
            stages,
            config_file,
        } = options;

        let setting = match config_file {
            Some(path) => {
                let loaded = discover::load_file(&path, &registry)?;
                CallerSetting::Explicit {
                    units: loaded.units,
                    options: loaded.options,
                }
            }
            None => setting,
        };
        let pipeline = match stages {
            Some(stages) => FilePipeline::new(stages)?,
            None => FilePipeline::standard(),
        };

        let resolver = OptionResolver::new(base.clone(), registry);
        let ctx = RunContext::new(base, resolver, Arc::new(setting)).with_observer(observer);
        Ok(StreamAdapter {
            pipeline: Arc::new(pipeline),
            ctx: Arc::new(ctx),
            concurrency,
        })
    }

    /// Process records from `input` until it closes, emitting outcomes on
    /// `output` in arrival order. Each file is tagged with a sequence
    /// number on receipt; finished files wait in a reorder buffer until
    /// every earlier file has been emitted.
    pub async fn run(
        &self,
        mut input: mpsc::Receiver<FileRecord>,
        output: mpsc::Sender<FileOutcome>,
    ) -> RunSummary {
        let mut tasks: JoinSet<(u64, FileOutcome)> = JoinSet::new();
        let mut pending: BTreeMap<u64, FileOutcome> = BTreeMap::new();
        let mut summary = RunSummary::default();
        let mut next_sequence: u64 = 0;
        let mut emit_sequence: u64 = 0;
        let mut input_open = true;

        loop {
            tokio::select! {
                record = input.recv(), if input_open && tasks.len() < self.concurrency => {
                    match record {
                        Some(record) => {
                            let sequence = next_sequence;
                            next_sequence += 1;
                            let pipeline = self.pipeline.clone();
                            let ctx = self.ctx.clone();
                            tasks.spawn(async move {
                                (sequence, process_file(&pipeline, &ctx, record, sequence).await)
                            });
                        }
                        None => input_open = false,
                    }
                }
                joined = tasks.join_next(), if !tasks.is_empty() => {
                    match joined {
                        Some(Ok((sequence, outcome))) => {
                            pending.insert(sequence, outcome);
                            while let Some(outcome) = pending.remove(&emit_sequence) {
                                summary.count(&outcome);
                                if output.send(outcome).await.is_err() {
                                    tracing::debug!("output channel closed; stopping early");
                                    return summary;
                                }
                                emit_sequence += 1;
                            }
                        }
                        Some(Err(join_error)) => {
                            // Leaves a hole in the sequence; drained below.
                            tracing::error!(error = %join_error, "file task panicked");
                        }
                        None => {}
                    }
                }
                else => break,
            }

            if !input_open && tasks.is_empty() && pending.is_empty() {
                break;
            }
        }

        // After a panicked task the reorder buffer may still hold later
        // sequences; emit them in order rather than dropping them.
        for (_, outcome) in std::mem::take(&mut pending) {
            summary.count(&outcome);
            if output.send(outcome).await.is_err() {
                break;
            }
        }
        summary
    }

    /// Feed a fixed set of records through [`run`](StreamAdapter::run) and
    /// collect every outcome.
    pub async fn process_all(&self, records: Vec<FileRecord>) -> (Vec<FileOutcome>, RunSummary) {
        let capacity = records.len().max(1);
        let (input_tx, input_rx) = mpsc::channel(capacity);
        let (output_tx, mut output_rx) = mpsc::channel(capacity);
        for record in records {
            // Capacity covers every record, so feeding cannot block.
            if input_tx.send(record).await.is_err() {
                break;
            }
        }
        drop(input_tx);

        let summary = self.run(input_rx, output_tx).await;
        let mut outcomes = Vec::new();
        while let Some(outcome) = output_rx.recv().await {
            outcomes.push(outcome);
        }
        (outcomes, summary)
    }
}

async fn process_file(
    pipeline: &FilePipeline,
    ctx: &RunContext,
    record: FileRecord,
    sequence: u64,
) -> FileOutcome {
    ctx.observer.on_file_start(sequence, record.path.as_deref());

    // Null contents skip the whole pipeline and re-emit unchanged.
    if record.is_null() {
        ctx.observer.on_file_emitted(sequence, record.path.as_deref());
        return FileOutcome::Emitted(record);
    }

    let path = record.path.clone();
    let task = FileTask::new(record, sequence);
    match pipeline.run(task, ctx).await {
        Ok(task) => {
            ctx.observer
                .on_file_emitted(sequence, task.record.path.as_deref());
            FileOutcome::Emitted(task.record)
        }
        Err(failure) => {
            let error = translate::translate(&failure, path.as_deref());
            ctx.observer.on_file_failed(sequence, path.as_deref(), &error);
            FileOutcome::Failed(FileFailure { path, error })
        }
    }
}
