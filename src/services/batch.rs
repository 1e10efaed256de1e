//! Batch export orchestrator.
//!
//! One run walks an immutable snapshot: the selected files, a per-file
//! enabled bit per translator, and a cloned configuration record. The run
//! executes on a dedicated blocking worker; the owner observes it through a
//! typed signal channel and cancels it through a watch flag. Only one run at
//! a time is the caller's responsibility.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::config::ConfigurationRecord;
use crate::models::{DocumentHandle, ExportService, PageRef};
use crate::translators::Translator;

const LOG_FILE_NAME: &str = "cadpack.log";

/// One selected source file with its per-translator enabled bits. The bit
/// order matches the record's translator instantiation order; missing bits
/// count as disabled.
#[derive(Clone, Debug)]
pub struct BatchItem {
    pub path: Utf8PathBuf,
    pub enabled: Vec<bool>,
}

impl BatchItem {
    pub fn new(path: impl Into<Utf8PathBuf>, enabled: Vec<bool>) -> Self {
        Self {
            path: path.into(),
            enabled,
        }
    }
}

/// Worker-to-owner signal. Progress percentages are monotonically
/// non-decreasing; exactly one of `Stopped`/`Completed` terminates a run.
#[derive(Clone, Debug, PartialEq)]
pub enum RunSignal {
    Progress { percent: f64 },
    Stopped { log_path: Utf8PathBuf },
    Completed { log_path: Utf8PathBuf },
}

/// Final result of a run, returned to the awaiting owner.
#[derive(Clone, Debug, PartialEq)]
pub struct RunOutcome {
    /// False when the run was cancelled.
    pub completed: bool,
    /// Export calls actually dispatched (enabled slots reached).
    pub dispatched: usize,
    /// Dispatched calls that the export service declined.
    pub failed: usize,
    pub log_path: Utf8PathBuf,
}

/// In-memory run log, owned exclusively by the worker and flushed to the
/// output directory at the end of the run whether completed or cancelled.
struct RunLog {
    lines: Vec<String>,
}

impl RunLog {
    fn new() -> Self {
        Self { lines: Vec::new() }
    }

    fn line(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    fn flush(&self, directory: &Utf8Path) -> anyhow::Result<Utf8PathBuf> {
        if !directory.as_str().is_empty() {
            std::fs::create_dir_all(directory)
                .with_context(|| format!("create output directory {directory}"))?;
        }
        let path = directory.join(LOG_FILE_NAME);
        let mut text = self.lines.join("\n");
        text.push('\n');
        std::fs::write(&path, text).with_context(|| format!("write run log {path}"))?;
        Ok(path)
    }
}

/// Executes one batch export over a configuration snapshot.
pub struct BatchRunner {
    record: ConfigurationRecord,
    service: Arc<dyn ExportService>,
}

impl BatchRunner {
    pub fn new(record: ConfigurationRecord, service: Arc<dyn ExportService>) -> Self {
        Self { record, service }
    }

    /// Run on a dedicated blocking worker and await the outcome.
    pub async fn run(
        self,
        items: Vec<BatchItem>,
        cancel: watch::Receiver<bool>,
        signals: mpsc::Sender<RunSignal>,
    ) -> anyhow::Result<RunOutcome> {
        tokio::task::spawn_blocking(move || self.run_blocking(items, cancel, signals))
            .await
            .context("batch worker panicked")?
    }

    /// Synchronous run body. The cancellation flag is polled once per file,
    /// before the file is entered; a set flag emits `Stopped` exactly once
    /// and abandons the remaining progress increments.
    pub fn run_blocking(
        self,
        items: Vec<BatchItem>,
        cancel: watch::Receiver<bool>,
        signals: mpsc::Sender<RunSignal>,
    ) -> anyhow::Result<RunOutcome> {
        let started = Instant::now();
        let translators: Vec<Translator> = self.record.translators().cloned().collect();
        let slots_per_file = translators.len();
        let total_slots = items.len() * slots_per_file;
        let increment = if total_slots > 0 {
            100.0 / total_slots as f64
        } else {
            0.0
        };

        info!(
            "batch run started: {} file(s), {} translator(s)",
            items.len(),
            slots_per_file
        );

        let mut log = RunLog::new();
        let mut progress = 0.0_f64;
        let mut dispatched = 0;
        let mut failed = 0;
        let mut cancelled = false;

        for item in &items {
            if *cancel.borrow() {
                cancelled = true;
                break;
            }

            log.line(format!("Processing file: {}", item.path));
            let document = DocumentHandle::new(item.path.clone());
            let page = PageRef::for_document(&item.path);
            let stem = item.path.file_stem().unwrap_or("document");

            for (slot, translator) in translators.iter().enumerate() {
                let enabled = item.enabled.get(slot).copied().unwrap_or(false);
                if enabled {
                    log.line(format!("Translator:\t{}", translator.kind().label()));
                    let output_path = self
                        .record
                        .output_directory()
                        .join(translator.output_file_name(stem));
                    let ok = translator.export(&document, &page, &output_path, &*self.service);
                    dispatched += 1;
                    if ok {
                        log.line(format!("Export succeeded: {output_path}"));
                    } else {
                        // failures are isolated, the run proceeds
                        failed += 1;
                        log.line(format!("Export failed: {output_path}"));
                    }
                }
                // disabled slots still advance the bar
                progress += increment;
                let _ = signals.blocking_send(RunSignal::Progress { percent: progress });
            }
        }

        log.line(format!(
            "Processing time: {} ms",
            started.elapsed().as_millis()
        ));
        let log_path = log.flush(self.record.output_directory())?;

        if cancelled {
            warn!("batch run cancelled, log at {}", log_path);
            let _ = signals.blocking_send(RunSignal::Stopped {
                log_path: log_path.clone(),
            });
            return Ok(RunOutcome {
                completed: false,
                dispatched,
                failed,
                log_path,
            });
        }

        let _ = signals.blocking_send(RunSignal::Progress { percent: 100.0 });
        let _ = signals.blocking_send(RunSignal::Completed {
            log_path: log_path.clone(),
        });
        info!(
            "batch run completed: {} dispatched, {} failed, log at {}",
            dispatched, failed, log_path
        );
        Ok(RunOutcome {
            completed: true,
            dispatched,
            failed,
            log_path,
        })
    }
}
