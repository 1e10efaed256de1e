//! Integration tests for the batch export orchestrator
//!
//! These tests verify that a run on its dedicated worker:
//! - Reports monotonically non-decreasing progress ending at exactly 100
//! - Emits Stopped exactly once when cancelled and skips remaining files
//! - Isolates export failures and records them in the run log
//! - Flushes the run log whether the run completed or was cancelled

use std::sync::{Arc, Mutex};

use cadpack::config::ConfigurationRecord;
use cadpack::models::{DocumentHandle, ExportOptions, ExportService, PageRef};
use cadpack::services::{BatchItem, BatchRunner, RunSignal};
use cadpack::translators::TranslatorKind;
use camino::{Utf8Path, Utf8PathBuf};
use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, timeout};

/// Records every call; optionally declines outputs ending with a suffix.
struct RecordingService {
    calls: Mutex<Vec<Utf8PathBuf>>,
    fail_suffix: Option<String>,
}

impl RecordingService {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_suffix: None,
        }
    }

    fn failing_on(suffix: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_suffix: Some(suffix.to_string()),
        }
    }
}

impl ExportService for RecordingService {
    fn export(
        &self,
        _document: &DocumentHandle,
        _page: &PageRef,
        output_path: &Utf8Path,
        _options: &ExportOptions,
    ) -> bool {
        self.calls.lock().unwrap().push(output_path.to_owned());
        match &self.fail_suffix {
            Some(suffix) => !output_path.as_str().ends_with(suffix),
            None => true,
        }
    }
}

/// Flips the cancellation flag from inside the first export call, so the
/// request lands while file one is still being processed.
struct CancellingService {
    cancel_tx: watch::Sender<bool>,
    calls: Mutex<usize>,
}

impl ExportService for CancellingService {
    fn export(
        &self,
        _document: &DocumentHandle,
        _page: &PageRef,
        _output_path: &Utf8Path,
        _options: &ExportOptions,
    ) -> bool {
        *self.calls.lock().unwrap() += 1;
        let _ = self.cancel_tx.send(true);
        true
    }
}

fn temp_record(kinds: &[TranslatorKind]) -> (tempfile::TempDir, ConfigurationRecord) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
    let mut record = ConfigurationRecord::new("run", path.clone());
    record.set_output_directory(path.join("out"));
    for kind in kinds {
        record.activate(*kind);
    }
    (dir, record)
}

fn drain(rx: &mut mpsc::Receiver<RunSignal>) -> Vec<RunSignal> {
    let mut out = Vec::new();
    while let Ok(signal) = rx.try_recv() {
        out.push(signal);
    }
    out
}

#[tokio::test]
async fn test_completed_run_ends_at_exactly_one_hundred() {
    let (_dir, record) = temp_record(&[TranslatorKind::Pdf]);
    let service = Arc::new(RecordingService::new());
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let (tx, mut rx) = mpsc::channel(256);

    // the record carries Document and Pdf variants: two slots per file
    let items = vec![
        BatchItem::new("a.grb", vec![true, true]),
        BatchItem::new("b.grb", vec![false, true]),
        BatchItem::new("c.grb", vec![true, false]),
    ];
    let outcome = timeout(
        Duration::from_secs(5),
        BatchRunner::new(record, service.clone()).run(items, cancel_rx, tx),
    )
    .await
    .expect("Timeout waiting for run")
    .expect("run failed");

    assert!(outcome.completed);
    assert_eq!(outcome.dispatched, 4);
    assert_eq!(outcome.failed, 0);
    assert_eq!(service.calls.lock().unwrap().len(), 4);

    let signals = drain(&mut rx);
    let percents: Vec<f64> = signals
        .iter()
        .filter_map(|s| match s {
            RunSignal::Progress { percent } => Some(*percent),
            _ => None,
        })
        .collect();
    // six slots plus the forced final value
    assert_eq!(percents.len(), 7);
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*percents.last().unwrap(), 100.0);
    assert!(matches!(signals.last(), Some(RunSignal::Completed { .. })));
}

#[tokio::test]
async fn test_cancel_after_first_file_stops_exactly_once() {
    let (_dir, record) = temp_record(&[]);
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let service = Arc::new(CancellingService {
        cancel_tx,
        calls: Mutex::new(0),
    });
    let (tx, mut rx) = mpsc::channel(256);

    let items = vec![
        BatchItem::new("a.grb", vec![true]),
        BatchItem::new("b.grb", vec![true]),
        BatchItem::new("c.grb", vec![true]),
    ];
    let outcome = timeout(
        Duration::from_secs(5),
        BatchRunner::new(record, service.clone()).run(items, cancel_rx, tx),
    )
    .await
    .expect("Timeout waiting for run")
    .expect("run failed");

    // file one was already entered; files two and three never were
    assert!(!outcome.completed);
    assert_eq!(outcome.dispatched, 1);
    assert_eq!(*service.calls.lock().unwrap(), 1);

    let signals = drain(&mut rx);
    let stops = signals
        .iter()
        .filter(|s| matches!(s, RunSignal::Stopped { .. }))
        .count();
    assert_eq!(stops, 1);
    assert!(
        !signals
            .iter()
            .any(|s| matches!(s, RunSignal::Completed { .. }))
    );

    // the log is flushed for a cancelled run too
    let log = std::fs::read_to_string(&outcome.log_path).expect("read run log");
    assert!(log.contains("Processing file: a.grb"));
    assert!(!log.contains("Processing file: b.grb"));
    assert!(log.contains("Processing time:"));
}

#[tokio::test]
async fn test_two_by_two_run_with_one_failure() {
    let (_dir, record) = temp_record(&[TranslatorKind::Pdf]);
    let service = Arc::new(RecordingService::failing_on("b.pdf"));
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let (tx, mut rx) = mpsc::channel(256);

    let items = vec![
        BatchItem::new("a.grb", vec![true, true]),
        BatchItem::new("b.grb", vec![true, true]),
    ];
    let outcome = timeout(
        Duration::from_secs(5),
        BatchRunner::new(record, service).run(items, cancel_rx, tx),
    )
    .await
    .expect("Timeout waiting for run")
    .expect("run failed");

    assert!(outcome.completed);
    assert_eq!(outcome.dispatched, 4);
    assert_eq!(outcome.failed, 1);
    assert!(matches!(
        drain(&mut rx).last(),
        Some(RunSignal::Completed { .. })
    ));

    let log = std::fs::read_to_string(&outcome.log_path).expect("read run log");
    assert_eq!(log.matches("Export succeeded").count(), 3);
    assert_eq!(log.matches("Export failed").count(), 1);
    assert!(log.contains("Processing time:"));
}

#[tokio::test]
async fn test_disabled_slots_advance_progress_without_dispatch() {
    let (_dir, record) = temp_record(&[]);
    let service = Arc::new(RecordingService::new());
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let (tx, mut rx) = mpsc::channel(256);

    let items = vec![
        BatchItem::new("a.grb", vec![false]),
        BatchItem::new("b.grb", vec![false]),
    ];
    let outcome = timeout(
        Duration::from_secs(5),
        BatchRunner::new(record, service.clone()).run(items, cancel_rx, tx),
    )
    .await
    .expect("Timeout waiting for run")
    .expect("run failed");

    assert!(outcome.completed);
    assert_eq!(outcome.dispatched, 0);
    assert!(service.calls.lock().unwrap().is_empty());

    let percents: Vec<f64> = drain(&mut rx)
        .iter()
        .filter_map(|s| match s {
            RunSignal::Progress { percent } => Some(*percent),
            _ => None,
        })
        .collect();
    assert_eq!(percents.len(), 3);
    assert_eq!(*percents.last().unwrap(), 100.0);
}
