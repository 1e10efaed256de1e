//! Integration tests for the configuration store
//!
//! These tests verify that the ConfigurationStore correctly:
//! - Hydrates records from a directory of .config files
//! - Maintains the dirty set across record mutations
//! - Persists every dirty record on save_all
//! - Emits store and container events to subscribers

use cadpack::config::{ConfigurationStore, StoreEvent};
use cadpack::collection::MapChange;
use cadpack::translators::TranslatorKind;
use camino::Utf8PathBuf;
use tokio::time::{Duration, timeout};

fn temp_store() -> (tempfile::TempDir, ConfigurationStore) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
    let mut store = ConfigurationStore::new();
    store.set_directory(path).expect("set directory");
    (dir, store)
}

#[test]
fn test_empty_directory_yields_empty_store() {
    let (_dir, store) = temp_store();
    assert!(store.records().is_empty());
    assert!(store.dirty_names().is_empty());
    assert!(!store.has_unsaved_changes());
}

#[test]
fn test_set_directory_creates_missing_directory() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let nested = Utf8PathBuf::from_path_buf(dir.path().join("a").join("b")).expect("utf-8 path");

    let mut store = ConfigurationStore::new();
    store.set_directory(nested.clone()).expect("set directory");
    assert!(nested.is_dir());
}

#[test]
fn test_saved_document_contains_header_parameters() {
    let (_dir, mut store) = temp_store();
    store.add_record("assembly").expect("add record");
    store.update_record("assembly", |r| {
        r.set_output_directory("/exports");
        r.set_input_directory("/cad");
    });
    store.save_all().expect("save all");

    let path = store.get("assembly").expect("record").file_path();
    let text = std::fs::read_to_string(path).expect("read config file");
    assert!(text.contains(r#"<parameter name="ConfigurationName" value="assembly"/>"#));
    assert!(text.contains(r#"<parameter name="TargetDirectory" value="/exports"/>"#));
    assert!(text.contains(r#"<parameter name="InitialCatalog" value="/cad"/>"#));
    assert!(text.contains(r#"<parameter name="InputExtension" value="*.grb"/>"#));
    assert!(text.contains(r#"<parameter name="Modules""#));
}

#[test]
fn test_full_lifecycle_survives_reload() {
    let (_dir, mut store) = temp_store();
    store.add_record("plates").expect("add plates");
    store.add_record("frames").expect("add frames");

    store.update_record("plates", |r| {
        r.activate(TranslatorKind::Step);
        r.with_active_translator_mut(|t| t.set_file_name_suffix("_step"))
    });
    store.update_record("frames", |r| r.set_processing_mode(1));
    assert_eq!(store.dirty_names().len(), 2);

    store.save_all().expect("save all");
    assert!(store.dirty_names().is_empty());
    assert!(!store.has_unsaved_changes());

    let directory = store.directory().to_owned();
    let mut reloaded = ConfigurationStore::new();
    reloaded.set_directory(directory).expect("reload");

    assert_eq!(reloaded.records().len(), 2);
    let plates = reloaded.get("plates").expect("plates record");
    assert_eq!(plates.active_kind(), TranslatorKind::Step);
    assert_eq!(plates.active_translator().file_name_suffix(), "_step");
    assert!(!plates.is_dirty());
    assert_eq!(reloaded.get("frames").expect("frames").processing_mode(), 1);
}

#[test]
fn test_save_all_has_no_validity_gate() {
    let (_dir, mut store) = temp_store();
    store.add_record("broken").expect("add record");

    // invalid suffix: record is dirty but evicted from the dirty set
    store.update_record("broken", |r| {
        r.with_active_translator_mut(|t| t.set_file_name_suffix("a<b"))
    });
    assert!(store.dirty_names().is_empty());
    assert!(store.get("broken").expect("record").is_dirty());

    // save_all still writes it
    assert_eq!(store.save_all().expect("save all"), 1);
    let path = store.get("broken").expect("record").file_path();
    let text = std::fs::read_to_string(path).expect("read config file");
    assert!(text.contains(r#"value="a&lt;b""#));
}

#[tokio::test]
async fn test_dirty_events_reach_subscriber() {
    let (_dir, mut store) = temp_store();
    store.add_record("assembly").expect("add record");
    let mut rx = store.subscribe();

    store.update_record("assembly", |r| r.set_output_directory("/out"));

    let event = timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed");
    assert_eq!(
        event,
        StoreEvent::DirtyChanged {
            name: "assembly".to_string(),
            dirty: true,
        }
    );

    store.save_all().expect("save all");
    let event = timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed");
    assert_eq!(
        event,
        StoreEvent::DirtyChanged {
            name: "assembly".to_string(),
            dirty: false,
        }
    );
}

#[tokio::test]
async fn test_container_insert_event_on_add_record() {
    let (_dir, mut store) = temp_store();
    let mut rx = store.records().subscribe_changes();
    let mut agg = store.records().subscribe_aggregate();

    store.add_record("assembly").expect("add record");

    let event = timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed");
    assert_eq!(
        event,
        MapChange::Insert {
            key: "assembly".to_string()
        }
    );

    let aggregate = timeout(Duration::from_millis(100), agg.recv())
        .await
        .expect("Timeout waiting for aggregate")
        .expect("Channel closed");
    assert_eq!(aggregate.count, 1);
}

#[test]
fn test_rename_then_reload_uses_new_name() {
    let (_dir, mut store) = temp_store();
    store.add_record("draft").expect("add record");
    store.rename_record("draft", "final").expect("rename");

    let directory = store.directory().to_owned();
    let mut reloaded = ConfigurationStore::new();
    reloaded.set_directory(directory).expect("reload");

    assert!(reloaded.get("draft").is_none());
    assert!(reloaded.get("final").is_some());
}
