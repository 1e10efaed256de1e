//! Directory-backed collection of configuration records.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexSet;
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::{ConfigurationRecord, Result};
use crate::collection::ObservableMap;
use crate::translators::ValidationMessages;

/// Store-level change notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    RecordAdded(String),
    RecordRemoved(String),
    RecordRenamed { old: String, new: String },
    DirtyChanged { name: String, dirty: bool },
}

/// All configurations found in one directory, keyed by file base name.
///
/// Mutations go through the store so it can maintain the dirty set: the
/// names of records that are currently dirty *and* valid. `update_record`
/// is the subscription point for record-level edits.
pub struct ConfigurationStore {
    directory: Utf8PathBuf,
    records: ObservableMap<String, ConfigurationRecord>,
    dirty_set: IndexSet<String>,
    messages: ValidationMessages,
    events_tx: broadcast::Sender<StoreEvent>,
}

impl ConfigurationStore {
    pub fn new() -> Self {
        Self::with_messages(ValidationMessages::default())
    }

    pub fn with_messages(messages: ValidationMessages) -> Self {
        let (events_tx, _) = broadcast::channel(100);
        Self {
            directory: Utf8PathBuf::new(),
            records: ObservableMap::new(),
            dirty_set: IndexSet::new(),
            messages,
            events_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events_tx.subscribe()
    }

    pub fn directory(&self) -> &Utf8Path {
        &self.directory
    }

    pub fn records(&self) -> &ObservableMap<String, ConfigurationRecord> {
        &self.records
    }

    pub fn get(&self, name: &str) -> Option<&ConfigurationRecord> {
        self.records.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    /// Names of records that are dirty and valid, in insertion order.
    pub fn dirty_names(&self) -> Vec<String> {
        self.dirty_set.iter().cloned().collect()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.records.values().any(ConfigurationRecord::is_dirty)
    }

    /// Point the store at a directory: drop everything loaded, create the
    /// directory if missing, then hydrate one record per `*.config` file.
    /// Files that fail to parse are skipped with a warning.
    pub fn set_directory(&mut self, path: impl Into<Utf8PathBuf>) -> Result<()> {
        self.directory = path.into();
        self.records.clear();
        self.dirty_set.clear();

        std::fs::create_dir_all(&self.directory)?;

        let mut names = Vec::new();
        for entry in self.directory.read_dir_utf8()? {
            let entry = entry?;
            let path = entry.path();
            if path.extension() == Some("config") {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();

        for name in names {
            let mut record = ConfigurationRecord::with_messages(
                name.clone(),
                self.directory.clone(),
                self.messages.clone(),
            );
            match record.load() {
                Ok(()) => {
                    // fresh container, the key cannot collide
                    let _ = self.records.add(name, record);
                }
                Err(e) => warn!("skipping configuration '{}': {}", name, e),
            }
        }

        info!(
            "loaded {} configuration(s) from {}",
            self.records.len(),
            self.directory
        );
        Ok(())
    }

    /// Create a fresh record and write its backing file immediately.
    pub fn add_record(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        let mut record = ConfigurationRecord::with_messages(
            name.clone(),
            self.directory.clone(),
            self.messages.clone(),
        );
        if self.records.contains_key(&name) {
            return Err(super::ConfigError::DuplicateKey(name));
        }
        record.save()?;
        self.records.add(name.clone(), record)?;
        self.send(StoreEvent::RecordAdded(name));
        Ok(())
    }

    /// Delete a record's backing file and drop it from the collection.
    /// Returns whether the record existed.
    pub fn remove_record(&mut self, name: &str) -> Result<bool> {
        let Some(record) = self.records.get_mut(name) else {
            return Ok(false);
        };
        record.delete()?;
        let key = name.to_string();
        self.records.remove(&key);
        self.dirty_set.shift_remove(name);
        self.send(StoreEvent::RecordRemoved(key));
        Ok(true)
    }

    /// Re-key a record and rename its backing file. A missing old name or an
    /// unchanged name is a no-op; an existing new name fails with
    /// `DuplicateKey`. The file moves before the container is re-keyed, so a
    /// filesystem failure leaves the in-memory state untouched.
    pub fn rename_record(&mut self, old: &str, new: impl Into<String>) -> Result<()> {
        let new_key = new.into();
        if !self.records.contains_key(old) || new_key == old {
            return Ok(());
        }
        if self.records.contains_key(new_key.as_str()) {
            return Err(super::ConfigError::DuplicateKey(new_key));
        }

        let old_path = self
            .records
            .get(old)
            .map(ConfigurationRecord::file_path)
            .expect("record checked present");
        if old_path.is_file() {
            let new_path = self.directory.join(format!("{new_key}.config"));
            std::fs::rename(&old_path, new_path)?;
        }

        let old_key = old.to_string();
        self.records.rename_key(&old_key, new_key.clone())?;
        if let Some(record) = self.records.get_mut(new_key.as_str()) {
            record.set_name(new_key.clone());
        }

        if self.dirty_set.shift_remove(old) {
            self.dirty_set.insert(new_key.clone());
        }
        self.send(StoreEvent::RecordRenamed {
            old: old_key,
            new: new_key,
        });
        Ok(())
    }

    /// Run a record-level mutation and refresh the dirty set from the
    /// record's resulting state. Returns `None` for an unknown name.
    pub fn update_record<R>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut ConfigurationRecord) -> R,
    ) -> Option<R> {
        let record = self.records.get_mut(name)?;
        let result = f(record);

        let eligible = record.is_dirty() && !record.is_invalid();
        let was_member = self.dirty_set.contains(name);
        if eligible != was_member {
            if eligible {
                self.dirty_set.insert(name.to_string());
            } else {
                self.dirty_set.shift_remove(name);
            }
            self.send(StoreEvent::DirtyChanged {
                name: name.to_string(),
                dirty: eligible,
            });
        }
        Some(result)
    }

    /// Save every dirty record, valid or not, then empty the dirty set.
    /// Returns the number of records written.
    pub fn save_all(&mut self) -> Result<usize> {
        let mut saved = 0;
        for (_, record) in self.records.iter_mut() {
            if record.is_dirty() {
                record.save()?;
                saved += 1;
            }
        }
        for name in std::mem::take(&mut self.dirty_set) {
            self.send(StoreEvent::DirtyChanged { name, dirty: false });
        }
        info!("saved {} configuration(s)", saved);
        Ok(saved)
    }

    fn send(&self, event: StoreEvent) {
        // Send errors only mean nobody is listening
        let _ = self.events_tx.send(event);
    }
}

impl Default for ConfigurationStore {
    fn default() -> Self {
        Self::new()
    }
}
