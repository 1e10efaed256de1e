// Per-field change tracking and validation state for translator variants.
//
// Dirtiness is a map from field name to the value captured at the last
// successful load/save; a field is dirty while its current value differs
// from that baseline, so setting a field back to its original value leaves
// the variant clean. Validation errors are advisory per-field message lists;
// they block saving through `is_invalid`, never further edits.

use indexmap::{IndexMap, IndexSet};

/// Characters that may not appear in file name fields.
pub const FORBIDDEN_FILE_NAME_CHARS: [char; 9] =
    ['"', '<', '>', '|', '*', '?', ':', '\\', '/'];

/// Notification produced by a field setter. Setters return the events they
/// fired so callers can observe mutations without a subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldEvent {
    PropertyChanged(&'static str),
    ErrorsChanged(&'static str),
}

/// Validation message templates, supplied by the embedder's resource
/// provider. The `{chars}` placeholder is replaced with the forbidden
/// character list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationMessages {
    pub invalid_file_name_chars: String,
}

impl Default for ValidationMessages {
    fn default() -> Self {
        Self {
            invalid_file_name_chars:
                "the value must not contain any of the following characters: {chars}".to_string(),
        }
    }
}

impl ValidationMessages {
    pub fn forbidden_chars_error(&self) -> String {
        let chars: String = FORBIDDEN_FILE_NAME_CHARS.iter().collect();
        self.invalid_file_name_chars.replace("{chars}", &chars)
    }
}

/// Baseline, dirty-bit, and error state shared by every translator variant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldTracker {
    baseline: IndexMap<&'static str, String>,
    dirty: IndexSet<&'static str>,
    errors: IndexMap<&'static str, Vec<String>>,
}

impl FieldTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the given parameter table as the new baseline and mark every
    /// field clean. Called after construction and after each successful
    /// load/save.
    pub fn capture_baseline(&mut self, parameters: &[(&'static str, String)]) {
        self.baseline = parameters
            .iter()
            .map(|(name, value)| (*name, value.clone()))
            .collect();
        self.dirty.clear();
    }

    /// Recompute one field's dirty bit after a write. Fields unknown to the
    /// baseline (never captured) count as dirty when set.
    pub fn record_write(&mut self, name: &'static str, value: &str) {
        match self.baseline.get(name) {
            Some(base) if base == value => {
                self.dirty.shift_remove(name);
            }
            _ => {
                self.dirty.insert(name);
            }
        }
    }

    pub fn is_field_dirty(&self, name: &str) -> bool {
        self.dirty.contains(name)
    }

    /// Aggregate dirtiness: true while any field differs from its baseline.
    pub fn is_changed(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Add an error message for a field. Identical messages are never
    /// duplicated; returns true when the error set actually changed.
    pub fn add_error(&mut self, name: &'static str, message: String) -> bool {
        let messages = self.errors.entry(name).or_default();
        if messages.contains(&message) {
            return false;
        }
        messages.push(message);
        true
    }

    /// Remove an error message for a field, dropping the field entry when its
    /// last message goes. Returns true when the entry was dropped.
    pub fn remove_error(&mut self, name: &'static str, message: &str) -> bool {
        let Some(messages) = self.errors.get_mut(name) else {
            return false;
        };
        messages.retain(|m| m != message);
        if messages.is_empty() {
            self.errors.shift_remove(name);
            return true;
        }
        false
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors_for(&self, name: &str) -> &[String] {
        self.errors.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }
}

/// True when the value contains none of the forbidden file name characters.
pub fn is_valid_file_name(value: &str) -> bool {
    !value.contains(FORBIDDEN_FILE_NAME_CHARS)
}
