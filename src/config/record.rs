//! One named export configuration backed by a `.config` file.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use tracing::{debug, info};

use super::xml::{self, RawConfig};
use super::Result;
use crate::models::ModuleFlags;
use crate::translators::{FieldEvent, Translator, TranslatorKind, ValidationMessages};

const DEFAULT_INPUT_EXTENSION: &str = "*.grb";

/// A typed export configuration: header fields, the active translator kind,
/// and a cache of translator variants constructed at most once per kind.
///
/// The record is the single source of truth; the persisted XML document is
/// regenerated from these fields on every save.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigurationRecord {
    name: String,
    directory: Utf8PathBuf,
    input_directory: Utf8PathBuf,
    output_directory: Utf8PathBuf,
    input_extension: String,
    modules: ModuleFlags,
    active_kind: TranslatorKind,
    processing_mode: u32,
    translators: IndexMap<TranslatorKind, Translator>,
    messages: ValidationMessages,
    dirty: bool,
}

impl ConfigurationRecord {
    pub fn new(name: impl Into<String>, directory: impl Into<Utf8PathBuf>) -> Self {
        Self::with_messages(name, directory, ValidationMessages::default())
    }

    /// Construct with embedder-supplied validation message templates, used
    /// for every variant this record instantiates.
    pub fn with_messages(
        name: impl Into<String>,
        directory: impl Into<Utf8PathBuf>,
        messages: ValidationMessages,
    ) -> Self {
        let active_kind = TranslatorKind::Document;
        let mut translators = IndexMap::new();
        translators.insert(
            active_kind,
            Translator::with_messages(active_kind, messages.clone()),
        );
        Self {
            name: name.into(),
            directory: directory.into(),
            input_directory: Utf8PathBuf::new(),
            output_directory: Utf8PathBuf::new(),
            input_extension: DEFAULT_INPUT_EXTENSION.to_string(),
            modules: active_kind.module_flags(),
            active_kind,
            processing_mode: 0,
            translators,
            messages,
            dirty: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Path of the backing `.config` file.
    pub fn file_path(&self) -> Utf8PathBuf {
        self.directory.join(format!("{}.config", self.name))
    }

    pub fn input_directory(&self) -> &Utf8Path {
        &self.input_directory
    }

    pub fn output_directory(&self) -> &Utf8Path {
        &self.output_directory
    }

    pub fn input_extension(&self) -> &str {
        &self.input_extension
    }

    pub fn modules(&self) -> ModuleFlags {
        self.modules
    }

    pub fn active_kind(&self) -> TranslatorKind {
        self.active_kind
    }

    pub fn processing_mode(&self) -> u32 {
        self.processing_mode
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True while any instantiated variant carries validation errors.
    pub fn is_invalid(&self) -> bool {
        self.translators.values().any(Translator::has_errors)
    }

    pub fn set_input_directory(&mut self, path: impl Into<Utf8PathBuf>) {
        let path = path.into();
        if self.input_directory != path {
            self.input_directory = path;
            self.dirty = true;
        }
    }

    pub fn set_output_directory(&mut self, path: impl Into<Utf8PathBuf>) {
        let path = path.into();
        if self.output_directory != path {
            self.output_directory = path;
            self.dirty = true;
        }
    }

    pub fn set_input_extension(&mut self, extension: impl Into<String>) {
        let extension = extension.into();
        if self.input_extension != extension {
            self.input_extension = extension;
            self.dirty = true;
        }
    }

    pub fn set_processing_mode(&mut self, mode: u32) {
        if self.processing_mode != mode {
            self.processing_mode = mode;
            self.dirty = true;
        }
    }

    /// Switch the active translator kind. No-op when already active;
    /// otherwise reuses or constructs the variant, switches the module flags,
    /// and marks the record dirty. Returns whether a switch happened.
    pub fn activate(&mut self, kind: TranslatorKind) -> bool {
        if kind == self.active_kind {
            return false;
        }
        self.ensure_variant(kind);
        self.active_kind = kind;
        self.modules = kind.module_flags();
        self.dirty = true;
        debug!("configuration '{}' activated {}", self.name, kind.label());
        true
    }

    fn ensure_variant(&mut self, kind: TranslatorKind) {
        let messages = self.messages.clone();
        self.translators
            .entry(kind)
            .or_insert_with(|| Translator::with_messages(kind, messages));
    }

    pub fn translator(&self, kind: TranslatorKind) -> Option<&Translator> {
        self.translators.get(&kind)
    }

    /// Instantiated variants in instantiation order. The batch orchestrator
    /// pairs this order with per-file enabled bits.
    pub fn translators(&self) -> impl Iterator<Item = &Translator> {
        self.translators.values()
    }

    /// The active variant. Always cached; construction and activation insert
    /// it eagerly.
    pub fn active_translator(&self) -> &Translator {
        &self.translators[&self.active_kind]
    }

    /// Mutate the active variant through its typed setters. The record turns
    /// dirty iff the closure reports at least one `PropertyChanged`.
    pub fn with_active_translator_mut(
        &mut self,
        f: impl FnOnce(&mut Translator) -> Vec<FieldEvent>,
    ) -> Vec<FieldEvent> {
        let translator = self
            .translators
            .get_mut(&self.active_kind)
            .expect("active variant is always cached");
        let events = f(translator);
        if events
            .iter()
            .any(|e| matches!(e, FieldEvent::PropertyChanged(_)))
        {
            self.dirty = true;
        }
        events
    }

    /// Hydrate from the backing file. Hydration is not a user edit: the dirty
    /// flag is reset last, after baselines are captured.
    pub fn load(&mut self) -> Result<()> {
        let path = self.file_path();
        let raw = xml::read_config_file(&path)?;

        if let Some(value) = raw.header_value("InitialCatalog") {
            self.input_directory = Utf8PathBuf::from(value);
        }
        if let Some(value) = raw.header_value("TargetDirectory") {
            self.output_directory = Utf8PathBuf::from(value);
        }
        if let Some(value) = raw.header_value("InputExtension") {
            self.input_extension = value.to_string();
        }
        if let Some(value) = raw.header_value("Modules") {
            self.modules = ModuleFlags::decode(value);
        }

        self.active_kind =
            TranslatorKind::from_index(raw.translator_type).unwrap_or(TranslatorKind::Document);
        self.processing_mode = raw.translator_mode;
        self.ensure_variant(self.active_kind);
        let translator = self
            .translators
            .get_mut(&self.active_kind)
            .expect("variant just ensured");
        translator.hydrate(&raw.parameters);

        self.dirty = false;
        info!("loaded configuration '{}' from {}", self.name, path);
        Ok(())
    }

    /// Serialise the current fields and write the backing file, then
    /// re-capture the active variant's baseline and mark the record clean.
    /// Fresh records write a complete document from defaults.
    pub fn save(&mut self) -> Result<()> {
        let path = self.file_path();
        let raw = self.to_raw();
        xml::write_config_file(&path, &raw)?;

        let translator = self
            .translators
            .get_mut(&self.active_kind)
            .expect("active variant is always cached");
        translator.capture_baseline();
        self.dirty = false;
        info!("saved configuration '{}' to {}", self.name, path);
        Ok(())
    }

    /// Remove the backing file (if it exists) and reset the active kind and
    /// processing mode to their defaults.
    pub fn delete(&mut self) -> Result<()> {
        let path = self.file_path();
        if path.is_file() {
            std::fs::remove_file(&path)?;
            info!("deleted configuration file {}", path);
        }
        self.active_kind = TranslatorKind::Document;
        self.processing_mode = 0;
        self.modules = self.active_kind.module_flags();
        self.ensure_variant(self.active_kind);
        for translator in self.translators.values_mut() {
            translator.clear_errors();
        }
        self.dirty = false;
        Ok(())
    }

    fn to_raw(&self) -> RawConfig {
        let translator = self.active_translator();
        RawConfig {
            header: vec![
                ("ConfigurationName".to_string(), self.name.clone()),
                (
                    "InitialCatalog".to_string(),
                    self.input_directory.to_string(),
                ),
                (
                    "TargetDirectory".to_string(),
                    self.output_directory.to_string(),
                ),
                ("InputExtension".to_string(), self.input_extension.clone()),
                ("Modules".to_string(), self.modules.encode()),
            ],
            translator_type: self.active_kind.index(),
            translator_mode: self.processing_mode,
            parameters: translator
                .parameters()
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }
}
