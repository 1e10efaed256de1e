// cadpack - Configuration engine and batch export orchestrator for CAD
// document conversion.
//
// This is a library crate: the presentation layer (file selection, progress
// display, run control) is an external collaborator, as is the per-format
// document export service.

pub mod collection;
pub mod config;
pub mod logging;
pub mod models;
pub mod services;
pub mod translators;

// Re-export commonly used types for convenience
pub use collection::{MapAggregate, MapChange, ObservableMap};
pub use config::{ConfigError, ConfigurationRecord, ConfigurationStore, StoreEvent};
pub use models::{DocumentHandle, ExportOptions, ExportService, ModuleFlags, PageRef};
pub use services::{BatchItem, BatchRunner, RunOutcome, RunSignal};
pub use translators::{FieldEvent, Translator, TranslatorKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
