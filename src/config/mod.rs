//! Configuration persistence: typed records, the directory-backed store, and
//! the `.config` XML codec.

mod record;
mod store;
pub mod xml;

use camino::Utf8PathBuf;
use thiserror::Error;

pub use record::ConfigurationRecord;
pub use store::{ConfigurationStore, StoreEvent};

/// Library error taxonomy for configuration persistence.
///
/// Field-level validation failures are deliberately absent: they live in the
/// per-field error maps of the translator variants and never surface as
/// `Err`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration '{0}' already exists")]
    DuplicateKey(String),

    #[error("configuration file not found: {0}")]
    NotFound(Utf8PathBuf),

    #[error("malformed configuration document: {0}")]
    Malformed(String),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<crate::collection::DuplicateKey<String>> for ConfigError {
    fn from(err: crate::collection::DuplicateKey<String>) -> Self {
        Self::DuplicateKey(err.0)
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
