//! Data models for the configuration engine.
//!
//! This module contains the vocabulary shared across the crate:
//! - [`ModuleFlags`]: the input-module selector persisted in the header
//!   `Modules` parameter
//! - [`DocumentHandle`] / [`PageRef`]: opaque per-call descriptors handed to
//!   the export service
//! - [`ExportOptions`]: format-specific option structures built by the
//!   translator variants
//! - [`ExportService`]: the external Document Export Service seam

pub mod export;
pub mod module;

pub use export::{
    AcadFormat, AcadVersion, DocumentHandle, ExportOptions, ExportService, ImageFormat, JtVersion,
    PageRef, StepProtocol, PX_PER_MM,
};
pub use module::ModuleFlags;
