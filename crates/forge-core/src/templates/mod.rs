//! Template lookup, rendering and packaging
//!
//! This module provides:
//! - Template roots (directory, local archive, remote archive) with ordered lookup
//! - A renderer contract plus a placeholder renderer
//! - Template data with legacy key mapping
//! - Archive packaging for distributing templates

pub mod data;
pub mod pack;
pub mod render;
pub mod root;

pub use data::{migrate_legacy_keys, TemplateData, DEPRECATED_KEYS};
pub use pack::{build_archive, build_archives};
pub use render::{
    destination_for, PlaceholderRenderer, RenderOptions, TemplateEngine, TemplateRenderer,
};
pub use root::{TemplateLocation, TemplateRoot, TemplateStore};
