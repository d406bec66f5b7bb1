//! Semantic layer: catalogs, binding environments, and reference analysis.

pub mod analyze;
pub mod catalog;
pub mod env;

pub use analyze::{Analyzer, FileAnalysis};
pub use catalog::{CatalogEntry, TargetCatalog};
pub use env::{Bindings, Reference};
