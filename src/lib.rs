//! mediafix - repair dangling image relationships in unpacked OOXML
//! word-processing packages.
//!
//! A package whose images were deleted, renamed, or never relinked after an
//! external edit ends up with blip references pointing at relationship ids
//! that resolve to nothing. This crate reconciles the three data sources
//! involved (the document body's graphic references, the relationship
//! table, and the media folder) and repairs the package by importing
//! staged replacement images under freshly allocated identifiers.
//!
//! # Example
//!
//! ```no_run
//! use mediafix::engine::{Reconciler, RepairConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RepairConfig::new("data/working", "data/staging", "data/done");
//! let summary = Reconciler::new(config).run()?;
//! println!("{} repairs applied", summary.repairs);
//! # Ok(())
//! # }
//! ```
//!
//! # Layout expected on disk
//!
//! - `<root>/word/document.xml` - document body
//! - `<root>/word/_rels/document.xml.rels` - relationship table
//! - `<root>/word/media/` - media folder
//! - a staging directory of candidate replacement images
//! - a done directory receiving imported candidates

/// Identifier allocation: rId / media filename value types and cursors
pub mod alloc;

/// Graphic reference scanning and blip patching for the document body
pub mod document;

/// The reconciliation engine and its configuration
pub mod engine;

/// Error types
pub mod error;

/// Media folder inventory
pub mod media;

/// Namespace constants and the fixed prefix/URI map
pub mod ns;

/// Relationship table for the document part
pub mod rels;

/// Cross-source diagnostics
pub mod report;

// Re-export the types most callers need
pub use engine::{DEFAULT_PLACEHOLDER, Reconciler, RepairConfig, RunSummary};
pub use error::{FixError, Result};
pub use report::Report;
