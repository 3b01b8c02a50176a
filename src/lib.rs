//! tsgroup - Time series group definitions
//!
//! This library provides the group model used to organize large catalogs of
//! time series:
//! - Declarative group definitions with explicit members, site, datatype and
//!   part filters, and included / excluded / intersected subgroups
//! - Membership resolution with set algebra over bitmaps and cycle detection
//! - Base/sub decomposition of compound TSID parts for mask pickers
//! - Change detection between a saved and an edited definition

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

/// Catalog collaborators, indexed snapshots and in-memory stores
pub mod catalog;

/// Configuration management with TOML support
pub mod config;

/// Base/sub decomposition of compound parts and mask resolution
pub mod decompose;

/// Group definitions, editor-side validation and change detection
pub mod group;

/// Membership resolution of group definitions
pub mod resolver;

// Re-export main types
pub use decompose::{BaseSubPartSpec, CompoundPart};
pub use error::{Error, Result};
pub use group::{has_changed, GroupDefinition, GroupDefinitionBuilder, GroupRef, SubgroupOp};
pub use resolver::{MembershipResolver, ResolvedMembership};
pub use types::{TimeSeriesId, TsKey};
