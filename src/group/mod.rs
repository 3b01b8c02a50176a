//! Time Series Group Definitions
//!
//! A group is a named, declarative description of a set of time series:
//!
//! ```text
//!   explicit members ─┐
//!   site filters     ─┤
//!   datatype filters ─┼──▶ base ──∪ included ──− excluded ──∩ intersected ──▶ members
//!   other filters    ─┘
//! ```
//!
//! Filter families are OR'd: each added filter widens the base set.
//!
//! # Components
//!
//! - `GroupDefinition`: the entity, mutated only through add/remove operations
//! - `GroupDefinitionBuilder`: validates editor input against the live catalog
//! - `ChangeDetector`: decides whether an edited definition needs saving
//! - `validate_unique_name` / `validate_acyclic` / `referencing_groups`:
//!   edit-time checks over sibling groups and the subgroup graph

pub mod builder;
pub mod change;
pub mod definition;
pub mod graph;

pub use builder::{BuildOutcome, GroupDefinitionBuilder};
pub use change::{has_changed, ChangeDetector, GroupChange};
pub use definition::{GroupDefinition, GroupRef, OtherFilter, SubgroupOp};
pub use graph::{referencing_groups, validate_acyclic, validate_unique_name};
