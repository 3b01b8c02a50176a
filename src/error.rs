//! Error types for group definitions and membership resolution

use std::fmt;

use thiserror::Error;

use crate::group::{GroupRef, SubgroupOp};
use crate::types::{DataTypeId, SiteId, TsKey};

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// A mutation or build step was rejected
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The subgroup graph revisited a group that was still being resolved
    #[error("Cycle error: {0}")]
    Cycle(#[from] CycleError),

    /// The catalog or group lookup collaborator failed
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Validation errors
///
/// Raised synchronously at the point of an invalid mutation. The definition
/// is left unmodified for that one operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Group name is empty after trimming
    #[error("Group name must not be empty")]
    EmptyName,

    /// Group type is empty
    #[error("Group type must not be empty")]
    EmptyType,

    /// Subgroup is the group itself, or already present in the same set
    #[error("Group '{group}' cannot be added as {op} subgroup: self reference or already present")]
    DuplicateOrSelfReference {
        /// Name of the rejected subgroup
        group: String,
        /// The set it was being added to
        op: SubgroupOp,
    },

    /// Another sibling group already uses this name (case-insensitive)
    #[error("A group named '{0}' already exists")]
    DuplicateName(String),

    /// Saving the definition would close a cycle in the subgroup graph
    #[error("Subgroup cycle: {}", chain.join(" -> "))]
    WouldCreateCycle {
        /// Group names along the cycle, first and last are the same group
        chain: Vec<String>,
    },
}

/// Fatal resolution error carrying the offending group chain
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("group cycle detected: {}", chain.join(" -> "))]
pub struct CycleError {
    /// Group names along the cycle, first and last are the same group
    pub chain: Vec<String>,
}

/// A filter value, member or subgroup that could not be found
///
/// Not an error: the value is left out of the result and reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LookupMiss {
    /// No site has this name
    SiteName(String),
    /// No datatype has this code
    DataTypeCode(String),
    /// Site filter matches no series in the catalog
    Site(SiteId),
    /// Datatype filter matches no series in the catalog
    DataType(DataTypeId),
    /// Explicit member key is not in the catalog
    ExplicitMember(TsKey),
    /// Referenced subgroup does not exist
    Subgroup(GroupRef),
    /// No TSID has this value for the named part
    PartValue {
        /// TSID part name
        part: String,
        /// The unmatched value
        value: String,
    },
    /// Wildcard part filter could not be compiled
    InvalidPattern {
        /// TSID part name
        part: String,
        /// The rejected value
        value: String,
    },
}

impl fmt::Display for LookupMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupMiss::SiteName(name) => write!(f, "no match for site name '{}'", name),
            LookupMiss::DataTypeCode(code) => write!(f, "no match for datatype '{}'", code),
            LookupMiss::Site(id) => write!(f, "no series at site {}", id),
            LookupMiss::DataType(id) => write!(f, "no series with datatype {}", id),
            LookupMiss::ExplicitMember(key) => write!(f, "time series {} not in catalog", key),
            LookupMiss::Subgroup(group) => {
                write!(f, "subgroup '{}' ({}) not found", group.name, group.id)
            },
            LookupMiss::PartValue { part, value } => {
                write!(f, "no match for {} '{}'", part, value)
            },
            LookupMiss::InvalidPattern { part, value } => {
                write!(f, "invalid {} pattern '{}'", part, value)
            },
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GroupId;

    #[test]
    fn test_cycle_error_message_lists_chain() {
        let err = CycleError {
            chain: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(err.to_string(), "group cycle detected: A -> B -> A");

        let wrapped: Error = err.into();
        assert!(matches!(wrapped, Error::Cycle(_)));
    }

    #[test]
    fn test_validation_message_names_group() {
        let err = ValidationError::DuplicateOrSelfReference {
            group: "Dams".into(),
            op: SubgroupOp::Exclude,
        };
        let msg = err.to_string();
        assert!(msg.contains("Dams"));
        assert!(msg.contains("Subtract"));
    }

    #[test]
    fn test_lookup_miss_display() {
        let miss = LookupMiss::Subgroup(GroupRef::new(GroupId(7), "Upstream"));
        assert_eq!(miss.to_string(), "subgroup 'Upstream' (7) not found");
        assert_eq!(
            LookupMiss::ExplicitMember(TsKey(42)).to_string(),
            "time series 42 not in catalog"
        );
        assert_eq!(LookupMiss::Site(SiteId(3)).to_string(), "no series at site 3");
    }
}
