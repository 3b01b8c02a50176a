//! Core identifier types used throughout the crate
//!
//! # Key Types
//!
//! - **`TsKey`**: Stable identity of one time series in the catalog
//! - **`SiteId`** / **`DataTypeId`**: Surrogate keys for sites and datatypes
//! - **`GroupId`**: Surrogate key of a saved group definition
//! - **`TimeSeriesId`**: A TSID, i.e. a key plus its named parts
//!
//! # TSID Parts
//!
//! A TSID path has six dot-separated parts:
//!
//! ```text
//! Location . Param . ParamType . Interval . Duration . Version
//! ALPHA-1  . Stage . Inst      . 1Hour    . 0        . raw
//! ```
//!
//! Location, Param and Version are compound: the text before the first hyphen
//! is the *base*, the remainder the *sub* part. These are addressable as
//! `BaseLocation`, `SubLocation`, `BaseParam`, `SubParam`, `BaseVersion` and
//! `SubVersion`.
//!
//! # Example
//!
//! ```rust
//! use tsgroup::types::{DataTypeId, SiteId, TimeSeriesId, TsKey};
//!
//! let tsid = TimeSeriesId::parse_path(
//!     TsKey(1),
//!     SiteId(10),
//!     DataTypeId(20),
//!     "ALPHA-1.Stage-Rev.Inst.1Hour.0.raw",
//! )
//! .unwrap();
//!
//! assert_eq!(tsid.part("interval"), Some("1Hour"));
//! assert_eq!(tsid.part("BaseLocation"), Some("ALPHA"));
//! assert_eq!(tsid.part("SubParam"), Some("Rev"));
//! assert_eq!(tsid.part("SubVersion"), None);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Names of the six parts of a TSID path, in path order
pub const STANDARD_PARTS: [&str; 6] = [
    "Location",
    "Param",
    "ParamType",
    "Interval",
    "Duration",
    "Version",
];

/// Stable identity of a time series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TsKey(pub u64);

/// Surrogate key of a site (location)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteId(pub u64);

/// Surrogate key of a datatype (param)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataTypeId(pub u64);

/// Surrogate key of a saved group definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub u64);

macro_rules! display_inner {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

display_inner!(TsKey, SiteId, DataTypeId, GroupId);

/// Errors from parsing a TSID path
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TsIdError {
    /// Path does not have exactly six parts
    #[error("TSID '{path}' has {found} parts, expected {expected}")]
    WrongPartCount {
        /// The rejected path
        path: String,
        /// Number of parts required
        expected: usize,
        /// Number of parts found
        found: usize,
    },

    /// A part is empty
    #[error("TSID '{path}' has an empty {part} part")]
    EmptyPart {
        /// The rejected path
        path: String,
        /// Name of the empty part
        part: &'static str,
    },
}

/// Split a compound identifier at its first hyphen into (base, sub)
///
/// The sub part is empty when there is no hyphen.
pub fn split_base_sub(value: &str) -> (&str, &str) {
    match value.split_once('-') {
        Some((base, sub)) => (base, sub),
        None => (value, ""),
    }
}

/// Map a part name onto the canonical lower-case name used for lookups
///
/// `Site` is an alias of `Location`, `DataType` an alias of `Param`.
pub fn canonical_part_name(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    match lower.as_str() {
        "site" => "location".to_string(),
        "datatype" => "param".to_string(),
        _ => lower,
    }
}

/// A time series identifier with its named parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesId {
    key: TsKey,
    site: SiteId,
    datatype: DataTypeId,
    parts: Vec<(String, String)>,
}

impl TimeSeriesId {
    /// Create a TSID with no parts
    pub fn new(key: TsKey, site: SiteId, datatype: DataTypeId) -> Self {
        Self {
            key,
            site,
            datatype,
            parts: Vec::new(),
        }
    }

    /// Parse a dotted six-part path
    pub fn parse_path(
        key: TsKey,
        site: SiteId,
        datatype: DataTypeId,
        path: &str,
    ) -> Result<Self, TsIdError> {
        let values: Vec<&str> = path.trim().split('.').collect();
        if values.len() != STANDARD_PARTS.len() {
            return Err(TsIdError::WrongPartCount {
                path: path.to_string(),
                expected: STANDARD_PARTS.len(),
                found: values.len(),
            });
        }

        let mut tsid = Self::new(key, site, datatype);
        for (name, value) in STANDARD_PARTS.iter().zip(values) {
            if value.is_empty() {
                return Err(TsIdError::EmptyPart {
                    path: path.to_string(),
                    part: *name,
                });
            }
            tsid.parts.push(((*name).to_string(), value.to_string()));
        }
        Ok(tsid)
    }

    /// Set a part, replacing any existing part of the same name
    pub fn with_part(mut self, name: &str, value: &str) -> Self {
        match self.parts.iter().position(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some(idx) => self.parts[idx].1 = value.to_string(),
            None => self.parts.push((name.to_string(), value.to_string())),
        }
        self
    }

    /// Replace the key, site and datatype, keeping the parts
    pub fn with_ids(mut self, key: TsKey, site: SiteId, datatype: DataTypeId) -> Self {
        self.key = key;
        self.site = site;
        self.datatype = datatype;
        self
    }

    /// Stable identity key
    pub fn key(&self) -> TsKey {
        self.key
    }

    /// Site the series belongs to
    pub fn site(&self) -> SiteId {
        self.site
    }

    /// Datatype of the series
    pub fn datatype(&self) -> DataTypeId {
        self.datatype
    }

    /// Look up a part by name (case-insensitive)
    ///
    /// Answers the stored parts, the `Site`/`DataType` aliases and the derived
    /// base/sub parts of Location, Param and Version. A derived sub part is
    /// `None` when the compound value has no hyphen.
    pub fn part(&self, name: &str) -> Option<&str> {
        let canonical = canonical_part_name(name);
        if let Some(value) = self.stored_part(&canonical) {
            return Some(value);
        }

        let (compound, want_base) = if let Some(rest) = canonical.strip_prefix("base") {
            (rest, true)
        } else if let Some(rest) = canonical.strip_prefix("sub") {
            (rest, false)
        } else {
            return None;
        };

        if !matches!(compound, "location" | "param" | "version") {
            return None;
        }

        let (base, sub) = split_base_sub(self.stored_part(compound)?);
        if want_base {
            Some(base)
        } else if sub.is_empty() {
            None
        } else {
            Some(sub)
        }
    }

    /// Iterate stored parts in path order
    pub fn parts(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parts.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Dotted path built from the stored parts
    pub fn unique_string(&self) -> String {
        self.parts
            .iter()
            .map(|(_, v)| v.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    fn stored_part(&self, canonical: &str) -> Option<&str> {
        self.parts
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(canonical))
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for TimeSeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.unique_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TimeSeriesId {
        TimeSeriesId::parse_path(
            TsKey(1),
            SiteId(2),
            DataTypeId(3),
            "ALPHA-1-North.Flow.Ave.1Day.1Day.Combined-raw",
        )
        .unwrap()
    }

    #[test]
    fn test_parse_path_parts() {
        let tsid = sample();
        assert_eq!(tsid.part("Location"), Some("ALPHA-1-North"));
        assert_eq!(tsid.part("site"), Some("ALPHA-1-North"));
        assert_eq!(tsid.part("DATATYPE"), Some("Flow"));
        assert_eq!(tsid.part("ParamType"), Some("Ave"));
        assert_eq!(tsid.part("Duration"), Some("1Day"));
        assert_eq!(tsid.unique_string(), "ALPHA-1-North.Flow.Ave.1Day.1Day.Combined-raw");
    }

    #[test]
    fn test_derived_parts_split_at_first_hyphen() {
        let tsid = sample();
        assert_eq!(tsid.part("BaseLocation"), Some("ALPHA"));
        assert_eq!(tsid.part("SubLocation"), Some("1-North"));
        assert_eq!(tsid.part("baseparam"), Some("Flow"));
        assert_eq!(tsid.part("SubParam"), None);
        assert_eq!(tsid.part("BaseVersion"), Some("Combined"));
        assert_eq!(tsid.part("SubVersion"), Some("raw"));
        assert_eq!(tsid.part("SubInterval"), None);
        assert_eq!(tsid.part("Office"), None);
    }

    #[test]
    fn test_parse_path_rejects_bad_input() {
        let err = TimeSeriesId::parse_path(TsKey(1), SiteId(1), DataTypeId(1), "A.B.C")
            .unwrap_err();
        assert!(matches!(err, TsIdError::WrongPartCount { found: 3, .. }));

        let err = TimeSeriesId::parse_path(TsKey(1), SiteId(1), DataTypeId(1), "A..C.D.E.F")
            .unwrap_err();
        assert!(matches!(err, TsIdError::EmptyPart { part: "Param", .. }));
    }

    #[test]
    fn test_with_part_replaces_case_insensitive() {
        let tsid = TimeSeriesId::new(TsKey(5), SiteId(1), DataTypeId(1))
            .with_part("Interval", "1Hour")
            .with_part("interval", "15Minutes")
            .with_part("TableSelector", "R_");
        assert_eq!(tsid.part("INTERVAL"), Some("15Minutes"));
        assert_eq!(tsid.part("tableselector"), Some("R_"));
        assert_eq!(tsid.parts().count(), 2);
    }

    #[test]
    fn test_split_base_sub() {
        assert_eq!(split_base_sub("ALPHA-1"), ("ALPHA", "1"));
        assert_eq!(split_base_sub("ALPHA"), ("ALPHA", ""));
        assert_eq!(split_base_sub("A-B-C"), ("A", "B-C"));
    }
}
