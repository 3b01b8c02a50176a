//! Base/Sub Decomposition of Compound Identifiers
//!
//! Location, Param and Version values are compound: `ALPHA-1` has base
//! `ALPHA` and sub `1`. Selection dialogs present the catalog as one row per
//! distinct (base, sub) pair with the number of series sharing it, and turn
//! a textual mask back into a row:
//!
//! | Mask      | Selects                          | Filter contributed   |
//! |-----------|----------------------------------|----------------------|
//! | `ALPHA-*` | first row whose base is `ALPHA`  | `BaseLocation=ALPHA` |
//! | `*-1`     | first row whose sub is `1`       | `SubLocation=1`      |
//! | `BETA-1`  | the row whose full value matches | `Location=BETA-1`    |
//!
//! Mask matching is case-insensitive and first-match in row order, never
//! all-match.
//!
//! # Example
//!
//! ```rust
//! use tsgroup::decompose::{decompose_values, resolve_mask, MaskSelection};
//!
//! let specs = decompose_values(["ALPHA-1", "ALPHA-2", "BETA-1", "ALPHA-1"]);
//! assert_eq!(specs.len(), 3);
//! assert_eq!(specs[0].count, 2);
//!
//! match resolve_mask("alpha-*", &specs) {
//!     Some(MaskSelection::BaseOnly(spec)) => assert_eq!(spec.base, "ALPHA"),
//!     other => panic!("unexpected selection: {:?}", other),
//! }
//! assert!(resolve_mask("GAMMA-*", &specs).is_none());
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{split_base_sub, TimeSeriesId};

/// One distinct (base, sub) pair and the number of series sharing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseSubPartSpec {
    /// Text before the first hyphen
    pub base: String,
    /// Text after the first hyphen, empty when there is none
    pub sub: String,
    /// Full compound value of the first series seen with this pair
    pub full: String,
    /// Number of series sharing this pair
    pub count: usize,
}

/// Which compound TSID part is decomposed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompoundPart {
    /// Location (site)
    Location,
    /// Param (datatype)
    Param,
    /// Version
    Version,
}

impl CompoundPart {
    /// Name of the full part
    pub fn part_name(&self) -> &'static str {
        match self {
            CompoundPart::Location => "Location",
            CompoundPart::Param => "Param",
            CompoundPart::Version => "Version",
        }
    }

    /// Name of the derived base part
    pub fn base_part_name(&self) -> &'static str {
        match self {
            CompoundPart::Location => "BaseLocation",
            CompoundPart::Param => "BaseParam",
            CompoundPart::Version => "BaseVersion",
        }
    }

    /// Name of the derived sub part
    pub fn sub_part_name(&self) -> &'static str {
        match self {
            CompoundPart::Location => "SubLocation",
            CompoundPart::Param => "SubParam",
            CompoundPart::Version => "SubVersion",
        }
    }
}

impl fmt::Display for CompoundPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.part_name())
    }
}

impl FromStr for CompoundPart {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "location" | "site" => Ok(CompoundPart::Location),
            "param" | "datatype" => Ok(CompoundPart::Param),
            "version" => Ok(CompoundPart::Version),
            other => Err(format!("'{}' is not a compound part", other)),
        }
    }
}

// ============================================================================
// Decomposition
// ============================================================================

/// Decompose one compound part of every TSID
///
/// Rows appear in first-occurrence order. A TSID without the part counts
/// towards the row with an empty base and sub.
pub fn decompose<'a, I>(catalog: I, part: CompoundPart) -> Vec<BaseSubPartSpec>
where
    I: IntoIterator<Item = &'a TimeSeriesId>,
{
    decompose_values(
        catalog
            .into_iter()
            .map(|tsid| tsid.part(part.part_name()).unwrap_or_default()),
    )
}

/// Decompose raw compound strings
///
/// Pairs are compared exactly; rows appear in first-occurrence order, so a
/// fixed input order always produces the same rows and counts.
pub fn decompose_values<I, S>(values: I) -> Vec<BaseSubPartSpec>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut specs: Vec<BaseSubPartSpec> = Vec::new();
    let mut rows: HashMap<(String, String), usize> = HashMap::new();

    for value in values {
        let full = value.as_ref();
        let (base, sub) = split_base_sub(full);
        let key = (base.to_string(), sub.to_string());

        match rows.get(&key) {
            Some(&row) => specs[row].count += 1,
            None => {
                rows.insert(key, specs.len());
                specs.push(BaseSubPartSpec {
                    base: base.to_string(),
                    sub: sub.to_string(),
                    full: full.to_string(),
                    count: 1,
                });
            },
        }
    }

    specs
}

// ============================================================================
// Sorting
// ============================================================================

/// Row orders offered by selection dialogs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Base, then sub
    Base,
    /// Sub with empty subs last, then base
    Sub,
    /// Count ascending, then base, then sub
    Count,
}

impl SortOrder {
    /// Compare two rows
    pub fn compare(&self, a: &BaseSubPartSpec, b: &BaseSubPartSpec) -> Ordering {
        match self {
            SortOrder::Base => a.base.cmp(&b.base).then_with(|| a.sub.cmp(&b.sub)),
            SortOrder::Sub => {
                // Rows without a sub part go last
                a.sub
                    .is_empty()
                    .cmp(&b.sub.is_empty())
                    .then_with(|| a.sub.cmp(&b.sub))
                    .then_with(|| a.base.cmp(&b.base))
            },
            SortOrder::Count => a
                .count
                .cmp(&b.count)
                .then_with(|| a.base.cmp(&b.base))
                .then_with(|| a.sub.cmp(&b.sub)),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base" => Ok(SortOrder::Base),
            "sub" => Ok(SortOrder::Sub),
            "count" => Ok(SortOrder::Count),
            other => Err(format!("'{}' is not a sort order", other)),
        }
    }
}

/// Sort rows in place
pub fn sort_specs(specs: &mut [BaseSubPartSpec], order: SortOrder) {
    specs.sort_by(|a, b| order.compare(a, b));
}

// ============================================================================
// Mask Resolution
// ============================================================================

/// A row selected by a textual mask
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaskSelection {
    /// The exact compound value
    Full(BaseSubPartSpec),
    /// Any value with this base
    BaseOnly(BaseSubPartSpec),
    /// Any value with this sub
    SubOnly(BaseSubPartSpec),
}

impl MaskSelection {
    /// The selected row
    pub fn spec(&self) -> &BaseSubPartSpec {
        match self {
            MaskSelection::Full(spec) | MaskSelection::BaseOnly(spec) | MaskSelection::SubOnly(spec) => {
                spec
            },
        }
    }

    /// The (part name, value) filter this selection contributes to a group
    pub fn to_filter(&self, part: CompoundPart) -> (String, String) {
        match self {
            MaskSelection::Full(spec) => (part.part_name().to_string(), spec.full.clone()),
            MaskSelection::BaseOnly(spec) => (part.base_part_name().to_string(), spec.base.clone()),
            MaskSelection::SubOnly(spec) => (part.sub_part_name().to_string(), spec.sub.clone()),
        }
    }

    /// Textual mask for this selection
    pub fn to_mask(&self) -> String {
        match self {
            MaskSelection::Full(spec) => spec.full.clone(),
            MaskSelection::BaseOnly(spec) => format!("{}-*", spec.base),
            MaskSelection::SubOnly(spec) => format!("*-{}", spec.sub),
        }
    }
}

/// Resolve a textual mask against decomposed rows
///
/// `*-<sub>` selects by sub, `<base>-*` by base, anything else by full
/// value. Matching is case-insensitive and the first matching row wins.
/// Returns `None` for a blank mask or when nothing matches.
pub fn resolve_mask(mask: &str, specs: &[BaseSubPartSpec]) -> Option<MaskSelection> {
    let mask = mask.trim();
    if mask.is_empty() {
        return None;
    }

    if let Some(sub) = mask.strip_prefix("*-") {
        specs
            .iter()
            .find(|s| s.sub.eq_ignore_ascii_case(sub))
            .map(|s| MaskSelection::SubOnly(s.clone()))
    } else if let Some(base) = mask.strip_suffix("-*") {
        specs
            .iter()
            .find(|s| s.base.eq_ignore_ascii_case(base))
            .map(|s| MaskSelection::BaseOnly(s.clone()))
    } else {
        specs
            .iter()
            .find(|s| s.full.eq_ignore_ascii_case(mask))
            .map(|s| MaskSelection::Full(s.clone()))
    }
}

/// Filters contributed by a set of selections, in selection order
pub fn selection_filters(selections: &[MaskSelection], part: CompoundPart) -> Vec<(String, String)> {
    selections.iter().map(|s| s.to_filter(part)).collect()
}
