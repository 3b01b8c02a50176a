//! Edit-time checks over the subgroup graph
//!
//! - `validate_unique_name`: sibling names are unique, case-insensitive
//! - `validate_acyclic`: saving a definition must not close a subgroup cycle
//! - `referencing_groups`: groups that would be affected by deleting a group
//!
//! Resolution detects cycles on its own; these checks let an editor reject a
//! bad definition before it is saved.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::definition::{GroupDefinition, GroupRef};
use crate::catalog::GroupLookup;
use crate::error::{Result, ValidationError};
use crate::types::GroupId;

/// Reject a name already used by another group (case-insensitive)
///
/// `own_id` is the id of the group being edited, so renaming a group to its
/// own name is allowed.
pub fn validate_unique_name<'a, I>(
    name: &str,
    siblings: I,
    own_id: Option<GroupId>,
) -> std::result::Result<(), ValidationError>
where
    I: IntoIterator<Item = &'a GroupDefinition>,
{
    let name = name.trim();
    let clash = siblings.into_iter().any(|sibling| {
        sibling.name().trim().eq_ignore_ascii_case(name)
            && (own_id.is_none() || sibling.id() != own_id)
    });

    if clash {
        Err(ValidationError::DuplicateName(name.to_string()))
    } else {
        Ok(())
    }
}

/// Stack frame of the depth-first walk
struct Frame {
    id: Option<GroupId>,
    name: String,
    children: Vec<GroupRef>,
    next: usize,
}

impl Frame {
    fn new(def: &GroupDefinition) -> Self {
        Self {
            id: def.id(),
            name: def.name().to_string(),
            children: def.subgroups().map(|(_, g)| g.clone()).collect(),
            next: 0,
        }
    }
}

/// Check that saving `def` would not create a subgroup cycle
///
/// The edited definition stands in for its stored version. Subgroups that no
/// longer exist are skipped.
pub fn validate_acyclic(def: &GroupDefinition, lookup: &dyn GroupLookup) -> Result<()> {
    let mut stack = vec![Frame::new(def)];
    let mut finished: HashSet<GroupId> = HashSet::new();

    while let Some(frame) = stack.last_mut() {
        let Some(child) = frame.children.get(frame.next).cloned() else {
            if let Some(id) = frame.id {
                finished.insert(id);
            }
            stack.pop();
            continue;
        };
        frame.next += 1;

        if finished.contains(&child.id) {
            continue;
        }

        if let Some(start) = stack.iter().position(|f| f.id == Some(child.id)) {
            let mut chain: Vec<String> = stack[start..].iter().map(|f| f.name.clone()).collect();
            chain.push(stack[start].name.clone());
            debug!(chain = %chain.join(" -> "), "Rejecting subgroup cycle");
            return Err(ValidationError::WouldCreateCycle { chain }.into());
        }

        if let Some(loaded) = lookup.group_by_id(child.id)? {
            stack.push(Frame::new(&loaded));
        }
    }

    Ok(())
}

/// Every group that reaches `target` through any subgroup set
///
/// Returned in the order the groups are given; `target` itself is never
/// included.
pub fn referencing_groups<'a, I>(target: GroupId, groups: I) -> Vec<GroupRef>
where
    I: IntoIterator<Item = &'a GroupDefinition>,
{
    let groups: Vec<&GroupDefinition> = groups.into_iter().collect();
    let by_id: HashMap<GroupId, &GroupDefinition> =
        groups.iter().filter_map(|g| g.id().map(|id| (id, *g))).collect();

    groups
        .iter()
        .filter(|g| g.id() != Some(target))
        .filter(|g| reaches(g, target, &by_id))
        .filter_map(|g| g.to_ref())
        .collect()
}

fn reaches(
    start: &GroupDefinition,
    target: GroupId,
    by_id: &HashMap<GroupId, &GroupDefinition>,
) -> bool {
    let mut seen: HashSet<GroupId> = HashSet::new();
    let mut pending: Vec<GroupId> = start.subgroups().map(|(_, g)| g.id).collect();

    while let Some(id) = pending.pop() {
        if id == target {
            return true;
        }
        if !seen.insert(id) {
            continue;
        }
        if let Some(def) = by_id.get(&id) {
            pending.extend(def.subgroups().map(|(_, g)| g.id));
        }
    }
    false
}
