//! Alias resolution
//!
//! Splits a client's item-id aliases into the set that can be reconciled and
//! the values claimed by more than one SKU. Conflicts are only reported and
//! flagged; nothing here deletes or rewrites an alias.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use shared::models::{AliasConflict, AliasRef};

/// Aliases usable for a pass plus the conflicts that were set aside
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingSet {
    /// Non-conflicted aliases, in input order
    pub resolved: Vec<AliasRef>,
    pub conflicts: Vec<AliasConflict>,
}

impl WorkingSet {
    /// Distinct SKU ids in `resolved`, ascending
    pub fn sku_ids(&self) -> Vec<i64> {
        let ids: BTreeSet<i64> = self.resolved.iter().map(|a| a.sku_id).collect();
        ids.into_iter().collect()
    }

    pub fn conflicted_values(&self) -> Vec<String> {
        self.conflicts.iter().map(|c| c.alias_value.clone()).collect()
    }
}

/// Values owned by more than one distinct SKU, ordered by value
pub fn find_conflicts(aliases: &[AliasRef]) -> Vec<AliasConflict> {
    let mut by_value: BTreeMap<&str, BTreeSet<i64>> = BTreeMap::new();
    for alias in aliases {
        by_value.entry(alias.value.as_str()).or_default().insert(alias.sku_id);
    }

    by_value
        .into_iter()
        .filter(|(_, skus)| skus.len() > 1)
        .map(|(value, skus)| AliasConflict {
            alias_value: value.to_string(),
            sku_ids: skus.into_iter().collect(),
        })
        .collect()
}

pub fn partition(aliases: Vec<AliasRef>) -> WorkingSet {
    let conflicts = find_conflicts(&aliases);
    let conflicted: HashSet<&str> = conflicts.iter().map(|c| c.alias_value.as_str()).collect();
    let resolved = aliases
        .iter()
        .filter(|a| !conflicted.contains(a.value.as_str()))
        .cloned()
        .collect();
    WorkingSet { resolved, conflicts }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias(sku_id: i64, value: &str) -> AliasRef {
        AliasRef {
            sku_id,
            value: value.to_string(),
        }
    }

    #[test]
    fn unique_values_have_no_conflicts() {
        let aliases = vec![alias(1, "a"), alias(2, "b"), alias(3, "c")];
        assert!(find_conflicts(&aliases).is_empty());
    }

    #[test]
    fn shared_value_is_one_conflict() {
        let aliases = vec![alias(2, "item-9"), alias(1, "item-9"), alias(3, "item-4")];
        let conflicts = find_conflicts(&aliases);
        assert_eq!(
            conflicts,
            vec![AliasConflict {
                alias_value: "item-9".to_string(),
                sku_ids: vec![1, 2],
            }]
        );
    }

    #[test]
    fn same_sku_twice_is_not_a_conflict() {
        let aliases = vec![alias(1, "item-9"), alias(1, "item-9")];
        assert!(find_conflicts(&aliases).is_empty());
    }

    #[test]
    fn partition_excludes_every_conflicted_alias() {
        let set = partition(vec![alias(1, "x"), alias(2, "x"), alias(3, "y"), alias(2, "z")]);

        assert_eq!(set.resolved, vec![alias(3, "y"), alias(2, "z")]);
        assert_eq!(set.sku_ids(), vec![2, 3]);
        assert_eq!(set.conflicted_values(), vec!["x".to_string()]);
    }

    #[test]
    fn empty_input_is_empty_set() {
        let set = partition(Vec::new());
        assert_eq!(set, WorkingSet::default());
    }
}
