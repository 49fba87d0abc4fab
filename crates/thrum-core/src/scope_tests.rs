// SPDX-License-Identifier: MIT

use super::Scope;

#[test]
fn everyone_scope_is_group_everyone() {
    let scope = Scope::everyone();
    assert!(scope.is_group("@everyone"));
    assert!(!scope.is_group("reviewers"));
}

#[test]
fn scope_ordering_is_stable_for_btreeset() {
    use std::collections::BTreeSet;
    let mut set = BTreeSet::new();
    set.insert(Scope::new("group", "b"));
    set.insert(Scope::new("group", "a"));
    let values: Vec<_> = set.iter().map(|s| s.value.as_str()).collect();
    assert_eq!(values, vec!["a", "b"]);
}
