// SPDX-License-Identifier: MIT

use super::*;
use crate::scope::Scope;

#[test]
fn dedup_key_distinguishes_modes() {
    let now = Utc::now();
    let all = Subscription::new_all("client-1", now);
    let mention = Subscription::new_mention("client-1", "reviewer", now);
    assert_ne!(all.dedup_key(), mention.dedup_key());
}

#[test]
fn dedup_key_matches_for_identical_scope_subscriptions() {
    let now = Utc::now();
    let a = Subscription::new_scope("client-1", Scope::new("group", "reviewers"), now);
    let b = Subscription::new_scope("client-1", Scope::new("group", "reviewers"), now);
    assert_eq!(a.dedup_key(), b.dedup_key());
}
