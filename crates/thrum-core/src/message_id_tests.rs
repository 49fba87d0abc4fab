// SPDX-License-Identifier: MIT

use super::MessageId;
use chrono::{DateTime, Utc};

#[test]
fn ids_are_26_characters() {
    let id = MessageId::generate(Utc::now());
    assert_eq!(id.as_str().len(), 26);
}

#[test]
fn later_timestamps_sort_after_earlier_ones() {
    let t0: DateTime<Utc> = DateTime::UNIX_EPOCH;
    let t1 = t0 + chrono::Duration::milliseconds(1);
    let a = MessageId::generate(t0);
    let b = MessageId::generate(t1);
    assert!(a < b, "{a} should sort before {b}");
}

#[test]
fn same_millisecond_ids_are_distinct() {
    let t = Utc::now();
    let a = MessageId::generate(t);
    let b = MessageId::generate(t);
    assert_ne!(a, b);
}
