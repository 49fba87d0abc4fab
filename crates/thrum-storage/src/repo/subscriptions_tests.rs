use super::*;
use chrono::Utc;

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

#[test]
fn insert_deduped_skips_equivalent_subscription() {
    let store = store();
    let sub = Subscription::new_all("client-1", Utc::now());
    let first = insert_deduped(&store, &sub).unwrap();

    let duplicate = Subscription::new_all("client-1", Utc::now());
    let second = insert_deduped(&store, &duplicate).unwrap();

    assert_eq!(first.subscription_id, second.subscription_id);
    assert_eq!(list_for_client(&store, "client-1").unwrap().len(), 1);
}

#[test]
fn insert_deduped_allows_distinct_modes_for_same_client() {
    let store = store();
    insert_deduped(&store, &Subscription::new_all("client-2", Utc::now())).unwrap();
    insert_deduped(&store, &Subscription::new_mention("client-2", "reviewer", Utc::now())).unwrap();

    assert_eq!(list_for_client(&store, "client-2").unwrap().len(), 2);
}

#[test]
fn remove_for_client_clears_everything_on_disconnect() {
    let store = store();
    insert_deduped(&store, &Subscription::new_all("client-3", Utc::now())).unwrap();
    insert_deduped(&store, &Subscription::new_mention("client-3", "impl", Utc::now())).unwrap();

    remove_for_client(&store, "client-3").unwrap();

    assert!(list_for_client(&store, "client-3").unwrap().is_empty());
}

#[test]
fn remove_deletes_a_single_subscription() {
    let store = store();
    let sub = insert_deduped(&store, &Subscription::new_all("client-4", Utc::now())).unwrap();
    remove(&store, &sub.subscription_id).unwrap();
    assert!(find_by_id(&store, &sub.subscription_id).unwrap().is_none());
}
