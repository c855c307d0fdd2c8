#![forbid(unsafe_code)]

use crm_core::Collection;
use crm_store::CollectionStore;

#[test]
fn readers_keep_their_snapshot_across_replacements() {
    let mut store = CollectionStore::new(Collection::Users);
    store.replace(vec!["ana", "juan"]);
    let held = store.current();

    // Full replacement: nothing from the previous load survives.
    store.replace(vec!["luis"]);
    assert_eq!(held.items, vec!["ana", "juan"]);
    assert_eq!(held.epoch, 1);
    let now = store.current();
    assert_eq!(now.items, vec!["luis"]);
    assert_eq!(now.epoch, 2);
}

#[test]
fn replacing_with_empty_load_clears_collection() {
    let mut store = CollectionStore::new(Collection::Emails);
    store.replace(vec![1, 2]);
    store.replace(Vec::<i32>::new());
    assert!(store.current().is_empty());
    assert_eq!(store.epoch(), 2);
}

#[test]
fn epoch_travels_with_the_snapshot() {
    let mut store = CollectionStore::new(Collection::Users);
    for round in 1..=5u64 {
        let epoch = store.replace(vec![round; round as usize]);
        let snap = store.current();
        assert_eq!(epoch, round);
        assert_eq!(snap.epoch, round);
        assert_eq!(snap.len(), round as usize);
    }
}
