use super::*;
use crate::value::Value;

fn document(id: i32, payload: &[u8]) -> Document<()> {
    Document::new(vec![Value::Int(id)].into(), Some(payload.to_vec()), "Seed")
}

fn id(id: i32) -> Identifier {
    vec![Value::Int(id)].into()
}

#[test]
fn clean_registrations_produce_no_changes() {
    let mut set = ChangeSet::new();
    set.register("seeds", document(1, b"a"), EntityState::Clean);

    assert!(set.changes().is_empty());
    assert_eq!(set.len(), 1);
    assert_eq!(
        set.find_clean(&id(1)).and_then(Document::object),
        Some(&b"a"[..])
    );
}

#[test]
fn changes_follow_registration_order() {
    let mut set = ChangeSet::new();
    set.register("seeds", document(3, b"c"), EntityState::Deleted);
    set.register("seeds", document(1, b"a"), EntityState::New);
    set.register("seeds", document(2, b"b"), EntityState::Dirty);

    let states = set
        .changes()
        .into_iter()
        .map(|change| (change.id().clone(), change.state()))
        .collect::<Vec<_>>();

    assert_eq!(
        states,
        [
            (id(3), EntityState::Deleted),
            (id(1), EntityState::New),
            (id(2), EntityState::Dirty),
        ]
    );
}

#[test]
fn last_active_registration_wins() {
    let mut set = ChangeSet::new();
    set.register("seeds", document(1, b"first"), EntityState::New);
    set.register("seeds", document(1, b"second"), EntityState::Dirty);
    set.register("seeds", document(1, b"third"), EntityState::Deleted);
    set.register("seeds", document(1, b"fourth"), EntityState::Dirty);

    let changes = set.changes();

    assert_eq!(changes.len(), 1, "one actionable change per identifier");
    assert_eq!(changes[0].state(), EntityState::Dirty);
    assert_eq!(changes[0].document().object(), Some(&b"fourth"[..]));
}

#[test]
fn clean_snapshot_survives_later_active_registration() {
    let mut set = ChangeSet::new();
    set.register("seeds", document(1, b"before"), EntityState::Clean);
    set.register("seeds", document(1, b"after"), EntityState::Dirty);

    let entries = set.entries_for("seeds", &id(1)).expect("entries exist");

    assert_eq!(
        entries.clean().and_then(|c| c.document().object()),
        Some(&b"before"[..])
    );
    assert_eq!(
        entries.as_change().map(Change::state),
        Some(EntityState::Dirty)
    );
    assert_eq!(entries.iter().count(), 2);
}

#[test]
fn views_do_not_share_identifiers() {
    let mut set = ChangeSet::new();
    set.register("seeds", document(1, b"primary"), EntityState::New);
    set.register("seeds_by_name", document(1, b"view"), EntityState::New);
    set.register("seeds_by_name", document(1, b"clean"), EntityState::Clean);

    assert_eq!(set.changes().len(), 2);
    assert!(set.find_clean_in("seeds", &id(1)).is_none());
    assert!(set.find_clean_in("seeds_by_name", &id(1)).is_some());
    assert!(set.find_clean(&id(1)).is_some(), "search spans views");
}

#[test]
fn reset_empties_the_set() {
    let mut set = ChangeSet::new();
    set.register("seeds", document(1, b"a"), EntityState::New);
    set.register("seeds", document(2, b"b"), EntityState::Clean);

    set.reset();

    assert!(set.is_empty());
    assert!(set.changes().is_empty());
    assert!(set.find_clean(&id(2)).is_none());
}

#[test]
fn changes_mut_allows_stamping_in_order() {
    let mut set = ChangeSet::new();
    set.register("seeds", document(2, b"b"), EntityState::New);
    set.register("seeds", document(1, b"a"), EntityState::New);

    for change in set.changes_mut() {
        change.document_mut().metadata_mut().insert("seen".into(), "yes".into());
    }

    assert!(
        set.changes()
            .iter()
            .all(|change| change.document().metadata().contains_key("seen"))
    );
    assert_eq!(set.changes()[0].id(), &id(2));
}
