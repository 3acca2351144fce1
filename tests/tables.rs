// tests/tables.rs

//! Multi-index table semantics: both tables must stay consistent across all
//! search directions as rows are added and erased.

use tagforge::tags::{ActionId, DependencyTable, ProvisionId, Tag, TagTable};

#[test]
fn tag_table_is_queryable_in_both_directions() {
    let mut table = TagTable::new();
    let p1 = ProvisionId(1);
    let p2 = ProvisionId(2);

    table.add(Tag::new("hdr:foo"), p1);
    table.add(Tag::new("hdr:foo"), p2);
    table.add(Tag::default_tag(), p1);

    assert_eq!(table.providers(&Tag::new("hdr:foo")), &[p1, p2]);
    assert_eq!(table.providers(&Tag::default_tag()), &[p1]);
    assert_eq!(table.tags_of(p1).len(), 2);
    assert_eq!(table.tags_of(p2), &[Tag::new("hdr:foo")]);
    assert_eq!(table.row_count(), 3);
}

#[test]
fn erasing_a_provision_restores_the_pre_register_state() {
    let mut table = TagTable::new();
    let p1 = ProvisionId(1);
    let p2 = ProvisionId(2);
    table.add(Tag::new("t"), p1);

    table.add(Tag::new("t"), p2);
    table.add(Tag::new("u"), p2);
    assert_eq!(table.erase_provision(p2), 2);

    assert_eq!(table.providers(&Tag::new("t")), &[p1]);
    assert!(table.providers(&Tag::new("u")).is_empty());
    assert!(table.tags_of(p2).is_empty());
    assert_eq!(table.row_count(), 1);

    // Erasing again is a no-op.
    assert_eq!(table.erase_provision(p2), 0);
}

#[test]
fn dependency_table_supports_three_search_directions() {
    let mut table = DependencyTable::new();
    let a = ActionId(1);
    let b = ActionId(2);
    let p = ProvisionId(7);

    table.add(Tag::new("t"), a, Some(p));
    table.add(Tag::new("t"), b, None);
    table.add(Tag::new("u"), a, None);

    assert_eq!(table.rows_for_tag(&Tag::new("t")).len(), 2);
    assert_eq!(table.rows_for_action(a).len(), 2);
    assert_eq!(table.rows_for_provision(p).len(), 1);
    assert_eq!(table.rows_for_provision(p)[0].action, a);
    assert!(table.has_action(b));
    assert_eq!(table.row_count(), 3);
}

#[test]
fn null_provider_rows_record_that_nothing_was_found() {
    let mut table = DependencyTable::new();
    let a = ActionId(1);
    table.add(Tag::new("t"), a, None);

    let rows = table.rows_for_tag(&Tag::new("t"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].provision, None);
    // A null provider belongs to no provision index.
    assert!(table.rows_for_provision(ProvisionId(0)).is_empty());
}

#[test]
fn erase_action_removes_rows_from_every_index() {
    let mut table = DependencyTable::new();
    let a = ActionId(1);
    let b = ActionId(2);
    let p = ProvisionId(7);

    table.add(Tag::new("t"), a, Some(p));
    table.add(Tag::new("t"), b, Some(p));

    assert_eq!(table.erase_action(a), 1);
    assert_eq!(table.rows_for_tag(&Tag::new("t")).len(), 1);
    assert_eq!(table.rows_for_provision(p).len(), 1);
    assert!(!table.has_action(a));
    assert_eq!(table.erase_action(a), 0);
}

#[test]
fn erase_provision_removes_rows_from_every_index() {
    let mut table = DependencyTable::new();
    let a = ActionId(1);
    let p = ProvisionId(7);

    table.add(Tag::new("t"), a, Some(p));
    table.add(Tag::new("u"), a, None);

    assert_eq!(table.erase_provision(p), 1);
    assert!(table.rows_for_tag(&Tag::new("t")).is_empty());
    assert_eq!(table.rows_for_action(a).len(), 1);
    assert_eq!(table.row_count(), 1);
}
