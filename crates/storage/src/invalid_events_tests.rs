// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn row(n: usize) -> String {
    format!("{{\"EventID\":\"E{n}\",\"Timestamp\":{n}}}")
}

#[test]
fn rows_come_back_in_insertion_order() {
    let store = BoundedInvalidEventStore::new(10_000);
    store.insert_events(vec![row(1), row(2), row(3)]).unwrap();

    assert_eq!(store.row_count(), 3);
    let rows = store.retrieve_events(2);
    assert_eq!(rows.len(), 2);
    assert!(rows[0].1.contains("E1"));
    assert!(rows[1].1.contains("E2"));
    assert!(rows[0].0 < rows[1].0);
}

#[test]
fn delete_removes_only_named_rows() {
    let store = BoundedInvalidEventStore::new(10_000);
    store.insert_events(vec![row(1), row(2), row(3)]).unwrap();

    let ids: Vec<i64> = store.retrieve_events(2).into_iter().map(|(id, _)| id).collect();
    store.delete_events(&ids).unwrap();

    assert_eq!(store.row_count(), 1);
    assert!(store.retrieve_events(10)[0].1.contains("E3"));
}

#[test]
fn overflow_purges_oldest_first() {
    let payload = row(1);
    // Room for roughly three rows.
    let store = BoundedInvalidEventStore::new(payload.len() * 3);
    store.insert_events(vec![row(1), row(2), row(3), row(4)]).unwrap();

    let rows = store.retrieve_events(10);
    assert!(rows.iter().all(|(_, p)| !p.contains("E1")), "oldest row should be purged");
    assert!(rows.iter().any(|(_, p)| p.contains("E4")));
}
