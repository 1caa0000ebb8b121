//! LedgerStore interface tests.
//!
//! These tests verify the contract of the LedgerStore and LedgerTransaction
//! traits. Each storage implementation should run these tests. Every test
//! uses its own `test_`-prefixed client group so runs against a shared
//! database do not interfere.

use futures::future::join_all;
use pushgate::storage::{LedgerStore, LedgerTransaction};

// =============================================================================
// last_mutation_id tests
// =============================================================================

pub async fn test_absent_record_reads_zero<S: LedgerStore>(store: &S) {
    let lmid = store
        .last_mutation_id("test_absent", "c1")
        .await
        .expect("read should succeed");
    assert_eq!(lmid, 0, "absent record should read as 0");
}

// =============================================================================
// fetch_and_increment tests
// =============================================================================

pub async fn test_increment_creates_record_at_one<S: LedgerStore>(store: &S) {
    let mut tx = store.begin().await.expect("begin should succeed");
    let next = tx
        .fetch_and_increment("test_create", "c1")
        .await
        .expect("increment should succeed");
    tx.commit().await.expect("commit should succeed");

    assert_eq!(next, 1, "first increment should return 1");
    assert_eq!(store.last_mutation_id("test_create", "c1").await.unwrap(), 1);
}

pub async fn test_increment_advances_by_one<S: LedgerStore>(store: &S) {
    for expected in 1..=3 {
        let mut tx = store.begin().await.unwrap();
        let next = tx.fetch_and_increment("test_advance", "c1").await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(next, expected, "each committed increment should add 1");
    }
    assert_eq!(store.last_mutation_id("test_advance", "c1").await.unwrap(), 3);
}

pub async fn test_increment_sees_own_writes<S: LedgerStore>(store: &S) {
    let mut tx = store.begin().await.unwrap();
    let first = tx.fetch_and_increment("test_own_writes", "c1").await.unwrap();
    let second = tx.fetch_and_increment("test_own_writes", "c1").await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!((first, second), (1, 2));
    assert_eq!(
        store.last_mutation_id("test_own_writes", "c1").await.unwrap(),
        2
    );
}

// =============================================================================
// Rollback tests
// =============================================================================

pub async fn test_rollback_discards_increment<S: LedgerStore>(store: &S) {
    let mut tx = store.begin().await.unwrap();
    tx.fetch_and_increment("test_rollback", "c1").await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let next = tx.fetch_and_increment("test_rollback", "c1").await.unwrap();
    assert_eq!(next, 2);
    tx.rollback().await.expect("rollback should succeed");

    assert_eq!(
        store.last_mutation_id("test_rollback", "c1").await.unwrap(),
        1,
        "rolled back increment should not persist"
    );
}

pub async fn test_drop_discards_increment<S: LedgerStore>(store: &S) {
    {
        let mut tx = store.begin().await.unwrap();
        tx.fetch_and_increment("test_drop", "c1").await.unwrap();
    }

    // A fresh transaction also proves the dropped one released its lock.
    let mut tx = store.begin().await.unwrap();
    let next = tx.fetch_and_increment("test_drop", "c1").await.unwrap();
    tx.commit().await.unwrap();
    assert_eq!(next, 1, "dropped transaction should not persist");
}

// =============================================================================
// Isolation tests
// =============================================================================

pub async fn test_client_isolation<S: LedgerStore>(store: &S) {
    let mut tx = store.begin().await.unwrap();
    tx.fetch_and_increment("test_client_iso", "c1").await.unwrap();
    tx.fetch_and_increment("test_client_iso", "c1").await.unwrap();
    tx.fetch_and_increment("test_client_iso", "c2").await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(store.last_mutation_id("test_client_iso", "c1").await.unwrap(), 2);
    assert_eq!(store.last_mutation_id("test_client_iso", "c2").await.unwrap(), 1);
}

pub async fn test_group_isolation<S: LedgerStore>(store: &S) {
    let mut tx = store.begin().await.unwrap();
    tx.fetch_and_increment("test_group_iso_a", "c1").await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(store.last_mutation_id("test_group_iso_a", "c1").await.unwrap(), 1);
    assert_eq!(
        store.last_mutation_id("test_group_iso_b", "c1").await.unwrap(),
        0,
        "same client in another group should be independent"
    );
}

// =============================================================================
// Concurrency tests
// =============================================================================

pub async fn test_concurrent_increments_are_distinct<S: LedgerStore>(store: &S) {
    let attempts = (0..8).map(|_| async move {
        let mut tx = store.begin().await.unwrap();
        let next = tx.fetch_and_increment("test_concurrent", "c1").await.unwrap();
        tx.commit().await.unwrap();
        next
    });

    let mut claimed = join_all(attempts).await;
    claimed.sort();

    assert_eq!(claimed, (1..=8).collect::<Vec<i64>>(), "no lost updates");
    assert_eq!(store.last_mutation_id("test_concurrent", "c1").await.unwrap(), 8);
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all LedgerStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_ledger_store_tests {
    ($store:expr) => {
        use $crate::storage::ledger_store_tests::*;

        // last_mutation_id tests
        test_absent_record_reads_zero($store).await;
        println!("  test_absent_record_reads_zero: PASSED");

        // fetch_and_increment tests
        test_increment_creates_record_at_one($store).await;
        println!("  test_increment_creates_record_at_one: PASSED");

        test_increment_advances_by_one($store).await;
        println!("  test_increment_advances_by_one: PASSED");

        test_increment_sees_own_writes($store).await;
        println!("  test_increment_sees_own_writes: PASSED");

        // rollback tests
        test_rollback_discards_increment($store).await;
        println!("  test_rollback_discards_increment: PASSED");

        test_drop_discards_increment($store).await;
        println!("  test_drop_discards_increment: PASSED");

        // isolation tests
        test_client_isolation($store).await;
        println!("  test_client_isolation: PASSED");

        test_group_isolation($store).await;
        println!("  test_group_isolation: PASSED");

        // concurrency tests
        test_concurrent_increments_are_distinct($store).await;
        println!("  test_concurrent_increments_are_distinct: PASSED");
    };
}
