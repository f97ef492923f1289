//! Ledger Store Tests
//!
//! Validates balance reads, transfer atomicity, lock ordering and the
//! seed-data loader.
//!
//! *Note: routing and replication across nodes are covered by the router
//! tests; everything here runs against a single in-process store.*

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use crate::ledger::amount::Amount;
use crate::ledger::seed;
use crate::ledger::store::LedgerStore;
use crate::ledger::types::{Account, AccountId, TransactionStatus};
use crate::protocol::types::ProtocolError;

fn account(id: AccountId, balance: &str) -> Account {
    Account {
        id,
        owner_id: id % 100,
        balance: balance.parse().expect("bad balance literal"),
        kind: "Savings".to_string(),
    }
}

fn demo_store() -> LedgerStore {
    let store = LedgerStore::new();
    store.insert_account(account(101, "1500.00"));
    store.insert_account(account(102, "3200.50"));
    store
}

// ============================================================
// BALANCE READS
// ============================================================

#[tokio::test]
async fn read_balance_returns_current_value() {
    let store = demo_store();

    let balance = store.read_balance(101).await.expect("read failed");
    assert_eq!(balance, Amount::from_units(1500));
}

#[tokio::test]
async fn read_balance_unknown_account_fails() {
    let store = demo_store();

    assert_eq!(
        store.read_balance(999).await,
        Err(ProtocolError::AccountNotFound(999))
    );
}

// ============================================================
// TRANSFERS
// ============================================================

#[tokio::test]
async fn transfer_moves_funds_and_records_transaction() {
    let store = demo_store();

    let new_balance = store
        .transfer(101, 102, "500.00".parse().expect("bad amount"), Some(42))
        .await
        .expect("transfer failed");

    assert_eq!(new_balance, Amount::from_units(1000));
    assert_eq!(
        store.read_balance(102).await.expect("read failed"),
        "3700.50".parse().expect("bad amount")
    );

    let record = store.transaction(42).expect("missing transaction record");
    assert_eq!(record.from_account, 101);
    assert_eq!(record.to_account, 102);
    assert_eq!(record.amount, Amount::from_units(500));
    assert_eq!(record.status, TransactionStatus::Confirmed);
}

#[tokio::test]
async fn transfer_with_insufficient_funds_changes_nothing() {
    let store = demo_store();

    let result = store
        .transfer(101, 102, Amount::from_units(2000), Some(1))
        .await;

    assert_eq!(result, Err(ProtocolError::InsufficientFunds(101)));
    assert_eq!(
        store.read_balance(101).await.expect("read failed"),
        Amount::from_units(1500)
    );
    assert_eq!(
        store.read_balance(102).await.expect("read failed"),
        "3200.50".parse().expect("bad amount")
    );
    assert!(store.transaction(1).is_none());
}

#[tokio::test]
async fn transfer_rejects_non_positive_amounts() {
    let store = demo_store();

    // A negative amount would inflate the source and drain the destination.
    for literal in ["-5000.00", "0.00"] {
        let result = store
            .transfer(101, 102, literal.parse().expect("bad amount"), Some(99))
            .await;
        assert_eq!(result, Err(ProtocolError::InvalidAmount), "amount {literal}");
    }

    assert_eq!(
        store.read_balance(101).await.expect("read failed"),
        Amount::from_units(1500)
    );
    assert_eq!(
        store.read_balance(102).await.expect("read failed"),
        "3200.50".parse().expect("bad amount")
    );
    assert!(store.transaction(99).is_none());
}

#[tokio::test]
async fn transfer_from_unknown_account_fails() {
    let store = demo_store();

    let result = store
        .transfer(999, 102, Amount::from_units(10), Some(1))
        .await;
    assert_eq!(result, Err(ProtocolError::AccountNotFound(999)));
}

#[tokio::test]
async fn transfer_to_missing_destination_debits_only() {
    let store = demo_store();

    let new_balance = store
        .transfer(101, 555, Amount::from_units(300), Some(7))
        .await
        .expect("transfer failed");

    assert_eq!(new_balance, Amount::from_units(1200));

    // The credit side is left to replica sync; the record still links both.
    let record = store.transaction(7).expect("missing transaction record");
    assert_eq!(record.to_account, 555);
}

#[tokio::test]
async fn self_transfer_leaves_balance_unchanged() {
    let store = demo_store();

    let new_balance = store
        .transfer(101, 101, Amount::from_units(100), Some(9))
        .await
        .expect("transfer failed");

    assert_eq!(new_balance, Amount::from_units(1500));
    assert!(store.transaction(9).is_some());
}

#[tokio::test]
async fn fallback_id_continues_after_max_existing() {
    let store = demo_store();

    store
        .transfer(101, 102, Amount::from_units(1), Some(7))
        .await
        .expect("transfer failed");
    store
        .transfer(101, 102, Amount::from_units(1), None)
        .await
        .expect("transfer failed");

    assert!(store.transaction(8).is_some(), "fallback id should be max + 1");
}

// ============================================================
// CONCURRENCY
// ============================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn opposing_transfers_do_not_deadlock() {
    let store = Arc::new(LedgerStore::new());
    store.insert_account(account(201, "10000.00"));
    store.insert_account(account(202, "10000.00"));

    let forward = {
        let store = store.clone();
        tokio::spawn(async move {
            for i in 0..200u64 {
                let _ = store
                    .transfer(201, 202, Amount::from_units(1), Some(1_000 + i))
                    .await;
            }
        })
    };
    let backward = {
        let store = store.clone();
        tokio::spawn(async move {
            for i in 0..200u64 {
                let _ = store
                    .transfer(202, 201, Amount::from_units(1), Some(2_000 + i))
                    .await;
            }
        })
    };

    tokio::time::timeout(Duration::from_secs(10), async {
        forward.await.expect("forward task panicked");
        backward.await.expect("backward task panicked");
    })
    .await
    .expect("opposing transfers deadlocked");

    let total = store.read_balance(201).await.expect("read failed")
        + store.read_balance(202).await.expect("read failed");
    assert_eq!(total, Amount::from_units(20_000), "funds must be conserved");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reads_never_observe_torn_balances() {
    let store = Arc::new(LedgerStore::new());
    store.insert_account(account(301, "500.00"));
    store.insert_account(account(302, "500.00"));

    let writer = {
        let store = store.clone();
        tokio::spawn(async move {
            for i in 0..300u64 {
                let (from, to) = if i % 2 == 0 { (301, 302) } else { (302, 301) };
                let _ = store
                    .transfer(from, to, Amount::from_units(5), Some(10_000 + i))
                    .await;
            }
        })
    };

    let reader = {
        let store = store.clone();
        tokio::spawn(async move {
            for _ in 0..300 {
                let balance = store.read_balance(301).await.expect("read failed");
                // Committed states are whole-unit balances; a fractional or
                // negative read would mean a half-applied transfer leaked.
                assert!(!balance.is_negative());
                assert!(balance.to_string().ends_with(".0000"));
            }
        })
    };

    writer.await.expect("writer panicked");
    reader.await.expect("reader panicked");
}

// ============================================================
// SEED LOADER
// ============================================================

#[tokio::test]
async fn load_parses_pipe_separated_tables() {
    let dir = tempfile::tempdir().expect("tempdir failed");

    let mut accounts =
        std::fs::File::create(dir.path().join(seed::ACCOUNTS_FILE)).expect("create failed");
    writeln!(accounts, "# ACCOUNT_ID | OWNER_ID | BALANCE | KIND").expect("write failed");
    writeln!(accounts, "101|1|1500.00|Savings").expect("write failed");
    writeln!(accounts).expect("write failed");
    writeln!(accounts, "102|2|3200.50|Checking").expect("write failed");
    writeln!(accounts, "broken line").expect("write failed");
    // Well-formed digits, unrepresentable magnitude: skipped, not fatal.
    writeln!(accounts, "103|3|922337203685478.00|Savings").expect("write failed");

    let mut transactions =
        std::fs::File::create(dir.path().join(seed::TRANSACTIONS_FILE)).expect("create failed");
    writeln!(transactions, "1|101|102|500.00|2025-05-02T14:30:00|Confirmed")
        .expect("write failed");
    writeln!(transactions, "2|102|101|200.00|2025-05-02T15:00:00|Pending")
        .expect("write failed");

    let store = seed::load(dir.path());

    assert_eq!(store.account_count(), 2, "malformed line must be skipped");
    assert_eq!(store.transaction_count(), 2);
    assert_eq!(
        store.read_balance(102).await.expect("read failed"),
        "3200.50".parse().expect("bad amount")
    );
    assert_eq!(
        store.transaction(2).expect("missing record").status,
        TransactionStatus::Pending
    );
}

#[tokio::test]
async fn load_falls_back_to_sample_dataset() {
    let dir = tempfile::tempdir().expect("tempdir failed");

    let store = seed::load(dir.path());

    assert!(store.holds_account(101));
    assert!(store.holds_account(110));
    assert_eq!(
        store.read_balance(101).await.expect("read failed"),
        Amount::from_units(1500)
    );
}

#[test]
fn write_sample_dataset_bootstraps_directory() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let data_dir = dir.path().join("node0");

    seed::write_sample_dataset(&data_dir).expect("bootstrap failed");

    assert!(data_dir.join(seed::ACCOUNTS_FILE).exists());
    assert!(data_dir.join(seed::TRANSACTIONS_FILE).exists());
    assert!(data_dir.join(seed::CUSTOMERS_FILE).exists());

    // Idempotent: a second run leaves existing files alone.
    seed::write_sample_dataset(&data_dir).expect("second bootstrap failed");
}
