//! Seed-data loading for worker nodes.
//!
//! A node's data directory holds three newline-delimited, pipe-separated
//! tables: `accounts.txt`, `transactions.txt` and `customers.txt`. Lines that
//! are blank or start with `#` are ignored. The customer table exists for
//! completeness but is not read by the transaction core.
//!
//! A missing or unreadable table does not abort startup: the node logs a
//! warning and falls back to a small built-in sample dataset, which
//! [`write_sample_dataset`] can also materialize on disk to bootstrap an
//! empty data directory.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use super::store::LedgerStore;
use super::types::{Account, Transaction};

pub const ACCOUNTS_FILE: &str = "accounts.txt";
pub const TRANSACTIONS_FILE: &str = "transactions.txt";
pub const CUSTOMERS_FILE: &str = "customers.txt";

const SAMPLE_ACCOUNTS: &str = "\
# ACCOUNT_ID | OWNER_ID | BALANCE | KIND
101|1|1500.00|Savings
102|2|3200.50|Checking
103|3|2750.75|Savings
104|4|5000.00|Savings
105|5|12500.25|Checking
106|1|800.00|Checking
107|2|1200.50|Savings
108|3|3500.00|Checking
109|4|750.30|Savings
110|5|9200.00|Savings
";

const SAMPLE_TRANSACTIONS: &str = "\
# TX_ID | FROM_ACCOUNT | TO_ACCOUNT | AMOUNT | TIMESTAMP | STATUS
1|101|102|500.00|2025-05-02T14:30:00|Confirmed
2|102|101|200.00|2025-05-02T15:00:00|Confirmed
3|103|105|300.50|2025-05-03T09:15:00|Confirmed
4|104|106|150.25|2025-05-03T12:30:00|Confirmed
5|107|108|1000.00|2025-05-04T08:45:00|Confirmed
";

const SAMPLE_CUSTOMERS: &str = "\
# CUSTOMER_ID | NAME | EMAIL | PHONE
1|Juan Perez|juan@email.com|987654321
2|Maria Lopez|maria@email.com|998877665
3|Carlos Ruiz|carlos@email.com|955544333
4|Ana Torres|ana@email.com|911122334
5|Luis Mendez|luis@email.com|966677889
";

/// Builds a [`LedgerStore`] from the tables in `data_dir`.
pub fn load(data_dir: &Path) -> LedgerStore {
    let store = LedgerStore::new();

    match fs::read_to_string(data_dir.join(ACCOUNTS_FILE)) {
        Ok(contents) => load_accounts(&store, &contents),
        Err(e) => {
            tracing::warn!(
                "failed to read {} in {}: {}; using sample accounts",
                ACCOUNTS_FILE,
                data_dir.display(),
                e
            );
            load_accounts(&store, SAMPLE_ACCOUNTS);
        }
    }

    match fs::read_to_string(data_dir.join(TRANSACTIONS_FILE)) {
        Ok(contents) => load_transactions(&store, &contents),
        Err(e) => {
            tracing::warn!(
                "failed to read {} in {}: {}; using sample transactions",
                TRANSACTIONS_FILE,
                data_dir.display(),
                e
            );
            load_transactions(&store, SAMPLE_TRANSACTIONS);
        }
    }

    tracing::info!(
        "loaded {} accounts and {} transactions",
        store.account_count(),
        store.transaction_count()
    );

    store
}

/// Writes the built-in sample tables into `data_dir`, creating the directory
/// if needed. Existing files are left untouched.
pub fn write_sample_dataset(data_dir: &Path) -> Result<()> {
    fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;

    for (name, contents) in [
        (ACCOUNTS_FILE, SAMPLE_ACCOUNTS),
        (TRANSACTIONS_FILE, SAMPLE_TRANSACTIONS),
        (CUSTOMERS_FILE, SAMPLE_CUSTOMERS),
    ] {
        let path = data_dir.join(name);
        if path.exists() {
            continue;
        }
        fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    tracing::info!("sample dataset initialized in {}", data_dir.display());
    Ok(())
}

fn load_accounts(store: &LedgerStore, contents: &str) {
    for line in data_lines(contents) {
        match parse_account(line) {
            Ok(account) => store.insert_account(account),
            Err(e) => tracing::warn!("skipping malformed account line {:?}: {}", line, e),
        }
    }
}

fn load_transactions(store: &LedgerStore, contents: &str) {
    for line in data_lines(contents) {
        match parse_transaction(line) {
            Ok(transaction) => store.insert_transaction(transaction),
            Err(e) => tracing::warn!("skipping malformed transaction line {:?}: {}", line, e),
        }
    }
}

fn data_lines(contents: &str) -> impl Iterator<Item = &str> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

fn parse_account(line: &str) -> Result<Account> {
    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    if fields.len() < 4 {
        bail!("expected 4 fields, got {}", fields.len());
    }

    Ok(Account {
        id: fields[0].parse().context("bad account id")?,
        owner_id: fields[1].parse().context("bad owner id")?,
        balance: fields[2].parse().context("bad balance")?,
        kind: fields[3].to_string(),
    })
}

fn parse_transaction(line: &str) -> Result<Transaction> {
    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    if fields.len() < 6 {
        bail!("expected 6 fields, got {}", fields.len());
    }

    Ok(Transaction {
        id: fields[0].parse().context("bad transaction id")?,
        from_account: fields[1].parse().context("bad source account")?,
        to_account: fields[2].parse().context("bad destination account")?,
        amount: fields[3].parse().context("bad amount")?,
        timestamp: fields[4].parse().context("bad timestamp")?,
        status: fields[5]
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("bad status")?,
    })
}
