// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded application database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user id → serialized StoredUser
//! - `user_emails`: lowercase email → user id
//! - `user_identities`: `provider:subject` → user id
//! - `posts`: post id → serialized StoredPost
//! - `watchlist`: `{user_id:020}|{coin_id}` → serialized StoredWatchlistEntry
//! - `cryptos`: CoinGecko coin id → serialized StoredCrypto
//! - `sequences`: table name → last allocated id

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::{de::DeserializeOwned, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

/// Unique index on the lowercased email address.
pub(crate) const USER_EMAILS: TableDefinition<&str, u64> = TableDefinition::new("user_emails");

/// Index on linked vendor accounts. Key format: `provider:subject`.
pub(crate) const USER_IDENTITIES: TableDefinition<&str, u64> =
    TableDefinition::new("user_identities");

pub(crate) const POSTS: TableDefinition<u64, &[u8]> = TableDefinition::new("posts");

/// Key format: `{user_id:020}|{coin_id}` so each user owns one contiguous range.
pub(crate) const WATCHLIST: TableDefinition<&str, &[u8]> = TableDefinition::new("watchlist");

pub(crate) const CRYPTOS: TableDefinition<&str, &[u8]> = TableDefinition::new("cryptos");

pub(crate) const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Record Helpers
// =============================================================================

pub(crate) fn encode<T: Serialize>(record: &T) -> StoreResult<Vec<u8>> {
    Ok(serde_json::to_vec(record)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Allocate the next id of `sequence` inside an open write transaction.
///
/// Must not be called while the caller holds the `sequences` table open.
pub(crate) fn next_id(txn: &WriteTransaction, sequence: &str) -> StoreResult<u64> {
    let mut table = txn.open_table(SEQUENCES)?;
    let next = table.get(sequence)?.map(|v| v.value()).unwrap_or(0) + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

// =============================================================================
// CryptoplaceDb
// =============================================================================

/// Embedded ACID application database.
pub struct CryptoplaceDb {
    db: Database,
}

impl CryptoplaceDb {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_EMAILS)?;
            let _ = write_txn.open_table(USER_IDENTITIES)?;
            let _ = write_txn.open_table(POSTS)?;
            let _ = write_txn.open_table(WATCHLIST)?;
            let _ = write_txn.open_table(CRYPTOS)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;

        tracing::debug!(path = %path.display(), "Database opened");
        Ok(Self { db })
    }

    pub(crate) fn inner(&self) -> &Database {
        &self.db
    }

    /// Cheap liveness probe: open a read transaction and touch the users table.
    pub fn check(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        let _ = table.first()?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::CryptoplaceDb;
    use tempfile::TempDir;

    /// Open a fresh database in a temporary directory.
    ///
    /// The directory must outlive the database handle.
    pub fn temp_db() -> (CryptoplaceDb, TempDir) {
        let dir = TempDir::new().expect("create temp dir");
        let db = CryptoplaceDb::open(&dir.path().join("test.redb")).expect("open database");
        (db, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::temp_db;
    use super::*;

    #[test]
    fn open_creates_parent_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("db.redb");
        let db = CryptoplaceDb::open(&path).unwrap();
        assert!(path.exists());
        db.check().unwrap();
    }

    #[test]
    fn sequences_are_monotonic_per_name() {
        let (db, _dir) = temp_db();
        let txn = db.inner().begin_write().unwrap();
        assert_eq!(next_id(&txn, "users").unwrap(), 1);
        assert_eq!(next_id(&txn, "users").unwrap(), 2);
        assert_eq!(next_id(&txn, "posts").unwrap(), 1);
        txn.commit().unwrap();

        let txn = db.inner().begin_write().unwrap();
        assert_eq!(next_id(&txn, "users").unwrap(), 3);
    }
}
