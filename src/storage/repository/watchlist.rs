// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Watchlist repository.
//!
//! Entries are keyed `{user_id:020}|{coin_id}`, which makes a (user, coin)
//! pair unique and keeps every user's entries in one contiguous key range.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};

use super::cryptos::{upsert_in, StoredCrypto};
use crate::storage::database::{
    decode, encode, next_id, CryptoplaceDb, StoreError, StoreResult, WATCHLIST,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredWatchlistEntry {
    pub id: u64,
    pub user_id: u64,
    pub coin_id: String,
    pub coin_name: String,
    pub symbol: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Coin fields supplied when adding to a watchlist.
#[derive(Debug, Clone)]
pub struct NewWatchlistEntry {
    pub coin_id: String,
    pub coin_name: String,
    pub symbol: String,
    pub image: Option<String>,
}

fn entry_key(user_id: u64, coin_id: &str) -> String {
    format!("{user_id:020}|{coin_id}")
}

/// Half-open key range covering every entry of `user_id`.
///
/// `}` sorts directly after `|`, so the end bound is past any `{user}|…` key.
fn user_range(user_id: u64) -> (String, String) {
    (format!("{user_id:020}|"), format!("{user_id:020}}}"))
}

pub struct WatchlistRepository<'a> {
    db: &'a CryptoplaceDb,
}

impl<'a> WatchlistRepository<'a> {
    pub fn new(db: &'a CryptoplaceDb) -> Self {
        Self { db }
    }

    /// Add a coin to a user's watchlist and refresh the coin snapshot.
    ///
    /// Fails with `Conflict` if the coin is already on the list.
    pub fn add(&self, user_id: u64, entry: NewWatchlistEntry) -> StoreResult<StoredWatchlistEntry> {
        let key = entry_key(user_id, &entry.coin_id);
        let write_txn = self.db.inner().begin_write()?;
        {
            let table = write_txn.open_table(WATCHLIST)?;
            if table.get(key.as_str())?.is_some() {
                return Err(StoreError::Conflict(format!(
                    "Coin {} already in watchlist",
                    entry.coin_id
                )));
            }
        }

        let now = Utc::now();
        let stored = StoredWatchlistEntry {
            id: next_id(&write_txn, "watchlist")?,
            user_id,
            coin_id: entry.coin_id,
            coin_name: entry.coin_name,
            symbol: entry.symbol,
            image: entry.image,
            created_at: now,
        };
        {
            let mut table = write_txn.open_table(WATCHLIST)?;
            table.insert(key.as_str(), encode(&stored)?.as_slice())?;
        }
        upsert_in(
            &write_txn,
            &StoredCrypto {
                id: stored.coin_id.clone(),
                name: stored.coin_name.clone(),
                symbol: stored.symbol.clone(),
                image: stored.image.clone(),
                updated_at: now,
            },
        )?;
        write_txn.commit()?;

        tracing::debug!(user_id, coin_id = %stored.coin_id, "Watchlist entry added");
        Ok(stored)
    }

    /// Remove a coin, returning the deleted entry.
    pub fn remove(&self, user_id: u64, coin_id: &str) -> StoreResult<StoredWatchlistEntry> {
        let key = entry_key(user_id, coin_id);
        let write_txn = self.db.inner().begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(WATCHLIST)?;
            let bytes = table.remove(key.as_str())?.map(|v| v.value().to_vec());
            match bytes {
                Some(bytes) => decode::<StoredWatchlistEntry>(&bytes)?,
                None => {
                    return Err(StoreError::NotFound(format!(
                        "Coin {coin_id} not in watchlist"
                    )))
                }
            }
        };
        write_txn.commit()?;

        tracing::debug!(user_id, coin_id, "Watchlist entry removed");
        Ok(removed)
    }

    /// List a user's entries, newest first.
    pub fn list(&self, user_id: u64) -> StoreResult<Vec<StoredWatchlistEntry>> {
        let (start, end) = user_range(user_id);
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(WATCHLIST)?;

        let mut entries = Vec::new();
        for item in table.range(start.as_str()..end.as_str())? {
            let (_, value) = item?;
            entries.push(decode::<StoredWatchlistEntry>(value.value())?);
        }
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(entries)
    }

    pub fn contains(&self, user_id: u64, coin_id: &str) -> StoreResult<bool> {
        let key = entry_key(user_id, coin_id);
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(WATCHLIST)?;
        Ok(table.get(key.as_str())?.is_some())
    }

    /// Membership of every id in `coin_ids`, from a single range scan.
    pub fn contains_many(
        &self,
        user_id: u64,
        coin_ids: &[String],
    ) -> StoreResult<BTreeMap<String, bool>> {
        if coin_ids.is_empty() {
            return Ok(BTreeMap::new());
        }

        let (start, end) = user_range(user_id);
        let prefix_len = start.len();
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(WATCHLIST)?;

        let mut watched = HashSet::new();
        for item in table.range(start.as_str()..end.as_str())? {
            let (key, _) = item?;
            watched.insert(key.value()[prefix_len..].to_string());
        }

        Ok(coin_ids
            .iter()
            .map(|id| (id.clone(), watched.contains(id)))
            .collect())
    }

    pub fn count(&self, user_id: u64) -> StoreResult<usize> {
        let (start, end) = user_range(user_id);
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(WATCHLIST)?;
        let mut count = 0;
        for item in table.range(start.as_str()..end.as_str())? {
            item?;
            count += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::test_support::temp_db;
    use crate::storage::repository::cryptos::CryptoRepository;

    fn coin(id: &str) -> NewWatchlistEntry {
        NewWatchlistEntry {
            coin_id: id.to_string(),
            coin_name: id.to_uppercase(),
            symbol: id[..3].to_string(),
            image: None,
        }
    }

    #[test]
    fn duplicate_add_is_conflict_and_keeps_one_row() {
        let (db, _dir) = temp_db();
        let repo = WatchlistRepository::new(&db);

        repo.add(1, coin("bitcoin")).unwrap();
        let err = repo.add(1, coin("bitcoin")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(repo.count(1).unwrap(), 1);
    }

    #[test]
    fn add_writes_crypto_snapshot() {
        let (db, _dir) = temp_db();
        WatchlistRepository::new(&db).add(1, coin("ethereum")).unwrap();

        let snapshot = CryptoRepository::new(&db).get("ethereum").unwrap().unwrap();
        assert_eq!(snapshot.name, "ETHEREUM");
        assert_eq!(snapshot.symbol, "eth");
    }

    #[test]
    fn entries_are_scoped_per_user() {
        let (db, _dir) = temp_db();
        let repo = WatchlistRepository::new(&db);

        repo.add(1, coin("bitcoin")).unwrap();
        repo.add(1, coin("ethereum")).unwrap();
        repo.add(2, coin("bitcoin")).unwrap();
        // Adjacent ids must not bleed into each other's range
        repo.add(10, coin("dogecoin")).unwrap();

        assert_eq!(repo.count(1).unwrap(), 2);
        assert_eq!(repo.count(2).unwrap(), 1);
        assert_eq!(repo.count(3).unwrap(), 0);

        let listed: Vec<String> = repo.list(1).unwrap().into_iter().map(|e| e.coin_id).collect();
        assert_eq!(listed, vec!["ethereum", "bitcoin"]);
    }

    #[test]
    fn remove_returns_entry_and_missing_is_not_found() {
        let (db, _dir) = temp_db();
        let repo = WatchlistRepository::new(&db);
        repo.add(1, coin("bitcoin")).unwrap();

        let removed = repo.remove(1, "bitcoin").unwrap();
        assert_eq!(removed.coin_id, "bitcoin");
        assert!(!repo.contains(1, "bitcoin").unwrap());
        assert!(matches!(
            repo.remove(1, "bitcoin").unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn batch_check_reports_each_id() {
        let (db, _dir) = temp_db();
        let repo = WatchlistRepository::new(&db);
        repo.add(1, coin("watched")).unwrap();

        let result = repo
            .contains_many(1, &["watched".to_string(), "unwatched".to_string()])
            .unwrap();
        assert_eq!(result.get("watched"), Some(&true));
        assert_eq!(result.get("unwatched"), Some(&false));
        assert_eq!(result.len(), 2);

        assert!(repo.contains_many(1, &[]).unwrap().is_empty());
    }
}
