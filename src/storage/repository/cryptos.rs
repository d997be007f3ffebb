// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Coin metadata snapshots.
//!
//! A snapshot is written whenever a coin is added to any watchlist and is
//! used to fill display fields a watchlist row is missing.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};

use crate::storage::database::{decode, encode, CryptoplaceDb, StoreResult, CRYPTOS};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredCrypto {
    /// CoinGecko coin id
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub image: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Insert or refresh a snapshot inside an existing write transaction.
///
/// An existing image is kept when the new snapshot has none.
pub(crate) fn upsert_in(txn: &WriteTransaction, crypto: &StoredCrypto) -> StoreResult<()> {
    let mut table = txn.open_table(CRYPTOS)?;
    let previous = table
        .get(crypto.id.as_str())?
        .map(|v| v.value().to_vec());

    let mut record = crypto.clone();
    if record.image.is_none() {
        if let Some(bytes) = previous {
            let previous: StoredCrypto = decode(&bytes)?;
            record.image = previous.image;
        }
    }
    table.insert(record.id.as_str(), encode(&record)?.as_slice())?;
    Ok(())
}

pub struct CryptoRepository<'a> {
    db: &'a CryptoplaceDb,
}

impl<'a> CryptoRepository<'a> {
    pub fn new(db: &'a CryptoplaceDb) -> Self {
        Self { db }
    }

    pub fn upsert(&self, crypto: &StoredCrypto) -> StoreResult<()> {
        let write_txn = self.db.inner().begin_write()?;
        upsert_in(&write_txn, crypto)?;
        write_txn.commit()?;
        Ok(())
    }

    pub fn get(&self, coin_id: &str) -> StoreResult<Option<StoredCrypto>> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(CRYPTOS)?;
        match table.get(coin_id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    /// Fetch the snapshots that exist for `coin_ids` in one read transaction.
    pub fn get_many(&self, coin_ids: &[&str]) -> StoreResult<HashMap<String, StoredCrypto>> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(CRYPTOS)?;
        let mut found = HashMap::new();
        for coin_id in coin_ids {
            if let Some(value) = table.get(*coin_id)? {
                let crypto: StoredCrypto = decode(value.value())?;
                found.insert(crypto.id.clone(), crypto);
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::test_support::temp_db;

    fn bitcoin(image: Option<&str>) -> StoredCrypto {
        StoredCrypto {
            id: "bitcoin".to_string(),
            name: "Bitcoin".to_string(),
            symbol: "btc".to_string(),
            image: image.map(str::to_string),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn upsert_keeps_existing_image() {
        let (db, _dir) = temp_db();
        let repo = CryptoRepository::new(&db);

        repo.upsert(&bitcoin(Some("https://img/btc.png"))).unwrap();
        repo.upsert(&bitcoin(None)).unwrap();

        let stored = repo.get("bitcoin").unwrap().unwrap();
        assert_eq!(stored.image.as_deref(), Some("https://img/btc.png"));
    }

    #[test]
    fn get_many_skips_unknown_ids() {
        let (db, _dir) = temp_db();
        let repo = CryptoRepository::new(&db);
        repo.upsert(&bitcoin(None)).unwrap();

        let found = repo.get_many(&["bitcoin", "dogecoin"]).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key("bitcoin"));
        assert!(repo.get("dogecoin").unwrap().is_none());
    }
}
