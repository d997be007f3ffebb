// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent storage in a single embedded [redb](https://docs.rs/redb)
//! database file (`$DATA_DIR/cryptoplace.redb`).
//!
//! ## Layout
//!
//! ```text
//! users            id → StoredUser (JSON)
//! user_emails      lowercase email → id
//! user_identities  "google:<sub>" | "azure-ad:<oid>" → id
//! posts            id → StoredPost (JSON)
//! watchlist        "{user_id:020}|{coin_id}" → StoredWatchlistEntry (JSON)
//! cryptos          coin id → StoredCrypto (JSON)
//! sequences        table name → last id
//! ```
//!
//! ## Important Notes
//!
//! - Every multi-row change (create with index update, post reorder,
//!   watchlist add with snapshot refresh) runs in one write transaction
//! - redb serializes writers, so there is no read-modify-write race
//!   between concurrent requests

pub mod database;
pub mod repository;

pub use database::{CryptoplaceDb, StoreError, StoreResult};
pub use repository::{
    AccountProvider, CryptoRepository, ExternalIdentity, HrProfile, NewUser, NewWatchlistEntry,
    PostChanges, PostRepository, StoredCrypto, StoredPost, StoredUser, StoredWatchlistEntry,
    UserRepository, WatchlistRepository,
};
