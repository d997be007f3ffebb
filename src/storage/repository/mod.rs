// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the database.
//!
//! Each repository borrows the shared [`CryptoplaceDb`](super::CryptoplaceDb)
//! and provides the operations for one entity type.

pub mod cryptos;
pub mod posts;
pub mod users;
pub mod watchlist;

pub use cryptos::{CryptoRepository, StoredCrypto};
pub use posts::{move_item, PostChanges, PostRepository, StoredPost};
pub use users::{
    AccountProvider, ExternalIdentity, HrProfile, NewUser, StoredUser, UserRepository,
};
pub use watchlist::{NewWatchlistEntry, StoredWatchlistEntry, WatchlistRepository};
