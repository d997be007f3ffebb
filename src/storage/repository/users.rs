// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository.
//!
//! Users are keyed by a sequential id. Emails are unique case-insensitively
//! through the `user_emails` index; linked Google / Azure AD accounts are
//! found through `user_identities`.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::storage::database::{
    decode, encode, next_id, CryptoplaceDb, StoreError, StoreResult, USERS, USER_EMAILS,
    USER_IDENTITIES,
};

/// Optional HR directory fields carried on a user account.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HrProfile {
    pub empl_id: Option<String>,
    pub en_name: Option<String>,
    pub ch_name: Option<String>,
    pub job_title: Option<String>,
    pub phone: Option<String>,
    pub office: Option<String>,
    pub dept_id: Option<String>,
    pub dept_descr: Option<String>,
    pub supv_empl_id: Option<String>,
    pub site: Option<String>,
}

/// User account persisted in the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredUser {
    pub id: u64,
    pub email: String,
    pub name: String,
    /// Argon2id PHC string. `None` for accounts created through a vendor login.
    pub password_hash: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub google_id: Option<String>,
    pub azure_id: Option<String>,
    #[serde(default)]
    pub hr: HrProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create a password account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub role: Role,
}

/// Vendor that authenticated an external login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountProvider {
    Google,
    AzureAd,
}

impl AccountProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountProvider::Google => "google",
            AccountProvider::AzureAd => "azure-ad",
        }
    }

    fn identity_key(&self, subject: &str) -> String {
        format!("{}:{subject}", self.as_str())
    }
}

/// Identity asserted by Google or Azure AD after a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub provider: AccountProvider,
    pub subject: String,
    pub email: String,
    pub name: String,
    /// Whether the vendor vouches that `email` belongs to the subject.
    pub email_verified: bool,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Repository for user accounts.
pub struct UserRepository<'a> {
    db: &'a CryptoplaceDb,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a CryptoplaceDb) -> Self {
        Self { db }
    }

    /// Create a new account. Fails with `Conflict` when the email is taken.
    pub fn create(&self, new_user: NewUser) -> StoreResult<StoredUser> {
        let email = normalize_email(&new_user.email);
        let write_txn = self.db.inner().begin_write()?;
        {
            let emails = write_txn.open_table(USER_EMAILS)?;
            if emails.get(email.as_str())?.is_some() {
                return Err(StoreError::Conflict(format!("User {email}")));
            }
        }

        let now = Utc::now();
        let user = StoredUser {
            id: next_id(&write_txn, "users")?,
            email,
            name: new_user.name,
            password_hash: new_user.password_hash,
            role: new_user.role,
            is_active: true,
            google_id: None,
            azure_id: None,
            hr: HrProfile::default(),
            created_at: now,
            updated_at: now,
        };
        {
            let mut users = write_txn.open_table(USERS)?;
            users.insert(user.id, encode(&user)?.as_slice())?;
            let mut emails = write_txn.open_table(USER_EMAILS)?;
            emails.insert(user.email.as_str(), user.id)?;
        }
        write_txn.commit()?;

        tracing::info!(user_id = user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Get a user by id.
    pub fn get(&self, user_id: u64) -> StoreResult<StoredUser> {
        let read_txn = self.db.inner().begin_read()?;
        let users = read_txn.open_table(USERS)?;
        match users.get(user_id)? {
            Some(value) => decode(value.value()),
            None => Err(StoreError::NotFound(format!("User {user_id}"))),
        }
    }

    /// Find a user by email (case-insensitive).
    pub fn find_by_email(&self, email: &str) -> StoreResult<Option<StoredUser>> {
        let email = normalize_email(email);
        let read_txn = self.db.inner().begin_read()?;
        let emails = read_txn.open_table(USER_EMAILS)?;
        let Some(user_id) = emails.get(email.as_str())?.map(|v| v.value()) else {
            return Ok(None);
        };
        let users = read_txn.open_table(USERS)?;
        match users.get(user_id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    /// Resolve a vendor login to a local account.
    ///
    /// Lookup order: linked subject id, then email (linking the subject),
    /// then a new `USER` account without a password. Runs in one write
    /// transaction so concurrent callbacks cannot create duplicates.
    ///
    /// An unverified email never links onto a password or admin account;
    /// that case fails with `Conflict`.
    pub fn upsert_external(&self, identity: &ExternalIdentity) -> StoreResult<StoredUser> {
        let email = normalize_email(&identity.email);
        if email.is_empty() {
            return Err(StoreError::InvalidInput(
                "External identity has no email".to_string(),
            ));
        }
        let identity_key = identity.provider.identity_key(&identity.subject);
        let now = Utc::now();

        let write_txn = self.db.inner().begin_write()?;
        let (linked_id, matched_by_email) = {
            let identities = write_txn.open_table(USER_IDENTITIES)?;
            let by_subject = identities.get(identity_key.as_str())?.map(|v| v.value());
            match by_subject {
                Some(id) => (Some(id), false),
                None => {
                    let emails = write_txn.open_table(USER_EMAILS)?;
                    let by_email = emails.get(email.as_str())?.map(|v| v.value());
                    (by_email, by_email.is_some())
                }
            }
        };

        let existing = match linked_id {
            Some(id) => {
                let users = write_txn.open_table(USERS)?;
                let bytes = users.get(id)?.map(|v| v.value().to_vec());
                match bytes {
                    Some(bytes) => Some(decode::<StoredUser>(&bytes)?),
                    None => None,
                }
            }
            None => None,
        };

        let mut stale_key = None;
        let user = match existing {
            Some(mut user) => {
                if matched_by_email
                    && !identity.email_verified
                    && (user.password_hash.is_some() || user.role == Role::Admin)
                {
                    tracing::warn!(
                        user_id = user.id,
                        provider = identity.provider.as_str(),
                        "Refused to link unverified external email to existing account"
                    );
                    return Err(StoreError::Conflict(format!("Account for {email}")));
                }
                let linked = match identity.provider {
                    AccountProvider::Google => &mut user.google_id,
                    AccountProvider::AzureAd => &mut user.azure_id,
                };
                if linked.as_deref() != Some(identity.subject.as_str()) {
                    if let Some(previous) = linked.replace(identity.subject.clone()) {
                        stale_key = Some(identity.provider.identity_key(&previous));
                    }
                    user.updated_at = now;
                }
                user
            }
            None => {
                let id = next_id(&write_txn, "users")?;
                let mut user = StoredUser {
                    id,
                    email: email.clone(),
                    name: identity.name.clone(),
                    password_hash: None,
                    role: Role::User,
                    is_active: true,
                    google_id: None,
                    azure_id: None,
                    hr: HrProfile::default(),
                    created_at: now,
                    updated_at: now,
                };
                match identity.provider {
                    AccountProvider::Google => user.google_id = Some(identity.subject.clone()),
                    AccountProvider::AzureAd => user.azure_id = Some(identity.subject.clone()),
                }
                let mut emails = write_txn.open_table(USER_EMAILS)?;
                emails.insert(email.as_str(), id)?;
                tracing::info!(user_id = id, provider = identity.provider.as_str(), "User created from external login");
                user
            }
        };

        {
            let mut users = write_txn.open_table(USERS)?;
            users.insert(user.id, encode(&user)?.as_slice())?;
            let mut identities = write_txn.open_table(USER_IDENTITIES)?;
            if let Some(stale_key) = &stale_key {
                identities.remove(stale_key.as_str())?;
            }
            identities.insert(identity_key.as_str(), user.id)?;
        }
        write_txn.commit()?;
        Ok(user)
    }

    /// List all users ordered by id (admin view).
    pub fn list_all(&self) -> StoreResult<Vec<StoredUser>> {
        let read_txn = self.db.inner().begin_read()?;
        let users = read_txn.open_table(USERS)?;
        let mut result = Vec::new();
        for entry in users.iter()? {
            let (_, value) = entry?;
            result.push(decode(value.value())?);
        }
        Ok(result)
    }

    /// Activate or deactivate an account.
    pub fn set_active(&self, user_id: u64, is_active: bool) -> StoreResult<StoredUser> {
        let write_txn = self.db.inner().begin_write()?;
        let user = {
            let mut users = write_txn.open_table(USERS)?;
            let bytes = users.get(user_id)?.map(|v| v.value().to_vec());
            let Some(bytes) = bytes else {
                return Err(StoreError::NotFound(format!("User {user_id}")));
            };
            let mut user: StoredUser = decode(&bytes)?;
            user.is_active = is_active;
            user.updated_at = Utc::now();
            users.insert(user_id, encode(&user)?.as_slice())?;
            user
        };
        write_txn.commit()?;

        tracing::info!(user_id, is_active, "User status changed");
        Ok(user)
    }
}
