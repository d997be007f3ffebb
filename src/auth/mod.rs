// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Session tokens for the Crypto Place API.
//!
//! ## Auth Flow
//!
//! 1. A user signs in with email + password, Google or Azure AD
//! 2. The server issues an HS256 JWT (`sub`, `email`, `role`, `login_type`)
//! 3. The frontend sends `Authorization: Bearer <JWT>`
//! 4. The [`Auth`] extractor:
//!    - Verifies signature, expiry and issuer
//!    - Loads the account named by `sub`
//!    - Rejects unknown or deactivated accounts
//!
//! ## Security
//!
//! - Passwords are stored as Argon2id PHC strings
//! - Azure AD logins use PKCE (S256)
//! - OAuth `state` values are single use and expire after 10 minutes
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwt;
pub mod oauth;
pub mod password;
pub mod roles;

pub use claims::{AuthenticatedUser, Claims, LoginType};
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth};
pub use jwt::JwtKeys;
pub use password::{hash_password, verify_password, PasswordError};
pub use roles::Role;
