// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outbound HTTP integrations.

pub mod chat;
pub mod upstream;

pub use chat::{ChatClient, ChatContext, ChatError};
pub use upstream::{UpstreamClient, UpstreamError, UpstreamResponse};
