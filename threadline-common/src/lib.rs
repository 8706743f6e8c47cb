//! Common types and utilities shared across Threadline crates.
//!
//! This crate defines the conversation model, observability helpers, and
//! shared error types used throughout the Threadline workspace. It is
//! intentionally lightweight so that every crate can depend on it without
//! introducing heavy transitive costs.
//!
//! # Overview
//!
//! - [`Message`] and [`Role`]: one turn of a conversation sent to a completion endpoint
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`ThreadlineError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! ```rust
//! use threadline_common::{Message, Role};
//!
//! let turns = vec![Message::system("be brief"), Message::user("hello")];
//! assert_eq!(turns[1].role, Role::User);
//! assert_eq!(turns[1].content, "hello");
//! ```
use serde::{Deserialize, Serialize};

pub mod observability;

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role/content pair.
///
/// Ordered sequences of messages form a conversation; the earliest entries
/// carry the foundational instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Error types used across the Threadline system.
#[derive(thiserror::Error, Debug)]
pub enum ThreadlineError {
    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenient alias for results that use [`ThreadlineError`].
pub type Result<T> = std::result::Result<T, ThreadlineError>;
