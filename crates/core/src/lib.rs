//! Bindery core types.
//!
//! Shared domain types used by the server and CLI crates: type-safe entity
//! IDs, a validated [`Email`] / [`Username`] pair, and the [`Price`] type
//! used for catalog and checkout amounts.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::email::{Email, EmailError};
pub use types::id::{BookId, DeckId, EventId, MessageId, PurchaseId, UserId};
pub use types::price::Price;
pub use types::username::{Username, UsernameError};
