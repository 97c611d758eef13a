// src/wallet/mod.rs
//! Holder-side wallet: credential storage and the exchange client role.

pub mod credential_storage;
pub mod holder;

pub use credential_storage::CredentialStorage;
pub use holder::{HolderService, RequestSummary};
