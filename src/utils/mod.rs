// src/utils/mod.rs
//! Helper functions shared across the protocol layers.

pub mod crypto;
pub mod serialization;
