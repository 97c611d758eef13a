// src/services/mod.rs
//! Protocol services: issuance, verification, and the HTTP surface.

pub mod api_server;
pub mod issuer;
pub mod verifier;
