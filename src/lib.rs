// src/lib.rs
//! # Verifiable Credential Exchange Core
//!
//! Protocol core for exchanging signed claims between three independent
//! parties (an issuer, a subject holding credentials, and a verifier)
//! without a central authority. Entities are named by DIDs that resolve to
//! public keys through identity documents.
//!
//! ## Architecture Overview
//! 1. **Models**: identity documents, detached signatures, presentation
//!    requests, and verifiable credentials
//! 2. **Resolver**: DID document lookup and public-key delivery
//! 3. **Crypto**: canonical signing and verification (RSA PKCS#1 v1.5 over
//!    SHA-256 of a canonical JSON encoding)
//! 4. **Services**: the issuance and verification protocols plus the HTTP
//!    surface that exposes them
//! 5. **Wallet**: holder-side credential storage and presentation

pub mod errors;    // Protocol error taxonomy
pub mod models;    // Data structures
pub mod resolver;  // DID document and key resolution
pub mod services;  // Issuance/verification protocols and API
pub mod utils;     // Canonical encoding and crypto helpers
pub mod wallet;    // Holder-side storage and presentation
