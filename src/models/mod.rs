// src/models/mod.rs
//! Data structures exchanged between protocol parties.

pub mod credential;
pub mod did;
pub mod request;

pub use credential::{Signature, VerifiableCredential};
pub use did::DidDocument;
pub use request::{PresentationField, PresentationRequest, RequestKind};
