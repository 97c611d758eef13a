// src/models/credential.rs
//! Verifiable Credential data model.
//!
//! A credential is a map of claim names to claim values plus two detached
//! signatures: the subject's and the issuer's. The same structure carries an
//! issue submission (subject-signed, issuer signature absent or copied from
//! an upstream credential) and a finished credential (issuer-signed).
//!
//! # Signature coverage
//! A record that carries its own signature cannot be hashed as-is, so every
//! signing or verifying operation works on a *payload view*: a borrowed
//! struct that serializes exactly like the credential with the relevant
//! signature value(s) absent. Nothing is ever cleared in place.
//!
//! - [`VerifiableCredential::subject_payload`]: subject signature absent,
//!   issuer signature kept. This is what the holder signs when submitting or
//!   presenting, so a presentation covers the issuer signature too.
//! - [`VerifiableCredential::issuer_payload`]: both signature values absent.
//!   This is what the issuer signs at minting time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A detached signature: the signer's DID alongside the base64 signature
/// value. An empty value means "not signed yet" and is omitted from JSON.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    /// DID of the signing entity
    pub did: String,

    /// Base64 (standard alphabet, no padding) signature text
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub signature: String,
}

impl Signature {
    /// Creates an unsigned placeholder naming `did` as the signer.
    pub fn for_did(did: impl Into<String>) -> Self {
        Signature {
            did: did.into(),
            signature: String::new(),
        }
    }

    /// Whether a signature value is attached.
    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }
}

/// A set of claims bearing both the holder's and the issuer's signatures.
///
/// Claims are kept in a `BTreeMap` so the canonical encoding used for
/// signing is stable regardless of insertion order.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifiableCredential {
    /// Claim name → claim value
    pub credentials: BTreeMap<String, String>,

    /// Subject (holder) detached signature
    pub subject: Signature,

    /// Issuer detached signature
    pub issuer: Signature,
}

/// Borrowed signer reference serializing identically to an unsigned
/// [`Signature`] (the signature value is omitted when empty).
#[derive(Serialize)]
struct SignerRef<'a> {
    did: &'a str,
}

/// Canonical form covered by the subject signature.
///
/// Field order mirrors [`VerifiableCredential`]; only the subject signature
/// value is absent.
#[derive(Serialize)]
pub struct SubjectPayload<'a> {
    credentials: &'a BTreeMap<String, String>,
    subject: SignerRef<'a>,
    issuer: &'a Signature,
}

/// Canonical form covered by the issuer signature: both signature values
/// are absent.
#[derive(Serialize)]
pub struct IssuerPayload<'a> {
    credentials: &'a BTreeMap<String, String>,
    subject: SignerRef<'a>,
    issuer: SignerRef<'a>,
}

impl VerifiableCredential {
    /// The canonical payload the subject signs and verifiers check first.
    pub fn subject_payload(&self) -> SubjectPayload<'_> {
        SubjectPayload {
            credentials: &self.credentials,
            subject: SignerRef {
                did: &self.subject.did,
            },
            issuer: &self.issuer,
        }
    }

    /// The canonical payload the issuer signs at minting time.
    pub fn issuer_payload(&self) -> IssuerPayload<'_> {
        IssuerPayload {
            credentials: &self.credentials,
            subject: SignerRef {
                did: &self.subject.did,
            },
            issuer: SignerRef {
                did: &self.issuer.did,
            },
        }
    }
}
