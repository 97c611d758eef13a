// src/wallet/credential_storage.rs
//! Credential storage for the holder's wallet.
//!
//! Provides an in-memory store for the credentials a holder has been
//! issued, keyed by the issuing entity's DID. A holder keeps at most one
//! credential per issuer; re-issuance overwrites the previous one.

use crate::models::VerifiableCredential;
use std::collections::HashMap;

/// In-memory store of issued credentials, keyed by issuer DID.
///
/// # Note
/// For production use, consider persisting to secure storage.
#[derive(Default)]
pub struct CredentialStorage {
    credentials: HashMap<String, VerifiableCredential>,
}

impl CredentialStorage {
    /// Creates a new empty store.
    pub fn new() -> Self {
        CredentialStorage {
            credentials: HashMap::new(),
        }
    }

    /// Stores a credential under its issuer's DID.
    ///
    /// # Behavior
    /// - Overwrites any previous credential from the same issuer
    /// - Does not validate the credential before storage
    pub fn store_credential(&mut self, credential: VerifiableCredential) {
        self.credentials
            .insert(credential.issuer.did.clone(), credential);
    }

    /// Retrieves the credential issued by `issuer_did`, if any.
    pub fn get_credential(&self, issuer_did: &str) -> Option<&VerifiableCredential> {
        self.credentials.get(issuer_did)
    }

    /// Checks whether a credential from `issuer_did` is stored.
    pub fn contains_credential(&self, issuer_did: &str) -> bool {
        self.credentials.contains_key(issuer_did)
    }

    /// Removes the credential issued by `issuer_did`.
    ///
    /// # Returns
    /// `true` if a credential was present and removed.
    pub fn remove_credential(&mut self, issuer_did: &str) -> bool {
        self.credentials.remove(issuer_did).is_some()
    }

    /// Returns the number of stored credentials.
    pub fn count_credentials(&self) -> usize {
        self.credentials.len()
    }
}
