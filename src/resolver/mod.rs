// src/resolver/mod.rs
//! DID document and public-key resolution.
//!
//! Resolution is decoupled from transport behind the [`DidResolver`] trait
//! so the protocol layer never branches on where a key came from.
//! [`FileResolver`] is the shipped strategy: identity documents are JSON
//! files in a local directory, and the key itself is fetched over HTTP from
//! the document's declared `"key"` route.
//!
//! There is no caching: repeated verifications against the same identifier
//! re-fetch the key. The only concession to production behavior is the
//! request timeout bounding the fetch.

use async_trait::async_trait;
use rsa::RsaPrivateKey;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::errors::ExchangeError;
use crate::models::DidDocument;
use crate::utils::crypto::{self, CryptoError};

/// Name of the route an identity document delivers its public key on.
pub const KEY_ROUTE: &str = "key";

/// Failures of document lookup or key delivery.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No identity document exists for the DID
    #[error("identity document not found for '{0}'")]
    NotFound(String),

    /// The document file exists but could not be read or written
    #[error("error reading identity document")]
    Document(#[source] std::io::Error),

    /// The document bytes are not a valid identity document
    #[error("error decoding identity document")]
    Decode(#[from] serde_json::Error),

    /// The document declares no key-delivery route
    #[error("document for '{0}' declares no key route")]
    MissingKeyRoute(String),

    /// The key endpoint was unreachable
    #[error("error fetching public key from {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The key endpoint answered with a non-success status
    #[error("key endpoint {url} answered with status {status}")]
    BadStatus { url: String, status: u16 },

    /// The document carries no endorsement from the named entity
    #[error("document is not endorsed by '{0}'")]
    NotEndorsed(String),

    /// The endorsement exists but does not verify
    #[error("endorsement by '{0}' does not verify")]
    BadEndorsement(String, #[source] CryptoError),
}

/// Maps an identifier to an identity document and onwards to raw
/// public-key bytes.
#[async_trait]
pub trait DidResolver: Send + Sync {
    /// Looks up the identity document for `did`.
    async fn resolve_document(&self, did: &str) -> Result<DidDocument, ResolveError>;

    /// Follows a document's key route and returns the delivered key bytes
    /// (a PEM-encoded X.509 certificate).
    async fn resolve_key(&self, document: &DidDocument) -> Result<Vec<u8>, ResolveError>;

    /// Document lookup followed by key delivery; the first failure
    /// propagates.
    async fn resolve_key_for(&self, did: &str) -> Result<Vec<u8>, ResolveError> {
        let document = self.resolve_document(did).await?;
        self.resolve_key(&document).await
    }

    /// Checks the one-hop trust chain "is this document vouched for by
    /// `endorser_did`": the document's signature map must contain an entry
    /// for the endorser that verifies against the endorser's own resolved
    /// key, over the document with its signature map cleared.
    async fn verify_endorsement(
        &self,
        document: &DidDocument,
        endorser_did: &str,
    ) -> Result<(), ResolveError> {
        let text = document
            .signatures
            .get(endorser_did)
            .ok_or_else(|| ResolveError::NotEndorsed(endorser_did.to_string()))?;
        let signature = crypto::decode_signature(text)
            .map_err(|e| ResolveError::BadEndorsement(endorser_did.to_string(), e))?;

        let endorser_key = self.resolve_key_for(endorser_did).await?;

        crypto::verify_record(&endorser_key, &signature, &document.payload())
            .map_err(|e| ResolveError::BadEndorsement(endorser_did.to_string(), e))
    }
}

/// Resolver backed by a directory of identity-document JSON files.
///
/// A document for `did` lives at `{docs_dir}/{did}.json`. Keys are fetched
/// over plain HTTP from `http://{domain}/{route}`.
pub struct FileResolver {
    docs_dir: PathBuf,
    http: reqwest::Client,
}

impl FileResolver {
    /// Creates a resolver over `docs_dir` with the given network timeout
    /// on key fetches.
    ///
    /// # Errors
    /// Returns `Err` if the HTTP client cannot be constructed.
    pub fn new(docs_dir: impl Into<PathBuf>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(FileResolver {
            docs_dir: docs_dir.into(),
            http,
        })
    }

    fn document_path(&self, did: &str) -> PathBuf {
        self.docs_dir.join(format!("{}.json", did))
    }

    /// Writes an identity document back to the store.
    ///
    /// Used by the out-of-band administrative flow only; nothing mutates
    /// documents during verification traffic.
    pub async fn save_document(
        &self,
        did: &str,
        document: &DidDocument,
    ) -> Result<(), ResolveError> {
        let bytes = serde_json::to_vec_pretty(document)?;
        tokio::fs::write(self.document_path(did), bytes)
            .await
            .map_err(ResolveError::Document)
    }

    /// Appends `endorser_did`'s trust signature to the document for `did`.
    ///
    /// The signature covers the document with its signature map cleared,
    /// so previously appended endorsements do not invalidate each other.
    pub async fn endorse_document(
        &self,
        did: &str,
        endorser_did: &str,
        endorser_key: &RsaPrivateKey,
    ) -> Result<(), ExchangeError> {
        let mut document = self
            .resolve_document(did)
            .await
            .map_err(|e| ExchangeError::resolution(did, e))?;

        let signature = crypto::sign_record(endorser_key, &document.payload())
            .map_err(|e| ExchangeError::signing("identity document", e))?;
        document
            .signatures
            .insert(endorser_did.to_string(), crypto::encode_signature(&signature));

        self.save_document(did, &document)
            .await
            .map_err(|e| ExchangeError::resolution(did, e))
    }
}

#[async_trait]
impl DidResolver for FileResolver {
    async fn resolve_document(&self, did: &str) -> Result<DidDocument, ResolveError> {
        let path = self.document_path(did);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ResolveError::NotFound(did.to_string()))
            }
            Err(e) => return Err(ResolveError::Document(e)),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn resolve_key(&self, document: &DidDocument) -> Result<Vec<u8>, ResolveError> {
        let route = document
            .routes
            .get(KEY_ROUTE)
            .ok_or_else(|| ResolveError::MissingKeyRoute(document.name.clone()))?;

        let url = format!(
            "http://{}/{}",
            document.domain.trim_end_matches('/'),
            route.trim_start_matches('/')
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ResolveError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::BadStatus {
                url,
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| ResolveError::Transport { url, source })?;
        Ok(bytes.to_vec())
    }
}
