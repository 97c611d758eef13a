// src/wallet/holder.rs
//! The holder (client) role of the exchange.
//!
//! A holder inspects a service's presentation request before acting on it:
//! the request's entity signature is verified against the entity's resolved
//! key, and when the request names an endorsing issuer, the entity's
//! identity document is checked for that endorsement. Only then does the
//! holder fill in a form or re-present a stored credential, signing the
//! result with its own key.

use rsa::RsaPrivateKey;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::errors::ExchangeError;
use crate::models::{
    PresentationField, PresentationRequest, RequestKind, Signature, VerifiableCredential,
};
use crate::resolver::DidResolver;
use crate::utils::crypto;
use crate::wallet::credential_storage::CredentialStorage;

/// What a holder learns about a presentation request before deciding to
/// answer it. Produced only after the request's signature verified.
#[derive(Debug, Clone)]
pub struct RequestSummary {
    /// Display name from the requesting entity's identity document
    pub name: String,

    /// Domain from the requesting entity's identity document
    pub domain: String,

    /// Stated purpose of the exchange
    pub purpose: String,

    /// What the request asks the holder to do
    pub kind: RequestKind,

    /// Credential type referenced by the request, if any
    pub cred_type: Option<String>,

    /// Form fields to fill in, for form-based issuance
    pub fields: Vec<PresentationField>,

    /// Whether the entity's document carries a valid endorsement from the
    /// issuer the request names. `None` when the request names no issuer.
    pub trusted_by_issuer: Option<bool>,
}

/// Holder-side service: wallet plus signing identity.
pub struct HolderService {
    resolver: Arc<dyn DidResolver>,
    did: String,
    signing_key: RsaPrivateKey,
    wallet: Mutex<CredentialStorage>,
}

impl HolderService {
    /// Creates a holder acting as `did` and signing with `signing_key`,
    /// starting with an empty wallet.
    pub fn new(
        resolver: Arc<dyn DidResolver>,
        did: impl Into<String>,
        signing_key: RsaPrivateKey,
    ) -> Self {
        HolderService {
            resolver,
            did: did.into(),
            signing_key,
            wallet: Mutex::new(CredentialStorage::new()),
        }
    }

    /// DID this holder acts as.
    pub fn did(&self) -> &str {
        &self.did
    }

    /// Verifies a presentation request and summarizes it for the holder.
    ///
    /// # Process Flow
    /// 1. Resolve the requesting entity's identity document and key
    /// 2. Verify the entity signature over the request
    /// 3. When the request names an issuer, check the entity's document
    ///    for that issuer's endorsement
    ///
    /// # Errors
    /// An unverifiable request is never summarized; the holder sees an
    /// error instead of an unauthenticated description.
    pub async fn inspect_request(
        &self,
        request: &PresentationRequest,
    ) -> Result<RequestSummary, ExchangeError> {
        if !request.entity.is_signed() {
            return Err(ExchangeError::MissingSignature { context: "entity" });
        }

        let document = self
            .resolver
            .resolve_document(&request.entity.did)
            .await
            .map_err(|e| ExchangeError::resolution(&request.entity.did, e))?;
        let entity_key = self
            .resolver
            .resolve_key(&document)
            .await
            .map_err(|e| ExchangeError::resolution(&request.entity.did, e))?;

        let signature = crypto::decode_signature(&request.entity.signature)
            .map_err(|e| ExchangeError::unauthorized("entity", e))?;
        crypto::verify_record(&entity_key, &signature, &request.payload())
            .map_err(|e| ExchangeError::unauthorized("entity", e))?;

        let trusted_by_issuer = match &request.issuer {
            Some(issuer_did) => Some(
                self.resolver
                    .verify_endorsement(&document, issuer_did)
                    .await
                    .is_ok(),
            ),
            None => None,
        };

        Ok(RequestSummary {
            name: document.name,
            domain: document.domain,
            purpose: request.purpose.clone(),
            kind: request.kind,
            cred_type: request.cred_type.clone(),
            fields: request.fields.clone(),
            trusted_by_issuer,
        })
    }

    /// Answers a presentation request.
    ///
    /// For a form request the filled-in `inputs` become the claim set of a
    /// fresh subject-signed submission. For credential-based requests the
    /// wallet's credential from the named issuer is re-presented.
    pub fn complete_submission(
        &self,
        request: &PresentationRequest,
        inputs: BTreeMap<String, String>,
    ) -> Result<VerifiableCredential, ExchangeError> {
        match request.kind {
            RequestKind::IssueForm => {
                let mut submission = VerifiableCredential {
                    credentials: inputs,
                    subject: Signature::for_did(&self.did),
                    issuer: Signature::default(),
                };
                let signature = crypto::sign_record(&self.signing_key, &submission.subject_payload())
                    .map_err(|e| ExchangeError::signing("submission", e))?;
                submission.subject.signature = crypto::encode_signature(&signature);
                Ok(submission)
            }
            RequestKind::IssueCredential | RequestKind::Verify => {
                let issuer_did = request.issuer.as_deref().ok_or_else(|| {
                    ExchangeError::Business("request names no issuer to present from".into())
                })?;
                let stored = self
                    .stored_credential(issuer_did)
                    .ok_or_else(|| {
                        ExchangeError::Business(format!(
                            "no stored credential issued by '{}'",
                            issuer_did
                        ))
                    })?;
                self.present(&stored)
            }
        }
    }

    /// Re-signs a credential for presentation.
    ///
    /// The holder's signature covers the whole record including the issuer
    /// signature, so a verifier sees both that the claims are issuer-vouched
    /// and that the presenter holds the subject key.
    pub fn present(
        &self,
        credential: &VerifiableCredential,
    ) -> Result<VerifiableCredential, ExchangeError> {
        let mut presented = credential.clone();
        presented.subject = Signature::for_did(&self.did);

        let signature = crypto::sign_record(&self.signing_key, &presented.subject_payload())
            .map_err(|e| ExchangeError::signing("presentation", e))?;
        presented.subject.signature = crypto::encode_signature(&signature);
        Ok(presented)
    }

    /// Stores an issued credential in the wallet, keyed by issuer DID.
    pub fn store_credential(&self, credential: VerifiableCredential) {
        let mut wallet = self.wallet.lock().unwrap();
        wallet.store_credential(credential);
    }

    /// Returns a copy of the stored credential from `issuer_did`, if any.
    pub fn stored_credential(&self, issuer_did: &str) -> Option<VerifiableCredential> {
        let wallet = self.wallet.lock().unwrap();
        wallet.get_credential(issuer_did).cloned()
    }

    /// Number of credentials currently in the wallet.
    pub fn credential_count(&self) -> usize {
        let wallet = self.wallet.lock().unwrap();
        wallet.count_credentials()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{FileResolver, KEY_ROUTE};
    use crate::utils::crypto::load_private_key;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/keys")
            .join(name)
    }

    fn write_document(dir: &Path, did: &str, key_path: &str) {
        let doc = crate::models::DidDocument {
            name: did.to_string(),
            domain: mockito::server_address().to_string(),
            routes: [(KEY_ROUTE.to_string(), key_path.to_string())].into(),
            signatures: Default::default(),
        };
        std::fs::write(
            dir.join(format!("{}.json", did)),
            serde_json::to_vec(&doc).unwrap(),
        )
        .unwrap();
    }

    fn serve_cert(route: &str, name: &str) -> mockito::Mock {
        mockito::mock("GET", route)
            .with_body(std::fs::read(fixture(name)).unwrap())
            .create()
    }

    fn holder(dir: &Path) -> HolderService {
        let resolver = Arc::new(FileResolver::new(dir, Duration::from_secs(2)).unwrap());
        HolderService::new(
            resolver,
            "did:example:alice",
            load_private_key(fixture("alice.key")).unwrap(),
        )
    }

    fn signed_request(issuer: Option<String>) -> PresentationRequest {
        let mut request = PresentationRequest {
            kind: RequestKind::IssueForm,
            service_url: "http://acme.example/issue".into(),
            purpose: "Authenticate to obtain a staff card.".into(),
            fields: vec![PresentationField {
                name: "Username".into(),
                field_type: "text".into(),
            }],
            cred_type: None,
            issuer,
            entity: Signature::for_did("did:example:acme"),
        };
        let key = load_private_key(fixture("acme.key")).unwrap();
        let sig = crypto::sign_record(&key, &request.payload()).unwrap();
        request.entity.signature = crypto::encode_signature(&sig);
        request
    }

    #[tokio::test]
    async fn inspect_summarizes_a_verified_request() {
        let _acme = serve_cert("/hold1/acme.cert", "acme.cert");
        let dir = tempfile::tempdir().unwrap();
        write_document(dir.path(), "did:example:acme", "/hold1/acme.cert");

        let holder = holder(dir.path());
        let summary = holder
            .inspect_request(&signed_request(None))
            .await
            .unwrap();

        assert_eq!(summary.name, "did:example:acme");
        assert_eq!(summary.kind, RequestKind::IssueForm);
        assert_eq!(summary.fields.len(), 1);
        assert_eq!(summary.trusted_by_issuer, None);
    }

    #[tokio::test]
    async fn inspect_reports_endorsement_status() {
        let _acme = serve_cert("/hold2/acme.cert", "acme.cert");
        let _bravo = serve_cert("/hold2/bravo.cert", "bravo.cert");
        let dir = tempfile::tempdir().unwrap();
        write_document(dir.path(), "did:example:acme", "/hold2/acme.cert");
        write_document(dir.path(), "did:example:bravo", "/hold2/bravo.cert");

        let resolver = FileResolver::new(dir.path(), Duration::from_secs(2)).unwrap();
        let bravo_key = load_private_key(fixture("bravo.key")).unwrap();
        resolver
            .endorse_document("did:example:acme", "did:example:bravo", &bravo_key)
            .await
            .unwrap();

        let holder = holder(dir.path());
        let request = signed_request(Some("did:example:bravo".into()));
        let summary = holder.inspect_request(&request).await.unwrap();
        assert_eq!(summary.trusted_by_issuer, Some(true));

        // An issuer that never endorsed the document.
        let request = signed_request(Some("did:example:carol".into()));
        let summary = holder.inspect_request(&request).await.unwrap();
        assert_eq!(summary.trusted_by_issuer, Some(false));
    }

    #[tokio::test]
    async fn tampered_request_is_not_summarized() {
        let _acme = serve_cert("/hold3/acme.cert", "acme.cert");
        let dir = tempfile::tempdir().unwrap();
        write_document(dir.path(), "did:example:acme", "/hold3/acme.cert");

        let holder = holder(dir.path());
        let mut request = signed_request(None);
        request.purpose = "Totally legitimate purpose.".into();

        let err = holder.inspect_request(&request).await.unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::Unauthorized {
                context: "entity",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unsigned_request_is_rejected_without_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let holder = holder(dir.path());

        let mut request = signed_request(None);
        request.entity.signature.clear();

        let err = holder.inspect_request(&request).await.unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::MissingSignature { context: "entity" }
        ));
    }

    #[test]
    fn form_submission_is_subject_signed() {
        let dir = tempfile::tempdir().unwrap();
        let holder = holder(dir.path());

        let submission = holder
            .complete_submission(
                &signed_request(None),
                [("Username".to_string(), "alice".to_string())].into(),
            )
            .unwrap();

        assert_eq!(submission.subject.did, "did:example:alice");
        assert!(!submission.issuer.is_signed());

        let cert = std::fs::read(fixture("alice.cert")).unwrap();
        let sig = crypto::decode_signature(&submission.subject.signature).unwrap();
        crypto::verify_record(&cert, &sig, &submission.subject_payload()).unwrap();
    }

    #[test]
    fn presentation_covers_the_issuer_signature() {
        let dir = tempfile::tempdir().unwrap();
        let holder = holder(dir.path());

        // A minted credential from acme, as the wallet would receive it.
        let mut credential = VerifiableCredential {
            credentials: [("First Name".to_string(), "Alice".to_string())].into(),
            subject: Signature::for_did("did:example:alice"),
            issuer: Signature::for_did("did:example:acme"),
        };
        let acme_key = load_private_key(fixture("acme.key")).unwrap();
        let sig = crypto::sign_record(&acme_key, &credential.issuer_payload()).unwrap();
        credential.issuer.signature = crypto::encode_signature(&sig);
        holder.store_credential(credential.clone());

        let mut request = signed_request(Some("did:example:acme".into()));
        request.kind = RequestKind::Verify;
        let presented = holder
            .complete_submission(&request, BTreeMap::new())
            .unwrap();

        assert_eq!(presented.issuer, credential.issuer);

        let cert = std::fs::read(fixture("alice.cert")).unwrap();
        let sig = crypto::decode_signature(&presented.subject.signature).unwrap();
        crypto::verify_record(&cert, &sig, &presented.subject_payload()).unwrap();

        // Stripping the issuer signature breaks the subject signature too.
        let mut stripped = presented.clone();
        stripped.issuer.signature.clear();
        assert!(crypto::verify_record(&cert, &sig, &stripped.subject_payload()).is_err());
    }

    #[test]
    fn presenting_without_a_stored_credential_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let holder = holder(dir.path());

        let mut request = signed_request(Some("did:example:acme".into()));
        request.kind = RequestKind::Verify;

        let err = holder
            .complete_submission(&request, BTreeMap::new())
            .unwrap_err();
        assert_eq!(err.category(), "business");
    }

    #[test]
    fn wallet_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let holder = holder(dir.path());
        assert_eq!(holder.credential_count(), 0);

        let credential = VerifiableCredential {
            credentials: [("Member".to_string(), "yes".to_string())].into(),
            subject: Signature::for_did("did:example:alice"),
            issuer: Signature {
                did: "did:example:acme".into(),
                signature: "c2ln".into(),
            },
        };
        holder.store_credential(credential.clone());

        assert_eq!(holder.credential_count(), 1);
        assert_eq!(
            holder.stored_credential("did:example:acme"),
            Some(credential)
        );
        assert_eq!(holder.stored_credential("did:example:ghost"), None);
    }
}
