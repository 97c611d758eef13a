// src/services/issuer.rs
//! Credential issuance protocol.
//!
//! An issuing service publishes a signed presentation request describing
//! what it needs, accepts a subject-signed submission, verifies the
//! signature chain, asks its role-specific policy for the claim set, and
//! returns an issuer-signed credential.
//!
//! Verification is strictly ordered: the subject signature is checked
//! before anything else, the upstream endorsement (when the request demands
//! one) before minting, and no claim data reaches the policy from an
//! unverified submission. Any failure terminates the exchange; a partial
//! credential is never returned.

use rsa::RsaPrivateKey;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::ExchangeError;
use crate::models::{PresentationRequest, Signature, VerifiableCredential};
use crate::resolver::DidResolver;
use crate::utils::crypto;

/// Role-specific issuance behavior, supplied per deployment.
pub trait IssuerPolicy: Send + Sync {
    /// Describes what this issuer wants from a subject. The service fills
    /// in and signs the entity field; the policy leaves it untouched.
    fn presentation_request(&self) -> PresentationRequest;

    /// Computes the claim set for a verified submission.
    ///
    /// The submission's signature chain has already been verified when
    /// this is called. Domain-level refusals (bad login, unknown account)
    /// are returned as [`ExchangeError::Business`].
    fn mint_claims(
        &self,
        submission: &VerifiableCredential,
    ) -> Result<BTreeMap<String, String>, ExchangeError>;
}

/// The issuing side of an exchange.
pub struct IssuerService {
    resolver: Arc<dyn DidResolver>,
    policy: Arc<dyn IssuerPolicy>,
    did: String,
    signing_key: RsaPrivateKey,
}

impl IssuerService {
    /// Creates an issuer service acting as `did` and signing with
    /// `signing_key`.
    pub fn new(
        resolver: Arc<dyn DidResolver>,
        policy: Arc<dyn IssuerPolicy>,
        did: impl Into<String>,
        signing_key: RsaPrivateKey,
    ) -> Self {
        IssuerService {
            resolver,
            policy,
            did: did.into(),
            signing_key,
        }
    }

    /// DID this service acts as.
    pub fn did(&self) -> &str {
        &self.did
    }

    /// Creates and signs this issuer's presentation request.
    pub fn create_request(&self) -> Result<PresentationRequest, ExchangeError> {
        let mut request = self.policy.presentation_request();
        request.entity = Signature::for_did(&self.did);

        let signature = crypto::sign_record(&self.signing_key, &request.payload())
            .map_err(|e| ExchangeError::signing("presentation request", e))?;
        request.entity.signature = crypto::encode_signature(&signature);
        Ok(request)
    }

    /// Accepts a subject-signed submission and issues a credential.
    ///
    /// # Process Flow
    /// 1. Resolve the subject's key from the declared subject DID
    /// 2. Verify the subject signature over the submission
    /// 3. Verify the upstream issuer's signature when the request names one
    /// 4. Ask the policy for the claim set
    /// 5. Stamp this issuer's DID and sign the credential
    ///
    /// # Errors
    /// - [`ExchangeError::Resolution`] if a key cannot be resolved
    /// - [`ExchangeError::MissingSignature`] / [`ExchangeError::Unauthorized`]
    ///   if the signature chain fails; minting never runs in that case
    /// - [`ExchangeError::UpstreamRequired`] if a demanded endorsement is
    ///   absent
    /// - [`ExchangeError::Business`] if the policy declines
    pub async fn accept_submission(
        &self,
        submission: &VerifiableCredential,
    ) -> Result<VerifiableCredential, ExchangeError> {
        if !submission.subject.is_signed() {
            return Err(ExchangeError::MissingSignature { context: "subject" });
        }

        let subject_key = self
            .resolver
            .resolve_key_for(&submission.subject.did)
            .await
            .map_err(|e| ExchangeError::resolution(&submission.subject.did, e))?;

        let subject_sig = crypto::decode_signature(&submission.subject.signature)
            .map_err(|e| ExchangeError::unauthorized("subject", e))?;
        crypto::verify_record(&subject_key, &subject_sig, &submission.subject_payload())
            .map_err(|e| ExchangeError::unauthorized("subject", e))?;

        if let Some(upstream) = self.policy.presentation_request().issuer {
            self.verify_upstream(submission, &upstream).await?;
        }

        let claims = self.policy.mint_claims(submission)?;

        let mut credential = VerifiableCredential {
            credentials: claims,
            // The holder re-signs at presentation time; the minted
            // credential carries the subject DID with no signature value.
            subject: Signature::for_did(&submission.subject.did),
            issuer: Signature::for_did(&self.did),
        };

        let signature = crypto::sign_record(&self.signing_key, &credential.issuer_payload())
            .map_err(|e| ExchangeError::signing("credential", e))?;
        credential.issuer.signature = crypto::encode_signature(&signature);

        Ok(credential)
    }

    /// Verifies that the submission carries a valid signature from the
    /// upstream issuer the request demands. Absence is a rejection, never
    /// a default-trust pass.
    async fn verify_upstream(
        &self,
        submission: &VerifiableCredential,
        upstream: &str,
    ) -> Result<(), ExchangeError> {
        if submission.issuer.did != upstream || !submission.issuer.is_signed() {
            return Err(ExchangeError::UpstreamRequired {
                expected: upstream.to_string(),
            });
        }

        let upstream_key = self
            .resolver
            .resolve_key_for(upstream)
            .await
            .map_err(|e| ExchangeError::resolution(upstream, e))?;

        let upstream_sig = crypto::decode_signature(&submission.issuer.signature)
            .map_err(|e| ExchangeError::unauthorized("upstream issuer", e))?;
        crypto::verify_record(&upstream_key, &upstream_sig, &submission.issuer_payload())
            .map_err(|e| ExchangeError::unauthorized("upstream issuer", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PresentationField, RequestKind};
    use crate::resolver::{FileResolver, KEY_ROUTE};
    use crate::utils::crypto::load_private_key;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, Ordering};
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

    /// Policy probe recording whether minting ran.
    struct RegistrarPolicy {
        upstream: Option<String>,
        minted: AtomicBool,
    }

    impl RegistrarPolicy {
        fn new(upstream: Option<String>) -> Self {
            RegistrarPolicy {
                upstream,
                minted: AtomicBool::new(false),
            }
        }
    }

    impl IssuerPolicy for RegistrarPolicy {
        fn presentation_request(&self) -> PresentationRequest {
            PresentationRequest {
                kind: RequestKind::IssueForm,
                service_url: "http://localhost/issue".into(),
                purpose: "Authenticate to obtain a staff card.".into(),
                fields: vec![PresentationField {
                    name: "Username".into(),
                    field_type: "text".into(),
                }],
                cred_type: None,
                issuer: self.upstream.clone(),
                entity: Signature::default(),
            }
        }

        fn mint_claims(
            &self,
            submission: &VerifiableCredential,
        ) -> Result<BTreeMap<String, String>, ExchangeError> {
            self.minted.store(true, Ordering::SeqCst);
            if submission.credentials.get("Username").map(String::as_str) != Some("alice") {
                return Err(ExchangeError::Business("unknown username".into()));
            }
            Ok([("First Name".to_string(), "Alice".to_string())].into())
        }
    }

    fn serve_cert(route: &str, name: &str) -> mockito::Mock {
        mockito::mock("GET", route)
            .with_body(std::fs::read(fixture(name)).unwrap())
            .create()
    }

    fn service(
        dir: &Path,
        policy: Arc<RegistrarPolicy>,
    ) -> IssuerService {
        let resolver =
            Arc::new(FileResolver::new(dir, Duration::from_secs(2)).unwrap());
        IssuerService::new(
            resolver,
            policy,
            "did:example:acme",
            load_private_key(fixture("acme.key")).unwrap(),
        )
    }

    fn signed_submission(username: &str) -> VerifiableCredential {
        let mut submission = VerifiableCredential {
            credentials: [("Username".to_string(), username.to_string())].into(),
            subject: Signature::for_did("did:example:alice"),
            issuer: Signature::default(),
        };
        let key = load_private_key(fixture("alice.key")).unwrap();
        let sig = crypto::sign_record(&key, &submission.subject_payload()).unwrap();
        submission.subject.signature = crypto::encode_signature(&sig);
        submission
    }

    #[test]
    fn request_is_signed_by_the_service() {
        let dir = tempfile::tempdir().unwrap();
        let policy = Arc::new(RegistrarPolicy::new(None));
        let service = service(dir.path(), policy);

        let request = service.create_request().unwrap();
        assert_eq!(request.entity.did, "did:example:acme");

        let cert = std::fs::read(fixture("acme.cert")).unwrap();
        let sig = crypto::decode_signature(&request.entity.signature).unwrap();
        crypto::verify_record(&cert, &sig, &request.payload()).unwrap();
    }

    #[tokio::test]
    async fn issues_credential_for_valid_submission() {
        let _alice = serve_cert("/iss/alice.cert", "alice.cert");
        let dir = tempfile::tempdir().unwrap();
        write_document(dir.path(), "did:example:alice", "/iss/alice.cert");

        let policy = Arc::new(RegistrarPolicy::new(None));
        let service = service(dir.path(), policy.clone());

        let credential = service
            .accept_submission(&signed_submission("alice"))
            .await
            .unwrap();

        assert!(policy.minted.load(Ordering::SeqCst));
        assert_eq!(credential.issuer.did, "did:example:acme");
        assert_eq!(credential.subject.did, "did:example:alice");
        assert!(!credential.subject.is_signed());
        assert_eq!(
            credential.credentials.get("First Name").unwrap(),
            "Alice"
        );

        let cert = std::fs::read(fixture("acme.cert")).unwrap();
        let sig = crypto::decode_signature(&credential.issuer.signature).unwrap();
        crypto::verify_record(&cert, &sig, &credential.issuer_payload()).unwrap();
    }

    #[tokio::test]
    async fn tampered_submission_is_unauthorized_and_never_minted() {
        let _alice = serve_cert("/iss2/alice.cert", "alice.cert");
        let dir = tempfile::tempdir().unwrap();
        write_document(dir.path(), "did:example:alice", "/iss2/alice.cert");

        let policy = Arc::new(RegistrarPolicy::new(None));
        let service = service(dir.path(), policy.clone());

        let mut submission = signed_submission("alice");
        submission
            .credentials
            .insert("Username".into(), "mallory".into());

        let err = service.accept_submission(&submission).await.unwrap_err();
        assert_eq!(err.category(), "authentication");
        assert!(!policy.minted.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unsigned_submission_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let policy = Arc::new(RegistrarPolicy::new(None));
        let service = service(dir.path(), policy.clone());

        let mut submission = signed_submission("alice");
        submission.subject.signature.clear();

        let err = service.accept_submission(&submission).await.unwrap_err();
        assert!(matches!(err, ExchangeError::MissingSignature { .. }));
        assert!(!policy.minted.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unresolvable_subject_is_an_infrastructure_fault() {
        // No identity document for alice in this directory.
        let dir = tempfile::tempdir().unwrap();
        let policy = Arc::new(RegistrarPolicy::new(None));
        let service = service(dir.path(), policy.clone());

        let err = service
            .accept_submission(&signed_submission("alice"))
            .await
            .unwrap_err();
        assert_eq!(err.category(), "resolution");
        assert!(!policy.minted.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn business_rejection_is_distinct_from_authentication() {
        let _alice = serve_cert("/iss3/alice.cert", "alice.cert");
        let dir = tempfile::tempdir().unwrap();
        write_document(dir.path(), "did:example:alice", "/iss3/alice.cert");

        let policy = Arc::new(RegistrarPolicy::new(None));
        let service = service(dir.path(), policy);

        let err = service
            .accept_submission(&signed_submission("eve"))
            .await
            .unwrap_err();
        assert_eq!(err.category(), "business");
        assert_eq!(err.to_string(), "unknown username");
    }

    #[tokio::test]
    async fn missing_upstream_endorsement_is_rejected() {
        let _alice = serve_cert("/iss4/alice.cert", "alice.cert");
        let dir = tempfile::tempdir().unwrap();
        write_document(dir.path(), "did:example:alice", "/iss4/alice.cert");

        let policy = Arc::new(RegistrarPolicy::new(Some("did:example:bravo".into())));
        let service = service(dir.path(), policy.clone());

        let err = service
            .accept_submission(&signed_submission("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::UpstreamRequired { .. }));
        assert!(!policy.minted.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn upstream_endorsed_submission_is_accepted() {
        let _alice = serve_cert("/iss5/alice.cert", "alice.cert");
        let _bravo = serve_cert("/iss5/bravo.cert", "bravo.cert");
        let dir = tempfile::tempdir().unwrap();
        write_document(dir.path(), "did:example:alice", "/iss5/alice.cert");
        write_document(dir.path(), "did:example:bravo", "/iss5/bravo.cert");

        let policy = Arc::new(RegistrarPolicy::new(Some("did:example:bravo".into())));
        let service = service(dir.path(), policy.clone());

        // An upstream credential issued by bravo, then presented by alice:
        // bravo signs with both signature values cleared, alice signs over
        // the whole record.
        let mut submission = VerifiableCredential {
            credentials: [("Username".to_string(), "alice".to_string())].into(),
            subject: Signature::for_did("did:example:alice"),
            issuer: Signature::for_did("did:example:bravo"),
        };
        let bravo_key = load_private_key(fixture("bravo.key")).unwrap();
        let sig = crypto::sign_record(&bravo_key, &submission.issuer_payload()).unwrap();
        submission.issuer.signature = crypto::encode_signature(&sig);

        let alice_key = load_private_key(fixture("alice.key")).unwrap();
        let sig = crypto::sign_record(&alice_key, &submission.subject_payload()).unwrap();
        submission.subject.signature = crypto::encode_signature(&sig);

        let credential = service.accept_submission(&submission).await.unwrap();
        assert!(policy.minted.load(Ordering::SeqCst));
        assert_eq!(credential.issuer.did, "did:example:acme");
    }
}
