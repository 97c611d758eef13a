// src/services/verifier.rs
//! Credential verification protocol.
//!
//! A verifying service publishes a signed presentation request; an inbound
//! credential must pass, in strict order: subject-signature verification,
//! issuer-key resolution, issuer-signature verification, and finally the
//! role-specific acceptance check. Any failure halts the chain: later
//! checks never run against an unverified credential, and the acceptance
//! callback never sees unauthenticated claim data.

use rsa::RsaPrivateKey;
use std::sync::Arc;

use crate::errors::ExchangeError;
use crate::models::{PresentationRequest, Signature, VerifiableCredential};
use crate::resolver::DidResolver;
use crate::utils::crypto;

/// Role-specific acceptance behavior, supplied per deployment.
pub trait VerifierPolicy: Send + Sync {
    /// Describes what this verifier wants presented. The service fills in
    /// and signs the entity field.
    fn presentation_request(&self) -> PresentationRequest;

    /// Decides whether a fully verified credential is acceptable.
    ///
    /// Only called after the whole signature chain has passed. Domain
    /// refusals are returned as [`ExchangeError::Business`].
    fn check_claims(&self, credential: &VerifiableCredential) -> Result<(), ExchangeError>;
}

/// The verifying side of an exchange.
pub struct VerifierService {
    resolver: Arc<dyn DidResolver>,
    policy: Arc<dyn VerifierPolicy>,
    did: String,
    signing_key: RsaPrivateKey,
}

impl VerifierService {
    /// Creates a verifier service acting as `did` and signing with
    /// `signing_key`.
    pub fn new(
        resolver: Arc<dyn DidResolver>,
        policy: Arc<dyn VerifierPolicy>,
        did: impl Into<String>,
        signing_key: RsaPrivateKey,
    ) -> Self {
        VerifierService {
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

    /// Creates and signs this verifier's presentation request.
    pub fn create_request(&self) -> Result<PresentationRequest, ExchangeError> {
        let mut request = self.policy.presentation_request();
        request.entity = Signature::for_did(&self.did);

        let signature = crypto::sign_record(&self.signing_key, &request.payload())
            .map_err(|e| ExchangeError::signing("presentation request", e))?;
        request.entity.signature = crypto::encode_signature(&signature);
        Ok(request)
    }

    /// Verifies an inbound credential's signature chain, then asks the
    /// policy to accept it.
    ///
    /// # Process Flow
    /// 1. Resolve the subject's key from the credential's subject DID
    /// 2. Verify the subject signature (whole record, subject value cleared)
    /// 3. Resolve the issuer's key from the credential's issuer DID
    /// 4. Verify the issuer signature (both signature values cleared)
    /// 5. Run the acceptance callback
    pub async fn verify_credential(
        &self,
        credential: &VerifiableCredential,
    ) -> Result<(), ExchangeError> {
        if !credential.subject.is_signed() {
            return Err(ExchangeError::MissingSignature { context: "subject" });
        }

        let subject_key = self
            .resolver
            .resolve_key_for(&credential.subject.did)
            .await
            .map_err(|e| ExchangeError::resolution(&credential.subject.did, e))?;

        let subject_sig = crypto::decode_signature(&credential.subject.signature)
            .map_err(|e| ExchangeError::unauthorized("subject", e))?;
        crypto::verify_record(&subject_key, &subject_sig, &credential.subject_payload())
            .map_err(|e| ExchangeError::unauthorized("subject", e))?;

        if !credential.issuer.is_signed() {
            return Err(ExchangeError::MissingSignature { context: "issuer" });
        }

        let issuer_key = self
            .resolver
            .resolve_key_for(&credential.issuer.did)
            .await
            .map_err(|e| ExchangeError::resolution(&credential.issuer.did, e))?;

        let issuer_sig = crypto::decode_signature(&credential.issuer.signature)
            .map_err(|e| ExchangeError::unauthorized("issuer", e))?;
        crypto::verify_record(&issuer_key, &issuer_sig, &credential.issuer_payload())
            .map_err(|e| ExchangeError::unauthorized("issuer", e))?;

        self.policy.check_claims(credential)
    }
}
