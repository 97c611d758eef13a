// src/main.rs

//! Exchange service entry point.
//!
//! Wires one issuing service and one verifying service over a shared file
//! resolver and serves them through the HTTP API. The shipped deployment is
//! a login-based issuer (authenticate with a username to receive a member
//! card) plus a verifier that checks presented member cards.
//!
//! ## Environment Variables
//! - `SERVICE_DID`: DID this deployment acts as
//! - `PRIVATE_KEY_PATH`: PEM-encoded PKCS#8 RSA private key file
//! - `DID_DOCS_DIR`: (Optional) identity document directory (default: did-docs)
//! - `BIND_ADDR`: (Optional) listen address (default: 127.0.0.1:3000)
//! - `RESOLVER_TIMEOUT_SECS`: (Optional) key-fetch timeout (default: 10)

use anyhow::Context;
use dotenv::dotenv;
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use vc_exchange::errors::ExchangeError;
use vc_exchange::models::{
    PresentationField, PresentationRequest, RequestKind, Signature, VerifiableCredential,
};
use vc_exchange::resolver::FileResolver;
use vc_exchange::services::api_server::ApiServer;
use vc_exchange::services::issuer::{IssuerPolicy, IssuerService};
use vc_exchange::services::verifier::{VerifierPolicy, VerifierService};
use vc_exchange::utils::crypto;

/// Form-based issuance: authenticate with a known username and receive a
/// member card naming you.
struct LoginIssuerPolicy {
    service_url: String,
    /// username → display name
    accounts: HashMap<String, String>,
}

impl IssuerPolicy for LoginIssuerPolicy {
    fn presentation_request(&self) -> PresentationRequest {
        PresentationRequest {
            kind: RequestKind::IssueForm,
            service_url: self.service_url.clone(),
            purpose: "Log in to receive your member card.".into(),
            fields: vec![PresentationField {
                name: "Username".into(),
                field_type: "text".into(),
            }],
            cred_type: Some("Member Card".into()),
            issuer: None,
            entity: Signature::default(),
        }
    }

    fn mint_claims(
        &self,
        submission: &VerifiableCredential,
    ) -> Result<BTreeMap<String, String>, ExchangeError> {
        let username = submission
            .credentials
            .get("Username")
            .ok_or_else(|| ExchangeError::Business("no username submitted".into()))?;
        let display_name = self
            .accounts
            .get(username)
            .ok_or_else(|| ExchangeError::Business("unknown username".into()))?;

        Ok(BTreeMap::from([
            ("First Name".to_string(), display_name.clone()),
            ("Member".to_string(), "yes".to_string()),
        ]))
    }
}

/// Verification: accept any member card this deployment issued, as long as
/// it carries the membership claim.
struct MemberCardPolicy {
    service_url: String,
    issuer_did: String,
}

impl VerifierPolicy for MemberCardPolicy {
    fn presentation_request(&self) -> PresentationRequest {
        PresentationRequest {
            kind: RequestKind::Verify,
            service_url: self.service_url.clone(),
            purpose: "Present your member card.".into(),
            fields: Vec::new(),
            cred_type: Some("Member Card".into()),
            issuer: Some(self.issuer_did.clone()),
            entity: Signature::default(),
        }
    }

    fn check_claims(&self, credential: &VerifiableCredential) -> Result<(), ExchangeError> {
        if credential.issuer.did != self.issuer_did {
            return Err(ExchangeError::Business(format!(
                "card was issued by '{}', not this service",
                credential.issuer.did
            )));
        }
        if credential.credentials.get("Member").map(String::as_str) != Some("yes") {
            return Err(ExchangeError::Business("not a member card".into()));
        }
        Ok(())
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let service_did = std::env::var("SERVICE_DID").context("SERVICE_DID must be set")?;
    let key_path = std::env::var("PRIVATE_KEY_PATH").context("PRIVATE_KEY_PATH must be set")?;
    let docs_dir = env_or("DID_DOCS_DIR", "did-docs");
    let bind_addr: SocketAddr = env_or("BIND_ADDR", "127.0.0.1:3000")
        .parse()
        .context("BIND_ADDR is not a valid socket address")?;
    let timeout_secs: u64 = env_or("RESOLVER_TIMEOUT_SECS", "10")
        .parse()
        .context("RESOLVER_TIMEOUT_SECS is not a number")?;

    let signing_key =
        crypto::load_private_key(&key_path).context("failed to load the service signing key")?;
    let resolver = Arc::new(
        FileResolver::new(&docs_dir, Duration::from_secs(timeout_secs))
            .context("failed to build the resolver")?,
    );

    let issuer = Arc::new(IssuerService::new(
        resolver.clone(),
        Arc::new(LoginIssuerPolicy {
            service_url: format!("http://{}/issue", bind_addr),
            accounts: HashMap::from([
                ("alice".to_string(), "Alice".to_string()),
                ("bob".to_string(), "Bob".to_string()),
            ]),
        }),
        service_did.clone(),
        signing_key.clone(),
    ));

    let verifier = Arc::new(VerifierService::new(
        resolver,
        Arc::new(MemberCardPolicy {
            service_url: format!("http://{}/verify/member", bind_addr),
            issuer_did: service_did.clone(),
        }),
        service_did,
        signing_key,
    ));

    let server = ApiServer::new(issuer, HashMap::from([("member".to_string(), verifier)]));
    server.run(bind_addr).await.context("server failed")
}
