// src/models/request.rs
//! Presentation / issue request data model.
//!
//! A service bootstraps an exchange by publishing a signed description of
//! what it wants: either a set of typed input fields to fill in
//! ([`RequestKind::IssueForm`]), an existing credential of a named type to
//! re-present ([`RequestKind::IssueCredential`]), or a credential to check
//! ([`RequestKind::Verify`]).

use serde::{Deserialize, Serialize};

use crate::models::credential::Signature;

/// What a presentation request asks the holder to do.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Fill in the listed fields to obtain a credential
    #[serde(rename = "iss:form")]
    IssueForm,

    /// Present an existing credential of `cred_type` to obtain a new one
    #[serde(rename = "iss:cred")]
    IssueCredential,

    /// Present a credential of `cred_type` for checking
    #[serde(rename = "verify")]
    Verify,
}

/// A typed input field the holder is asked to fill in.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PresentationField {
    /// Field name, also used as the claim name in the submission
    pub name: String,

    /// Input type hint (e.g. "text", "password")
    #[serde(rename = "type")]
    pub field_type: String,
}

/// A signed description of what claims a service wants or offers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PresentationRequest {
    /// Kind tag
    #[serde(rename = "type")]
    pub kind: RequestKind,

    /// URL completed submissions should be posted to
    pub service_url: String,

    /// Human-readable purpose of the exchange
    pub purpose: String,

    /// Input fields for form-based issuance
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<PresentationField>,

    /// Credential type reference for credential-based requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_type: Option<String>,

    /// DID of the issuer whose endorsement the requesting entity claims,
    /// or whose signature a submitted credential must carry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// Requesting entity's detached signature over this request
    pub entity: Signature,
}

/// Borrowed signer reference, identical in serialized form to an unsigned
/// [`Signature`].
#[derive(Serialize)]
struct SignerRef<'a> {
    did: &'a str,
}

/// Canonical form covered by the requesting entity's signature.
#[derive(Serialize)]
pub struct RequestPayload<'a> {
    #[serde(rename = "type")]
    kind: RequestKind,
    service_url: &'a str,
    purpose: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: &'a Vec<PresentationField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cred_type: &'a Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    issuer: &'a Option<String>,
    entity: SignerRef<'a>,
}

impl PresentationRequest {
    /// The canonical payload the requesting entity signs.
    pub fn payload(&self) -> RequestPayload<'_> {
        RequestPayload {
            kind: self.kind,
            service_url: &self.service_url,
            purpose: &self.purpose,
            fields: &self.fields,
            cred_type: &self.cred_type,
            issuer: &self.issuer,
            entity: SignerRef {
                did: &self.entity.did,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::serialization::to_canonical_bytes;

    #[test]
    fn payload_matches_request_with_cleared_entity_signature() {
        let mut req = PresentationRequest {
            kind: RequestKind::IssueForm,
            service_url: "http://acme.example/issue".into(),
            purpose: "Authenticate to obtain a staff card.".into(),
            fields: vec![PresentationField {
                name: "Username".into(),
                field_type: "text".into(),
            }],
            cred_type: None,
            issuer: None,
            entity: Signature {
                did: "did:example:acme".into(),
                signature: "c2ln".into(),
            },
        };

        let signed = to_canonical_bytes(&req.payload()).unwrap();
        req.entity.signature.clear();
        assert_eq!(signed, to_canonical_bytes(&req).unwrap());
    }

    #[test]
    fn kind_tags_are_stable() {
        assert_eq!(
            serde_json::to_string(&RequestKind::IssueForm).unwrap(),
            r#""iss:form""#
        );
        assert_eq!(
            serde_json::to_string(&RequestKind::IssueCredential).unwrap(),
            r#""iss:cred""#
        );
        assert_eq!(
            serde_json::to_string(&RequestKind::Verify).unwrap(),
            r#""verify""#
        );
    }
}
