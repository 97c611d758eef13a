// src/models/did.rs
//! Identity document data model.
//!
//! An identity document maps a DID to the place its public key can be
//! fetched from: a resolvable domain plus one or more named delivery routes.
//! The key-delivery route is named `"key"` ([`crate::resolver::KEY_ROUTE`]).
//!
//! A document may additionally carry a map of endorsements: signatures by
//! *other* entities over this document, expressing "issuer X vouches for
//! this entity". Endorsements cover the document with its signature map
//! cleared, which is what [`DidDocument::payload`] serializes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The resolvable record describing where to fetch an entity's public key
/// and which other entities vouch for it.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DidDocument {
    /// Human-readable entity name, shown to holders inspecting a request
    pub name: String,

    /// Domain (host, optionally with port) the routes are served from
    pub domain: String,

    /// Route name → path map; the `"key"` route delivers the X.509
    /// certificate carrying the entity's public key
    pub routes: BTreeMap<String, String>,

    /// Endorser DID → base64 signature over this document with the
    /// signature map cleared
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub signatures: BTreeMap<String, String>,
}

/// Canonical form covered by an endorsement signature: the document without
/// its signature map.
#[derive(Serialize)]
pub struct DocumentPayload<'a> {
    name: &'a str,
    domain: &'a str,
    routes: &'a BTreeMap<String, String>,
}

impl DidDocument {
    /// The canonical payload an endorser signs.
    pub fn payload(&self) -> DocumentPayload<'_> {
        DocumentPayload {
            name: &self.name,
            domain: &self.domain,
            routes: &self.routes,
        }
    }
}
