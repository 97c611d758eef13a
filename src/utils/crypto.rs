// src/utils/crypto.rs
//! Canonical signing and verification.
//!
//! The fixed signature scheme of the exchange: a record (one of the payload
//! views from [`crate::models`]) is serialized to its canonical byte
//! encoding, hashed with SHA-256, and signed with RSA PKCS#1 v1.5.
//!
//! Key material handling:
//! - private keys are PEM-encoded PKCS#8 blobs and must parse as RSA keys
//! - public keys are extracted from an X.509 certificate's embedded subject
//!   public key (never a bare key) and must be RSA
//!
//! Any parse failure, missing PEM block, or key-type mismatch is a distinct
//! error; there is no "unsigned" fallback anywhere.
//!
//! Signature values travel as base64 text (standard alphabet, no padding).
//! That encoding is fixed for the whole deployment; signer and verifier must
//! agree on it or nothing verifies.

use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;
use x509_cert::der::{DecodePem, Encode};
use x509_cert::Certificate;

use crate::utils::serialization::to_canonical_bytes;

/// Failures of key loading, signing, or verification.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The private key file could not be read
    #[error("error reading private key file '{path}'")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The private key PEM did not parse as an RSA PKCS#8 key
    #[error("error parsing private key")]
    PrivateKey(#[source] rsa::pkcs8::Error),

    /// The certificate PEM did not parse
    #[error("error parsing certificate")]
    Certificate(#[source] x509_cert::der::Error),

    /// The certificate's subject public key is not an RSA key
    #[error("certificate public key is not an RSA key")]
    KeyType,

    /// The certificate's RSA public key could not be decoded
    #[error("error decoding certificate public key")]
    PublicKey(#[source] rsa::pkcs8::spki::Error),

    /// The record could not be canonically encoded
    #[error("error encoding record")]
    Encode(#[from] serde_json::Error),

    /// The RSA signing operation failed
    #[error("error signing record digest")]
    Sign(#[source] rsa::Error),

    /// The signature does not verify against the record and key
    #[error("signature does not match record")]
    Mismatch,

    /// The base64 signature text could not be decoded
    #[error("error decoding signature text")]
    SignatureText(#[from] base64::DecodeError),
}

/// Loads an RSA private key from a PEM-encoded PKCS#8 file.
///
/// # Errors
/// Returns `Err` if the file cannot be read, the PEM block is missing or
/// malformed, or the key is not an RSA key.
pub fn load_private_key(path: impl AsRef<Path>) -> Result<RsaPrivateKey, CryptoError> {
    let path = path.as_ref();
    let pem = std::fs::read_to_string(path).map_err(|source| CryptoError::KeyFile {
        path: path.display().to_string(),
        source,
    })?;
    RsaPrivateKey::from_pkcs8_pem(&pem).map_err(CryptoError::PrivateKey)
}

/// Extracts the RSA public key embedded in a PEM-encoded X.509 certificate.
///
/// # Errors
/// Returns `Err` if the bytes are not a certificate, or the certificate's
/// subject public key is not RSA.
pub fn public_key_from_cert(cert_pem: &[u8]) -> Result<RsaPublicKey, CryptoError> {
    let cert = Certificate::from_pem(cert_pem).map_err(CryptoError::Certificate)?;
    let spki = &cert.tbs_certificate.subject_public_key_info;

    if spki.algorithm.oid != rsa::pkcs1::ALGORITHM_OID {
        return Err(CryptoError::KeyType);
    }

    let spki_der = spki.to_der().map_err(CryptoError::Certificate)?;
    RsaPublicKey::from_public_key_der(&spki_der).map_err(CryptoError::PublicKey)
}

/// Signs a record's canonical encoding.
///
/// The caller passes the appropriate payload view, never a record that
/// still contains the signature value being produced.
///
/// # Returns
/// Opaque signature bytes; use [`encode_signature`] for transport.
pub fn sign_record<T: Serialize>(key: &RsaPrivateKey, record: &T) -> Result<Vec<u8>, CryptoError> {
    let bytes = to_canonical_bytes(record)?;
    let digest = Sha256::digest(&bytes);
    key.sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
        .map_err(CryptoError::Sign)
}

/// Verifies a detached signature against a record's canonical encoding.
///
/// `cert_pem` is the signer's X.509 certificate as delivered by the
/// resolver. The record must be the same payload view the signer encoded;
/// a record carrying a signature value the signer had cleared will fail
/// verification by contract, not by accident.
pub fn verify_record<T: Serialize>(
    cert_pem: &[u8],
    signature: &[u8],
    record: &T,
) -> Result<(), CryptoError> {
    let key = public_key_from_cert(cert_pem)?;
    let bytes = to_canonical_bytes(record)?;
    let digest = Sha256::digest(&bytes);
    key.verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
        .map_err(|_| CryptoError::Mismatch)
}

/// Encodes signature bytes as base64 text (standard alphabet, no padding).
pub fn encode_signature(signature: &[u8]) -> String {
    base64::encode_config(signature, base64::STANDARD_NO_PAD)
}

/// Decodes base64 signature text back to bytes.
pub fn decode_signature(text: &str) -> Result<Vec<u8>, CryptoError> {
    base64::decode_config(text, base64::STANDARD_NO_PAD).map_err(CryptoError::from)
}
