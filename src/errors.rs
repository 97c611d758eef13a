// src/errors.rs
//! Protocol error taxonomy.
//!
//! Lower layers report their own errors ([`CryptoError`],
//! [`ResolveError`]); the protocol services wrap them into an
//! [`ExchangeError`] that carries the externally visible category. Only the
//! API layer turns categories into status codes. Every failure is terminal
//! for its exchange; there is no retry anywhere.

use thiserror::Error;

use crate::resolver::ResolveError;
use crate::utils::crypto::CryptoError;

/// A failure of an issuance or verification exchange.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// The inbound payload could not be parsed; nothing was processed
    #[error("malformed {context}")]
    Malformed {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A signature did not verify; processing stopped immediately
    #[error("error verifying {context} signature")]
    Unauthorized {
        context: &'static str,
        #[source]
        source: CryptoError,
    },

    /// A required signature is absent from the payload
    #[error("{context} signature is missing")]
    MissingSignature { context: &'static str },

    /// The submission does not carry the demanded upstream endorsement
    #[error("submission is not endorsed by required issuer '{expected}'")]
    UpstreamRequired { expected: String },

    /// An identity document or key could not be resolved; this is an
    /// infrastructure fault, not attributable to the caller
    #[error("error resolving identity '{did}'")]
    Resolution {
        did: String,
        #[source]
        source: ResolveError,
    },

    /// The role callback declined for domain reasons
    #[error("{0}")]
    Business(String),

    /// The service's own signing operation failed
    #[error("error signing {context}")]
    Signing {
        context: &'static str,
        #[source]
        source: CryptoError,
    },
}

impl ExchangeError {
    pub fn unauthorized(context: &'static str, source: CryptoError) -> Self {
        ExchangeError::Unauthorized { context, source }
    }

    pub fn resolution(did: impl Into<String>, source: ResolveError) -> Self {
        ExchangeError::Resolution {
            did: did.into(),
            source,
        }
    }

    pub fn signing(context: &'static str, source: CryptoError) -> Self {
        ExchangeError::Signing { context, source }
    }

    /// The externally visible error category, used by the API layer and
    /// for logging.
    pub fn category(&self) -> &'static str {
        match self {
            ExchangeError::Malformed { .. } => "malformed",

            ExchangeError::Unauthorized { .. }
            | ExchangeError::MissingSignature { .. }
            | ExchangeError::UpstreamRequired { .. } => "authentication",

            ExchangeError::Resolution { .. } => "resolution",

            ExchangeError::Business(_) => "business",

            ExchangeError::Signing { .. } => "internal",
        }
    }
}

/// Renders an error with its full source chain, one cause per segment.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
