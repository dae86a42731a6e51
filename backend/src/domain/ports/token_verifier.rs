//! Port for the external bearer-token verifier.
//!
//! Session issuance and token formats live outside this core; all the
//! domain needs back is the authenticated principal.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::access::Principal;

/// Errors surfaced by token verification adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenVerifierError {
    /// The token is malformed, expired, or unknown.
    #[error("bearer token is not valid")]
    InvalidToken,
    /// The verifier backend could not be reached.
    #[error("token verifier unavailable: {message}")]
    Unavailable {
        /// Adapter-provided context.
        message: String,
    },
}

impl TokenVerifierError {
    /// Helper for backend outages.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Port resolving a bearer token to the authenticated principal.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify a bearer token and return the principal it identifies.
    async fn verify(&self, token: &str) -> Result<Principal, TokenVerifierError>;
}

/// Fixture verifier that rejects every token.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureTokenVerifier;

#[async_trait]
impl TokenVerifier for FixtureTokenVerifier {
    async fn verify(&self, _token: &str) -> Result<Principal, TokenVerifierError> {
        Err(TokenVerifierError::InvalidToken)
    }
}
