//! Development token verifier backed by a static table.
//!
//! The real deployment verifies bearer tokens against its identity
//! provider; this adapter exists so a local instance can be driven
//! without one. Tokens come from a `token:user-uuid:role` spec string
//! (comma separated), typically the `AUTH_TOKENS` environment variable.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::access::Principal;
use crate::domain::ports::{TokenVerifier, TokenVerifierError};
use crate::domain::user::{Role, UserId};

/// Errors raised while parsing a token table spec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenTableParseError {
    /// An entry did not have the `token:uuid:role` shape.
    #[error("token entry must look like token:user-uuid:role, got {entry:?}")]
    MalformedEntry {
        /// The offending entry.
        entry: String,
    },
    /// The user id segment was not a UUID.
    #[error("token entry has an invalid user id: {entry:?}")]
    InvalidUserId {
        /// The offending entry.
        entry: String,
    },
    /// The role segment was not `user` or `admin`.
    #[error("token entry has an unknown role: {entry:?}")]
    UnknownRole {
        /// The offending entry.
        entry: String,
    },
}

/// Token verifier resolving bearer tokens from a fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticTableVerifier {
    tokens: HashMap<String, Principal>,
}

impl StaticTableVerifier {
    /// Parse a comma-separated `token:user-uuid:role` spec.
    ///
    /// # Examples
    /// ```
    /// use backend::outbound::auth::StaticTableVerifier;
    ///
    /// let verifier = StaticTableVerifier::from_spec(
    ///     "alice-token:3fa85f64-5717-4562-b3fc-2c963f66afa6:admin",
    /// )
    /// .expect("valid spec");
    /// let _ = verifier;
    /// ```
    pub fn from_spec(spec: &str) -> Result<Self, TokenTableParseError> {
        let mut tokens = HashMap::new();
        for entry in spec.split(',').filter(|entry| !entry.trim().is_empty()) {
            let entry = entry.trim();
            let mut segments = entry.splitn(3, ':');
            let (Some(token), Some(user_id), Some(role)) =
                (segments.next(), segments.next(), segments.next())
            else {
                return Err(TokenTableParseError::MalformedEntry {
                    entry: entry.to_owned(),
                });
            };

            let user_id = Uuid::parse_str(user_id).map_err(|_| {
                TokenTableParseError::InvalidUserId {
                    entry: entry.to_owned(),
                }
            })?;
            let role = Role::from_str(role).map_err(|_| TokenTableParseError::UnknownRole {
                entry: entry.to_owned(),
            })?;
            tokens.insert(
                token.to_owned(),
                Principal::new(UserId::from_uuid(user_id), role),
            );
        }
        Ok(Self { tokens })
    }

    /// Number of tokens in the table.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl TokenVerifier for StaticTableVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, TokenVerifierError> {
        self.tokens
            .get(token)
            .copied()
            .ok_or(TokenVerifierError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use rstest::rstest;

    use super::*;

    const ALICE: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

    #[rstest]
    #[tokio::test]
    async fn known_token_resolves_to_its_principal() {
        let verifier =
            StaticTableVerifier::from_spec(&format!("alice:{ALICE}:admin")).expect("valid spec");
        let principal = verifier.verify("alice").await.expect("token resolves");
        assert!(principal.is_admin());
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let verifier =
            StaticTableVerifier::from_spec(&format!("alice:{ALICE}:user")).expect("valid spec");
        let err = verifier.verify("mallory").await.expect_err("rejected");
        assert_eq!(err, TokenVerifierError::InvalidToken);
    }

    #[rstest]
    #[case("no-colons")]
    #[case("token:not-a-uuid:user")]
    #[case("token:3fa85f64-5717-4562-b3fc-2c963f66afa6:owner")]
    fn malformed_specs_are_rejected(#[case] spec: &str) {
        assert!(StaticTableVerifier::from_spec(spec).is_err());
    }

    #[rstest]
    fn empty_spec_builds_an_empty_table() {
        let verifier = StaticTableVerifier::from_spec("").expect("empty spec");
        assert!(verifier.is_empty());
    }
}
