//! Bearer-token authentication for HTTP handlers.
//!
//! Token issuance lives outside this service; handlers only need the
//! `Authorization: Bearer <token>` header resolved to a [`Principal`]
//! through the [`TokenVerifier`] port.

use actix_web::HttpRequest;
use actix_web::http::header::AUTHORIZATION;

use crate::domain::ports::{TokenVerifier, TokenVerifierError};
use crate::domain::{Error, Principal};

/// Resolve the request's bearer token to the authenticated principal.
pub async fn require_principal(
    verifier: &dyn TokenVerifier,
    request: &HttpRequest,
) -> Result<Principal, Error> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| Error::unauthorized("missing bearer token"))?;
    let header = header
        .to_str()
        .map_err(|_| Error::unauthorized("authorization header is not valid"))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| Error::unauthorized("authorization header must use the Bearer scheme"))?;

    verifier.verify(token).await.map_err(|err| match err {
        TokenVerifierError::InvalidToken => Error::unauthorized("bearer token is not valid"),
        TokenVerifierError::Unavailable { message } => {
            Error::service_unavailable(format!("token verifier unavailable: {message}"))
        }
    })
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use actix_web::test::TestRequest;
    use rstest::rstest;

    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::user::{Role, UserId};
    use crate::test_support::StaticTokenVerifier;

    fn verifier_with(token: &str, principal: Principal) -> StaticTokenVerifier {
        StaticTokenVerifier::new().with_token(token, principal)
    }

    #[rstest]
    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let verifier = StaticTokenVerifier::new();
        let request = TestRequest::default().to_http_request();

        let err = require_principal(&verifier, &request)
            .await
            .expect_err("unauthorized");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[rstest]
    #[tokio::test]
    async fn non_bearer_scheme_is_unauthorized() {
        let verifier = StaticTokenVerifier::new();
        let request = TestRequest::default()
            .insert_header((AUTHORIZATION, "Basic dXNlcjpwdw=="))
            .to_http_request();

        let err = require_principal(&verifier, &request)
            .await
            .expect_err("unauthorized");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let principal = Principal::new(UserId::random(), Role::User);
        let verifier = verifier_with("good-token", principal);
        let request = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer wrong-token"))
            .to_http_request();

        let err = require_principal(&verifier, &request)
            .await
            .expect_err("unauthorized");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[rstest]
    #[tokio::test]
    async fn valid_token_resolves_the_principal() {
        let principal = Principal::new(UserId::random(), Role::Admin);
        let verifier = verifier_with("good-token", principal);
        let request = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer good-token"))
            .to_http_request();

        let resolved = require_principal(&verifier, &request)
            .await
            .expect("resolves");
        assert_eq!(resolved, principal);
    }
}
