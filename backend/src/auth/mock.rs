//! Mock token verifier for local development and tests.

use axum::http::HeaderMap;

use super::{bearer_token, AuthError, TokenClaims, TokenVerifier};
use crate::models::user::Role;

/// Accepts structured stand-in tokens of the form `mock:<email>:<role>`.
///
/// Only wired in when mock auth is enabled in config; startup validation
/// rejects that combination for production environments.
pub struct MockVerifier;

impl MockVerifier {
    fn parse(token: &str) -> Result<TokenClaims, AuthError> {
        let rest = token
            .strip_prefix("mock:")
            .ok_or_else(|| AuthError::InvalidToken("not a mock token".to_string()))?;

        let (email, role) = rest
            .split_once(':')
            .ok_or_else(|| AuthError::InvalidToken("malformed mock token".to_string()))?;

        if email.is_empty() {
            return Err(AuthError::InvalidToken("empty email in mock token".to_string()));
        }

        // The role segment must name a real role; the resolver then maps
        // it like any other provider claim.
        Role::parse(role)
            .ok_or_else(|| AuthError::InvalidToken(format!("unknown role: {}", role)))?;

        Ok(TokenClaims {
            subject: format!("mock:{}", email),
            email: Some(email.to_string()),
            roles: vec![role.to_string()],
            groups: vec![],
        })
    }
}

#[async_trait::async_trait]
impl TokenVerifier for MockVerifier {
    async fn verify(&self, headers: &HeaderMap) -> Result<TokenClaims, AuthError> {
        let token = bearer_token(headers)?;
        Self::parse(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    #[test]
    fn test_parse_valid_mock_token() {
        let claims = MockVerifier::parse("mock:alice@example.com:writer").unwrap();
        assert_eq!(claims.subject, "mock:alice@example.com");
        assert_eq!(claims.email.as_deref(), Some("alice@example.com"));
        assert_eq!(claims.resolved_role(), Role::Writer);
    }

    #[test]
    fn test_parse_each_role() {
        for (role, expected) in [
            ("admin", Role::Admin),
            ("writer", Role::Writer),
            ("reader", Role::Reader),
        ] {
            let claims = MockVerifier::parse(&format!("mock:a@x.com:{}", role)).unwrap();
            assert_eq!(claims.resolved_role(), expected);
        }
    }

    #[test]
    fn test_parse_rejects_unknown_role() {
        assert!(MockVerifier::parse("mock:a@x.com:superuser").is_err());
    }

    #[test]
    fn test_parse_rejects_malformed_tokens() {
        assert!(MockVerifier::parse("mock:a@x.com").is_err());
        assert!(MockVerifier::parse("mock:").is_err());
        assert!(MockVerifier::parse("mock::admin").is_err());
        assert!(MockVerifier::parse("eyJhbGciOiJSUzI1NiJ9.x.y").is_err());
    }

    #[tokio::test]
    async fn test_verify_requires_bearer_header() {
        let verifier = MockVerifier;
        let headers = HeaderMap::new();
        assert!(matches!(
            verifier.verify(&headers).await,
            Err(AuthError::MissingHeader)
        ));
    }

    #[tokio::test]
    async fn test_verify_full_header_path() {
        let verifier = MockVerifier;
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            "Bearer mock:bob@example.com:admin".parse().unwrap(),
        );
        let claims = verifier.verify(&headers).await.unwrap();
        assert_eq!(claims.resolved_role(), Role::Admin);
    }
}
