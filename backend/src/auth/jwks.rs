//! JWT validation against the Azure AD tenant's JWKS.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::HeaderMap;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{bearer_token, AuthError, TokenClaims, TokenVerifier};

/// JWKS key set response.
#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    n: Option<String>,
    e: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OidcConfig {
    jwks_uri: String,
}

/// Raw JWT claims as issued by the provider.
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    preferred_username: Option<String>,
    /// Stable object id; preferred over `sub` as the subject when present.
    #[serde(default)]
    oid: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    groups: Vec<String>,
}

/// Verifier backed by the tenant's published signing keys.
///
/// Fetches the OIDC discovery document once at startup to locate the JWKS
/// endpoint and caches the parsed keys.
pub struct JwksVerifier {
    http_client: Client,
    jwks_uri: String,
    keys: Arc<RwLock<HashMap<String, DecodingKey>>>,
    issuer: String,
    audience: String,
}

impl JwksVerifier {
    /// Build a verifier for an Azure AD tenant and client application.
    pub async fn for_tenant(tenant_id: &str, client_id: &str) -> Result<Self, AuthError> {
        let issuer = format!("https://login.microsoftonline.com/{}/v2.0", tenant_id);
        Self::new(&issuer, client_id).await
    }

    pub async fn new(issuer: &str, audience: &str) -> Result<Self, AuthError> {
        let http_client = Client::new();

        // Fetch OIDC configuration to get the JWKS URI
        let config_url = format!(
            "{}/.well-known/openid-configuration",
            issuer.trim_end_matches('/')
        );
        let config: OidcConfig = http_client
            .get(&config_url)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;

        let verifier = Self {
            http_client,
            jwks_uri: config.jwks_uri,
            keys: Arc::new(RwLock::new(HashMap::new())),
            issuer: issuer.trim_end_matches('/').to_string(),
            audience: audience.to_string(),
        };

        verifier.refresh_keys().await?;

        Ok(verifier)
    }

    async fn refresh_keys(&self) -> Result<(), AuthError> {
        tracing::info!("Fetching JWKS from {}", self.jwks_uri);

        let response: JwksResponse = self
            .http_client
            .get(&self.jwks_uri)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;

        let mut keys = self.keys.write().await;
        keys.clear();

        for jwk in response.keys {
            if jwk.kty == "RSA" {
                if let (Some(n), Some(e)) = (&jwk.n, &jwk.e) {
                    match DecodingKey::from_rsa_components(n, e) {
                        Ok(key) => {
                            keys.insert(jwk.kid.clone(), key);
                        }
                        Err(e) => {
                            tracing::warn!("Failed to parse RSA key {}: {}", jwk.kid, e);
                        }
                    }
                }
            }
        }

        tracing::info!("Loaded {} JWKS keys", keys.len());
        Ok(())
    }
}

#[async_trait::async_trait]
impl TokenVerifier for JwksVerifier {
    async fn verify(&self, headers: &HeaderMap) -> Result<TokenClaims, AuthError> {
        let token = bearer_token(headers)?;

        // Decode header to get kid
        let header =
            decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("Missing kid in token header".to_string()))?;

        let keys = self.keys.read().await;
        let key = keys
            .get(&kid)
            .ok_or_else(|| AuthError::KeyNotFound(kid.clone()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let token_data = decode::<Claims>(token, key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let claims = token_data.claims;
        let subject = claims.oid.unwrap_or(claims.sub);
        let email = claims.email.or(claims.preferred_username);

        Ok(TokenClaims {
            subject,
            email,
            roles: claims.roles,
            groups: claims.groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_claims_defaults() {
        let claims: Claims = serde_json::from_str(r#"{"sub": "abc"}"#).unwrap();
        assert_eq!(claims.sub, "abc");
        assert!(claims.email.is_none());
        assert!(claims.roles.is_empty());
        assert!(claims.groups.is_empty());
    }

    #[test]
    fn test_raw_claims_full() {
        let claims: Claims = serde_json::from_str(
            r#"{
                "sub": "abc",
                "oid": "oid-1",
                "preferred_username": "a@example.com",
                "roles": ["writer"],
                "groups": ["fastapi-admins"]
            }"#,
        )
        .unwrap();
        assert_eq!(claims.oid.as_deref(), Some("oid-1"));
        assert_eq!(claims.preferred_username.as_deref(), Some("a@example.com"));
        assert_eq!(claims.roles, vec!["writer"]);
        assert_eq!(claims.groups, vec!["fastapi-admins"]);
    }
}
