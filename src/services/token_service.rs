use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Agent tokens are effectively non-expiring; the deployed agent has no
/// refresh flow.
const AGENT_TOKEN_VALIDITY_DAYS: i64 = 3650;

#[derive(Debug, Error)]
#[error("token error: {0}")]
pub struct TokenError(#[from] jsonwebtoken::errors::Error);

/// Claims carried by an agent bearer token. `sub` is the principal that
/// performed the onboarding, `resource_id` scopes the token to one resource's
/// metric callbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentClaims {
    pub sub: String,
    pub resource_id: i32,
    pub exp: usize,
}

/// Issues and verifies the long-lived bearer tokens deployed agents use to
/// authenticate metric callbacks.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenIssuer {
    pub fn new(jwt_secret: &str) -> Self {
        TokenIssuer {
            encoding_key: EncodingKey::from_secret(jwt_secret.as_ref()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_ref()),
        }
    }

    pub fn issue_agent_token(&self, principal: &str, resource_id: i32) -> Result<String, TokenError> {
        let expiration = (Utc::now() + Duration::days(AGENT_TOKEN_VALIDITY_DAYS)).timestamp() as usize;
        let claims = AgentClaims {
            sub: principal.to_string(),
            resource_id,
            exp: expiration,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    pub fn verify_agent_token(&self, token: &str) -> Result<AgentClaims, TokenError> {
        let data = decode::<AgentClaims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_verify_roundtrip() {
        let issuer = TokenIssuer::new("unit-test-jwt-secret");
        let token = issuer.issue_agent_token("admin", 42).unwrap();
        let claims = issuer.verify_agent_token(&token).unwrap();

        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.resource_id, 42);
    }

    #[test]
    fn test_verify_with_wrong_secret_fails() {
        let issuer = TokenIssuer::new("secret-a");
        let other = TokenIssuer::new("secret-b");
        let token = issuer.issue_agent_token("admin", 1).unwrap();

        assert!(other.verify_agent_token(&token).is_err());
    }
}
