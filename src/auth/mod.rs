use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Verified identity context carried by a bearer token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    #[serde(default)]
    pub username: String,
    /// Empty for platform-scope callers
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub role_ids: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        tenant_id: impl Into<String>,
        role_ids: Vec<String>,
        expiry_hours: u64,
    ) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id.into(),
            username: username.into(),
            tenant_id: tenant_id.into(),
            role_ids,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidToken(String),
    InvalidSecret,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidToken(msg) => write!(f, "Invalid JWT token: {}", msg),
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
        }
    }
}

impl std::error::Error for JwtError {}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Verifies signature and expiry (HS256)
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_carries_identity_context() {
        let claims = Claims::new("U1", "alice", "T1", vec!["R1".into()], 1);
        let token = generate_jwt(&claims, "secret").unwrap();
        let decoded = decode_jwt(&token, "secret").unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn wrong_secret_and_empty_secret_are_rejected() {
        let claims = Claims::new("U1", "alice", "", Vec::new(), 1);
        let token = generate_jwt(&claims, "secret").unwrap();
        assert!(matches!(decode_jwt(&token, "other"), Err(JwtError::InvalidToken(_))));
        assert!(matches!(generate_jwt(&claims, ""), Err(JwtError::InvalidSecret)));
    }

    #[test]
    fn expired_tokens_fail_validation() {
        let mut claims = Claims::new("U1", "alice", "", Vec::new(), 1);
        claims.iat -= 7200;
        claims.exp = claims.iat + 60;
        let token = generate_jwt(&claims, "secret").unwrap();
        assert!(decode_jwt(&token, "secret").is_err());
    }
}
