//! Bearer token parsing.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Why a request could not be authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("empty authorization header")]
    Missing,
    #[error("invalid authorization header")]
    MalformedHeader,
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Claims carried by gateway tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// Validates HS256 tokens signed with the shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // `exp` is checked when present but not required.
        validation.required_spec_claims = HashSet::new();
        validation.leeway = 0;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify `token` and return the principal it names.
    pub fn verify(&self, token: &str) -> Result<String, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::Invalid(e.to_string()),
        })?;

        if data.claims.user_id.is_empty() {
            return Err(AuthError::Invalid("missing user_id".to_string()));
        }
        Ok(data.claims.user_id)
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier").finish_non_exhaustive()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.map(str::trim).filter(|h| !h.is_empty()).ok_or(AuthError::Missing)?;

    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthError::MalformedHeader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn token(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn now() -> u64 {
        chrono::Utc::now().timestamp() as u64
    }

    #[test]
    fn test_valid_token() {
        let verifier = TokenVerifier::new(SECRET);
        let t = token(
            &Claims {
                user_id: "alice".to_string(),
                exp: Some(now() + 3600),
            },
            SECRET,
        );
        assert_eq!(verifier.verify(&t).unwrap(), "alice");
    }

    #[test]
    fn test_token_without_exp_is_accepted() {
        let verifier = TokenVerifier::new(SECRET);
        let t = token(
            &Claims {
                user_id: "alice".to_string(),
                exp: None,
            },
            SECRET,
        );
        assert_eq!(verifier.verify(&t).unwrap(), "alice");
    }

    #[test]
    fn test_expired_token() {
        let verifier = TokenVerifier::new(SECRET);
        let t = token(
            &Claims {
                user_id: "alice".to_string(),
                exp: Some(now() - 60),
            },
            SECRET,
        );
        assert_eq!(verifier.verify(&t), Err(AuthError::Expired));
    }

    #[test]
    fn test_wrong_secret_and_garbage() {
        let verifier = TokenVerifier::new(SECRET);
        let t = token(
            &Claims {
                user_id: "alice".to_string(),
                exp: None,
            },
            "other-secret",
        );
        assert!(matches!(verifier.verify(&t), Err(AuthError::Invalid(_))));
        assert!(matches!(verifier.verify("a.b.c"), Err(AuthError::Invalid(_))));
    }

    #[test]
    fn test_empty_user_id_rejected() {
        let verifier = TokenVerifier::new(SECRET);
        let t = token(
            &Claims {
                user_id: String::new(),
                exp: None,
            },
            SECRET,
        );
        assert!(matches!(verifier.verify(&t), Err(AuthError::Invalid(_))));
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(Some("Bearer abc")), Ok("abc"));
        assert_eq!(bearer_token(Some("bearer  abc ")), Ok("abc"));
        assert_eq!(bearer_token(None), Err(AuthError::Missing));
        assert_eq!(bearer_token(Some("  ")), Err(AuthError::Missing));
        assert_eq!(bearer_token(Some("abc")), Err(AuthError::MalformedHeader));
        assert_eq!(bearer_token(Some("Basic abc")), Err(AuthError::MalformedHeader));
        assert_eq!(bearer_token(Some("Bearer a b")), Err(AuthError::MalformedHeader));
    }
}
