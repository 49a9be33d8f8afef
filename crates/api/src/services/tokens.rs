//! JWT issuance and validation for session cookies.
//!
//! Two HS256 tokens share one secret: a short-lived access token checked on
//! protected routes, and a long-lived refresh token that can only mint new
//! access tokens. The `kind` claim keeps one from standing in for the other.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Access token lifetime.
pub const ACCESS_TOKEN_TTL: Duration = Duration::minutes(5);

/// Refresh token lifetime.
pub const REFRESH_TOKEN_TTL: Duration = Duration::days(7);

/// Which cookie a token belongs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub kind: TokenKind,
    pub exp: i64,
    pub iat: i64,
}

/// A signed token and the moment it stops being valid.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Token errors.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token")]
    Invalid,

    /// A valid token of the wrong kind, e.g. an access token sent for refresh.
    #[error("wrong token kind")]
    WrongKind,

    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

/// Signs and verifies session tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    /// Create a token service from the signing secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat"]);

        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation,
        }
    }

    /// Issue an access token for `email`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue_access(&self, email: &str) -> Result<IssuedToken, TokenError> {
        self.issue(email, TokenKind::Access, ACCESS_TOKEN_TTL)
    }

    /// Issue a refresh token for `email`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue_refresh(&self, email: &str) -> Result<IssuedToken, TokenError> {
        self.issue(email, TokenKind::Refresh, REFRESH_TOKEN_TTL)
    }

    fn issue(&self, email: &str, kind: TokenKind, ttl: Duration) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let expires_at = now + ttl;
        let claims = Claims {
            email: email.to_owned(),
            kind,
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Validate a token and check it is of `kind`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` past `exp`, `TokenError::WrongKind` for a
    /// token of the other kind, and `TokenError::Invalid` for anything else.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token validation failed");
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    _ => TokenError::Invalid,
                }
            })?;

        if claims.kind != kind {
            return Err(TokenError::WrongKind);
        }
        Ok(claims)
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(&SecretString::from(secret.to_owned()))
    }

    #[test]
    fn test_access_token_round_trip() {
        let tokens = service("k3v9-test-signing-secret-0f8a2b71");
        let issued = tokens.issue_access("buyer@tanam.software").unwrap();

        let claims = tokens.verify(&issued.token, TokenKind::Access).unwrap();
        assert_eq!(claims.email, "buyer@tanam.software");
        assert_eq!(claims.exp - claims.iat, ACCESS_TOKEN_TTL.num_seconds());
    }

    #[test]
    fn test_refresh_token_cannot_authorize_requests() {
        let tokens = service("k3v9-test-signing-secret-0f8a2b71");
        let issued = tokens.issue_refresh("buyer@tanam.software").unwrap();

        assert!(matches!(
            tokens.verify(&issued.token, TokenKind::Access),
            Err(TokenError::WrongKind)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = service("k3v9-test-signing-secret-0f8a2b71");
        let issued = tokens
            .issue("buyer@tanam.software", TokenKind::Access, Duration::seconds(-5))
            .unwrap();

        assert!(matches!(
            tokens.verify(&issued.token, TokenKind::Access),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_other_secret_rejected() {
        let issued = service("k3v9-test-signing-secret-0f8a2b71")
            .issue_access("buyer@tanam.software")
            .unwrap();

        assert!(matches!(
            service("another-signing-secret-77c1e0d4a9").verify(&issued.token, TokenKind::Access),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        let tokens = service("k3v9-test-signing-secret-0f8a2b71");
        assert!(matches!(
            tokens.verify("not.a.jwt", TokenKind::Access),
            Err(TokenError::Invalid)
        ));
    }
}
