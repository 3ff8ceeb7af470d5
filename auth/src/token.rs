//! Bearer token issuance and validation.
//!
//! Tokens are self-contained HS256 JWTs: validation needs only the signing
//! secret, no storage lookup. There is no server-side revocation — "logout"
//! is the client discarding its copy, and a token stays valid until its
//! embedded expiry. The signing secret is process-wide configuration,
//! loaded once before serving begins (see [`crate::config`]); nothing in
//! this module can be constructed without it.

use crate::error::{AuthError, Result};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer embedded in every token.
const ISSUER: &str = "staykey-platform";

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: String,
    /// The user's role at issuance time.
    pub role: String,
    /// The user's email at issuance time.
    pub email: String,
    /// Issuer.
    pub iss: String,
    /// Issued-at (seconds since epoch).
    pub iat: i64,
    /// Not-before (seconds since epoch).
    pub nbf: i64,
    /// Expiry (seconds since epoch).
    pub exp: i64,
}

/// A freshly issued token with its lifetime.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The signed compact JWT.
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
}

/// Outcome of validating a presented token.
///
/// This is a soft result: malformed, expired, or tampered tokens yield
/// `Invalid`, never an error, so every caller can produce one uniform
/// unauthorized response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenValidity {
    /// Signature, expiry and not-before all check out.
    Valid {
        /// The authenticated user id.
        user_id: Uuid,
        /// The role embedded at issuance.
        role: String,
    },
    /// The token failed any check, for any reason.
    Invalid,
}

/// Issues and validates access tokens with a single process-wide secret.
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenAuthority {
    /// Create a token authority from the signing secret.
    #[must_use]
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.validate_nbf = true;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs,
        }
    }

    /// Issue a signed, time-boxed token for an authenticated user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenIssueFailed`] if signing fails.
    pub fn issue(&self, user_id: Uuid, role: &str, email: &str) -> Result<IssuedToken> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            email: email.to_string(),
            iss: ISSUER.to_string(),
            iat: now,
            nbf: now,
            exp: now + self.ttl_secs,
        };

        let access_token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(|_| AuthError::TokenIssueFailed)?;

        Ok(IssuedToken {
            access_token,
            expires_in: self.ttl_secs,
        })
    }

    /// Validate a presented token.
    ///
    /// Never errors: any decoding, signature, expiry, or not-before failure
    /// yields [`TokenValidity::Invalid`].
    #[must_use]
    pub fn validate(&self, token: &str) -> TokenValidity {
        let Ok(data) = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
        else {
            return TokenValidity::Invalid;
        };

        // A token whose subject is not a UUID was not issued here.
        match Uuid::parse_str(&data.claims.sub) {
            Ok(user_id) => TokenValidity::Valid {
                user_id,
                role: data.claims.role,
            },
            Err(_) => TokenValidity::Invalid,
        }
    }
}

/// Truncate a token for diagnostics.
///
/// Full tokens are credentials and must never be logged; the first few
/// characters are enough to correlate log lines. Presented tokens are
/// arbitrary client input, so the cut lands on a char boundary rather
/// than a byte offset.
#[must_use]
pub fn token_preview(token: &str) -> String {
    match token.char_indices().nth(20) {
        Some((cut, _)) => format!("{}...", &token[..cut]),
        None => token.to_string(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code

    use super::*;

    fn authority() -> TokenAuthority {
        TokenAuthority::new("test-secret-for-unit-tests", 3600)
    }

    #[test]
    fn issued_token_validates_with_matching_claims() {
        let authority = authority();
        let user_id = Uuid::new_v4();

        let issued = authority.issue(user_id, "guest", "guest@example.com").unwrap();
        assert_eq!(issued.expires_in, 3600);

        match authority.validate(&issued.access_token) {
            TokenValidity::Valid {
                user_id: validated,
                role,
            } => {
                assert_eq!(validated, user_id);
                assert_eq!(role, "guest");
            },
            TokenValidity::Invalid => panic!("freshly issued token should validate"),
        }
    }

    #[test]
    fn expired_token_is_invalid_not_an_error() {
        // TTL far enough in the past to clear the default clock leeway.
        let authority = TokenAuthority::new("test-secret-for-unit-tests", -7200);
        let issued = authority
            .issue(Uuid::new_v4(), "guest", "guest@example.com")
            .unwrap();

        assert_eq!(authority.validate(&issued.access_token), TokenValidity::Invalid);
    }

    #[test]
    fn tampered_token_is_invalid() {
        let authority = authority();
        let issued = authority
            .issue(Uuid::new_v4(), "guest", "guest@example.com")
            .unwrap();

        // Flip a character in the signature segment.
        let mut tampered = issued.access_token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        assert_eq!(authority.validate(&tampered), TokenValidity::Invalid);
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let issued = TokenAuthority::new("other-secret", 3600)
            .issue(Uuid::new_v4(), "guest", "guest@example.com")
            .unwrap();

        assert_eq!(authority().validate(&issued.access_token), TokenValidity::Invalid);
    }

    #[test]
    fn garbage_token_is_invalid() {
        assert_eq!(authority().validate("not-a-jwt"), TokenValidity::Invalid);
        assert_eq!(authority().validate(""), TokenValidity::Invalid);
    }

    #[test]
    fn preview_never_exposes_a_full_token() {
        let authority = authority();
        let issued = authority
            .issue(Uuid::new_v4(), "guest", "guest@example.com")
            .unwrap();

        let preview = token_preview(&issued.access_token);
        assert!(preview.len() <= 23);
        assert_ne!(preview, issued.access_token);
    }

    #[test]
    fn preview_truncates_multibyte_input_on_char_boundaries() {
        // Presented tokens are untrusted input and may contain multi-byte
        // characters; 21 three-byte chars exceeds the preview length in
        // bytes and in chars.
        let token = "あ".repeat(21);
        let preview = token_preview(&token);
        assert_eq!(preview, format!("{}...", "あ".repeat(20)));

        // At or under the limit the token passes through untouched.
        let short = "あ".repeat(7);
        assert_eq!(token_preview(&short), short);
    }
}
