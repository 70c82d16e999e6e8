//! JWT verification module.
//!
//! Verifies HS256, HS384 and HS512 bearer tokens against the configured
//! issuer, audience and symmetric signing key.
//!
//! # Pre-conditions
//! - The signing key must be non-empty.
//! - The JWT must be a valid, properly formatted token.
//!
//! # Post-conditions
//! - On success, returns the claims carried by the token.
//! - On failure, returns a descriptive error indicating what went wrong.
//!
//! # Invariants
//! - Verification is stateless and does not modify any external state.
//! - A token is accepted only if signature, issuer, audience and lifetime
//!   all validate.

use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// Tolerance applied to `exp` and `nbf` checks.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(5 * 60);

/// Claims extracted from a JWT.
///
/// Registered claims (`iss`, `aud`, `exp`, `nbf`) are validated by the
/// decoder and not kept here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject claim containing the user identifier.
    #[serde(default)]
    pub sub: Option<String>,
    /// Display name of the user.
    #[serde(default)]
    pub unique_name: Option<String>,
}

/// Error returned when JWT verification fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JwtError {
    /// The JWT signature is invalid.
    InvalidSignature,
    /// The JWT has expired.
    TokenExpired,
    /// The JWT is not valid yet (`nbf` in the future).
    TokenNotYetValid,
    /// The issuer is missing, does not match, or no issuer is configured.
    InvalidIssuer,
    /// The audience is missing, does not match, or no audience is configured.
    InvalidAudience,
    /// A required claim is missing.
    MissingClaim(String),
    /// The JWT is malformed or cannot be parsed.
    MalformedToken,
    /// The decoding key could not be created from the provided configuration.
    InvalidKey(String),
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSignature => write!(f, "invalid JWT signature"),
            Self::TokenExpired => write!(f, "JWT has expired"),
            Self::TokenNotYetValid => write!(f, "JWT is not valid yet"),
            Self::InvalidIssuer => write!(f, "invalid JWT issuer"),
            Self::InvalidAudience => write!(f, "invalid JWT audience"),
            Self::MissingClaim(claim) => write!(f, "missing '{claim}' claim in JWT"),
            Self::MalformedToken => write!(f, "malformed JWT"),
            Self::InvalidKey(reason) => write!(f, "invalid key: {reason}"),
        }
    }
}

impl std::error::Error for JwtError {}

/// Parameters a presented token is validated against.
#[derive(Debug, Clone)]
pub struct TokenValidationParameters {
    /// Expected `iss`. `None` rejects every token.
    pub valid_issuer: Option<String>,
    /// Expected `aud`. `None` rejects every token.
    pub valid_audience: Option<String>,
    /// Symmetric key material for HMAC-SHA256.
    pub signing_key: Vec<u8>,
    /// Tolerance for lifetime checks.
    pub clock_skew: Duration,
}

impl TokenValidationParameters {
    /// Parameters with a symmetric key derived from UTF-8 text.
    #[must_use]
    pub fn symmetric(issuer: Option<String>, audience: Option<String>, secret: &str) -> Self {
        Self {
            valid_issuer: issuer,
            valid_audience: audience,
            signing_key: secret.as_bytes().to_vec(),
            clock_skew: DEFAULT_CLOCK_SKEW,
        }
    }
}

/// HMAC algorithms accepted for a symmetric signing key.
const SYMMETRIC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Verifies a JWT and returns its claims.
///
/// # Arguments
/// * `token` - The JWT string to verify.
/// * `parameters` - Issuer, audience and key material to validate against.
///
/// # Errors
/// Returns `JwtError` if verification fails for any reason.
pub fn verify_token(token: &str, parameters: &TokenValidationParameters) -> Result<Claims, JwtError> {
    if parameters.signing_key.is_empty() {
        return Err(JwtError::InvalidKey("signing key must be non-empty".to_string()));
    }

    let key = DecodingKey::from_secret(&parameters.signing_key);
    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = SYMMETRIC_ALGORITHMS.to_vec();
    validation.leeway = parameters.clock_skew.as_secs();
    validation.validate_nbf = true;
    if let Some(issuer) = &parameters.valid_issuer {
        validation.set_issuer(&[issuer]);
    }
    match &parameters.valid_audience {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }

    let token_data = decode::<Claims>(token, &key, &validation).map_err(map_jwt_error)?;

    if parameters.valid_issuer.is_none() {
        return Err(JwtError::InvalidIssuer);
    }
    if parameters.valid_audience.is_none() {
        return Err(JwtError::InvalidAudience);
    }

    Ok(token_data.claims)
}

/// Maps jsonwebtoken errors to our JwtError type.
fn map_jwt_error(error: jsonwebtoken::errors::Error) -> JwtError {
    use jsonwebtoken::errors::ErrorKind;

    match error.kind() {
        ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        ErrorKind::ExpiredSignature => JwtError::TokenExpired,
        ErrorKind::ImmatureSignature => JwtError::TokenNotYetValid,
        ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        ErrorKind::InvalidAudience => JwtError::InvalidAudience,
        ErrorKind::MissingRequiredClaim(claim) => match claim.as_str() {
            "iss" => JwtError::InvalidIssuer,
            "aud" => JwtError::InvalidAudience,
            other => JwtError::MissingClaim(other.to_string()),
        },
        ErrorKind::InvalidKeyFormat => JwtError::InvalidKey(error.to_string()),
        _ => JwtError::MalformedToken,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode, get_current_timestamp};

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: &'a str,
        iss: &'a str,
        aud: &'a str,
        exp: u64,
    }

    fn create_token(iss: &str, aud: &str, exp: u64, secret: &[u8]) -> String {
        create_token_with(Algorithm::HS256, iss, aud, exp, secret)
    }

    fn create_token_with(
        algorithm: Algorithm,
        iss: &str,
        aud: &str,
        exp: u64,
        secret: &[u8],
    ) -> String {
        let claims = TestClaims {
            sub: "user-123",
            iss,
            aud,
            exp,
        };
        encode(
            &Header::new(algorithm),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .expect("failed to create test token")
    }

    fn parameters() -> TokenValidationParameters {
        TokenValidationParameters::symmetric(Some("X".to_string()), Some("X".to_string()), "secret")
    }

    fn in_one_hour() -> u64 {
        get_current_timestamp() + 3600
    }

    #[test]
    fn test_verify_valid_token() {
        let token = create_token("X", "X", in_one_hour(), b"secret");

        let claims = verify_token(&token, &parameters()).expect("verified token");
        assert_eq!(claims.sub.as_deref(), Some("user-123"));
    }

    #[test]
    fn test_verify_hs384_token() {
        let token = create_token_with(Algorithm::HS384, "X", "X", in_one_hour(), b"secret");

        let claims = verify_token(&token, &parameters()).expect("verified token");
        assert_eq!(claims.sub.as_deref(), Some("user-123"));
    }

    #[test]
    fn test_verify_hs512_token() {
        let token = create_token_with(Algorithm::HS512, "X", "X", in_one_hour(), b"secret");

        let claims = verify_token(&token, &parameters()).expect("verified token");
        assert_eq!(claims.sub.as_deref(), Some("user-123"));
    }

    #[test]
    fn test_verify_hs512_token_with_wrong_secret() {
        let token = create_token_with(Algorithm::HS512, "X", "X", in_one_hour(), b"other");

        assert_eq!(
            verify_token(&token, &parameters()).map(|c| c.sub),
            Err(JwtError::InvalidSignature)
        );
    }

    #[test]
    fn test_verify_invalid_signature() {
        let token = create_token("X", "X", in_one_hour(), b"not-the-secret");

        assert_eq!(
            verify_token(&token, &parameters()).map(|c| c.sub),
            Err(JwtError::InvalidSignature)
        );
    }

    #[test]
    fn test_verify_wrong_issuer() {
        let token = create_token("Y", "X", in_one_hour(), b"secret");

        assert_eq!(
            verify_token(&token, &parameters()).map(|c| c.sub),
            Err(JwtError::InvalidIssuer)
        );
    }

    #[test]
    fn test_verify_wrong_audience() {
        let token = create_token("X", "Y", in_one_hour(), b"secret");

        assert_eq!(
            verify_token(&token, &parameters()).map(|c| c.sub),
            Err(JwtError::InvalidAudience)
        );
    }

    #[test]
    fn test_verify_expired_token_beyond_clock_skew() {
        let expired = get_current_timestamp() - DEFAULT_CLOCK_SKEW.as_secs() - 60;
        let token = create_token("X", "X", expired, b"secret");

        assert_eq!(
            verify_token(&token, &parameters()).map(|c| c.sub),
            Err(JwtError::TokenExpired)
        );
    }

    #[test]
    fn test_verify_recently_expired_token_within_clock_skew() {
        let token = create_token("X", "X", get_current_timestamp() - 30, b"secret");
        assert!(verify_token(&token, &parameters()).is_ok());
    }

    #[test]
    fn test_unconfigured_issuer_rejects_every_token() {
        let token = create_token("X", "X", in_one_hour(), b"secret");
        let parameters = TokenValidationParameters::symmetric(None, None, "secret");

        assert_eq!(
            verify_token(&token, &parameters).map(|c| c.sub),
            Err(JwtError::InvalidIssuer)
        );
    }

    #[test]
    fn test_verify_malformed_token() {
        assert_eq!(
            verify_token("not-a-valid-jwt", &parameters()).map(|c| c.sub),
            Err(JwtError::MalformedToken)
        );
    }

    #[test]
    fn test_verify_empty_token() {
        assert_eq!(
            verify_token("", &parameters()).map(|c| c.sub),
            Err(JwtError::MalformedToken)
        );
    }

    #[test]
    fn test_verify_empty_key() {
        let parameters = TokenValidationParameters::symmetric(Some("X".to_string()), None, "");

        match verify_token("some.jwt.token", &parameters) {
            Err(JwtError::InvalidKey(message)) => {
                assert_eq!(message, "signing key must be non-empty");
            }
            other => panic!("expected InvalidKey error, got {other:?}"),
        }
    }

    #[test]
    fn test_symmetric_parameters_use_utf8_bytes() {
        let parameters = TokenValidationParameters::symmetric(None, None, "sécret");
        assert_eq!(parameters.signing_key, "sécret".as_bytes());
        assert_eq!(parameters.clock_skew, DEFAULT_CLOCK_SKEW);
    }

    #[test]
    fn test_jwt_error_display() {
        assert_eq!(
            JwtError::InvalidSignature.to_string(),
            "invalid JWT signature"
        );
        assert_eq!(JwtError::TokenExpired.to_string(), "JWT has expired");
        assert_eq!(JwtError::InvalidIssuer.to_string(), "invalid JWT issuer");
        assert_eq!(JwtError::InvalidAudience.to_string(), "invalid JWT audience");
        assert_eq!(JwtError::MalformedToken.to_string(), "malformed JWT");
        assert_eq!(
            JwtError::MissingClaim("exp".to_string()).to_string(),
            "missing 'exp' claim in JWT"
        );
        assert_eq!(
            JwtError::InvalidKey("bad key".to_string()).to_string(),
            "invalid key: bad key"
        );
    }
}
