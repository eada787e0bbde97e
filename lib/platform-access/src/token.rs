//! Session token issuance and verification.
//!
//! Session tokens are compact JWTs signed with an HMAC algorithm keyed by the
//! gateway secret. They carry a copy of the [`Identity`] plus the standard
//! temporal claims, so verifying one needs no server-side lookup.
//!
//! Verification is a pure function of the token string, the secret and the
//! supplied clock reading. Tokens declaring any non-HMAC algorithm are
//! rejected before the signature is checked, which rules out
//! algorithm-confusion forgeries using a public key as an HMAC secret.
//!
//! A token stays valid until its natural expiry; there is no revocation.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::{ConfigError, TokenError};
use crate::identity::{Identity, Provider};
use crate::role::RoleSet;

/// Issuer claim stamped on every token this gateway signs.
pub const TOKEN_ISSUER: &str = "iag";

/// Algorithms accepted on verification.
pub const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub roles: Vec<String>,
    pub provider: Provider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    pub exp: i64,
    pub iat: i64,
    pub nbf: i64,
    pub iss: String,
    pub sub: String,
}

impl SessionClaims {
    /// Rebuilds the identity carried by these claims.
    ///
    /// The identity's materialization time is the token's issue time.
    #[must_use]
    pub fn into_identity(self) -> Identity {
        let created = DateTime::<Utc>::from_timestamp(self.iat, 0).unwrap_or_else(Utc::now);
        Identity::new(
            self.user_id,
            self.email,
            self.name,
            self.provider,
            RoleSet::from_names(self.roles),
        )
        .with_picture(self.picture)
        .with_created(created)
    }
}

/// Issues and verifies session tokens with a fixed secret and lifetime.
#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    /// Creates an HS256 codec.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is empty, or the lifetime is not
    /// positive or puts expiry beyond the representable date range.
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::MissingSetting {
                setting: "token.secret".to_string(),
            });
        }
        if ttl <= Duration::zero() {
            return Err(ConfigError::InvalidSetting {
                setting: "token.ttl".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if Utc::now().checked_add_signed(ttl).is_none() {
            return Err(ConfigError::InvalidSetting {
                setting: "token.ttl".to_string(),
                reason: "out of range".to_string(),
            });
        }

        // Temporal claims are checked against the caller's clock in
        // `verify_at`, so the library only checks they are present.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iat", "nbf", "iss", "sub"]);

        Ok(Self {
            algorithm: Algorithm::HS256,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        })
    }

    /// Selects the HMAC algorithm used for signing.
    ///
    /// # Errors
    ///
    /// Returns an error for any algorithm outside HS256/HS384/HS512.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Result<Self, ConfigError> {
        if !HMAC_ALGORITHMS.contains(&algorithm) {
            return Err(ConfigError::InvalidSetting {
                setting: "token.algorithm".to_string(),
                reason: format!("{algorithm:?} is not an HMAC algorithm"),
            });
        }
        self.algorithm = algorithm;
        Ok(self)
    }

    /// Returns the signing algorithm.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Returns the token lifetime.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for `identity` valid from now until now + ttl.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if the signing primitive fails.
    pub fn issue(&self, identity: &Identity) -> Result<String, Report<TokenError>> {
        self.issue_at(identity, Utc::now())
    }

    /// Issues a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if the signing primitive fails or the
    /// expiry falls outside the representable date range.
    pub fn issue_at(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<String, Report<TokenError>> {
        let issued_at = now.timestamp();
        let expires_at = now.checked_add_signed(self.ttl).ok_or_else(|| TokenError::Signing {
            reason: "token expiry out of range".to_string(),
        })?;
        let claims = SessionClaims {
            user_id: identity.id().to_string(),
            email: identity.email().to_string(),
            name: identity.name().to_string(),
            roles: identity.roles().to_vec(),
            provider: identity.provider(),
            picture: identity.picture().map(str::to_string),
            exp: expires_at.timestamp(),
            iat: issued_at,
            nbf: issued_at,
            iss: TOKEN_ISSUER.to_string(),
            sub: identity.id().to_string(),
        };

        let token = jsonwebtoken::encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing {
                reason: e.to_string(),
            })?;
        Ok(token)
    }

    /// Verifies a token against the current time.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenError`] describing why the token is not valid.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, Report<TokenError>> {
        self.verify_at(token, Utc::now())
    }

    /// Verifies a token as if the current time were `now`.
    ///
    /// A token is still valid at the exact second it expires.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenError`] describing why the token is not valid.
    pub fn verify_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionClaims, Report<TokenError>> {
        let data =
            jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
                .map_err(|e| classify(token, &e))?;
        let claims = data.claims;

        let now = now.timestamp();
        if now > claims.exp {
            debug!(sub = %claims.sub, exp = claims.exp, "rejecting expired token");
            return Err(TokenError::Expired.into());
        }
        if now < claims.nbf {
            debug!(sub = %claims.sub, nbf = claims.nbf, "rejecting token used before nbf");
            return Err(TokenError::NotYetValid.into());
        }

        Ok(claims)
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

fn classify(token: &str, err: &JwtError) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::MissingAlgorithm => {
            let algorithm = jsonwebtoken::decode_header(token)
                .map(|header| format!("{:?}", header.alg))
                .unwrap_or_else(|_| "unknown".to_string());
            TokenError::UnsupportedAlgorithm { algorithm }
        }
        ErrorKind::InvalidIssuer => TokenError::InvalidIssuer,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::ImmatureSignature => TokenError::NotYetValid,
        _ => TokenError::Malformed {
            reason: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Role;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    const SECRET: &[u8] = b"test-signing-secret";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET, Duration::hours(1)).expect("codec")
    }

    fn identity() -> Identity {
        Identity::new(
            "user-123".to_string(),
            "alice@example.com".to_string(),
            "Alice".to_string(),
            Provider::Google,
            RoleSet::from_roles([Role::Admin, Role::User]),
        )
        .with_picture(Some("https://example.com/alice.png".to_string()))
    }

    fn reason(result: Result<SessionClaims, Report<TokenError>>) -> TokenError {
        result
            .expect_err("token should be rejected")
            .current_context()
            .clone()
    }

    #[test]
    fn verify_returns_issued_identity() {
        let codec = codec();
        let identity = identity();
        let token = codec.issue(&identity).expect("issue");

        let claims = codec.verify(&token).expect("verify");
        assert_eq!(claims.user_id, "user-123");
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.iss, TOKEN_ISSUER);
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.name, "Alice");
        assert_eq!(claims.provider, Provider::Google);
        assert_eq!(claims.roles, vec!["admin", "user"]);
        assert_eq!(claims.iat, claims.nbf);
        assert_eq!(claims.exp - claims.iat, 3600);

        let decoded = claims.into_identity();
        assert_eq!(decoded.id(), identity.id());
        assert_eq!(decoded.email(), identity.email());
        assert_eq!(decoded.name(), identity.name());
        assert_eq!(decoded.picture(), identity.picture());
        assert_eq!(decoded.provider(), identity.provider());
        assert_eq!(decoded.roles(), identity.roles());
    }

    #[test]
    fn token_has_three_segments() {
        let token = codec().issue(&identity()).expect("issue");
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let codec = codec();
        let token = codec.issue(&identity()).expect("issue");
        let (body, signature) = token.rsplit_once('.').expect("signature segment");

        for index in [0, signature.len() / 2] {
            let mut chars: Vec<char> = signature.chars().collect();
            chars[index] = if chars[index] == 'A' { 'B' } else { 'A' };
            let tampered = format!("{body}.{}", chars.into_iter().collect::<String>());
            assert_eq!(
                reason(codec.verify(&tampered)),
                TokenError::InvalidSignature
            );
        }
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let codec = codec();
        let token = codec.issue(&identity()).expect("issue");
        let parts: Vec<&str> = token.split('.').collect();

        let forged_claims = json!({
            "user_id": "user-123", "email": "alice@example.com", "name": "Alice",
            "roles": ["admin"], "provider": "google",
            "exp": i64::MAX / 2, "iat": 0, "nbf": 0, "iss": TOKEN_ISSUER, "sub": "user-123",
        });
        let forged = format!(
            "{}.{}.{}",
            parts[0],
            URL_SAFE_NO_PAD.encode(forged_claims.to_string()),
            parts[2]
        );
        assert_eq!(reason(codec.verify(&forged)), TokenError::InvalidSignature);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = codec().issue(&identity()).expect("issue");
        let other = TokenCodec::new(b"another-secret", Duration::hours(1)).expect("codec");
        assert_eq!(reason(other.verify(&token)), TokenError::InvalidSignature);
    }

    #[test]
    fn asymmetric_algorithm_header_is_rejected() {
        let codec = codec();
        let token = codec.issue(&identity()).expect("issue");
        let (_, rest) = token.split_once('.').expect("header segment");
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
        let confused = format!("{header}.{rest}");

        assert_eq!(
            reason(codec.verify(&confused)),
            TokenError::UnsupportedAlgorithm {
                algorithm: "RS256".to_string()
            }
        );
    }

    #[test]
    fn unsigned_token_is_rejected() {
        let codec = codec();
        let token = codec.issue(&identity()).expect("issue");
        let parts: Vec<&str> = token.split('.').collect();
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let unsigned = format!("{header}.{}.", parts[1]);

        assert!(codec.verify(&unsigned).is_err());
    }

    #[test]
    fn other_hmac_algorithms_verify() {
        let hs512 = codec().with_algorithm(Algorithm::HS512).expect("hs512");
        let token = hs512.issue(&identity()).expect("issue");
        assert!(codec().verify(&token).is_ok());
    }

    #[test]
    fn non_hmac_signing_algorithm_is_refused() {
        let err = codec()
            .with_algorithm(Algorithm::RS256)
            .expect_err("refused");
        assert!(matches!(err, ConfigError::InvalidSetting { .. }));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            reason(codec().verify("not-a-token")),
            TokenError::Malformed { .. }
        ));
    }

    #[test]
    fn expiry_boundaries() {
        let codec = TokenCodec::new(SECRET, Duration::seconds(60)).expect("codec");
        let issued = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).expect("timestamp");
        let token = codec.issue_at(&identity(), issued).expect("issue");

        assert!(codec.verify_at(&token, issued).is_ok());
        assert!(
            codec
                .verify_at(&token, issued + Duration::seconds(60))
                .is_ok()
        );
        assert_eq!(
            reason(codec.verify_at(&token, issued + Duration::seconds(61))),
            TokenError::Expired
        );
        assert_eq!(
            reason(codec.verify_at(&token, issued - Duration::seconds(1))),
            TokenError::NotYetValid
        );
    }

    #[test]
    fn token_issued_long_ago_is_expired_now() {
        let codec = codec();
        let token = codec
            .issue_at(&identity(), Utc::now() - Duration::days(1))
            .expect("issue");
        assert_eq!(reason(codec.verify(&token)), TokenError::Expired);
    }

    #[test]
    fn foreign_issuer_is_rejected() {
        let now = Utc::now().timestamp();
        let claims = json!({
            "user_id": "u", "email": "", "name": "", "roles": ["user"], "provider": "okta",
            "exp": now + 60, "iat": now, "nbf": now, "iss": "someone-else", "sub": "u",
        });
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .expect("encode");

        assert_eq!(reason(codec().verify(&token)), TokenError::InvalidIssuer);
    }

    #[test]
    fn decoded_identity_defaults_empty_roles() {
        let claims = SessionClaims {
            user_id: "u".to_string(),
            email: String::new(),
            name: String::new(),
            roles: vec![],
            provider: Provider::Azure,
            picture: None,
            exp: 10,
            iat: 0,
            nbf: 0,
            iss: TOKEN_ISSUER.to_string(),
            sub: "u".to_string(),
        };
        let identity = claims.into_identity();
        assert!(identity.roles().contains("user"));
        assert_eq!(identity.created().timestamp(), 0);
    }

    #[test]
    fn constructor_rejects_bad_settings() {
        assert!(TokenCodec::new(b"", Duration::hours(1)).is_err());
        assert!(TokenCodec::new(SECRET, Duration::zero()).is_err());
    }

    #[test]
    fn constructor_rejects_unrepresentable_ttl() {
        let err = TokenCodec::new(SECRET, Duration::hours(2_400_000_000)).expect_err("too long");
        assert!(matches!(
            err,
            ConfigError::InvalidSetting { setting, .. } if setting == "token.ttl"
        ));
    }

    #[test]
    fn expiry_past_date_range_is_a_signing_error() {
        let codec = TokenCodec::new(SECRET, Duration::hours(2)).expect("codec");
        let near_end = DateTime::<Utc>::MAX_UTC - Duration::hours(1);

        let err = codec
            .issue_at(&identity(), near_end)
            .expect_err("out of range");
        assert!(matches!(err.current_context(), TokenError::Signing { .. }));
    }

    #[test]
    fn debug_output_hides_secret() {
        let rendered = format!("{:?}", codec());
        assert!(!rendered.contains("test-signing-secret"));
    }
}
