use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData,
};

use crate::claims::{epoch_now, Claims, TokenType};
use crate::config::JwtConfig;
use crate::error::AuthError;

/// A signed token together with its decoded claims.
///
/// `valid` is only ever set by [`JwtAuth::decode`]; tokens produced by
/// [`JwtAuth::encode`] carry their raw form but have not been verified.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub raw: String,
    pub header: Header,
    pub claims: Claims,
    pub valid: bool,
}

impl Token {
    /// Signing method named in the token header.
    pub fn algorithm(&self) -> Algorithm {
        self.header.alg
    }
}

/// Token codec bound to one immutable [`JwtConfig`].
///
/// Share it behind an `Arc`; every method takes `&self`.
#[derive(Debug, Clone)]
pub struct JwtAuth {
    config: JwtConfig,
}

impl JwtAuth {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    pub fn algorithm(&self) -> Algorithm {
        self.config.algorithm
    }

    /// Sign `claims` with the configured algorithm and signing key.
    ///
    /// Returns the token handle and its compact form.  Fails when the
    /// signing key cannot be used with the configured algorithm.
    pub fn encode(&self, claims: Claims) -> Result<(Token, String), AuthError> {
        let key = self.encoding_key()?;
        let header = Header::new(self.config.algorithm);
        let raw = encode(&header, &claims, &key).map_err(|e| {
            tracing::error!(algorithm = ?self.config.algorithm, error = %e, "failed to sign token");
            AuthError::from(e)
        })?;

        let token = Token {
            raw: raw.clone(),
            header,
            claims,
            valid: false,
        };
        Ok((token, raw))
    }

    /// Parse and verify a compact token.
    ///
    /// The signature is checked with the verify key when one is configured,
    /// else with the signing key.  An `exp` in the past yields
    /// [`AuthError::TokenExpired`]; an unparseable string yields
    /// [`AuthError::MalformedToken`]; a header naming another algorithm
    /// yields [`AuthError::AlgorithmMismatch`].
    pub fn decode(&self, token: &str) -> Result<Token, AuthError> {
        let key = self.decoding_key()?;
        let mut validation = self.config.effective_validation();
        // `jsonwebtoken` reads `exp` as unsigned; expiry is checked on the
        // decoded claims instead so a negative `exp` still counts as expired.
        let check_exp = std::mem::replace(&mut validation.validate_exp, false);
        let TokenData { header, claims } = decode::<Claims>(token, &key, &validation)?;

        if check_exp && expired(&claims, validation.leeway) {
            return Err(AuthError::TokenExpired);
        }

        Ok(Token {
            raw: token.to_owned(),
            header,
            claims,
            valid: true,
        })
    }

    /// Issue a `userauth` token for `claims`, stamped with `iat` now and
    /// `exp` one TTL from now.
    pub fn issue_user_auth(&self, claims: Claims) -> Result<String, AuthError> {
        self.issue(claims.set_type(TokenType::UserAuth))
    }

    /// Issue an `invitation` token allowing `email` to create an account in
    /// `organisation`.
    pub fn issue_invitation(&self, email: &str, organisation: &str) -> Result<String, AuthError> {
        if email.is_empty() {
            return Err(AuthError::InvalidClaim("email must not be empty".into()));
        }
        let claims = Claims::new()
            .set_type(TokenType::Invitation)
            .set("email", email)
            .set("organisation", organisation);
        self.issue(claims)
    }

    fn issue(&self, claims: Claims) -> Result<String, AuthError> {
        let claims = claims.set_issued_now().set_expiry_in(self.config.ttl);
        self.encode(claims).map(|(_, raw)| raw)
    }

    fn encoding_key(&self) -> Result<EncodingKey, AuthError> {
        let key = &self.config.sign_key;
        if key.is_empty() {
            return Err(AuthError::ConfigError("signing key must not be empty".into()));
        }
        let key = match self.config.algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => EncodingKey::from_secret(key),
            Algorithm::ES256 | Algorithm::ES384 => EncodingKey::from_ec_pem(key)?,
            Algorithm::EdDSA => EncodingKey::from_ed_pem(key)?,
            _ => EncodingKey::from_rsa_pem(key)?,
        };
        Ok(key)
    }

    fn decoding_key(&self) -> Result<DecodingKey, AuthError> {
        let key = self.config.resolve_verify_key();
        if key.is_empty() {
            return Err(AuthError::ConfigError("verify key must not be empty".into()));
        }
        let key = match self.config.algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => DecodingKey::from_secret(key),
            Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(key)?,
            Algorithm::EdDSA => DecodingKey::from_ed_pem(key)?,
            _ => DecodingKey::from_rsa_pem(key)?,
        };
        Ok(key)
    }
}

fn expired(claims: &Claims, leeway: u64) -> bool {
    let leeway = i64::try_from(leeway).unwrap_or(i64::MAX);
    claims
        .expiry()
        .is_some_and(|exp| exp.saturating_add(leeway) < epoch_now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{EXP, IAT};
    use std::time::Duration;

    fn auth() -> JwtAuth {
        JwtAuth::new(JwtConfig::hmac("test-secret"))
    }

    #[test]
    fn roundtrip_preserves_claims() {
        let claims = Claims::new()
            .set_type(TokenType::UserAuth)
            .set("name", "ada")
            .set("admin", true)
            .set_issued_now()
            .set_expiry_in(Duration::from_secs(600));

        let (token, raw) = auth().encode(claims.clone()).unwrap();
        assert_eq!(token.raw, raw);
        assert!(!token.valid);

        let decoded = auth().decode(&raw).unwrap();
        assert!(decoded.valid);
        assert_eq!(decoded.algorithm(), Algorithm::HS256);
        assert_eq!(decoded.claims, claims);
        assert_eq!(decoded.claims.get(IAT), claims.get(IAT));
    }

    #[test]
    fn float_expiry_survives_numerically() {
        let exp = (epoch_now() + 600) as f64;
        let (_, raw) = auth().encode(Claims::new().set(EXP, exp)).unwrap();
        let decoded = auth().decode(&raw).unwrap();
        assert_eq!(decoded.claims.expiry(), Some(exp as i64));
    }

    #[test]
    fn wrong_secret_rejected() {
        let (_, raw) = JwtAuth::new(JwtConfig::hmac("good"))
            .encode(Claims::new())
            .unwrap();
        let err = JwtAuth::new(JwtConfig::hmac("bad")).decode(&raw).unwrap_err();
        assert_eq!(err, AuthError::InvalidSignature);
    }

    #[test]
    fn verify_key_used_for_decoding() {
        let (_, raw) = JwtAuth::new(JwtConfig::hmac("shared")).encode(Claims::new()).unwrap();
        let auth = JwtAuth::new(JwtConfig::hmac("other").verify_key("shared"));
        assert!(auth.decode(&raw).is_ok());
    }

    #[test]
    fn expired_token_reported_as_expired() {
        let claims = Claims::new().set(EXP, epoch_now() - 120);
        let (_, raw) = auth().encode(claims).unwrap();
        assert_eq!(auth().decode(&raw).unwrap_err(), AuthError::TokenExpired);
    }

    #[test]
    fn negative_expiry_is_expired() {
        let (_, raw) = auth().encode(Claims::new().set(EXP, -5)).unwrap();
        assert_eq!(auth().decode(&raw).unwrap_err(), AuthError::TokenExpired);
    }

    #[test]
    fn leeway_applies_to_expiry() {
        let mut validation = jsonwebtoken::Validation::new(Algorithm::HS256);
        validation.leeway = 300;
        let lenient = JwtAuth::new(JwtConfig::hmac("test-secret").validation(validation));

        let (_, raw) = auth().encode(Claims::new().set(EXP, epoch_now() - 60)).unwrap();
        assert!(lenient.decode(&raw).is_ok());
        assert_eq!(auth().decode(&raw).unwrap_err(), AuthError::TokenExpired);
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            auth().decode("not-a-token"),
            Err(AuthError::MalformedToken(_))
        ));
    }

    #[test]
    fn other_algorithm_is_a_mismatch() {
        let hs512 = JwtAuth::new(JwtConfig::new(Algorithm::HS512, "test-secret"));
        let (_, raw) = hs512.encode(Claims::new()).unwrap();
        assert_eq!(auth().decode(&raw).unwrap_err(), AuthError::AlgorithmMismatch);
    }

    #[test]
    fn unusable_key_fails_encode() {
        let rsa = JwtAuth::new(JwtConfig::new(Algorithm::RS256, "not a pem"));
        assert!(matches!(
            rsa.encode(Claims::new()),
            Err(AuthError::InvalidKey(_) | AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn empty_secret_is_config_error() {
        let auth = JwtAuth::new(JwtConfig::hmac(""));
        assert!(matches!(auth.encode(Claims::new()), Err(AuthError::ConfigError(_))));
    }

    #[test]
    fn invitation_carries_email_and_organisation() {
        let raw = auth().issue_invitation("new@example.com", "acme").unwrap();
        let token = auth().decode(&raw).unwrap();
        assert_eq!(token.claims.token_type(), Some("invitation"));
        assert_eq!(token.claims.get_str("email"), Some("new@example.com"));
        assert_eq!(token.claims.get_str("organisation"), Some("acme"));
        assert!(token.claims.expiry().unwrap() > epoch_now());
    }

    #[test]
    fn invitation_requires_email() {
        assert!(matches!(
            auth().issue_invitation("", "acme"),
            Err(AuthError::InvalidClaim(_))
        ));
    }

    #[test]
    fn user_auth_stamps_type_and_times() {
        let raw = auth().issue_user_auth(Claims::new().set("name", "ada")).unwrap();
        let token = auth().decode(&raw).unwrap();
        assert_eq!(token.claims.token_type(), Some("userauth"));
        assert!(token.claims.issued_at().is_some());
        assert!(token.claims.validate().is_ok());
    }
}
