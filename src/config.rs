use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::{Algorithm, Validation};

use crate::error::AuthError;

const DEFAULT_TTL_MINUTES: u64 = 60;

/// Signing configuration shared by the codec and the verifier.
///
/// Build with [`new`](Self::new), [`hmac`](Self::hmac) or
/// [`from_env`](Self::from_env).  Once handed to [`JwtAuth`](crate::JwtAuth)
/// it is never mutated, so it can be read from any number of concurrent
/// requests without locking.
///
/// Keys are raw bytes: the shared secret for `HS*` algorithms, PEM text for
/// the `RS*`/`PS*`/`ES*`/`EdDSA` families.
#[derive(Clone)]
pub struct JwtConfig {
    pub algorithm: Algorithm,
    pub sign_key: Vec<u8>,
    /// Used instead of `sign_key` to check signatures when set and non-empty.
    pub verify_key: Option<Vec<u8>>,
    /// Replaces the default parser options when set.
    pub validation: Option<Validation>,
    /// Lifetime given to tokens issued by [`JwtAuth::issue_user_auth`](crate::JwtAuth::issue_user_auth)
    /// and [`JwtAuth::issue_invitation`](crate::JwtAuth::issue_invitation).
    pub ttl: Duration,
}

impl JwtConfig {
    pub fn new(algorithm: Algorithm, sign_key: impl Into<Vec<u8>>) -> Self {
        Self {
            algorithm,
            sign_key: sign_key.into(),
            verify_key: None,
            validation: None,
            ttl: ttl_from_minutes(DEFAULT_TTL_MINUTES),
        }
    }

    /// HS256 with a shared secret.
    pub fn hmac(secret: impl Into<Vec<u8>>) -> Self {
        Self::new(Algorithm::HS256, secret)
    }

    /// Build from environment variables already set in the process.
    ///
    /// | Variable          | Required | Default | Notes                               |
    /// |-------------------|----------|---------|-------------------------------------|
    /// | `JWT_SECRET`      | **yes**  | —       | HMAC secret or PEM signing key      |
    /// | `JWT_ALGORITHM`   | no       | `HS256` | Any `jsonwebtoken` algorithm name   |
    /// | `JWT_VERIFY_KEY`  | no       | *(unset)* | PEM public key for asymmetric algs |
    /// | `JWT_TTL_MINUTES` | no       | `60`    | Lifetime of issued tokens           |
    pub fn from_env() -> Result<Self, AuthError> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| AuthError::ConfigError("JWT_SECRET is not set".into()))?;

        let algorithm = match std::env::var("JWT_ALGORITHM") {
            Ok(name) if !name.is_empty() => parse_algorithm(&name)?,
            _ => Algorithm::HS256,
        };

        let verify_key = std::env::var("JWT_VERIFY_KEY")
            .ok()
            .filter(|v| !v.is_empty())
            .map(String::into_bytes);

        let ttl_minutes = std::env::var("JWT_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TTL_MINUTES);

        Ok(Self {
            algorithm,
            sign_key: secret.into_bytes(),
            verify_key,
            validation: None,
            ttl: ttl_from_minutes(ttl_minutes),
        })
    }

    pub fn verify_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.verify_key = Some(key.into());
        self
    }

    /// Custom parser options.  The configured algorithm is always the only
    /// one accepted, whatever `validation.algorithms` says.
    pub fn validation(mut self, v: Validation) -> Self {
        self.validation = Some(v);
        self
    }

    pub fn ttl(mut self, v: Duration) -> Self {
        self.ttl = v;
        self
    }

    /// Key used to check signatures: the verify key when present and
    /// non-empty, otherwise the signing key.
    pub fn resolve_verify_key(&self) -> &[u8] {
        match &self.verify_key {
            Some(key) if !key.is_empty() => key,
            _ => &self.sign_key,
        }
    }

    /// Parser options in effect for decoding.  `validate_exp` states whether
    /// expiry is enforced; [`JwtAuth::decode`](crate::JwtAuth::decode) checks
    /// it on the decoded claims rather than leaving it to `jsonwebtoken`.
    pub(crate) fn effective_validation(&self) -> Validation {
        let mut validation = match &self.validation {
            Some(v) => v.clone(),
            None => {
                let mut v = Validation::new(self.algorithm);
                v.leeway = 0;
                v.validate_aud = false;
                v.required_spec_claims.clear();
                v
            }
        };
        validation.algorithms = vec![self.algorithm];
        validation
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("algorithm", &self.algorithm)
            .field("verify_key", &self.verify_key.as_ref().map(|_| "<redacted>"))
            .field("validation", &self.validation)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

fn ttl_from_minutes(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}

/// Parse an algorithm name such as `HS256` or `RS512`.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, AuthError> {
    Algorithm::from_str(name)
        .map_err(|_| AuthError::ConfigError(format!("unknown signing algorithm {name:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_key_takes_precedence() {
        let cfg = JwtConfig::hmac("sign").verify_key("verify");
        assert_eq!(cfg.resolve_verify_key(), b"verify");
    }

    #[test]
    fn empty_verify_key_falls_back_to_sign_key() {
        let cfg = JwtConfig::hmac("sign").verify_key(Vec::new());
        assert_eq!(cfg.resolve_verify_key(), b"sign");
    }

    #[test]
    fn default_validation_requires_nothing() {
        let v = JwtConfig::new(Algorithm::HS384, "s").effective_validation();
        assert_eq!(v.algorithms, vec![Algorithm::HS384]);
        assert_eq!(v.leeway, 0);
        assert!(v.required_spec_claims.is_empty());
        assert!(v.validate_exp);
    }

    #[test]
    fn custom_validation_is_pinned_to_algorithm() {
        let mut custom = Validation::new(Algorithm::HS512);
        custom.leeway = 30;
        let v = JwtConfig::hmac("s").validation(custom).effective_validation();
        assert_eq!(v.algorithms, vec![Algorithm::HS256]);
        assert_eq!(v.leeway, 30);
    }

    #[test]
    fn debug_hides_keys() {
        let out = format!("{:?}", JwtConfig::hmac("hunter2").verify_key("pubkey"));
        assert!(!out.contains("hunter2"));
        assert!(!out.contains("pubkey"));
    }

    #[test]
    fn ttl_minutes_saturate() {
        assert_eq!(ttl_from_minutes(60), Duration::from_secs(3600));
        assert_eq!(ttl_from_minutes(u64::MAX), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn unknown_algorithm_rejected() {
        assert!(matches!(parse_algorithm("HS999"), Err(AuthError::ConfigError(_))));
        assert_eq!(parse_algorithm("RS256").unwrap(), Algorithm::RS256);
    }
}
