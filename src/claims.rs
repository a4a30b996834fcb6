use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AuthError;

/// Claim key holding the expiry instant (epoch seconds).
pub const EXP: &str = "exp";
/// Claim key holding the issued-at instant (epoch seconds).
pub const IAT: &str = "iat";
/// Claim key holding the not-before instant (epoch seconds).
pub const NBF: &str = "nbf";
/// Claim key a [`Gate`](crate::Gate) inspects by default.
pub const TYPE: &str = "type";

/// The kinds of token this service issues, stored in the `type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// General access token for an authenticated user.
    UserAuth,
    /// Single-purpose token allowing creation of a new user.
    Invitation,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::UserAuth => "userauth",
            TokenType::Invitation => "invitation",
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A JWT claim set: string keys to arbitrary JSON values.
///
/// Serializes as a plain JSON object, so application claims sit next to
/// the reserved ones (`exp`, `iat`, `type`).  Setters take and return
/// `self` so they chain:
///
/// ```rust
/// use std::time::Duration;
/// use axum_jwtauth::{Claims, TokenType};
///
/// let claims = Claims::new()
///     .set_type(TokenType::UserAuth)
///     .set("name", "ada")
///     .set_issued_now()
///     .set_expiry_in(Duration::from_secs(3600));
///
/// assert_eq!(claims.get_str("name"), Some("ada"));
/// assert!(claims.expiry().is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// In-place variant of [`set`](Self::set).
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The claim as a string, `None` when absent or not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn set_type(self, kind: TokenType) -> Self {
        self.set(TYPE, kind.as_str())
    }

    pub fn token_type(&self) -> Option<&str> {
        self.get_str(TYPE)
    }

    pub fn set_issued_at(self, at: SystemTime) -> Self {
        self.set(IAT, to_epoch(at))
    }

    pub fn set_issued_now(self) -> Self {
        self.set(IAT, epoch_now())
    }

    pub fn set_expiry(self, at: SystemTime) -> Self {
        self.set(EXP, to_epoch(at))
    }

    /// Set `exp` to `ttl` from now.
    pub fn set_expiry_in(self, ttl: Duration) -> Self {
        self.set(EXP, expire_in(ttl))
    }

    /// `exp` as epoch seconds.  Integer and floating-point encodings are
    /// both accepted; `None` when absent or not numeric.
    pub fn expiry(&self) -> Option<i64> {
        self.numeric(EXP)
    }

    pub fn issued_at(&self) -> Option<i64> {
        self.numeric(IAT)
    }

    pub fn not_before(&self) -> Option<i64> {
        self.numeric(NBF)
    }

    /// True when `exp` is present and strictly before now.
    pub fn is_expired(&self) -> bool {
        self.expiry().is_some_and(|exp| exp < epoch_now())
    }

    /// Standard time-claim validity: `exp` not past, `iat` and `nbf` not
    /// in the future.  Absent claims are not an error.
    pub fn validate(&self) -> Result<(), AuthError> {
        let now = epoch_now();
        if self.is_expired() {
            return Err(AuthError::TokenExpired);
        }
        if self.issued_at().is_some_and(|iat| iat > now) {
            return Err(AuthError::InvalidClaim("token used before issued".into()));
        }
        if self.not_before().is_some_and(|nbf| nbf > now) {
            return Err(AuthError::InvalidClaim("token is not valid yet".into()));
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    fn numeric(&self, key: &str) -> Option<i64> {
        let value = self.0.get(key)?;
        value
            .as_i64()
            .or_else(|| value.as_u64().and_then(|v| i64::try_from(v).ok()))
            .or_else(|| value.as_f64().map(|v| v as i64))
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Current UTC time as epoch seconds.
pub fn epoch_now() -> i64 {
    to_epoch(SystemTime::now())
}

/// Epoch seconds `ttl` from now, for the `exp` claim.
pub fn expire_in(ttl: Duration) -> i64 {
    epoch_now().saturating_add(secs(ttl))
}

fn to_epoch(at: SystemTime) -> i64 {
    match at.duration_since(UNIX_EPOCH) {
        Ok(d) => secs(d),
        Err(e) => -secs(e.duration()),
    }
}

// Clamped rather than wrapped, so a huge duration never turns negative.
fn secs(d: Duration) -> i64 {
    i64::try_from(d.as_secs()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expiry_accepts_float_encoding() {
        let claims = Claims::new().set(EXP, 1_700_000_000.0_f64);
        assert_eq!(claims.expiry(), Some(1_700_000_000));
    }

    #[test]
    fn non_numeric_expiry_is_ignored() {
        let claims = Claims::new().set(EXP, "tomorrow");
        assert_eq!(claims.expiry(), None);
        assert!(!claims.is_expired());
    }

    #[test]
    fn expired_in_the_past() {
        let past = SystemTime::now() - Duration::from_secs(60);
        let claims = Claims::new().set_expiry(past);
        assert!(claims.is_expired());
        assert_eq!(claims.validate(), Err(AuthError::TokenExpired));
    }

    #[test]
    fn future_iat_fails_validation() {
        let future = SystemTime::now() + Duration::from_secs(600);
        let claims = Claims::new().set_issued_at(future);
        assert!(matches!(claims.validate(), Err(AuthError::InvalidClaim(_))));
    }

    #[test]
    fn type_claim_uses_wire_literal() {
        let claims = Claims::new().set_type(TokenType::Invitation);
        assert_eq!(claims.token_type(), Some("invitation"));
        assert_eq!(serde_json::to_value(&claims).unwrap(), json!({ "type": "invitation" }));
    }

    #[test]
    fn huge_ttl_saturates() {
        assert_eq!(expire_in(Duration::from_secs(u64::MAX)), i64::MAX);
        assert!(!Claims::new().set_expiry_in(Duration::MAX).is_expired());
    }

    #[test]
    fn map_access() {
        let claims = Claims::new().set("name", "ada").set_type(TokenType::UserAuth);
        assert!(claims.contains("name"));
        assert!(!claims.contains(EXP));
        assert_eq!(claims.len(), 2);

        let map = claims.into_inner();
        assert_eq!(map["type"], json!("userauth"));
        assert_eq!(Claims::from(map).get_str("name"), Some("ada"));
    }

    #[test]
    fn pre_epoch_times_are_negative() {
        let before = UNIX_EPOCH - Duration::from_secs(10);
        let claims = Claims::new().set_issued_at(before);
        assert_eq!(claims.issued_at(), Some(-10));
    }
}
