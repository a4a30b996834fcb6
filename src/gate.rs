use std::borrow::Cow;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::request::Parts;
use http::Extensions;
use serde_json::Value;

use crate::claims::{TokenType, TYPE};
use crate::error::{AuthError, ErrorBody};
use crate::token::Token;
use crate::verifier::Verification;

/// Why a [`Gate`] refused a request.  Always rendered as a 401.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GateRejection {
    /// The verifier recorded an error.
    #[error("Token not found. You are not allowed to proceed without token.")]
    Verification(AuthError),

    #[error("token is not valid or does not exist")]
    NotValid,

    #[error("Token is not valid. {0} is undefined")]
    ClaimUndefined(String),

    #[error("{0}")]
    ClaimMismatch(String),
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        ErrorBody::respond(StatusCode::UNAUTHORIZED, self.to_string())
    }
}

/// Requires a verified token whose claim `claim` equals `expected`.
///
/// One gate type serves every token kind; the presets differ only in the
/// expected literal:
///
/// | Preset                       | Claim  | Expected     |
/// |------------------------------|--------|--------------|
/// | [`user_auth`](Self::user_auth)   | `type` | `userauth`   |
/// | [`invitation`](Self::invitation) | `type` | `invitation` |
///
/// Reads the [`Verification`] left by the verifier and never modifies it.
#[derive(Debug, Clone)]
pub struct Gate {
    claim: Cow<'static, str>,
    expected: Cow<'static, str>,
    mismatch: Cow<'static, str>,
}

impl Gate {
    pub fn new(
        claim: impl Into<Cow<'static, str>>,
        expected: impl Into<Cow<'static, str>>,
        mismatch: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            claim: claim.into(),
            expected: expected.into(),
            mismatch: mismatch.into(),
        }
    }

    /// General access: `type` must be `userauth`.
    pub fn user_auth() -> Self {
        Self::for_type(TokenType::UserAuth, "Token is not an user auth one")
    }

    /// User creation: `type` must be `invitation`.
    pub fn invitation() -> Self {
        Self::for_type(TokenType::Invitation, "Token is not an invitation one")
    }

    fn for_type(kind: TokenType, mismatch: &'static str) -> Self {
        Self::new(TYPE, kind.as_str(), mismatch)
    }

    pub fn claim(&self) -> &str {
        &self.claim
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// Decide on the outcome stored in `extensions`.
    pub fn check(&self, extensions: &Extensions) -> Result<(), GateRejection> {
        let outcome = Verification::from_extensions(extensions);

        if let Some(err) = outcome.and_then(|v| v.error.as_ref()) {
            return Err(GateRejection::Verification(err.clone()));
        }

        let token = outcome
            .and_then(|v| v.token.as_ref())
            .filter(|t| t.valid)
            .ok_or(GateRejection::NotValid)?;

        match token.claims.get(&self.claim) {
            None => Err(GateRejection::ClaimUndefined(self.claim_label())),
            Some(Value::String(v)) if *v == self.expected => Ok(()),
            Some(_) => Err(GateRejection::ClaimMismatch(self.mismatch.to_string())),
        }
    }

    fn claim_label(&self) -> String {
        let mut chars = self.claim.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Middleware fn for [`Gate`]; use with
/// [`axum::middleware::from_fn_with_state`] inside a verifier layer.
pub async fn authenticate(State(gate): State<Gate>, request: Request, next: Next) -> Response {
    match gate.check(request.extensions()) {
        Ok(()) => next.run(request).await,
        Err(rejection) => {
            tracing::warn!(
                path = %request.uri().path(),
                claim = %gate.claim,
                expected = %gate.expected,
                reason = %rejection,
                "rejected request"
            );
            rejection.into_response()
        }
    }
}

/// Extractor for handlers behind a gate: the verified token.
///
/// ```rust
/// use axum_jwtauth::VerifiedToken;
///
/// async fn me(VerifiedToken(token): VerifiedToken) -> String {
///     token.claims.get_str("name").unwrap_or("anonymous").to_owned()
/// }
/// ```
#[derive(Debug, Clone)]
pub struct VerifiedToken(pub Token);

impl<S> FromRequestParts<S> for VerifiedToken
where
    S: Send + Sync,
{
    type Rejection = GateRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let outcome = Verification::from_extensions(&parts.extensions)
            .filter(|v| v.is_valid())
            .ok_or(GateRejection::NotValid)?;

        outcome
            .token
            .clone()
            .map(VerifiedToken)
            .ok_or(GateRejection::NotValid)
    }
}
