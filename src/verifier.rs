use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use http::{Extensions, HeaderMap, Uri};

use crate::error::AuthError;
use crate::locator::TokenLocator;
use crate::token::{JwtAuth, Token};

// Private extension key: only this module can insert or read it directly,
// so no other layer can collide with or forge an outcome.
#[derive(Clone)]
struct Outcome(Verification);

/// Terminal state of one verification pass.
///
/// Decoding is the only intermediate step and is never recorded: a pass
/// always ends in one of these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VerificationState {
    #[default]
    NoToken,
    DecodedInvalid,
    Expired,
    Valid,
}

/// Outcome of verifying one request: the decoded token, if any, and the
/// error, if any.  Exactly one outcome exists per verified request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Verification {
    pub token: Option<Token>,
    pub error: Option<AuthError>,
    state: VerificationState,
}

impl Verification {
    fn new(state: VerificationState, token: Option<Token>, error: Option<AuthError>) -> Self {
        Self { token, error, state }
    }

    /// An outcome built outside a [`Verifier`], e.g. by a custom
    /// authentication layer.  The state is derived from the pair.
    pub fn from_parts(token: Option<Token>, error: Option<AuthError>) -> Self {
        let state = match (&token, &error) {
            (_, Some(AuthError::TokenExpired)) => VerificationState::Expired,
            (None, Some(AuthError::Unauthorized)) | (None, None) => VerificationState::NoToken,
            (_, Some(_)) => VerificationState::DecodedInvalid,
            (Some(_), None) => VerificationState::Valid,
        };
        Self { token, error, state }
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none() && self.token.as_ref().is_some_and(|t| t.valid)
    }

    pub fn state(&self) -> VerificationState {
        self.state
    }

    /// Store this outcome in request extensions, replacing any earlier one.
    pub fn attach(self, extensions: &mut Extensions) {
        extensions.insert(Outcome(self));
    }

    /// The outcome stored by [`attach`](Self::attach), `None` when the
    /// request never went through a verifier.
    pub fn from_extensions(extensions: &Extensions) -> Option<&Self> {
        extensions.get::<Outcome>().map(|o| &o.0)
    }
}

/// Decoded token stored by the verifier, if any.
pub fn token_from(extensions: &Extensions) -> Option<&Token> {
    Verification::from_extensions(extensions).and_then(|v| v.token.as_ref())
}

/// Verification error stored by the verifier, if any.
pub fn error_from(extensions: &Extensions) -> Option<&AuthError> {
    Verification::from_extensions(extensions).and_then(|v| v.error.as_ref())
}

/// Locates, decodes and checks the token of each request.
///
/// The verifier never rejects anything itself: it records a
/// [`Verification`] in the request extensions and always calls the next
/// layer.  Put a [`Gate`](crate::Gate) after it to turn failures into 401s.
///
/// ```rust,no_run
/// use axum::{middleware, routing::get, Router};
/// use axum_jwtauth::{authenticate, verify, Gate, JwtAuth, JwtConfig, Verifier};
///
/// # async fn handler() {}
/// let auth = JwtAuth::new(JwtConfig::hmac("secret"));
/// let app: Router = Router::new()
///     .route("/me", get(handler))
///     .layer(middleware::from_fn_with_state(Gate::user_auth(), authenticate))
///     .layer(middleware::from_fn_with_state(Verifier::new(auth), verify));
/// ```
#[derive(Debug, Clone)]
pub struct Verifier {
    auth: Arc<JwtAuth>,
    locator: TokenLocator,
}

impl Verifier {
    pub fn new(auth: impl Into<Arc<JwtAuth>>) -> Self {
        Self {
            auth: auth.into(),
            locator: TokenLocator::new(),
        }
    }

    /// Also accept the token from these query parameters when `jwt` is absent.
    pub fn with_aliases(mut self, aliases: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.locator = TokenLocator::with_aliases(aliases);
        self
    }

    pub fn auth(&self) -> &JwtAuth {
        &self.auth
    }

    /// Run one verification pass over a request's URI and headers.
    pub fn verify_request(&self, uri: &Uri, headers: &HeaderMap) -> Verification {
        use VerificationState::*;

        let Some((raw, source)) = self.locator.locate(uri, headers) else {
            return Verification::new(NoToken, None, Some(AuthError::Unauthorized));
        };
        tracing::debug!(?source, "located token");

        let token = match self.auth.decode(&raw) {
            Ok(token) => token,
            Err(AuthError::TokenExpired) => {
                return Verification::new(Expired, None, Some(AuthError::TokenExpired));
            }
            Err(AuthError::AlgorithmMismatch) => {
                return Verification::new(DecodedInvalid, None, Some(AuthError::Unauthorized));
            }
            Err(e) => return Verification::new(DecodedInvalid, None, Some(e)),
        };

        if !token.valid || token.algorithm() != self.auth.algorithm() {
            return Verification::new(DecodedInvalid, Some(token), Some(AuthError::Unauthorized));
        }

        if token.claims.is_expired() {
            return Verification::new(Expired, Some(token), Some(AuthError::TokenExpired));
        }

        Verification::new(Valid, Some(token), None)
    }
}

/// Middleware fn for [`Verifier`]; use with
/// [`axum::middleware::from_fn_with_state`].
pub async fn verify(State(verifier): State<Verifier>, mut request: Request, next: Next) -> Response {
    let outcome = verifier.verify_request(request.uri(), request.headers());
    tracing::debug!(
        path = %request.uri().path(),
        state = ?outcome.state(),
        "verified request token"
    );
    outcome.attach(request.extensions_mut());
    next.run(request).await
}
