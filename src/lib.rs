//! # axum-jwtauth
//!
//! Request-scoped JWT verification for [Axum](https://docs.rs/axum), split
//! in two layers:
//!
//! * [`Verifier`] finds the token (query `jwt`, alias parameters,
//!   `Authorization: Bearer`, `jwt` cookie), decodes it, checks algorithm
//!   and expiry, and records a [`Verification`] in the request extensions.
//!   It never rejects a request.
//! * [`Gate`] reads that outcome and answers 401 unless the token is valid
//!   and carries the expected claim value (`type = userauth` for general
//!   access, `type = invitation` for account creation).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use axum::{middleware, routing::{get, post}, Router};
//! use axum_jwtauth::{authenticate, verify, Gate, JwtAuth, JwtConfig, Verifier, VerifiedToken};
//!
//! async fn me(VerifiedToken(token): VerifiedToken) -> String {
//!     format!("{:?}", token.claims.get("name"))
//! }
//!
//! async fn create_user() {}
//!
//! #[tokio::main]
//! async fn main() {
//!     // JWT_SECRET must be set; JWT_ALGORITHM, JWT_VERIFY_KEY and
//!     // JWT_TTL_MINUTES are optional.
//!     let auth = JwtAuth::new(JwtConfig::from_env().unwrap());
//!     let verifier = Verifier::new(auth);
//!
//!     let users = Router::new()
//!         .route("/me", get(me))
//!         .layer(middleware::from_fn_with_state(Gate::user_auth(), authenticate));
//!     let signup = Router::new()
//!         .route("/signup", post(create_user))
//!         .layer(middleware::from_fn_with_state(Gate::invitation(), authenticate));
//!
//!     let app: Router = users
//!         .merge(signup)
//!         .layer(middleware::from_fn_with_state(verifier, verify));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```
//!
//! ## Issuing tokens
//!
//! ```rust
//! use axum_jwtauth::{Claims, JwtAuth, JwtConfig};
//!
//! let auth = JwtAuth::new(JwtConfig::hmac("secret"));
//! let login = auth.issue_user_auth(Claims::new().set("name", "ada")).unwrap();
//! let invite = auth.issue_invitation("new@example.com", "acme").unwrap();
//! assert_eq!(auth.decode(&invite).unwrap().claims.token_type(), Some("invitation"));
//! # let _ = login;
//! ```
//!
//! This crate does **not** load `.env` files.

pub mod claims;
pub mod config;
pub mod error;
pub mod gate;
pub mod locator;
pub mod token;
pub mod verifier;

pub use claims::{epoch_now, expire_in, Claims, TokenType};
pub use config::{parse_algorithm, JwtConfig};
pub use error::AuthError;
pub use gate::{authenticate, Gate, GateRejection, VerifiedToken};
pub use jsonwebtoken::{Algorithm, Validation};
pub use locator::{bearer_token, TokenLocator, TokenSource, TOKEN_PARAM};
pub use token::{JwtAuth, Token};
pub use verifier::{error_from, token_from, verify, Verification, VerificationState, Verifier};
