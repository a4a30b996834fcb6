//! Demo server: organisation and user routes behind the verifier and gates.
//!
//! Storage is an in-memory list; a real deployment plugs its own
//! repositories in behind the same routes.
//!
//! ```bash
//! JWT_SECRET=dev cargo run --example server
//! TOKEN=$(JWT_SECRET=dev cargo run -q --example token -- user ada)
//! curl -H "Authorization: Bearer $TOKEN" localhost:3000/user
//! ```

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing_subscriber::EnvFilter;

use axum_jwtauth::{authenticate, verify, Gate, JwtAuth, JwtConfig, VerifiedToken, Verifier};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Organisation {
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    username: String,
    email: String,
    #[serde(default)]
    organisation: String,
}

#[derive(Deserialize)]
struct InviteRequest {
    email: String,
}

#[derive(Serialize)]
struct InviteResponse {
    email: String,
    organisation: String,
    token: String,
}

#[derive(Clone)]
struct AppState {
    auth: Arc<JwtAuth>,
    organisations: Arc<RwLock<Vec<Organisation>>>,
    users: Arc<RwLock<Vec<User>>>,
}

type ApiError = (StatusCode, Json<String>);

fn reject(status: StatusCode, message: &str) -> ApiError {
    (status, Json(message.to_owned()))
}

async fn list_organisations(State(state): State<AppState>) -> Json<Vec<Organisation>> {
    Json(state.organisations.read().await.clone())
}

async fn create_organisation(
    State(state): State<AppState>,
    Json(org): Json<Organisation>,
) -> Result<(StatusCode, Json<Organisation>), ApiError> {
    let valid_name = !org.name.is_empty()
        && org.name.len() <= 64
        && org.name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_name {
        return Err(reject(StatusCode::UNPROCESSABLE_ENTITY, "Invalid organisation name"));
    }
    state.organisations.write().await.push(org.clone());
    Ok((StatusCode::CREATED, Json(org)))
}

async fn list_users(State(state): State<AppState>) -> Json<Vec<User>> {
    Json(state.users.read().await.clone())
}

/// Only reachable with an invitation token; the account email must be the
/// invited one.
async fn create_user(
    State(state): State<AppState>,
    VerifiedToken(token): VerifiedToken,
    Json(mut user): Json<User>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    if token.claims.get_str("email") != Some(user.email.as_str()) {
        return Err(reject(StatusCode::UNAUTHORIZED, "Invitation was issued for another email"));
    }
    if user.username.is_empty() || user.username.len() > 64 {
        return Err(reject(StatusCode::UNPROCESSABLE_ENTITY, "Invalid username"));
    }

    let mut users = state.users.write().await;
    if users.iter().any(|u| u.username == user.username || u.email == user.email) {
        return Err(reject(StatusCode::CONFLICT, "User already exists"));
    }
    user.organisation = token.claims.get_str("organisation").unwrap_or_default().to_owned();
    users.push(user.clone());
    Ok((StatusCode::CREATED, Json(user)))
}

async fn invite_user(
    State(state): State<AppState>,
    Json(req): Json<InviteRequest>,
) -> Result<(StatusCode, Json<InviteResponse>), ApiError> {
    let organisation = state
        .organisations
        .read()
        .await
        .first()
        .map(|o| o.name.clone())
        .unwrap_or_default();

    let token = state
        .auth
        .issue_invitation(&req.email, &organisation)
        .map_err(|_| reject(StatusCode::UNPROCESSABLE_ENTITY, "Could not generate token"))?;

    Ok((
        StatusCode::CREATED,
        Json(InviteResponse {
            email: req.email,
            organisation,
            token,
        }),
    ))
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,axum_jwtauth=debug")),
        )
        .init();

    let config = match JwtConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "cannot start");
            std::process::exit(1);
        }
    };
    let auth = Arc::new(JwtAuth::new(config));

    let state = AppState {
        auth: auth.clone(),
        organisations: Arc::default(),
        users: Arc::default(),
    };

    let user_auth = middleware::from_fn_with_state(Gate::user_auth(), authenticate);
    let invitation = middleware::from_fn_with_state(Gate::invitation(), authenticate);

    let app = Router::new()
        .route("/organisation", get(list_organisations).post(create_organisation))
        .route(
            "/user",
            get(list_users)
                .route_layer(user_auth.clone())
                .merge(post(create_user).route_layer(invitation)),
        )
        .route("/user/invite", post(invite_user).route_layer(user_auth))
        .layer(middleware::from_fn_with_state(Verifier::new(auth), verify))
        .with_state(state);

    let listener = match tokio::net::TcpListener::bind("0.0.0.0:3000").await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, "cannot bind");
            std::process::exit(1);
        }
    };
    tracing::info!("listening on 0.0.0.0:3000");
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server error");
    }
}
