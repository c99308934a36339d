use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        claims::Role,
        dto::{LoginRequest, RegisterRequest, TokenResponse},
        password::{hash_password, verify_password},
    },
    error::{AppError, AppResult},
    response::{self, Envelope},
    state::AppState,
    users::repo_types::User,
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Domain part only, for logs that must not carry the address itself.
fn email_domain(email: &str) -> &str {
    email.rsplit_once('@').map_or("", |(_, domain)| domain)
}

fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::validation("email", "must be a valid email address"));
    }
    Ok(email)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<Envelope<TokenResponse>>)> {
    let email = normalize_email(&payload.email)?;

    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }

    let role = payload
        .role
        .parse::<Role>()
        .map_err(|e| AppError::validation("role", e.to_string()))?;

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(domain = email_domain(&email), "email already registered");
        return Err(AppError::EmailTaken);
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &email, &hash, role).await?;
    let token = state.tokens.issue(user.id, user.role)?;

    info!(user_id = user.id, role = %user.role, "user registered");
    Ok((
        StatusCode::CREATED,
        response::ok(
            "User registered successfully",
            TokenResponse {
                token,
                role: user.role,
            },
        ),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<Envelope<TokenResponse>>> {
    let email = payload.email.trim().to_lowercase();

    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        warn!(domain = email_domain(&email), "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = state.tokens.issue(user.id, user.role)?;

    info!(user_id = user.id, "user logged in");
    Ok(response::ok(
        "Login successful",
        TokenResponse {
            token,
            role: user.role,
        },
    ))
}
