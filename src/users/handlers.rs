use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::repo_types::User;
use crate::{
    auth::{extractors::AuthUser, guard::require_auth},
    error::{AppError, AppResult},
    response::{self, Envelope},
    state::AppState,
};

pub fn me_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/users/me", get(get_me).delete(delete_me))
        .route_layer(from_fn_with_state(state.tokens.clone(), require_auth))
}

#[instrument(skip(state, ctx), fields(user_id = ctx.user_id))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> AppResult<Json<Envelope<User>>> {
    let user = User::find_by_id(&state.db, ctx.user_id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    Ok(response::ok("User retrieved successfully", user))
}

#[instrument(skip(state, ctx), fields(user_id = ctx.user_id))]
pub async fn delete_me(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> AppResult<Json<Envelope<()>>> {
    if !User::delete(&state.db, ctx.user_id).await? {
        return Err(AppError::NotFound("user"));
    }
    info!("user deleted");
    Ok(response::done("User deleted successfully"))
}
