use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use crate::{
    error::AppError,
    models::{UserResponse, UsersResponse},
    routes::auth::CurrentUser,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/me", post(save_me))
        .route("/users", get(all_users))
}

/// Creates or refreshes the caller's record from the forwarded profile.
async fn save_me(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.store.save_user(user.profile())?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

async fn all_users(State(state): State<Arc<AppState>>, _user: CurrentUser) -> Json<UsersResponse> {
    Json(UsersResponse {
        success: true,
        users: state.store.all_users(),
    })
}
