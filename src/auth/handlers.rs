use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{PublicUser, RefreshRequest, SigninRequest, SignupRequest, TokenResponse},
        extractors::AuthUser,
    },
    error::AppError,
    response::ApiResponse,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/signin", post(signin))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), AppError> {
    let Json(payload) = payload?;
    state.auth.signup(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::message("successfully signed up user")),
    ))
}

#[instrument(skip_all)]
pub async fn signin(
    State(state): State<AppState>,
    payload: Result<Json<SigninRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<TokenResponse>>, AppError> {
    let Json(payload) = payload?;
    let tokens = state.auth.signin(payload).await?;
    Ok(Json(ApiResponse::data(tokens)))
}

#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<TokenResponse>>, AppError> {
    let Json(payload) = payload?;
    let tokens = state.auth.refresh(payload).await?;
    Ok(Json(ApiResponse::data(tokens)))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<PublicUser>>, AppError> {
    let user = state.auth.current_user(user_id).await?;
    Ok(Json(ApiResponse::data(user)))
}
