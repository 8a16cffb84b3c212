//! # Handlers
//!
//! Thin translation between HTTP and the `services` use cases. Each failure
//! is filed under a fixed client-facing message; the cause goes to the log.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domains::{PostView, User};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use services::{AccountService, NewPost};
use tracing::info;

use crate::context::{AuthSession, JsonBody, RequestContext};
use crate::error::ApiError;
use crate::AppState;

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub comment: String,
}

pub async fn register(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(creds): JsonBody<Credentials>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .accounts
        .create_user(&creds.username, &creds.password)
        .await
        .map_err(ApiError::context("can't register a new user"))?;
    let token = open_session(&state.accounts, &user).await?;
    info!(request_id = %ctx.request_id, login = %user.login, "registered");
    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(creds): JsonBody<Credentials>,
) -> ApiResult<Json<TokenResponse>> {
    let user = state
        .accounts
        .check_credentials(&creds.username, &creds.password)
        .await
        .map_err(ApiError::context("user not found"))?;
    let token = open_session(&state.accounts, &user).await?;
    Ok(Json(TokenResponse { token }))
}

async fn open_session(accounts: &AccountService, user: &User) -> ApiResult<String> {
    let session = accounts
        .start_session(user)
        .await
        .map_err(ApiError::context("can't create session"))?;
    accounts
        .issue_token(user, &session)
        .map_err(ApiError::context("can't generate jwt token"))
}

pub async fn posts_by_user(
    State(state): State<AppState>,
    Path(login): Path<String>,
) -> ApiResult<Json<Vec<PostView>>> {
    let posts = state
        .posts
        .list_by_author(&login)
        .await
        .map_err(ApiError::context("can't get posts by user login"))?;
    Ok(Json(posts))
}

pub async fn list_posts(State(state): State<AppState>) -> ApiResult<Json<Vec<PostView>>> {
    let posts = state
        .posts
        .list_all()
        .await
        .map_err(ApiError::context("DB err"))?;
    Ok(Json(posts))
}

pub async fn posts_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> ApiResult<Json<Vec<PostView>>> {
    let posts = state
        .posts
        .list_by_category(&category)
        .await
        .map_err(ApiError::context("can't get posts by category"))?;
    Ok(Json(posts))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PostView>> {
    let post = state
        .posts
        .get(&id)
        .await
        .map_err(ApiError::context("can't get post by id"))?;
    Ok(Json(post))
}

pub async fn create_post(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    JsonBody(draft): JsonBody<NewPost>,
) -> ApiResult<Json<PostView>> {
    let category = state
        .posts
        .category(&draft.category)
        .await
        .map_err(ApiError::context("can't get category"))?;
    let post = state
        .posts
        .create_in(&session, &category, draft)
        .await
        .map_err(ApiError::context("can't add post"))?;
    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    AuthSession(_): AuthSession,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .posts
        .delete(&id)
        .await
        .map_err(ApiError::context("can't delete post, err"))?;
    Ok(Json(json!({"message": "success"})))
}

pub async fn upvote(
    State(state): State<AppState>,
    AuthSession(_): AuthSession,
    Path(id): Path<String>,
) -> ApiResult<Json<PostView>> {
    let post = state
        .posts
        .upvote(&id)
        .await
        .map_err(ApiError::context("can't up vote"))?;
    Ok(Json(post))
}

pub async fn downvote(
    State(state): State<AppState>,
    AuthSession(_): AuthSession,
    Path(id): Path<String>,
) -> ApiResult<Json<PostView>> {
    let post = state
        .posts
        .downvote(&id)
        .await
        .map_err(ApiError::context("can't down vote"))?;
    Ok(Json(post))
}

pub async fn unvote(
    State(state): State<AppState>,
    AuthSession(_): AuthSession,
    Path(id): Path<String>,
) -> ApiResult<Json<PostView>> {
    let post = state
        .posts
        .unvote(&id)
        .await
        .map_err(ApiError::context("can't down vote"))?;
    Ok(Json(post))
}

pub async fn add_comment(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(post_id): Path<String>,
    JsonBody(request): JsonBody<CommentRequest>,
) -> ApiResult<Json<PostView>> {
    let post = state
        .posts
        .add_comment(&session, &post_id, request.comment)
        .await
        .map_err(ApiError::context("can't add comment"))?;
    Ok(Json(post))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    AuthSession(_): AuthSession,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> ApiResult<Json<PostView>> {
    let post = state
        .posts
        .delete_comment(&post_id, &comment_id)
        .await
        .map_err(ApiError::context("can't delete comment, err"))?;
    Ok(Json(post))
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}
