//! Auth gate middleware.
//!
//! Route protection is decided by substring containment on the raw path,
//! not by the matched route: any POST or DELETE whose path contains `/post`
//! and any GET whose path contains a vote fragment needs a live session.

use axum::extract::{Request, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::AppState;

const VOTE_FRAGMENTS: [&str; 3] = ["/upvote", "/downvote", "/unvote"];

pub fn requires_auth(method: &Method, path: &str) -> bool {
    if (method == Method::POST || method == Method::DELETE) && path.contains("/post") {
        return true;
    }
    method == Method::GET && VOTE_FRAGMENTS.iter().any(|fragment| path.contains(fragment))
}

/// Whatever follows `Bearer ` in the Authorization header, if non-empty.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (_, token) = value.split_once("Bearer ")?;
    (!token.is_empty()).then_some(token)
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

pub async fn auth_gate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let mut ctx = RequestContext {
        request_id: request_id(req.headers()),
        session: None,
    };

    if !requires_auth(req.method(), req.uri().path()) {
        req.extensions_mut().insert(ctx);
        return next.run(req).await;
    }

    let Some(token) = bearer_token(req.headers()) else {
        debug!(request_id = %ctx.request_id, path = %req.uri().path(), "no bearer token");
        return ApiError::no_auth().into_response();
    };

    match state.accounts.authenticate(token).await {
        Ok(session) => {
            ctx.session = Some(session);
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(err) => {
            warn!(request_id = %ctx.request_id, error = %err, "no auth");
            ApiError::no_auth().into_response()
        }
    }
}
