//! # api-adapters
//!
//! HTTP surface of the forum backend (feature `web-axum`): the router, the
//! auth gate, request context extractors, JSON errors and route metrics.
//! The router also serves the browser client from disk.

#[cfg(feature = "web-axum")]
pub mod auth;
#[cfg(feature = "web-axum")]
pub mod context;
#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod metrics;

#[cfg(feature = "web-axum")]
pub use router::{build_router, AppState, StaticAssets};

#[cfg(feature = "web-axum")]
mod router {
    use std::path::PathBuf;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::extract::{FromRef, MatchedPath};
    use axum::http::{HeaderName, Request};
    use axum::middleware;
    use axum::routing::{delete, get, post};
    use axum::Router;
    use services::{AccountService, PostService};
    use tower::ServiceBuilder;
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
    use tower_http::services::{ServeDir, ServeFile};
    use tower_http::trace::{DefaultOnResponse, TraceLayer};
    use tracing::{info_span, Level};

    use crate::auth::auth_gate;
    use crate::handlers;
    use crate::metrics::{metrics_handler, track_metrics, Metrics};

    const REQUEST_ID: &str = "x-request-id";

    /// State shared by every handler. Cloning is cheap.
    #[derive(Clone)]
    pub struct AppState {
        pub posts: Arc<PostService>,
        pub accounts: Arc<AccountService>,
        pub metrics: Arc<Metrics>,
    }

    impl AppState {
        pub fn new(posts: PostService, accounts: AccountService, metrics: Metrics) -> Self {
            Self {
                posts: Arc::new(posts),
                accounts: Arc::new(accounts),
                metrics: Arc::new(metrics),
            }
        }
    }

    impl FromRef<AppState> for Arc<Metrics> {
        fn from_ref(state: &AppState) -> Self {
            state.metrics.clone()
        }
    }

    /// The browser client: `index` answers `/`, `dir` is served under `/static/`.
    #[derive(Debug, Clone)]
    pub struct StaticAssets {
        pub index: PathBuf,
        pub dir: PathBuf,
    }

    pub fn build_router(state: AppState, assets: StaticAssets) -> Router {
        let api = Router::new()
            .route("/api/register", post(handlers::register))
            .route("/api/login", post(handlers::login))
            .route("/api/user/{login}", get(handlers::posts_by_user))
            .route("/api/posts/", get(handlers::list_posts))
            .route("/api/posts/{category}", get(handlers::posts_by_category))
            .route("/api/posts", post(handlers::create_post))
            .route(
                "/api/post/{id}",
                get(handlers::get_post)
                    .post(handlers::add_comment)
                    .delete(handlers::delete_post),
            )
            .route("/api/post/{id}/upvote", get(handlers::upvote))
            .route("/api/post/{id}/downvote", get(handlers::downvote))
            .route("/api/post/{id}/unvote", get(handlers::unvote))
            .route("/api/post/{id}/{comment_id}", delete(handlers::delete_comment))
            .route("/health", get(handlers::health))
            .route("/metrics", get(metrics_handler))
            .route_service("/", ServeFile::new(&assets.index))
            .nest_service("/static", ServeDir::new(&assets.dir))
            .layer(middleware::from_fn_with_state(state.clone(), auth_gate))
            // outside the gate so rejected requests are counted too
            .layer(middleware::from_fn_with_state(
                state.metrics.clone(),
                track_metrics,
            ));

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        api.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    HeaderName::from_static(REQUEST_ID),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|req: &Request<Body>| {
                            let request_id = req
                                .headers()
                                .get(REQUEST_ID)
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or("-");
                            let route = req
                                .extensions()
                                .get::<MatchedPath>()
                                .map(MatchedPath::as_str)
                                .unwrap_or_else(|| req.uri().path());
                            info_span!(
                                "request",
                                method = %req.method(),
                                route = %route,
                                path = %req.uri().path(),
                                request_id = %request_id,
                            )
                        })
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID,
                )))
                .layer(cors),
        )
        .with_state(state)
    }
}
