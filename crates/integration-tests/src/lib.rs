//! # Test fixtures
//!
//! Deterministic seams (clock, ids, a cheap password hasher) and an
//! in-process application over `MemoryStore` that tests drive with
//! `tower::ServiceExt::oneshot`.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use domains::{Clock, DomainResult, IdGenerator, PasswordHasher, SessionStore, TokenService};
use services::{AccountService, PostService};
use storage_adapters::MemoryStore;

pub const TEST_SECRET: &[u8] = b"integration-test-secret";

/// Starts at 2022-11-09T19:51:42Z and moves one second per call, so rows
/// created in sequence sort in that sequence.
#[derive(Default)]
pub struct SteppingClock {
    ticks: AtomicI64,
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        Utc.with_ymd_and_hms(2022, 11, 9, 19, 51, 42).unwrap() + Duration::seconds(tick)
    }
}

/// `id-1`, `id-2`, ... and `sess-1`, `sess-2`, ...
#[derive(Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl IdGenerator for SequentialIds {
    fn new_id(&self) -> String {
        format!("id-{}", self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn new_session_id(&self) -> String {
        format!("sess-{}", self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Stands in for Argon2, which is slow in unoptimized test builds.
pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, password: &str) -> DomainResult<String> {
        Ok(format!("plain${password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        hash.strip_prefix("plain$") == Some(password)
    }
}

/// Account collaborators a test swaps out; `None` keeps the memory store
/// or the JWT service.
#[derive(Default)]
pub struct AccountSeams {
    pub sessions: Option<Arc<dyn SessionStore>>,
    pub tokens: Option<Arc<dyn TokenService>>,
}

/// Post and account services sharing one memory store.
pub fn wire_services(store: &Arc<MemoryStore>) -> (PostService, AccountService) {
    wire_services_with(store, AccountSeams::default())
}

pub fn wire_services_with(
    store: &Arc<MemoryStore>,
    seams: AccountSeams,
) -> (PostService, AccountService) {
    let clock = Arc::new(SteppingClock::default());
    let ids = Arc::new(SequentialIds::default());
    let posts = PostService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        clock.clone(),
        ids.clone(),
    );
    let sessions = seams
        .sessions
        .unwrap_or_else(|| store.clone() as Arc<dyn SessionStore>);
    let tokens = seams.tokens.unwrap_or_else(|| {
        Arc::new(auth_adapters::JwtTokenService::new(
            TEST_SECRET,
            Duration::days(90),
            clock.clone(),
        )) as Arc<dyn TokenService>
    });
    let accounts = AccountService::new(
        store.clone(),
        sessions,
        Arc::new(PlainHasher),
        tokens,
        clock,
        ids,
    );
    (posts, accounts)
}

#[cfg(feature = "web-axum")]
pub use app::{fixture_assets, Reply, TestApp};

#[cfg(feature = "web-axum")]
mod app {
    use std::path::Path;
    use std::sync::Arc;

    use api_adapters::{build_router, metrics::Metrics, AppState, StaticAssets};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, HeaderMap, Method, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use services::AccountService;
    use storage_adapters::MemoryStore;
    use tower::ServiceExt;

    use super::AccountSeams;

    /// Client files checked in under `fixtures/`.
    pub fn fixture_assets() -> StaticAssets {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
        StaticAssets {
            index: root.join("template").join("index.html"),
            dir: root.join("static"),
        }
    }

    pub struct Reply {
        pub status: StatusCode,
        pub headers: HeaderMap,
        pub body: Value,
    }

    pub struct TestApp {
        pub router: Router,
        pub store: Arc<MemoryStore>,
        pub accounts: Arc<AccountService>,
    }

    impl TestApp {
        /// Fresh store with the standard categories and no users.
        pub fn new() -> Self {
            Self::with_seams(AccountSeams::default())
        }

        pub fn with_seams(seams: AccountSeams) -> Self {
            let store = MemoryStore::with_default_categories();
            let (posts, accounts) = super::wire_services_with(&store, seams);
            let state = AppState::new(posts, accounts, Metrics::new());
            let accounts = state.accounts.clone();
            Self {
                router: build_router(state, fixture_assets()),
                store,
                accounts,
            }
        }

        pub async fn send(&self, request: Request<Body>) -> Reply {
            let response = self
                .router
                .clone()
                .oneshot(request)
                .await
                .expect("router is infallible");
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("body collects");
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes)
                    .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            };
            Reply {
                status,
                headers,
                body,
            }
        }

        pub async fn call(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> Reply {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string())),
                None => builder.body(Body::empty()),
            }
            .expect("request builds");
            self.send(request).await
        }

        pub async fn get(&self, uri: &str) -> Reply {
            self.call(Method::GET, uri, None, None).await
        }

        /// Registers `login` and returns its bearer token.
        pub async fn register(&self, login: &str, password: &str) -> String {
            let reply = self
                .call(
                    Method::POST,
                    "/api/register",
                    None,
                    Some(json!({"username": login, "password": password})),
                )
                .await;
            assert_eq!(reply.status, StatusCode::CREATED, "register failed: {}", reply.body);
            reply.body["token"]
                .as_str()
                .expect("token in register reply")
                .to_string()
        }

        /// Creates a text post in `category` and returns its id.
        pub async fn create_post(&self, token: &str, category: &str, title: &str) -> String {
            let reply = self
                .call(
                    Method::POST,
                    "/api/posts",
                    Some(token),
                    Some(json!({"category": category, "type": "text", "title": title, "text": "b"})),
                )
                .await;
            assert_eq!(reply.status, StatusCode::OK, "create failed: {}", reply.body);
            reply.body["id"].as_str().expect("post id").to_string()
        }
    }

    impl Default for TestApp {
        fn default() -> Self {
            Self::new()
        }
    }
}
