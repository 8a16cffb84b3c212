//! Account use cases: registration, login, and session-bound token checks.

use std::sync::Arc;

use domains::{
    format_created, Clock, DomainError, DomainResult, IdGenerator, PasswordHasher, Session,
    SessionStore, TokenService, User, UserRepository,
};
use tracing::{info, warn};

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionStore>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenService>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionStore>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenService>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            users,
            sessions,
            hasher,
            tokens,
            clock,
            ids,
        }
    }

    /// Creates the user, opens a session for it and returns a signed token.
    pub async fn register(&self, login: &str, password: &str) -> DomainResult<String> {
        let user = self.create_user(login, password).await?;
        let session = self.start_session(&user).await?;
        self.issue_token(&user, &session)
    }

    /// `NotFound` for an unknown login, `Unauthorized` for a wrong password.
    pub async fn login(&self, login: &str, password: &str) -> DomainResult<String> {
        let user = self.check_credentials(login, password).await?;
        let session = self.start_session(&user).await?;
        self.issue_token(&user, &session)
    }

    /// Stores a new user and reads it back.
    pub async fn create_user(&self, login: &str, password: &str) -> DomainResult<User> {
        if login.is_empty() || password.is_empty() {
            return Err(DomainError::Validation(
                "username and password are required".to_string(),
            ));
        }
        let password_hash = self.hash(password.to_string()).await?;
        let user = User {
            id: self.ids.new_id(),
            login: login.to_string(),
            password_hash,
            created: format_created(self.clock.now()),
        };
        self.users.insert(&user).await?;
        info!(user_id = %user.id, login = %user.login, "user registered");

        self.users.find_by_id(&user.id).await
    }

    /// The stored user, if `password` matches its hash.
    pub async fn check_credentials(&self, login: &str, password: &str) -> DomainResult<User> {
        let user = self.users.find_by_login(login).await?;
        if !self.verify(password.to_string(), user.password_hash.clone()).await? {
            warn!(login = %login, "invalid password");
            return Err(DomainError::Unauthorized("invalid password".to_string()));
        }
        Ok(user)
    }

    pub async fn start_session(&self, user: &User) -> DomainResult<Session> {
        let session = Session {
            id: self.ids.new_session_id(),
            user_id: user.id.clone(),
        };
        self.sessions.create(&session).await?;
        Ok(session)
    }

    pub fn issue_token(&self, user: &User, session: &Session) -> DomainResult<String> {
        self.tokens.issue(user, &session.id)
    }

    /// Resolves a bearer token to a live session.
    ///
    /// Every failure, whether signature, expiry, store error or a missing
    /// session, comes back as the same `Unauthorized`.
    pub async fn authenticate(&self, token: &str) -> DomainResult<Session> {
        let subject = self.tokens.verify(token).map_err(|err| {
            warn!(error = %err, "bad token");
            no_auth()
        })?;
        match self.sessions.find(&subject.session_id).await {
            Ok(Some(session)) => Ok(session),
            Ok(None) => {
                warn!(user_id = %subject.user_id, "session not found");
                Err(no_auth())
            }
            Err(err) => {
                warn!(error = %err, "session lookup failed");
                Err(no_auth())
            }
        }
    }

    /// Destroys the current session; its tokens stop working immediately.
    pub async fn logout(&self, session: &Session) -> DomainResult<()> {
        self.sessions.destroy(&session.id).await?;
        info!(user_id = %session.user_id, "session destroyed");
        Ok(())
    }

    /// Destroys every session of the user and returns how many went away.
    pub async fn revoke_all(&self, user_id: &str) -> DomainResult<u64> {
        let destroyed = self.sessions.destroy_all(user_id).await?;
        info!(user_id = %user_id, destroyed, "destroyed sessions");
        Ok(destroyed)
    }

    async fn hash(&self, password: String) -> DomainResult<String> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|err| DomainError::Internal(err.to_string()))?
    }

    async fn verify(&self, password: String, hash: String) -> DomainResult<bool> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|err| DomainError::Internal(err.to_string()))
    }
}

fn no_auth() -> DomainError {
    DomainError::Unauthorized("No auth".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use domains::{
        MockClock, MockIdGenerator, MockPasswordHasher, MockSessionStore, MockTokenService,
        MockUserRepository, TokenSubject,
    };
    use mockall::predicate::eq;

    struct Mocks {
        users: MockUserRepository,
        sessions: MockSessionStore,
        hasher: MockPasswordHasher,
        tokens: MockTokenService,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                users: MockUserRepository::new(),
                sessions: MockSessionStore::new(),
                hasher: MockPasswordHasher::new(),
                tokens: MockTokenService::new(),
            }
        }

        fn into_service(self) -> AccountService {
            let mut clock = MockClock::new();
            clock
                .expect_now()
                .returning(|| Utc.with_ymd_and_hms(2022, 11, 9, 19, 51, 42).unwrap());
            let mut ids = MockIdGenerator::new();
            ids.expect_new_id().returning(|| "u-1".to_string());
            ids.expect_new_session_id().returning(|| "sess-1".to_string());
            AccountService::new(
                Arc::new(self.users),
                Arc::new(self.sessions),
                Arc::new(self.hasher),
                Arc::new(self.tokens),
                Arc::new(clock),
                Arc::new(ids),
            )
        }
    }

    fn user() -> User {
        User {
            id: "u-1".to_string(),
            login: "mer".to_string(),
            password_hash: "hashed".to_string(),
            created: "2022-11-09T19:51:42Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_stores_hash_and_opens_session() {
        let mut mocks = Mocks::new();
        mocks
            .hasher
            .expect_hash()
            .with(eq("secret"))
            .returning(|_| Ok("hashed".to_string()));
        mocks
            .users
            .expect_insert()
            .withf(|u: &User| u.login == "mer" && u.password_hash == "hashed")
            .times(1)
            .returning(|_| Ok(()));
        mocks
            .users
            .expect_find_by_id()
            .with(eq("u-1"))
            .returning(|_| Ok(user()));
        mocks
            .sessions
            .expect_create()
            .withf(|s: &Session| s.id == "sess-1" && s.user_id == "u-1")
            .times(1)
            .returning(|_| Ok(()));
        mocks
            .tokens
            .expect_issue()
            .withf(|u: &User, sess: &str| u.id == "u-1" && sess == "sess-1")
            .returning(|_, _| Ok("jwt".to_string()));

        let token = mocks.into_service().register("mer", "secret").await.unwrap();
        assert_eq!(token, "jwt");
    }

    #[tokio::test]
    async fn test_login_stops_when_session_cannot_be_stored() {
        let mut mocks = Mocks::new();
        mocks.users.expect_find_by_login().returning(|_| Ok(user()));
        mocks.hasher.expect_verify().returning(|_, _| true);
        mocks
            .sessions
            .expect_create()
            .returning(|_| Err(DomainError::Transport("reset".to_string())));
        mocks.tokens.expect_issue().never();

        let err = mocks.into_service().login("mer", "love").await.unwrap_err();
        assert!(matches!(err, DomainError::Transport(_)));
    }

    #[tokio::test]
    async fn test_register_rejects_empty_credentials() {
        let mut mocks = Mocks::new();
        mocks.users.expect_insert().never();

        let err = mocks.into_service().register("", "secret").await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_login_with_wrong_password_is_unauthorized() {
        let mut mocks = Mocks::new();
        mocks.users.expect_find_by_login().returning(|_| Ok(user()));
        mocks.hasher.expect_verify().returning(|_, _| false);
        mocks.sessions.expect_create().never();

        let err = mocks.into_service().login("mer", "nope").await.unwrap_err();
        assert_eq!(err, DomainError::Unauthorized("invalid password".to_string()));
    }

    #[tokio::test]
    async fn test_login_unknown_user_propagates_not_found() {
        let mut mocks = Mocks::new();
        mocks
            .users
            .expect_find_by_login()
            .returning(|login| Err(DomainError::not_found("user", login)));

        let err = mocks.into_service().login("ghost", "x").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(..)));
    }

    #[tokio::test]
    async fn test_authenticate_requires_live_session() {
        let mut mocks = Mocks::new();
        mocks.tokens.expect_verify().returning(|_| {
            Ok(TokenSubject {
                username: "mer".to_string(),
                user_id: "u-1".to_string(),
                session_id: "gone".to_string(),
            })
        });
        mocks
            .sessions
            .expect_find()
            .with(eq("gone"))
            .returning(|_| Ok(None));

        let err = mocks.into_service().authenticate("jwt").await.unwrap_err();
        assert_eq!(err, no_auth());
    }

    #[tokio::test]
    async fn test_authenticate_bad_token_skips_store() {
        let mut mocks = Mocks::new();
        mocks
            .tokens
            .expect_verify()
            .returning(|_| Err(DomainError::Unauthorized("ExpiredSignature".to_string())));
        mocks.sessions.expect_find().never();

        let err = mocks.into_service().authenticate("jwt").await.unwrap_err();
        assert_eq!(err, no_auth());
    }

    #[tokio::test]
    async fn test_authenticate_returns_stored_session() {
        let mut mocks = Mocks::new();
        mocks.tokens.expect_verify().returning(|_| {
            Ok(TokenSubject {
                username: "mer".to_string(),
                user_id: "u-1".to_string(),
                session_id: "sess-1".to_string(),
            })
        });
        mocks.sessions.expect_find().returning(|id| {
            Ok(Some(Session {
                id: id.to_string(),
                user_id: "u-1".to_string(),
            }))
        });

        let session = mocks.into_service().authenticate("jwt").await.unwrap();
        assert_eq!(session.user_id, "u-1");
    }

    #[tokio::test]
    async fn test_revoke_all_reports_count() {
        let mut mocks = Mocks::new();
        mocks
            .sessions
            .expect_destroy_all()
            .with(eq("u-1"))
            .returning(|_| Ok(3));

        assert_eq!(mocks.into_service().revoke_all("u-1").await.unwrap(), 3);
    }
}
