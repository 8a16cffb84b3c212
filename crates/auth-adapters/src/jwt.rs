//! Session-bound HS256 tokens.
//!
//! Payload shape: `{"user": {"username", "id", "sess_id"}, "iat", "exp"}`.
//! Both timestamps, and the expiry check, use the injected `Clock`.

use std::sync::Arc;

use chrono::Duration;
use domains::{Clock, DomainError, DomainResult, TokenService, TokenSubject, User};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    pub username: String,
    pub id: String,
    pub sess_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user: UserClaims,
    pub iat: i64,
    pub exp: i64,
}

pub struct JwtTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl JwtTokenService {
    pub fn new(secret: &[u8], ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        // exp is compared against `clock` in `verify`
        validation.validate_exp = false;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
            clock,
        }
    }

    /// Signs arbitrary claims with this service's key.
    pub fn sign(&self, claims: &SessionClaims) -> DomainResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| DomainError::Internal(format!("can't generate jwt token: {e}")))
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, user: &User, session_id: &str) -> DomainResult<String> {
        let now = self.clock.now();
        let claims = SessionClaims {
            user: UserClaims {
                username: user.login.clone(),
                id: user.id.clone(),
                sess_id: session_id.to_string(),
            },
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        self.sign(&claims)
    }

    fn verify(&self, token: &str) -> DomainResult<TokenSubject> {
        let data = decode::<SessionClaims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!(error = %e, "token rejected");
            DomainError::Unauthorized(format!("bad token: {e}"))
        })?;
        if data.claims.exp <= self.clock.now().timestamp() {
            debug!(exp = data.claims.exp, "token expired");
            return Err(DomainError::Unauthorized("bad token: ExpiredSignature".to_string()));
        }
        let UserClaims {
            username,
            id,
            sess_id,
        } = data.claims.user;
        Ok(TokenSubject {
            username,
            user_id: id,
            session_id: sess_id,
        })
    }
}
