//! # auth-adapters
//!
//! Argon2 implementation of `PasswordHasher` and, behind `auth-jwt`, an
//! HS256 implementation of `TokenService`.

mod password;

#[cfg(feature = "auth-jwt")]
mod jwt;

pub use password::Argon2Hasher;

#[cfg(feature = "auth-jwt")]
pub use jwt::{JwtTokenService, SessionClaims, UserClaims};
