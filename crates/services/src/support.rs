//! Production implementations of the `Clock` and `IdGenerator` seams.

use chrono::{DateTime, Utc};
use domains::{Clock, IdGenerator};
use rand::distributions::{Alphanumeric, DistString};
use uuid::Uuid;

const SESSION_ID_LEN: usize = 32;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// UUID v4 for entities, random alphanumerics for session ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn new_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn new_session_id(&self) -> String {
        Alphanumeric.sample_string(&mut rand::thread_rng(), SESSION_ID_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_fresh() {
        let ids = RandomIdGenerator;
        let a = ids.new_session_id();
        let b = ids.new_session_id();
        assert_eq!(a.len(), SESSION_ID_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_entity_ids_parse_as_uuid() {
        assert!(Uuid::parse_str(&RandomIdGenerator.new_id()).is_ok());
    }
}
