//! Duplicate webhook suppression.
//!
//! Mailgun tokens are random per event. A token seen twice inside the
//! signature max-age window is a retry or a replay and is not processed again.
//! Tokens older than the window can be forgotten: their timestamps would fail
//! the freshness check anyway.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct ReplayGuard {
    window: Duration,
    seen: Mutex<HashMap<String, Instant>>,
}

impl ReplayGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Record `token`, returning `false` if it was already seen in the window.
    pub fn check_and_record(&self, token: &str) -> bool {
        self.check_and_record_at(token, Instant::now())
    }

    fn check_and_record_at(&self, token: &str, now: Instant) -> bool {
        let mut seen = match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        seen.retain(|_, first_seen| now.saturating_duration_since(*first_seen) <= self.window);

        if seen.contains_key(token) {
            return false;
        }

        seen.insert(token.to_string(), now);
        true
    }

    /// Tokens currently remembered.
    pub(crate) fn len(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sighting_accepted() {
        let guard = ReplayGuard::new(Duration::from_secs(300));
        assert!(guard.check_and_record("token-a"));
        assert!(guard.check_and_record("token-b"));
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn test_duplicate_rejected() {
        let guard = ReplayGuard::new(Duration::from_secs(300));
        assert!(guard.check_and_record("token-a"));
        assert!(!guard.check_and_record("token-a"));
    }

    #[test]
    fn test_expired_tokens_forgotten() {
        let guard = ReplayGuard::new(Duration::from_secs(300));
        let start = Instant::now();

        assert!(guard.check_and_record_at("token-a", start));
        assert!(guard.check_and_record_at("token-a", start + Duration::from_secs(301)));
    }
}
