//! In-memory per-session chat history.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    pub query: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

/// Chat exchanges keyed by caller-supplied session id.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Vec<Exchange>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, session_id: &str, query: &str, answer: &str) {
        let exchange = Exchange {
            query: query.to_string(),
            answer: answer.to_string(),
            asked_at: Utc::now(),
        };
        self.sessions
            .write()
            .expect("session lock poisoned")
            .entry(session_id.to_string())
            .or_default()
            .push(exchange);
    }

    /// History for a session, oldest first. `None` for an unknown id.
    pub fn history(&self, session_id: &str) -> Option<Vec<Exchange>> {
        self.sessions
            .read()
            .expect("session lock poisoned")
            .get(session_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_isolated_per_session() {
        let store = SessionStore::new();
        store.record("a", "q1", "a1");
        store.record("b", "q2", "a2");
        store.record("a", "q3", "a3");

        let a = store.history("a").unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].query, "q1");
        assert_eq!(a[1].answer, "a3");
        assert_eq!(store.history("b").unwrap().len(), 1);
    }

    #[test]
    fn unknown_session_is_none() {
        assert!(SessionStore::new().history("nope").is_none());
    }
}
