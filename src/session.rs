use crate::cache::TtlCache;
use crate::recommend::Recommendation;
use std::time::Duration;

const MAX_SESSIONS: usize = 10_000;
const MAX_SESSION_ID_LEN: usize = 128;

pub struct SessionStore {
    entries: TtlCache<String, Recommendation>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: TtlCache::with_capacity(ttl, MAX_SESSIONS),
        }
    }

    pub async fn save(&self, session_id: &str, recommendation: Recommendation) {
        self.entries
            .insert(session_id.to_string(), recommendation)
            .await;
    }

    pub async fn load(&self, session_id: &str) -> Option<Recommendation> {
        self.entries.get(&session_id.to_string()).await
    }

    pub async fn reset(&self, session_id: &str) -> bool {
        self.entries.remove(&session_id.to_string()).await.is_some()
    }
}

pub fn valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
