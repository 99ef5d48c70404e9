//! Operator session registry.
//!
//! Maps bearer tokens to [`SessionContext`]s. Entries expire after the
//! configured TTL.

use std::time::Duration;

use forecast_core::SessionContext;
use moka::future::Cache;

use crate::config::SessionConfig;

#[derive(Clone)]
pub struct SessionRegistry {
    cache: Cache<String, SessionContext>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(config: &SessionConfig) -> Self {
        let ttl = Duration::from_secs(config.ttl_seconds);
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(ttl)
            .build();

        Self { cache, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Register a session and return its bearer token
    pub async fn open(&self, session: SessionContext) -> String {
        let token = session.session_id.simple().to_string();
        tracing::info!(username = %session.username, "Session opened");
        self.cache.insert(token.clone(), session).await;
        token
    }

    pub async fn get(&self, token: &str) -> Option<SessionContext> {
        self.cache.get(token).await
    }

    /// Returns the closed session, if the token was live
    pub async fn close(&self, token: &str) -> Option<SessionContext> {
        let closed = self.cache.remove(token).await;
        if let Some(session) = &closed {
            tracing::info!(username = %session.username, "Session closed");
        }
        closed
    }
}
