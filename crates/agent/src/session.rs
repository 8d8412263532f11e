//! Per-caller agent sessions.
//!
//! Each key owns its own [`AgentExecutor`] and therefore its own memory. Sessions are created on
//! first use, evicted least-recently-used when the registry is full, and swept when idle. Runs on
//! one session are serialised; runs across sessions are capped by a shared semaphore.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use frontdesk_core::config::ServerConfig;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock, Semaphore};
use tokio::time::Instant;
use tracing::{debug, info, Instrument};

use crate::llm::LlmClient;
use crate::runtime::{AgentExecutor, ChatOutcome, ExecutorSettings};
use crate::tools::ToolRegistry;

/// Session used when a caller does not identify itself.
pub const SHARED_SESSION: &str = "shared";
pub const MAX_SESSION_KEY_LEN: usize = 128;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey(String);

impl SessionKey {
    /// Blank keys, over-long keys and keys with control characters are rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.len() > MAX_SESSION_KEY_LEN
            || trimmed.chars().any(char::is_control)
        {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn shared() -> Self {
        Self(SHARED_SESSION.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_sessions: usize,
    pub idle_timeout: Duration,
    pub max_concurrent_chats: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self { max_sessions: 1024, idle_timeout: Duration::from_secs(1800), max_concurrent_chats: 8 }
    }
}

impl SessionLimits {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            max_sessions: config.max_sessions.max(1),
            idle_timeout: config.session_idle_timeout(),
            max_concurrent_chats: config.max_concurrent_chats.max(1),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session registry is shutting down")]
    Closed,
}

struct SessionEntry {
    executor: Arc<Mutex<AgentExecutor>>,
    last_used: Instant,
}

pub struct SessionRegistry {
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    settings: ExecutorSettings,
    limits: SessionLimits,
    sessions: RwLock<HashMap<SessionKey, SessionEntry>>,
    permits: Semaphore,
}

impl SessionRegistry {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolRegistry>,
        settings: ExecutorSettings,
        limits: SessionLimits,
    ) -> Self {
        Self {
            llm,
            tools,
            settings,
            permits: Semaphore::new(limits.max_concurrent_chats),
            limits,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn contains(&self, key: &SessionKey) -> bool {
        self.sessions.read().await.contains_key(key)
    }

    /// Runs one chat turn on `key`'s session, creating the session if needed.
    pub async fn chat(
        &self,
        key: &SessionKey,
        user_input: &str,
        deadline: Option<Instant>,
    ) -> Result<ChatOutcome, SessionError> {
        let executor = self.checkout(key).await;
        let span = tracing::info_span!("session", session_id = %key);

        async {
            let mut executor = executor.lock().await;
            let _permit = self.permits.acquire().await.map_err(|_| SessionError::Closed)?;
            Ok::<_, SessionError>(executor.run_until(user_input, deadline).await)
        }
        .instrument(span)
        .await
    }

    /// Clears the session's memory. Returns whether the session existed; idempotent.
    pub async fn reset(&self, key: &SessionKey) -> bool {
        let executor = {
            let sessions = self.sessions.read().await;
            sessions.get(key).map(|entry| Arc::clone(&entry.executor))
        };
        match executor {
            Some(executor) => {
                executor.lock().await.reset();
                info!(
                    event_name = "agent.session.reset",
                    session_id = %key,
                    "session memory cleared"
                );
                true
            }
            None => false,
        }
    }

    pub async fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now()).await
    }

    pub async fn evict_idle_at(&self, now: Instant) -> usize {
        let idle_timeout = self.limits.idle_timeout;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| now.saturating_duration_since(entry.last_used) < idle_timeout);
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(
                event_name = "agent.session.idle_evicted",
                evicted,
                remaining = sessions.len(),
                "idle sessions evicted"
            );
        }
        evicted
    }

    /// Stops admitting new chats; in-flight chats finish.
    pub fn close(&self) {
        self.permits.close();
    }

    async fn checkout(&self, key: &SessionKey) -> Arc<Mutex<AgentExecutor>> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        if let Some(entry) = sessions.get_mut(key) {
            entry.last_used = now;
            return Arc::clone(&entry.executor);
        }

        if sessions.len() >= self.limits.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(oldest, _)| oldest.clone());
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                debug!(
                    event_name = "agent.session.lru_evicted",
                    session_id = %oldest,
                    "least recently used session evicted"
                );
            }
        }

        let executor = Arc::new(Mutex::new(AgentExecutor::new(
            Arc::clone(&self.llm),
            Arc::clone(&self.tools),
            self.settings.clone(),
        )));
        sessions
            .insert(key.clone(), SessionEntry { executor: Arc::clone(&executor), last_used: now });
        debug!(event_name = "agent.session.created", session_id = %key, "session created");
        executor
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use super::{SessionError, SessionKey, SessionLimits, SessionRegistry, SHARED_SESSION};
    use crate::llm::{LlmClient, ModelError, ModelReply, ModelRequest};
    use crate::runtime::ExecutorSettings;
    use crate::tools::ToolRegistry;

    /// Replies with how many turns it was shown and the latest user text.
    struct CountingModel;

    #[async_trait]
    impl LlmClient for CountingModel {
        fn provider(&self) -> &str {
            "counting"
        }

        async fn infer(&self, request: &ModelRequest) -> Result<ModelReply, ModelError> {
            let last = request.conversation.last().map(|turn| turn.content().to_string());
            Ok(ModelReply::FinalAnswer(format!(
                "seen {} turns, last: {}",
                request.conversation.len(),
                last.unwrap_or_default()
            )))
        }
    }

    fn registry(limits: SessionLimits) -> SessionRegistry {
        SessionRegistry::new(
            Arc::new(CountingModel),
            Arc::new(ToolRegistry::new()),
            ExecutorSettings::default(),
            limits,
        )
    }

    fn key(raw: &str) -> SessionKey {
        SessionKey::parse(raw).expect("valid key")
    }

    #[test]
    fn keys_are_trimmed_and_validated() {
        assert_eq!(SessionKey::parse("  abc  ").map(|k| k.to_string()), Some("abc".to_string()));
        assert!(SessionKey::parse("   ").is_none());
        assert!(SessionKey::parse("a\nb").is_none());
        assert!(SessionKey::parse(&"x".repeat(200)).is_none());
        assert_eq!(SessionKey::shared().as_str(), SHARED_SESSION);
    }

    #[tokio::test]
    async fn sessions_do_not_share_memory() {
        let registry = registry(SessionLimits::default());

        registry.chat(&key("alice"), "my order is ORD001", None).await.expect("chat");
        registry.chat(&key("alice"), "and the payment?", None).await.expect("chat");
        let bob = registry.chat(&key("bob"), "hello", None).await.expect("chat");

        assert_eq!(bob.reply, "seen 1 turns, last: hello");
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn reset_clears_only_that_session() {
        let registry = registry(SessionLimits::default());
        registry.chat(&key("alice"), "first", None).await.expect("chat");
        registry.chat(&key("bob"), "first", None).await.expect("chat");

        assert!(registry.reset(&key("alice")).await);
        assert!(registry.reset(&key("alice")).await);
        assert!(!registry.reset(&key("carol")).await);

        let alice = registry.chat(&key("alice"), "again", None).await.expect("chat");
        let bob = registry.chat(&key("bob"), "again", None).await.expect("chat");
        assert_eq!(alice.reply, "seen 1 turns, last: again");
        assert_eq!(bob.reply, "seen 3 turns, last: again");
    }

    #[tokio::test]
    async fn full_registry_evicts_least_recently_used() {
        let registry = registry(SessionLimits { max_sessions: 2, ..SessionLimits::default() });

        registry.chat(&key("a"), "hi", None).await.expect("chat");
        tokio::time::sleep(Duration::from_millis(5)).await;
        registry.chat(&key("b"), "hi", None).await.expect("chat");
        tokio::time::sleep(Duration::from_millis(5)).await;
        registry.chat(&key("a"), "again", None).await.expect("chat");
        tokio::time::sleep(Duration::from_millis(5)).await;
        registry.chat(&key("c"), "hi", None).await.expect("chat");

        assert!(registry.contains(&key("a")).await);
        assert!(!registry.contains(&key("b")).await);
        assert!(registry.contains(&key("c")).await);
    }

    #[tokio::test]
    async fn idle_sessions_are_swept() {
        let limits =
            SessionLimits { idle_timeout: Duration::from_secs(60), ..SessionLimits::default() };
        let registry = registry(limits);
        registry.chat(&key("a"), "hi", None).await.expect("chat");

        assert_eq!(registry.evict_idle_at(Instant::now()).await, 0);
        assert_eq!(registry.evict_idle_at(Instant::now() + Duration::from_secs(61)).await, 1);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn closed_registry_refuses_chats() {
        let registry = registry(SessionLimits::default());
        registry.close();

        let result = registry.chat(&key("a"), "hi", None).await;

        assert_eq!(result.err(), Some(SessionError::Closed));
    }
}
