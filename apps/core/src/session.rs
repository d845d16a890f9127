use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use crate::crisis::AlertContext;
use crate::error::{AppError, AppResult};
use crate::models::{ConversationHistory, ConversationMessage};

/// Sessions whose peak score exceeds this count as high-risk in metrics.
pub const HIGH_RISK_SESSION_THRESHOLD: f64 = 0.7;

/// Everything the store remembers about one conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub session_id: String,
    /// Chronological message history.
    pub messages: ConversationHistory,
    pub created_at: DateTime<Utc>,
    /// Crisis score of every analysed user message, in order.
    pub crisis_scores: Vec<f64>,
    pub total_tokens: u64,
    pub total_cost: f64,
}

impl SessionRecord {
    fn new(session_id: String, created_at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            messages: Vec::new(),
            created_at,
            crisis_scores: Vec::new(),
            total_tokens: 0,
            total_cost: 0.0,
        }
    }

    /// Highest recorded crisis score.
    pub fn peak_score(&self) -> Option<f64> {
        self.crisis_scores.iter().copied().reduce(f64::max)
    }

    /// Session facts quoted in crisis alerts.
    pub fn alert_context(&self) -> AlertContext<'_> {
        AlertContext {
            session_id: &self.session_id,
            message_count: self.messages.len(),
            created_at: Some(self.created_at),
            total_tokens: self.total_tokens,
            total_cost: self.total_cost,
        }
    }
}

/// Aggregate view over all retained sessions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionMetrics {
    pub total_sessions: usize,
    pub high_risk_sessions: usize,
    pub avg_session_length: f64,
}

/// A bounded, in-memory session store.
///
/// The least recently used session is evicted once capacity is reached.
/// Nothing is persisted.
pub struct SessionStore {
    sessions: Mutex<LruCache<String, SessionRecord>>,
}

impl SessionStore {
    /// Creates a store holding at most `capacity` sessions.
    pub fn new(capacity: usize) -> AppResult<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| AppError::Config("Session capacity must be at least 1".to_string()))?;

        Ok(Self {
            sessions: Mutex::new(LruCache::new(capacity)),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, LruCache<String, SessionRecord>>> {
        self.sessions
            .lock()
            .map_err(|_| AppError::Internal("Session store lock poisoned".to_string()))
    }

    /// Returns the given session id, creating the session if unknown.
    /// A missing or blank id gets a fresh UUID.
    pub fn get_or_create(&self, session_id: Option<&str>, now: DateTime<Utc>) -> AppResult<String> {
        let session_id = match session_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().to_string(),
        };

        let mut sessions = self.lock()?;
        if sessions.get(&session_id).is_none() {
            let record = SessionRecord::new(session_id.clone(), now);
            if let Some((evicted, _)) = sessions.push(session_id.clone(), record) {
                if evicted != session_id {
                    debug!("Evicted least recently used session {}", evicted);
                }
            }
            info!("Session created: {}", session_id);
        }

        Ok(session_id)
    }

    fn with_session<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionRecord) -> R,
    ) -> AppResult<R> {
        let mut sessions = self.lock()?;
        let record = sessions
            .get_mut(session_id)
            .ok_or_else(|| AppError::Validation(format!("Unknown session: {}", session_id)))?;
        Ok(f(record))
    }

    /// Copy of the session's message history.
    pub fn history(&self, session_id: &str) -> AppResult<ConversationHistory> {
        self.with_session(session_id, |record| record.messages.clone())
    }

    /// Copy of the whole session record, if retained.
    pub fn snapshot(&self, session_id: &str) -> AppResult<Option<SessionRecord>> {
        Ok(self.lock()?.peek(session_id).cloned())
    }

    pub fn record_user_message(
        &self,
        session_id: &str,
        content: &str,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.with_session(session_id, |record| {
            record.messages.push(ConversationMessage::user(content, at));
        })
    }

    pub fn record_assistant_message(
        &self,
        session_id: &str,
        content: &str,
        tokens: u64,
        cost: f64,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.with_session(session_id, |record| {
            record.messages.push(ConversationMessage::assistant(content, at));
            record.total_tokens += tokens;
            record.total_cost += cost;
        })
    }

    pub fn record_score(&self, session_id: &str, score: f64) -> AppResult<()> {
        self.with_session(session_id, |record| record.crisis_scores.push(score))
    }

    pub fn len(&self) -> AppResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> AppResult<bool> {
        Ok(self.lock()?.is_empty())
    }

    /// Totals over every retained session.
    pub fn metrics(&self) -> AppResult<SessionMetrics> {
        let sessions = self.lock()?;
        let total_sessions = sessions.len();

        let high_risk_sessions = sessions
            .iter()
            .filter(|(_, record)| {
                record
                    .peak_score()
                    .is_some_and(|peak| peak > HIGH_RISK_SESSION_THRESHOLD)
            })
            .count();

        let total_messages: usize = sessions.iter().map(|(_, r)| r.messages.len()).sum();
        let avg_session_length = total_messages as f64 / total_sessions.max(1) as f64;

        Ok(SessionMetrics {
            total_sessions,
            high_risk_sessions,
            avg_session_length,
        })
    }
}
