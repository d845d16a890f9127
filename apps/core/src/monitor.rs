//! Per-turn pipeline around the detector.
//!
//! For each inbound user message: resolve the session, analyse the message
//! against the history that preceded it, record the turn, and hand HIGH-risk
//! alerts to the configured sink. Reply generation happens elsewhere; its
//! output comes back through [`CrisisMonitor::record_reply`].

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::crisis::{
    build_alert, guidance_for, should_alert, AlertSink, AnalysisResult, CrisisDetector,
    CrisisResource, RiskLevel,
};
use crate::error::AppResult;
use crate::session::{SessionMetrics, SessionStore};

/// What the transport layer needs after one user message.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub session_id: String,
    pub analysis: AnalysisResult,
    /// MEDIUM or HIGH
    pub crisis_detected: bool,
    /// Resources to surface to the end user; only populated for HIGH.
    pub crisis_resources: Vec<CrisisResource>,
    /// Intervention script for the reply generator
    pub guidance: &'static str,
    /// Whether an alert was delivered for this turn
    pub alert_raised: bool,
}

pub struct CrisisMonitor {
    detector: Arc<CrisisDetector>,
    sessions: SessionStore,
    sink: Arc<dyn AlertSink>,
}

impl CrisisMonitor {
    pub fn new(detector: Arc<CrisisDetector>, sessions: SessionStore, sink: Arc<dyn AlertSink>) -> Self {
        Self {
            detector,
            sessions,
            sink,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Analyse and record one user message.
    pub fn process_user_message(
        &self,
        session_id: Option<&str>,
        message: &str,
        now: DateTime<FixedOffset>,
    ) -> AppResult<TurnOutcome> {
        let now_utc = now.with_timezone(&Utc);
        let session_id = self.sessions.get_or_create(session_id, now_utc)?;
        let history = self.sessions.history(&session_id)?;

        let analysis = self.detector.analyze(message, &history, now);

        self.sessions.record_user_message(&session_id, message, now_utc)?;
        self.sessions.record_score(&session_id, analysis.crisis_score)?;

        let alert_raised = if should_alert(&analysis) {
            self.raise_alert(&session_id, &analysis, message, now_utc)?
        } else {
            false
        };

        info!(
            session_id = %session_id,
            crisis_score = analysis.crisis_score,
            risk_level = %analysis.risk_level,
            degraded = analysis.is_degraded(),
            "Chat interaction processed"
        );

        let crisis_resources = match (&analysis.risk_level, &analysis.resources) {
            (RiskLevel::High, Some(resources)) => resources.clone(),
            _ => Vec::new(),
        };

        Ok(TurnOutcome {
            session_id,
            crisis_detected: analysis.crisis_detected(),
            crisis_resources,
            guidance: guidance_for(analysis.risk_level),
            alert_raised,
            analysis,
        })
    }

    fn raise_alert(
        &self,
        session_id: &str,
        analysis: &AnalysisResult,
        message: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let Some(record) = self.sessions.snapshot(session_id)? else {
            return Ok(false);
        };

        let alert = build_alert(analysis, message, &record.alert_context(), now);
        match self.sink.deliver(&alert) {
            Ok(()) => Ok(true),
            Err(e) => {
                error!(session_id = %session_id, "Failed to deliver crisis alert: {}", e);
                Ok(false)
            }
        }
    }

    /// Record the generated reply for a session.
    pub fn record_reply(
        &self,
        session_id: &str,
        reply: &str,
        tokens: u64,
        cost: f64,
        now: DateTime<FixedOffset>,
    ) -> AppResult<()> {
        self.sessions
            .record_assistant_message(session_id, reply, tokens, cost, now.with_timezone(&Utc))
    }

    pub fn metrics(&self) -> AppResult<SessionMetrics> {
        self.sessions.metrics()
    }
}
