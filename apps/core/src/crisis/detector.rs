//! Crisis Detector - Main orchestrator for the crisis module.
//!
//! Runs the signal matcher and behavioral analyzer against the same inputs,
//! dampens the lexical score with protective factors and classifies the sum.
//!
//! The detector holds only read-only tables, so one instance can be shared
//! across threads and sessions. Analysis never fails: internal errors turn
//! into a degraded result.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, error, warn};

use super::analysis::AnalysisResult;
use super::behavior::BehavioralAnalyzer;
use super::protective::ProtectiveFactorAdjuster;
use super::scorer::RiskScorer;
use super::signals::{CategoryDefinition, SignalMatcher};
use crate::error::{AppError, AppResult};
use crate::models::ConversationMessage;

/// Crisis-signal scoring engine.
#[derive(Debug, Clone)]
pub struct CrisisDetector {
    matcher: SignalMatcher,
    adjuster: ProtectiveFactorAdjuster,
    behavior: BehavioralAnalyzer,
}

impl CrisisDetector {
    /// Create a detector with the built-in lexicon.
    pub fn new() -> AppResult<Self> {
        Self::from_matcher(SignalMatcher::new()?)
    }

    /// Create a detector with a custom category table.
    pub fn with_categories(definitions: &[CategoryDefinition]) -> AppResult<Self> {
        Self::from_matcher(SignalMatcher::from_definitions(definitions)?)
    }

    /// Create a detector from a JSON lexicon file (an array of category definitions).
    pub fn from_lexicon_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let definitions: Vec<CategoryDefinition> = serde_json::from_str(&raw).map_err(|e| {
            AppError::Config(format!("Invalid lexicon file {}: {}", path.display(), e))
        })?;

        debug!("Loaded {} crisis categories from {}", definitions.len(), path.display());
        Self::with_categories(&definitions)
    }

    fn from_matcher(matcher: SignalMatcher) -> AppResult<Self> {
        Ok(Self {
            matcher,
            adjuster: ProtectiveFactorAdjuster::new()?,
            behavior: BehavioralAnalyzer::new(),
        })
    }

    pub fn matcher(&self) -> &SignalMatcher {
        &self.matcher
    }

    /// Analyze one inbound message against the prior history.
    ///
    /// `history` must not include `message` itself. `now` is the instant of
    /// analysis in the user's local offset.
    pub fn analyze(
        &self,
        message: &str,
        history: &[ConversationMessage],
        now: DateTime<FixedOffset>,
    ) -> AnalysisResult {
        match self.try_analyze(message, history, now) {
            Ok(result) => result,
            Err(e) => {
                error!("Crisis analysis degraded: {}", e);
                AnalysisResult::degraded(e.to_string(), now)
            }
        }
    }

    /// Analyze with history supplied as raw JSON records.
    ///
    /// A record that cannot be decoded (missing role or content, unknown role)
    /// degrades the whole analysis rather than being dropped.
    pub fn analyze_records(
        &self,
        message: &str,
        records: &[serde_json::Value],
        now: DateTime<FixedOffset>,
    ) -> AnalysisResult {
        match decode_history(records) {
            Ok(history) => self.analyze(message, &history, now),
            Err(e) => {
                error!("Crisis analysis degraded: {}", e);
                AnalysisResult::degraded(e.to_string(), now)
            }
        }
    }

    fn try_analyze(
        &self,
        message: &str,
        history: &[ConversationMessage],
        now: DateTime<FixedOffset>,
    ) -> AppResult<AnalysisResult> {
        // 1. Lexical signals
        let signals = self.matcher.find_matches(message);
        for signal in &signals {
            warn!(
                category = %signal.category,
                weight = signal.weight,
                "Crisis signal detected"
            );
        }
        let raw_score = SignalMatcher::raw_score(&signals);

        // 2. Protective dampening
        let protective_count = self.adjuster.count(message);
        let adjusted = ProtectiveFactorAdjuster::adjust(raw_score, protective_count);

        // 3. Behavioral flags
        let flags = self.behavior.analyze(history, now);

        // 4. Final score and tier
        let score = RiskScorer::final_score(adjusted, &flags).ok_or_else(|| {
            AppError::Internal(format!(
                "non-finite crisis score (raw {}, adjusted {})",
                raw_score, adjusted
            ))
        })?;

        let result = AnalysisResult::scored(score, signals, flags, now);
        debug!(
            protective_count,
            history_len = history.len(),
            "{}",
            result.summary()
        );

        Ok(result)
    }
}

/// Decode raw history records, reporting the first bad index.
pub fn decode_history(records: &[serde_json::Value]) -> AppResult<Vec<ConversationMessage>> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            ConversationMessage::deserialize(record).map_err(|e| {
                AppError::Validation(format!("history record {} is malformed: {}", index, e))
            })
        })
        .collect()
}
