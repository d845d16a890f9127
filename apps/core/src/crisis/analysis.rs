//! Analysis Result - Output structure for crisis analysis.
//!
//! Built fresh per call and never mutated afterwards.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use super::behavior::BehavioralFlags;
use super::resources::{crisis_resources, CrisisResource};
use super::scorer::{RecommendedAction, RiskLevel, RiskScorer};
use super::signals::SignalMatch;

/// Whether the analysis ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Every component ran; the result reflects the input.
    Complete,
    /// An internal failure occurred; the tier is a safe default, not a clearance.
    Degraded,
}

/// Complete result of analysing one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// Final score in [0, 1], three decimals.
    pub crisis_score: f64,

    /// Tier derived from the score
    pub risk_level: RiskLevel,

    /// 1, 2 or 3
    pub risk_level_numeric: u8,

    /// Every pattern hit, in category table order
    pub detected_signals: Vec<SignalMatch>,

    pub behavioral_flags: BehavioralFlags,

    pub recommended_action: RecommendedAction,

    /// Present iff the tier is MEDIUM or HIGH
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<CrisisResource>>,

    pub status: AnalysisStatus,

    /// Reason the analysis degraded, if it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,

    /// The instant the analysis was performed for
    pub timestamp: DateTime<FixedOffset>,
}

impl AnalysisResult {
    /// Build a completed result from a final score.
    pub fn scored(
        crisis_score: f64,
        detected_signals: Vec<SignalMatch>,
        behavioral_flags: BehavioralFlags,
        timestamp: DateTime<FixedOffset>,
    ) -> Self {
        let risk_level = RiskScorer::classify(crisis_score);

        Self {
            crisis_score,
            risk_level,
            risk_level_numeric: risk_level.numeric(),
            detected_signals,
            behavioral_flags,
            recommended_action: risk_level.recommended_action(),
            resources: risk_level.is_elevated().then(crisis_resources),
            status: AnalysisStatus::Complete,
            failure: None,
            timestamp,
        }
    }

    /// Safe default for a failed analysis: LOW tier, clearly marked as degraded.
    pub fn degraded(reason: impl Into<String>, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            status: AnalysisStatus::Degraded,
            failure: Some(reason.into()),
            ..Self::scored(0.0, vec![], BehavioralFlags::default(), timestamp)
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.status == AnalysisStatus::Degraded
    }

    /// MEDIUM or HIGH.
    pub fn crisis_detected(&self) -> bool {
        self.risk_level.is_elevated()
    }

    /// Get a summary for logging
    pub fn summary(&self) -> String {
        format!(
            "Risk: {} ({:.3}), Signals: {}, Flags: {}, Action: {}{}",
            self.risk_level,
            self.crisis_score,
            self.detected_signals.len(),
            if self.behavioral_flags.any() { "yes" } else { "no" },
            self.recommended_action,
            if self.is_degraded() { ", DEGRADED" } else { "" }
        )
    }
}
