//! Final scoring and tier classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::behavior::BehavioralFlags;
use crate::error::AppError;

/// Scores at or above this are HIGH.
pub const HIGH_THRESHOLD: f64 = 0.7;
/// Scores at or above this (and below HIGH) are MEDIUM.
pub const MEDIUM_THRESHOLD: f64 = 0.4;

pub const RAPID_ESCALATION_BONUS: f64 = 0.2;
pub const LATE_NIGHT_BONUS: f64 = 0.15;
pub const CONVERSATION_LENGTH_BONUS: f64 = 0.1;

/// Discrete risk tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// 1, 2 or 3.
    pub fn numeric(&self) -> u8 {
        match self {
            RiskLevel::Low => 1,
            RiskLevel::Medium => 2,
            RiskLevel::High => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }

    /// Next step the tier calls for.
    pub fn recommended_action(&self) -> RecommendedAction {
        match self {
            RiskLevel::Low => RecommendedAction::StandardSupport,
            RiskLevel::Medium => RecommendedAction::EnhancedMonitoring,
            RiskLevel::High => RecommendedAction::ImmediateEscalation,
        }
    }

    /// Whether crisis resources accompany this tier.
    pub fn is_elevated(&self) -> bool {
        !matches!(self, RiskLevel::Low)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for RiskLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(RiskLevel::Low),
            "MEDIUM" => Ok(RiskLevel::Medium),
            "HIGH" => Ok(RiskLevel::High),
            other => Err(AppError::Validation(format!("Unknown risk level: {}", other))),
        }
    }
}

/// Categorical next-step directive, driven solely by the tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendedAction {
    StandardSupport,
    EnhancedMonitoring,
    ImmediateEscalation,
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecommendedAction::StandardSupport => "STANDARD_SUPPORT",
            RecommendedAction::EnhancedMonitoring => "ENHANCED_MONITORING",
            RecommendedAction::ImmediateEscalation => "IMMEDIATE_ESCALATION",
        };
        write!(f, "{}", label)
    }
}

/// Combines the dampened lexical score with behavioral bonuses.
pub struct RiskScorer;

impl RiskScorer {
    /// Bonus from behavioral flags. `message_frequency_spike` is informational
    /// and contributes nothing.
    pub fn behavioral_bonus(flags: &BehavioralFlags) -> f64 {
        let mut bonus = 0.0;
        if flags.rapid_escalation {
            bonus += RAPID_ESCALATION_BONUS;
        }
        if flags.late_night_distress {
            bonus += LATE_NIGHT_BONUS;
        }
        if flags.conversation_length_concern {
            bonus += CONVERSATION_LENGTH_BONUS;
        }
        bonus
    }

    /// Final score in [0, 1], rounded to three decimals.
    ///
    /// Returns `None` when the inputs produce a non-finite value.
    pub fn final_score(adjusted_lexical: f64, flags: &BehavioralFlags) -> Option<f64> {
        let total = adjusted_lexical + Self::behavioral_bonus(flags);
        if !total.is_finite() {
            return None;
        }
        Some(round3(total.clamp(0.0, 1.0)))
    }

    /// Map a score to its tier. Boundaries belong to the higher tier.
    pub fn classify(score: f64) -> RiskLevel {
        if score >= HIGH_THRESHOLD {
            RiskLevel::High
        } else if score >= MEDIUM_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
