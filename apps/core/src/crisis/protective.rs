//! Protective factor dampening.
//!
//! Language describing existing support reduces the raw lexical score by 15%
//! per occurrence, down to (never below) zero.

use regex::Regex;

use super::signals::{compile_pattern, normalize_message};
use crate::error::AppResult;

const PROTECTIVE_PATTERNS: &[&str] = &[
    r"\bgetting help\b",
    r"\bin therapy\b",
    r"\bseeing therapist\b",
    r"\btalking to someone\b",
    r"\bfamily supports\b",
    r"\bfriends care\b",
];

/// Reduction applied per protective occurrence.
pub const DAMPENING_PER_FACTOR: f64 = 0.15;

/// Detects supportive language and dampens the raw score.
#[derive(Debug, Clone)]
pub struct ProtectiveFactorAdjuster {
    patterns: Vec<Regex>,
}

impl ProtectiveFactorAdjuster {
    pub fn new() -> AppResult<Self> {
        let patterns = PROTECTIVE_PATTERNS
            .iter()
            .map(|source| compile_pattern(source))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// Number of protective phrase occurrences in the message.
    pub fn count(&self, message: &str) -> usize {
        let normalized = normalize_message(message);
        self.patterns
            .iter()
            .map(|p| p.find_iter(&normalized).count())
            .sum()
    }

    /// `raw * (1 - min(1, count * 0.15))`, floored at zero.
    pub fn adjust(raw_score: f64, protective_count: usize) -> f64 {
        let reduction = (protective_count as f64 * DAMPENING_PER_FACTOR).min(1.0);
        let multiplier = (1.0 - reduction).max(0.0);
        (raw_score * multiplier).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_phrases() {
        let adjuster = ProtectiveFactorAdjuster::new().unwrap();

        assert_eq!(adjuster.count("I'm in therapy"), 1);
        assert_eq!(adjuster.count("I'm IN THERAPY and getting help"), 2);
        assert_eq!(adjuster.count("I'm seeing therapist weekly"), 1);
        // the phrase list is fixed; an article breaks the match
        assert_eq!(adjuster.count("I'm seeing a therapist weekly"), 0);
        assert_eq!(adjuster.count("nothing here"), 0);
    }

    #[test]
    fn test_counts_repeated_occurrences() {
        let adjuster = ProtectiveFactorAdjuster::new().unwrap();

        assert_eq!(adjuster.count("in therapy, still in therapy"), 2);
    }

    #[test]
    fn test_adjust_single_factor() {
        assert!((ProtectiveFactorAdjuster::adjust(1.0, 1) - 0.85).abs() < 1e-9);
        assert_eq!(ProtectiveFactorAdjuster::adjust(1.0, 0), 1.0);
    }

    #[test]
    fn test_adjust_never_negative() {
        for count in 0..20 {
            let adjusted = ProtectiveFactorAdjuster::adjust(2.5, count);
            assert!(adjusted >= 0.0, "negative score for count {}", count);
        }
        assert_eq!(ProtectiveFactorAdjuster::adjust(2.5, 7), 0.0);
    }

    #[test]
    fn test_adjust_monotonic() {
        let mut previous = f64::INFINITY;
        for count in 0..12 {
            let adjusted = ProtectiveFactorAdjuster::adjust(1.7, count);
            assert!(adjusted <= previous);
            previous = adjusted;
        }
    }
}
