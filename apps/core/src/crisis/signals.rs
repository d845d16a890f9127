//! Crisis signal matching.
//!
//! Weighted lexical patterns grouped into categories. Every pattern that
//! matches a message contributes one [`SignalMatch`]; the raw lexical score is
//! the sum of all contributing weights, so two hits in the same category count
//! twice.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};

// Immediate danger
const SUICIDE_PATTERNS: &[&str] = &[
    r"\bsuicide\b",
    r"\bkill myself\b",
    r"\bend my life\b",
    r"\bdon't want to live\b",
    r"\bwant to die\b",
    r"\bending it all\b",
    r"\bnot worth living\b",
];

const SELF_HARM_PATTERNS: &[&str] = &[
    r"\bcut myself\b",
    r"\bhurt myself\b",
    r"\bself harm\b",
    r"\bself-harm\b",
    r"\bburning myself\b",
];

const PLAN_PATTERNS: &[&str] = &[
    r"\bplanned\b.*\b(suicide|death)\b",
    r"\bhow to (kill|end)\b",
    r"\bmethods (of|for)\b.*\b(suicide|death)\b",
];

// High concern
const HOPELESSNESS_PATTERNS: &[&str] = &[
    r"\bno hope\b",
    r"\bhopeless\b",
    r"\bnothing matters\b",
    r"\bno point\b",
    r"\bgive up\b",
    r"\bcan't go on\b",
];

const ISOLATION_PATTERNS: &[&str] = &[
    r"\bno one cares\b",
    r"\ball alone\b",
    r"\bcompletely alone\b",
    r"\bnobody understands\b",
    r"\bbetter off without me\b",
];

const PAIN_PATTERNS: &[&str] = &[
    r"\bcan't take it anymore\b",
    r"\btoo much pain\b",
    r"\bcan't handle\b",
    r"\bso much pain\b",
];

// Medium concern
const HELP_SEEKING_PATTERNS: &[&str] = &[
    r"\bneed help\b",
    r"\bplease help\b",
    r"\bhelp me\b",
    r"\bdon't know what to do\b",
];

/// Declarative definition of a crisis category, as shipped built-in or loaded
/// from a lexicon file.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CategoryDefinition {
    /// Category name reported on every match (e.g. "suicide").
    #[validate(length(min = 1))]
    pub name: String,
    /// Weight added to the raw score per matching pattern, in (0, 1].
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub weight: f64,
    /// Regex sources, matched case-insensitively.
    #[validate(length(min = 1))]
    pub patterns: Vec<String>,
}

impl CategoryDefinition {
    fn builtin(name: &str, weight: f64, patterns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            weight,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// The built-in category table, ordered from most to least severe.
pub fn default_categories() -> Vec<CategoryDefinition> {
    vec![
        CategoryDefinition::builtin("suicide", 1.0, SUICIDE_PATTERNS),
        CategoryDefinition::builtin("self_harm", 0.9, SELF_HARM_PATTERNS),
        CategoryDefinition::builtin("plan", 1.0, PLAN_PATTERNS),
        CategoryDefinition::builtin("hopelessness", 0.7, HOPELESSNESS_PATTERNS),
        CategoryDefinition::builtin("isolation", 0.6, ISOLATION_PATTERNS),
        CategoryDefinition::builtin("pain", 0.5, PAIN_PATTERNS),
        CategoryDefinition::builtin("help_seeking", 0.4, HELP_SEEKING_PATTERNS),
    ]
}

/// Compiles a pattern for case-insensitive matching.
pub(crate) fn compile_pattern(source: &str) -> AppResult<Regex> {
    RegexBuilder::new(source)
        .case_insensitive(true)
        .build()
        .map_err(AppError::from)
}

/// Lowercases a message and folds typographic apostrophes so that
/// "don’t" matches patterns written with "don't".
pub(crate) fn normalize_message(message: &str) -> String {
    message.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'")
}

/// A compiled, immutable crisis category.
#[derive(Debug, Clone)]
pub struct CrisisCategory {
    name: String,
    weight: f64,
    patterns: Vec<Regex>,
}

impl CrisisCategory {
    /// Validates and compiles a category definition.
    pub fn compile(definition: &CategoryDefinition) -> AppResult<Self> {
        definition.validate()?;

        let patterns = definition
            .patterns
            .iter()
            .map(|source| compile_pattern(source))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            name: definition.name.clone(),
            weight: definition.weight,
            patterns,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

/// One pattern hit within a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMatch {
    /// Category the pattern belongs to.
    #[serde(rename = "type")]
    pub category: String,
    /// Category weight contributed by this match.
    pub weight: f64,
    /// Source of the pattern that matched.
    pub matched_pattern: String,
}

/// Tests messages against the category table.
#[derive(Debug, Clone)]
pub struct SignalMatcher {
    categories: Vec<CrisisCategory>,
}

impl SignalMatcher {
    /// Create a matcher over the built-in category table.
    pub fn new() -> AppResult<Self> {
        Self::from_definitions(&default_categories())
    }

    /// Create a matcher over a caller-supplied category table.
    pub fn from_definitions(definitions: &[CategoryDefinition]) -> AppResult<Self> {
        if definitions.is_empty() {
            return Err(AppError::Config(
                "crisis lexicon must define at least one category".to_string(),
            ));
        }

        let categories = definitions
            .iter()
            .map(CrisisCategory::compile)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self { categories })
    }

    pub fn categories(&self) -> &[CrisisCategory] {
        &self.categories
    }

    /// Every matching pattern, in table order.
    pub fn find_matches(&self, message: &str) -> Vec<SignalMatch> {
        let normalized = normalize_message(message);
        if normalized.trim().is_empty() {
            return vec![];
        }

        let mut matches = Vec::new();
        for category in &self.categories {
            for pattern in &category.patterns {
                if pattern.is_match(&normalized) {
                    matches.push(SignalMatch {
                        category: category.name.clone(),
                        weight: category.weight,
                        matched_pattern: pattern.as_str().to_string(),
                    });
                }
            }
        }

        matches
    }

    /// Sum of the weights of all matches.
    pub fn raw_score(matches: &[SignalMatch]) -> f64 {
        matches.iter().map(|m| m.weight).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suicide_match() {
        let matcher = SignalMatcher::new().unwrap();

        let matches = matcher.find_matches("I want to kill myself tonight");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].category, "suicide");
        assert_eq!(matches[0].weight, 1.0);
        assert_eq!(matches[0].matched_pattern, r"\bkill myself\b");
    }

    #[test]
    fn test_case_insensitive() {
        let matcher = SignalMatcher::new().unwrap();

        let matches = matcher.find_matches("I feel HOPELESS");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].category, "hopelessness");
    }

    #[test]
    fn test_word_boundaries() {
        let matcher = SignalMatcher::new().unwrap();

        // "hopelessly" is not the word "hopeless"
        assert!(matcher.find_matches("hopelessly romantic").is_empty());
        assert!(matcher.find_matches("suicidesquad fan").is_empty());
    }

    #[test]
    fn test_same_category_counts_twice() {
        let matcher = SignalMatcher::new().unwrap();

        let matches = matcher.find_matches("I have no hope, I feel hopeless");
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.category == "hopelessness"));
        assert!((SignalMatcher::raw_score(&matches) - 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_plan_pattern_spans_words() {
        let matcher = SignalMatcher::new().unwrap();

        let matches = matcher.find_matches("I planned everything about my death");
        assert!(matches.iter().any(|m| m.category == "plan"));
    }

    #[test]
    fn test_typographic_apostrophe() {
        let matcher = SignalMatcher::new().unwrap();

        let matches = matcher.find_matches("I don\u{2019}t want to live");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].category, "suicide");
    }

    #[test]
    fn test_no_match() {
        let matcher = SignalMatcher::new().unwrap();

        assert!(matcher.find_matches("I'm feeling a bit down today").is_empty());
        assert!(matcher.find_matches("").is_empty());
        assert!(matcher.find_matches("   ").is_empty());
    }

    #[test]
    fn test_default_table_shape() {
        let matcher = SignalMatcher::new().unwrap();
        let names: Vec<&str> = matcher.categories().iter().map(|c| c.name()).collect();

        assert_eq!(
            names,
            vec!["suicide", "self_harm", "plan", "hopelessness", "isolation", "pain", "help_seeking"]
        );
        assert!(matcher
            .categories()
            .iter()
            .all(|c| c.weight() > 0.0 && c.weight() <= 1.0 && c.pattern_count() > 0));
    }

    #[test]
    fn test_invalid_definitions_rejected() {
        let bad_weight = CategoryDefinition {
            name: "x".to_string(),
            weight: 0.0,
            patterns: vec![r"\bx\b".to_string()],
        };
        assert!(SignalMatcher::from_definitions(&[bad_weight]).is_err());

        let bad_regex = CategoryDefinition {
            name: "x".to_string(),
            weight: 0.5,
            patterns: vec!["(unclosed".to_string()],
        };
        assert!(matches!(
            SignalMatcher::from_definitions(&[bad_regex]),
            Err(AppError::Config(_))
        ));

        assert!(SignalMatcher::from_definitions(&[]).is_err());
    }
}
