//! Behavioral heuristics over conversation shape and timing.
//!
//! All four flags are independent. The analyzer reads the history and the
//! caller-supplied instant only; it never consults the system clock.

use chrono::{DateTime, Duration, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};

use super::signals::normalize_message;
use crate::models::{ConversationMessage, Role};

/// History longer than this raises `conversation_length_concern`.
pub const LENGTH_CONCERN_THRESHOLD: usize = 20;

/// Number of trailing user messages inspected for escalation.
pub const ESCALATION_WINDOW: usize = 4;

/// Number of trailing messages inspected for a frequency spike.
pub const FREQUENCY_WINDOW: usize = 3;

/// Late night starts at this local hour (inclusive).
pub const LATE_NIGHT_START_HOUR: u32 = 23;

/// Late night ends at this local hour (inclusive).
pub const LATE_NIGHT_END_HOUR: u32 = 5;

const NEGATIVE_AFFECT_WORDS: &[&str] = &["bad", "worse", "terrible", "awful", "can't", "no"];

fn frequency_span_limit() -> Duration {
    Duration::seconds(60)
}

/// Flags derived from conversation shape rather than content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehavioralFlags {
    pub rapid_escalation: bool,
    pub late_night_distress: bool,
    pub conversation_length_concern: bool,
    pub message_frequency_spike: bool,
}

impl BehavioralFlags {
    /// Flags paired with their wire names, in a fixed order.
    pub fn labelled(&self) -> [(&'static str, bool); 4] {
        [
            ("rapid_escalation", self.rapid_escalation),
            ("late_night_distress", self.late_night_distress),
            ("conversation_length_concern", self.conversation_length_concern),
            ("message_frequency_spike", self.message_frequency_spike),
        ]
    }

    pub fn any(&self) -> bool {
        self.labelled().iter().any(|(_, raised)| *raised)
    }
}

/// Computes [`BehavioralFlags`] from history and the current instant.
#[derive(Debug, Clone)]
pub struct BehavioralAnalyzer {
    negative_words: &'static [&'static str],
}

impl Default for BehavioralAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl BehavioralAnalyzer {
    pub fn new() -> Self {
        Self {
            negative_words: NEGATIVE_AFFECT_WORDS,
        }
    }

    /// Evaluate all four flags.
    pub fn analyze(&self, history: &[ConversationMessage], now: DateTime<FixedOffset>) -> BehavioralFlags {
        BehavioralFlags {
            rapid_escalation: self.rapid_escalation(history),
            late_night_distress: Self::late_night(now),
            conversation_length_concern: Self::length_concern(history),
            message_frequency_spike: Self::frequency_spike(history),
        }
    }

    /// Number of distinct negative-affect lexicon words present in `content`.
    ///
    /// Presence is a plain substring test, so "no" also counts inside "not"
    /// or "nothing".
    pub fn negative_affect_count(&self, content: &str) -> usize {
        let normalized = normalize_message(content);
        self.negative_words
            .iter()
            .filter(|word| normalized.contains(*word))
            .count()
    }

    fn length_concern(history: &[ConversationMessage]) -> bool {
        history.len() > LENGTH_CONCERN_THRESHOLD
    }

    fn late_night(now: DateTime<FixedOffset>) -> bool {
        let hour = now.hour();
        hour >= LATE_NIGHT_START_HOUR || hour <= LATE_NIGHT_END_HOUR
    }

    /// Compares the newest of the last four user messages against the oldest.
    /// Interior messages are ignored.
    fn rapid_escalation(&self, history: &[ConversationMessage]) -> bool {
        let mut recent: Vec<&ConversationMessage> = history
            .iter()
            .rev()
            .filter(|m| m.role == Role::User)
            .take(ESCALATION_WINDOW)
            .collect();

        if recent.len() < 2 {
            return false;
        }
        recent.reverse();

        let (Some(earliest), Some(latest)) = (recent.first(), recent.last()) else {
            return false;
        };

        self.negative_affect_count(&latest.content) > self.negative_affect_count(&earliest.content)
    }

    /// True when the parseable timestamps among the last three messages span
    /// under a minute. Unparseable timestamps are skipped.
    fn frequency_spike(history: &[ConversationMessage]) -> bool {
        if history.len() < FREQUENCY_WINDOW {
            return false;
        }

        let timestamps: Vec<_> = history[history.len() - FREQUENCY_WINDOW..]
            .iter()
            .filter_map(|m| m.parsed_timestamp())
            .collect();

        if timestamps.len() < 2 {
            return false;
        }

        match (timestamps.iter().min(), timestamps.iter().max()) {
            (Some(earliest), Some(latest)) => *latest - *earliest < frequency_span_limit(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at_hour(hour: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 10, hour, 0, 0)
            .unwrap()
    }

    fn user(content: &str, ts: &str) -> ConversationMessage {
        ConversationMessage {
            role: Role::User,
            content: content.to_string(),
            timestamp: ts.to_string(),
        }
    }

    fn assistant(content: &str, ts: &str) -> ConversationMessage {
        ConversationMessage {
            role: Role::Assistant,
            content: content.to_string(),
            timestamp: ts.to_string(),
        }
    }

    #[test]
    fn test_late_night_boundaries() {
        assert!(BehavioralAnalyzer::late_night(at_hour(23)));
        assert!(BehavioralAnalyzer::late_night(at_hour(0)));
        assert!(BehavioralAnalyzer::late_night(at_hour(5)));
        assert!(!BehavioralAnalyzer::late_night(at_hour(6)));
        assert!(!BehavioralAnalyzer::late_night(at_hour(14)));
        assert!(!BehavioralAnalyzer::late_night(at_hour(22)));
    }

    #[test]
    fn test_late_night_uses_local_offset() {
        // 21:00 UTC is 00:00 at UTC+3
        let utc = Utc.with_ymd_and_hms(2024, 5, 10, 21, 0, 0).unwrap();
        let local = utc.with_timezone(&FixedOffset::east_opt(3 * 3600).unwrap());
        assert!(BehavioralAnalyzer::late_night(local));
        assert!(!BehavioralAnalyzer::late_night(utc.fixed_offset()));
    }

    #[test]
    fn test_length_concern_threshold() {
        let twenty: Vec<_> = (0..20).map(|i| user(&format!("msg {}", i), "")).collect();
        assert!(!BehavioralAnalyzer::length_concern(&twenty));

        let twenty_one: Vec<_> = (0..21).map(|i| user(&format!("msg {}", i), "")).collect();
        assert!(BehavioralAnalyzer::length_concern(&twenty_one));
    }

    #[test]
    fn test_negative_affect_substrings() {
        let analyzer = BehavioralAnalyzer::new();

        assert_eq!(analyzer.negative_affect_count("hi there"), 0);
        // "no" is found inside "not" and "nothing", and counts once
        assert_eq!(analyzer.negative_affect_count("I'm not okay, nothing helps"), 1);
        assert_eq!(analyzer.negative_affect_count("I know"), 1);
        assert_eq!(analyzer.negative_affect_count("bad, worse, awful"), 3);
        assert_eq!(analyzer.negative_affect_count("bad bad bad"), 1);
        assert_eq!(analyzer.negative_affect_count("I CAN\u{2019}T"), 1);
        assert_eq!(analyzer.negative_affect_count("badminton"), 1);
    }

    #[test]
    fn test_rapid_escalation_counts_substrings() {
        let analyzer = BehavioralAnalyzer::new();
        let history = vec![
            user("hi there", ""),
            assistant("hello", ""),
            assistant("how can I help?", ""),
            user("I'm not okay, nothing helps", ""),
        ];

        assert!(analyzer.rapid_escalation(&history));
    }

    #[test]
    fn test_rapid_escalation_endpoints() {
        let analyzer = BehavioralAnalyzer::new();
        let history = vec![
            user("today was fine", ""),
            assistant("glad to hear", ""),
            user("it got bad", ""),
            user("fine again", ""),
            user("it's terrible and awful, I can't", ""),
        ];

        assert!(analyzer.rapid_escalation(&history));
    }

    #[test]
    fn test_rapid_escalation_ignores_interior() {
        let analyzer = BehavioralAnalyzer::new();
        let history = vec![
            user("bad day", ""),
            user("terrible awful worse no", ""),
            user("terrible awful worse no", ""),
            user("a bad one", ""),
        ];

        assert!(!analyzer.rapid_escalation(&history));
    }

    #[test]
    fn test_rapid_escalation_window_is_last_four_user_messages() {
        let analyzer = BehavioralAnalyzer::new();
        let history = vec![
            user("everything is fine", ""),
            user("bad and awful", ""),
            user("ok", ""),
            user("ok", ""),
            assistant("no no no, terrible", ""),
            user("bad", ""),
        ];

        // Window starts at "bad and awful" (2), ends at "bad" (1).
        assert!(!analyzer.rapid_escalation(&history));
    }

    #[test]
    fn test_rapid_escalation_needs_two_user_messages() {
        let analyzer = BehavioralAnalyzer::new();

        assert!(!analyzer.rapid_escalation(&[]));
        assert!(!analyzer.rapid_escalation(&[user("terrible", "")]));
        assert!(!analyzer.rapid_escalation(&[
            assistant("hello", ""),
            user("terrible awful", ""),
        ]));
    }

    #[test]
    fn test_frequency_spike() {
        let history = vec![
            user("a", "2024-05-10T10:00:00"),
            assistant("b", "2024-05-10T10:00:10"),
            user("c", "2024-05-10T10:00:20"),
        ];
        assert!(BehavioralAnalyzer::frequency_spike(&history));

        let slow = vec![
            user("a", "2024-05-10T10:00:00"),
            assistant("b", "2024-05-10T10:00:30"),
            user("c", "2024-05-10T10:01:00"),
        ];
        assert!(!BehavioralAnalyzer::frequency_spike(&slow));
    }

    #[test]
    fn test_frequency_spike_skips_bad_timestamps() {
        let history = vec![
            user("a", "not a time"),
            assistant("b", "2024-05-10T10:00:10"),
            user("c", "2024-05-10T10:00:20"),
        ];
        assert!(BehavioralAnalyzer::frequency_spike(&history));

        let one_valid = vec![
            user("a", "garbage"),
            assistant("b", ""),
            user("c", "2024-05-10T10:00:20"),
        ];
        assert!(!BehavioralAnalyzer::frequency_spike(&one_valid));
    }

    #[test]
    fn test_frequency_spike_uses_span_of_unordered_timestamps() {
        // last minus first is 10s, but the stamps span 90s
        let spread = vec![
            user("a", "2024-05-10T10:00:00"),
            assistant("b", "2024-05-10T10:01:30"),
            user("c", "2024-05-10T10:00:10"),
        ];
        assert!(!BehavioralAnalyzer::frequency_spike(&spread));

        // newest stamp first; the span is still 20s
        let reversed = vec![
            user("a", "2024-05-10T10:00:20"),
            assistant("b", "2024-05-10T10:00:10"),
            user("c", "2024-05-10T10:00:00"),
        ];
        assert!(BehavioralAnalyzer::frequency_spike(&reversed));
    }

    #[test]
    fn test_frequency_spike_needs_three_messages() {
        let history = vec![
            user("a", "2024-05-10T10:00:00"),
            user("b", "2024-05-10T10:00:01"),
        ];
        assert!(!BehavioralAnalyzer::frequency_spike(&history));
    }

    #[test]
    fn test_flags_labelled_order() {
        let flags = BehavioralFlags {
            late_night_distress: true,
            ..Default::default()
        };
        let labels: Vec<&str> = flags.labelled().iter().map(|(name, _)| *name).collect();

        assert_eq!(
            labels,
            vec![
                "rapid_escalation",
                "late_night_distress",
                "conversation_length_concern",
                "message_frequency_spike"
            ]
        );
        assert!(flags.any());
        assert!(!BehavioralFlags::default().any());
    }
}
