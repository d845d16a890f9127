//! Alert payloads for the telemetry boundary.
//!
//! Builds the event (and, for HIGH risk, the incident case) that a telemetry
//! collaborator raises. Delivery is behind [`AlertSink`]; nothing here
//! performs network I/O.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, warn};

use super::analysis::AnalysisResult;
use super::behavior::BehavioralFlags;
use super::scorer::RiskLevel;
use super::signals::SignalMatch;
use crate::error::AppResult;

/// Messages longer than this many words keep a preview; shorter ones are fully redacted.
const PREVIEW_MIN_WORDS: usize = 10;
const PREVIEW_EDGE_WORDS: usize = 3;
const REDACTED_PREVIEW: &str = "[Content anonymized for privacy]";

pub const ALERT_SOURCE: &str = "crisiswatch";

/// Event severity as understood by the telemetry backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CasePriority {
    P1,
}

/// Session facts owned by the session layer and quoted in alerts.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertContext<'a> {
    pub session_id: &'a str,
    pub message_count: usize,
    pub created_at: Option<DateTime<Utc>>,
    pub total_tokens: u64,
    pub total_cost: f64,
}

/// Incident case opened for HIGH risk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseReport {
    pub title: String,
    pub priority: CasePriority,
    pub description: String,
}

/// A crisis event ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrisisAlert {
    pub title: String,
    pub text: String,
    pub tags: Vec<String>,
    pub severity: AlertSeverity,
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case: Option<CaseReport>,
}

/// Delivery seam for alerts.
pub trait AlertSink: Send + Sync {
    fn deliver(&self, alert: &CrisisAlert) -> AppResult<()>;
}

/// Sink that records alerts in the tracing stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn deliver(&self, alert: &CrisisAlert) -> AppResult<()> {
        let tags = alert.tags.join(",");
        match alert.severity {
            AlertSeverity::Error => error!(tags = %tags, case = alert.case.is_some(), "{}", alert.title),
            AlertSeverity::Warning => warn!(tags = %tags, "{}", alert.title),
        }
        Ok(())
    }
}

/// Whether an analysis warrants an alert.
pub fn should_alert(analysis: &AnalysisResult) -> bool {
    analysis.risk_level == RiskLevel::High
}

/// Build the alert for an analysis.
pub fn build_alert(
    analysis: &AnalysisResult,
    user_message: &str,
    context: &AlertContext<'_>,
    now: DateTime<Utc>,
) -> CrisisAlert {
    let level = analysis.risk_level;
    let preview = anonymize_message(user_message);
    let duration = format_duration(context.created_at, now);
    let signals = format_signals(&analysis.detected_signals);
    let flags = format_behavioral_flags(&analysis.behavioral_flags);

    let title = format!(
        "{} Risk Crisis Detected - Session {}",
        level,
        prefix(context.session_id, 8)
    );

    let text = format!(
        "**Crisis Alert**: {level} risk detected (score: {score})\n\
         \n\
         **Session Context**:\n\
         - Session ID: `{id}`\n\
         - Message Count: {count}\n\
         - Session Duration: {duration}\n\
         - Total Tokens Used: {tokens}\n\
         - Total Cost: ${cost:.4}\n\
         \n\
         **Detected Signals**:\n\
         {signals}\n\
         \n\
         **Behavioral Flags**:\n\
         {flags}\n\
         \n\
         **Recommended Action**: {action}\n\
         \n\
         **Crisis Resources Provided**: {resources}\n\
         \n\
         **Anonymized Message Preview**: {preview}",
        level = level,
        score = analysis.crisis_score,
        id = context.session_id,
        count = context.message_count,
        duration = duration,
        tokens = context.total_tokens,
        cost = context.total_cost,
        signals = signals,
        flags = flags,
        action = analysis.recommended_action,
        resources = if analysis.resources.is_some() { "Yes" } else { "No" },
        preview = preview,
    );

    let tags = vec![
        format!("session_id:{}", context.session_id),
        format!("risk_level:{}", level),
        format!("crisis_score:{}", analysis.crisis_score),
        format!("service:{}", ALERT_SOURCE),
        "event_type:crisis_detection".to_string(),
        format!("action:{}", analysis.recommended_action),
    ];

    let (severity, case) = if level == RiskLevel::High {
        let case = CaseReport {
            title: format!("CRISIS: High Risk Detected - {}", prefix(context.session_id, 12)),
            priority: CasePriority::P1,
            description: case_description(analysis, context, &signals, &flags, &duration, &preview, now),
        };
        (AlertSeverity::Error, Some(case))
    } else {
        (AlertSeverity::Warning, None)
    };

    CrisisAlert {
        title,
        text,
        tags,
        severity,
        source: ALERT_SOURCE,
        case,
    }
}

fn case_description(
    analysis: &AnalysisResult,
    context: &AlertContext<'_>,
    signals: &str,
    flags: &str,
    duration: &str,
    preview: &str,
    now: DateTime<Utc>,
) -> String {
    format!(
        "# High-Risk Crisis Detected\n\
         \n\
         ## Session Information\n\
         - **Session ID**: `{id}`\n\
         - **Detection Time**: {detected}\n\
         - **Crisis Score**: {score}\n\
         - **Risk Level**: {level}\n\
         \n\
         ## Crisis Indicators\n\
         {signals}\n\
         \n\
         ## Behavioral Analysis\n\
         {flags}\n\
         \n\
         ## Session Metrics\n\
         - Messages: {count}\n\
         - Duration: {duration}\n\
         - Tokens: {tokens}\n\
         \n\
         ## Action Items\n\
         - Review full conversation transcript\n\
         - Verify crisis resources were provided to the user\n\
         - Assess whether emergency services must be notified\n\
         - Document initial assessment and actions taken\n\
         \n\
         **Last Message (Anonymized)**: {preview}",
        id = context.session_id,
        detected = now.to_rfc3339(),
        score = analysis.crisis_score,
        level = analysis.risk_level,
        signals = signals,
        flags = flags,
        count = context.message_count,
        duration = duration,
        tokens = context.total_tokens,
        preview = preview,
    )
}

fn prefix(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

/// Keep the first and last three words of long messages; redact short ones.
pub fn anonymize_message(message: &str) -> String {
    let words: Vec<&str> = message.split_whitespace().collect();
    if words.len() > PREVIEW_MIN_WORDS {
        format!(
            "{} [...] {}",
            words[..PREVIEW_EDGE_WORDS].join(" "),
            words[words.len() - PREVIEW_EDGE_WORDS..].join(" ")
        )
    } else {
        REDACTED_PREVIEW.to_string()
    }
}

pub fn format_signals(signals: &[SignalMatch]) -> String {
    if signals.is_empty() {
        return "- No specific crisis keywords detected".to_string();
    }

    signals
        .iter()
        .map(|s| format!("- **{}** (weight: {})", s.category, s.weight))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_behavioral_flags(flags: &BehavioralFlags) -> String {
    flags
        .labelled()
        .iter()
        .map(|(name, raised)| {
            format!(
                "- {}: {}",
                title_case(name),
                if *raised { "YES" } else { "No" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn title_case(snake: &str) -> String {
    snake
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Human-readable session age.
pub fn format_duration(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(created_at) = created_at else {
        return "Unknown".to_string();
    };

    let minutes = (now - created_at).num_minutes();
    match minutes {
        m if m < 1 => "< 1 minute".to_string(),
        1 => "1 minute".to_string(),
        m => format!("{} minutes", m),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 14, 0, 0).unwrap()
    }

    fn high_analysis() -> AnalysisResult {
        let signal = SignalMatch {
            category: "suicide".to_string(),
            weight: 1.0,
            matched_pattern: r"\bkill myself\b".to_string(),
        };
        AnalysisResult::scored(1.0, vec![signal], BehavioralFlags::default(), now().fixed_offset())
    }

    fn context(session_id: &str) -> AlertContext<'_> {
        AlertContext {
            session_id,
            message_count: 4,
            created_at: Some(now() - Duration::minutes(12)),
            total_tokens: 900,
            total_cost: 0.0123,
        }
    }

    #[test]
    fn test_anonymize() {
        assert_eq!(anonymize_message("I want to kill myself"), REDACTED_PREVIEW);
        assert_eq!(
            anonymize_message("one two three four five six seven eight nine ten eleven"),
            "one two three [...] nine ten eleven"
        );
        // exactly ten words is still redacted
        assert_eq!(
            anonymize_message("one two three four five six seven eight nine ten"),
            REDACTED_PREVIEW
        );
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(None, now()), "Unknown");
        assert_eq!(format_duration(Some(now()), now()), "< 1 minute");
        assert_eq!(format_duration(Some(now() - Duration::seconds(90)), now()), "1 minute");
        assert_eq!(format_duration(Some(now() - Duration::minutes(45)), now()), "45 minutes");
    }

    #[test]
    fn test_format_flags() {
        let flags = BehavioralFlags {
            rapid_escalation: true,
            ..Default::default()
        };
        let text = format_behavioral_flags(&flags);

        assert!(text.starts_with("- Rapid Escalation: YES"));
        assert!(text.contains("- Late Night Distress: No"));
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn test_format_signals_empty() {
        assert_eq!(format_signals(&[]), "- No specific crisis keywords detected");
    }

    #[test]
    fn test_high_alert_opens_case() {
        let analysis = high_analysis();
        assert!(should_alert(&analysis));

        let alert = build_alert(&analysis, "I want to kill myself", &context("abcdef0123456789"), now());

        assert_eq!(alert.title, "HIGH Risk Crisis Detected - Session abcdef01");
        assert_eq!(alert.severity, AlertSeverity::Error);
        assert!(alert.tags.contains(&"risk_level:HIGH".to_string()));
        assert!(alert.tags.contains(&"action:IMMEDIATE_ESCALATION".to_string()));
        assert!(alert.text.contains("- **suicide** (weight: 1)"));
        assert!(alert.text.contains("12 minutes"));
        assert!(alert.text.contains("$0.0123"));
        assert!(alert.text.contains("**Crisis Resources Provided**: Yes"));
        assert!(!alert.text.contains("kill myself"));

        let case = alert.case.expect("HIGH alerts carry a case");
        assert_eq!(case.title, "CRISIS: High Risk Detected - abcdef012345");
        assert_eq!(case.priority, CasePriority::P1);
    }

    #[test]
    fn test_medium_alert_is_warning_without_case() {
        let noon = FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let analysis = AnalysisResult::scored(0.5, vec![], BehavioralFlags::default(), noon);
        assert!(!should_alert(&analysis));

        let alert = build_alert(&analysis, "short", &context("s1"), now());
        assert_eq!(alert.severity, AlertSeverity::Warning);
        assert!(alert.case.is_none());
        assert_eq!(alert.title, "MEDIUM Risk Crisis Detected - Session s1");
    }

    #[test]
    fn test_log_sink_accepts() {
        let alert = build_alert(&high_analysis(), "x", &context("s"), now());
        assert!(LogAlertSink.deliver(&alert).is_ok());
    }
}
