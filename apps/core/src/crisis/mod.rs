//! # Crisis Module
//!
//! Deterministic crisis-signal scoring for CrisisWatch.
//! Analyzes each inbound user message BEFORE a reply is generated.
//!
//! ## Components
//! - `signals`: Weighted lexical pattern matching per crisis category
//! - `protective`: Protective-factor dampening of the lexical score
//! - `behavior`: Behavioral flags from history and the injected current instant
//! - `scorer`: Final bounded score, risk tier and recommended action
//! - `guidance`: Intervention script per tier
//! - `resources`: Fixed crisis resource list
//! - `analysis`: Output data structure
//! - `detector`: Main orchestrator
//! - `alert`: Alert/case payloads for the telemetry boundary

pub mod alert;
pub mod analysis;
pub mod behavior;
pub mod detector;
pub mod guidance;
pub mod protective;
pub mod resources;
pub mod scorer;
pub mod signals;

pub use alert::{build_alert, should_alert, AlertContext, AlertSink, CrisisAlert, LogAlertSink};
pub use analysis::{AnalysisResult, AnalysisStatus};
pub use behavior::{BehavioralAnalyzer, BehavioralFlags};
pub use detector::CrisisDetector;
pub use guidance::guidance_for;
pub use protective::ProtectiveFactorAdjuster;
pub use resources::{crisis_resources, CrisisResource, CRISIS_RESOURCES};
pub use scorer::{RecommendedAction, RiskLevel, RiskScorer};
pub use signals::{CategoryDefinition, CrisisCategory, SignalMatch, SignalMatcher};
