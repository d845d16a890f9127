//! CrisisWatch core.
//!
//! Deterministic crisis-signal scoring for conversational support sessions,
//! plus the session and alerting plumbing around it.
//!
//! ```rust,ignore
//! use crisiswatch_core::crisis::CrisisDetector;
//!
//! let detector = CrisisDetector::new()?;
//! let result = detector.analyze("I need help", &history, now);
//! if result.crisis_detected() { /* surface result.resources */ }
//! ```

pub mod config;
pub mod crisis;
pub mod error;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod session;

pub use crisis::{guidance_for, AnalysisResult, CrisisDetector, RiskLevel};
pub use error::{AppError, AppResult};
pub use models::{ConversationMessage, Role};

#[cfg(test)]
mod tests;
