//! CrisisWatch CLI
//!
//! Usage:
//!   crisiswatch analyze [FILE]   analyze a JSON request from FILE or stdin
//!   crisiswatch guidance LEVEL   print the intervention script for LOW/MEDIUM/HIGH
//!   crisiswatch resources        print the crisis resource list

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, FixedOffset};
use crisiswatch_core::config::AppConfig;
use crisiswatch_core::crisis::{crisis_resources, guidance_for, RiskLevel};
use crisiswatch_core::logging::init_tracing;
use serde::Deserialize;
use std::io::Read;
use tracing::info;

const USAGE: &str = "Usage: crisiswatch <analyze [FILE] | guidance LEVEL | resources>";

/// Request read by `analyze`.
#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    message: String,
    #[serde(default)]
    history: Vec<serde_json::Value>,
    /// RFC 3339 instant; the configured offset applied to the wall clock when absent.
    #[serde(default)]
    now: Option<String>,
}

fn main() -> Result<()> {
    let config = AppConfig::from_env().context("Failed to load configuration")?;
    init_tracing(&config)?;

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(|s| s.as_str()) {
        Some("analyze") => run_analyze(&config, args.get(2).map(|s| s.as_str())),
        Some("guidance") => {
            let level = args.get(2).ok_or_else(|| anyhow!("Usage: crisiswatch guidance LEVEL"))?;
            run_guidance(level)
        }
        Some("resources") => {
            println!("{}", serde_json::to_string_pretty(&crisis_resources())?);
            Ok(())
        }
        _ => bail!(USAGE),
    }
}

fn run_analyze(config: &AppConfig, path: Option<&str>) -> Result<()> {
    let raw = match path {
        Some(path) if path != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path))?,
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let request: AnalyzeRequest = serde_json::from_str(&raw).context("Invalid analyze request")?;
    let now = resolve_now(config, request.now.as_deref())?;

    let detector = config.build_detector()?;
    let result = detector.analyze_records(&request.message, &request.history, now);

    info!(
        risk_level = %result.risk_level,
        crisis_score = result.crisis_score,
        "Analysis complete"
    );
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn resolve_now(config: &AppConfig, now: Option<&str>) -> Result<DateTime<FixedOffset>> {
    match now {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("Invalid `now` timestamp: {}", raw)),
        None => Ok(config.local_now()?),
    }
}

fn run_guidance(level: &str) -> Result<()> {
    let level: RiskLevel = level.parse()?;
    println!("{}", guidance_for(level));
    Ok(())
}
