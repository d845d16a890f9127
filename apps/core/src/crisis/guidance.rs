//! Intervention scripts per risk tier.

use super::scorer::RiskLevel;

const HIGH_GUIDANCE: &str = "IMMEDIATE ACTION REQUIRED:
1. Human intervention needed within 5 minutes
2. Offer crisis resources immediately
3. Maintain connection - do not leave user alone
4. Consider emergency services if imminent danger
5. Document all interactions";

const MEDIUM_GUIDANCE: &str = "ENHANCED MONITORING:
1. Continue conversation with increased attention
2. Gently suggest professional resources
3. Monitor for escalation
4. Follow up within 24 hours if possible";

const LOW_GUIDANCE: &str = "STANDARD SUPPORT:
1. Provide empathetic, supportive responses
2. Continue normal conversation flow
3. Routine monitoring";

/// Fixed intervention checklist for a tier.
pub fn guidance_for(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::High => HIGH_GUIDANCE,
        RiskLevel::Medium => MEDIUM_GUIDANCE,
        RiskLevel::Low => LOW_GUIDANCE,
    }
}
