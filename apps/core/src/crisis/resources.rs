//! Pre-approved crisis resources surfaced when risk is elevated.

use serde::Serialize;

/// A support service reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CrisisResource {
    pub name: &'static str,
    pub contact: &'static str,
    /// Availability window; serialized as `available`.
    #[serde(rename = "available")]
    pub availability: &'static str,
}

/// The fixed resource list.
pub const CRISIS_RESOURCES: [CrisisResource; 3] = [
    CrisisResource {
        name: "988 Suicide & Crisis Lifeline",
        contact: "Call/Text 988",
        availability: "24/7",
    },
    CrisisResource {
        name: "Crisis Text Line",
        contact: "Text HOME to 741741",
        availability: "24/7",
    },
    CrisisResource {
        name: "International Association for Suicide Prevention",
        contact: "https://www.iasp.info/resources/Crisis_Centres/",
        availability: "Global directory",
    },
];

/// Owned copy of the list for attaching to results.
pub fn crisis_resources() -> Vec<CrisisResource> {
    CRISIS_RESOURCES.to_vec()
}
