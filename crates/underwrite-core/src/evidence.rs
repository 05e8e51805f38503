//! Evidence linking for scoring checks.
//!
//! Every earned or withheld increment can point at the response field it
//! read, or at the value the engine recomputed independently.

use serde::{Deserialize, Serialize};

/// Where a piece of evidence comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    /// A value the agents reported
    Response,

    /// A value the engine derived on its own
    Recomputed,
}

/// A piece of evidence supporting a check result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evidence {
    /// What this evidence supports
    pub claim: String,

    pub source: EvidenceSource,

    /// Pointer to the value (e.g., "agent_outputs.credit_analyst.dti_ratio")
    pub pointer: String,
}

impl Evidence {
    /// Evidence from a top-level envelope field.
    pub fn from_field(claim: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            claim: claim.into(),
            source: EvidenceSource::Response,
            pointer: field.into(),
        }
    }

    /// Evidence from a field inside one agent's output.
    pub fn from_agent(claim: impl Into<String>, agent: &str, field: &str) -> Self {
        Self {
            claim: claim.into(),
            source: EvidenceSource::Response,
            pointer: format!("agent_outputs.{}.{}", agent, field),
        }
    }

    /// Evidence from a recomputed quantity.
    pub fn recomputed(claim: impl Into<String>, quantity: &str) -> Self {
        Self {
            claim: claim.into(),
            source: EvidenceSource::Recomputed,
            pointer: format!("recomputed.{}", quantity),
        }
    }
}
