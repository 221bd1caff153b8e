//! Risk tiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered risk tier of an imperative command.
///
/// The derive order matters: `Safe < Risky < Dangerous`, so the tier of a
/// compound command is simply the maximum over its parts.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    /// Read-only or otherwise harmless; runs without confirmation.
    #[default]
    Safe,
    /// Mutates local state; needs confirmation.
    Risky,
    /// Destructive, privileged or system-wide; needs confirmation.
    Dangerous,
}

impl RiskTier {
    /// Whether a command at this tier must be confirmed before it runs.
    #[must_use]
    pub fn requires_confirmation(self) -> bool {
        self > Self::Safe
    }

    /// Upper-case label used in spoken and printed prompts.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::Risky => "RISKY",
            Self::Dangerous => "DANGEROUS",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::Risky => write!(f, "risky"),
            Self::Dangerous => write!(f, "dangerous"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(RiskTier::Safe < RiskTier::Risky);
        assert!(RiskTier::Risky < RiskTier::Dangerous);
        assert_eq!(RiskTier::Safe.max(RiskTier::Dangerous), RiskTier::Dangerous);
    }

    #[test]
    fn test_requires_confirmation() {
        assert!(!RiskTier::Safe.requires_confirmation());
        assert!(RiskTier::Risky.requires_confirmation());
        assert!(RiskTier::Dangerous.requires_confirmation());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&RiskTier::Dangerous).unwrap();
        assert_eq!(json, "\"dangerous\"");
        let back: RiskTier = serde_json::from_str("\"risky\"").unwrap();
        assert_eq!(back, RiskTier::Risky);
    }
}
