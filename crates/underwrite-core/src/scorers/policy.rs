//! Underwriting policy tables used by the scorers.
//!
//! These are domain rules, not reward calibration; the calibration lives in
//! [`crate::config::RewardConfig`].

use std::ops::RangeInclusive;

/// DTI above this is high risk.
pub const DTI_CEILING: f64 = 0.43;

/// An approval at high DTI is defensible only above this annual rate (percent).
pub const HIGH_RISK_RATE_FLOOR: f64 = 12.0;

/// Below this credit score a denial is expected.
pub const SUBPRIME_CREDIT_CUTOFF: f64 = 620.0;

/// At or above this credit score an approval is expected.
pub const PRIME_CREDIT_CUTOFF: f64 = 720.0;

/// Below this credit score a credit-related risk factor is expected.
pub const POOR_CREDIT_CUTOFF: f64 = 650.0;

/// Valid range for the analyst's 1-10 risk score.
pub const RISK_SCORE_RANGE: RangeInclusive<f64> = 1.0..=10.0;

/// Credit tier implied by a credit score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl CreditTier {
    /// Tier for a whole-number credit score.
    pub fn from_score(score: f64) -> Self {
        if score >= 750.0 {
            CreditTier::Excellent
        } else if score >= 700.0 {
            CreditTier::Good
        } else if score >= 650.0 {
            CreditTier::Fair
        } else {
            CreditTier::Poor
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CreditTier::Excellent => "excellent",
            CreditTier::Good => "good",
            CreditTier::Fair => "fair",
            CreditTier::Poor => "poor",
        }
    }

    /// Case-insensitive comparison with a reported tier label.
    pub fn matches_label(&self, label: &str) -> bool {
        label.trim().eq_ignore_ascii_case(self.name())
    }
}

/// The analyst's risk assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Parse a risk label case-insensitively.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "low" => Some(RiskTier::Low),
            "medium" => Some(RiskTier::Medium),
            "high" => Some(RiskTier::High),
            _ => None,
        }
    }

    /// Annual interest rate band (percent, inclusive) appropriate to the tier.
    pub fn rate_range(&self) -> RangeInclusive<f64> {
        match self {
            RiskTier::Low => 5.0..=8.0,
            RiskTier::Medium => 8.0..=12.0,
            RiskTier::High => 12.0..=18.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_tier_boundaries() {
        assert_eq!(CreditTier::from_score(750.0), CreditTier::Excellent);
        assert_eq!(CreditTier::from_score(749.0), CreditTier::Good);
        assert_eq!(CreditTier::from_score(700.0), CreditTier::Good);
        assert_eq!(CreditTier::from_score(699.0), CreditTier::Fair);
        assert_eq!(CreditTier::from_score(650.0), CreditTier::Fair);
        assert_eq!(CreditTier::from_score(649.0), CreditTier::Poor);
    }

    #[test]
    fn test_tier_label_match() {
        assert!(CreditTier::Good.matches_label("Good"));
        assert!(!CreditTier::Good.matches_label("excellent"));
    }

    #[test]
    fn test_rate_ranges_inclusive() {
        assert!(RiskTier::Low.rate_range().contains(&8.0));
        assert!(RiskTier::Medium.rate_range().contains(&8.0));
        assert!(RiskTier::High.rate_range().contains(&18.0));
        assert!(!RiskTier::High.rate_range().contains(&18.5));
        assert_eq!(RiskTier::parse(" HIGH "), Some(RiskTier::High));
        assert_eq!(RiskTier::parse("severe"), None);
    }
}
