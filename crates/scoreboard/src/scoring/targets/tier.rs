use serde::{Deserialize, Serialize};

const FAST_PACE_PERCENT: f64 = 80.0;
const MEDIUM_PACE_PERCENT: f64 = 50.0;

/// Coarse progress label derived from completion against the active tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pace {
    Fast,
    Medium,
    Slow,
}

impl Pace {
    pub fn from_completion(completion_percent: f64) -> Self {
        if completion_percent >= FAST_PACE_PERCENT {
            Pace::Fast
        } else if completion_percent >= MEDIUM_PACE_PERCENT {
            Pace::Medium
        } else {
            Pace::Slow
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Pace::Fast => "Fast",
            Pace::Medium => "Medium",
            Pace::Slow => "Slow",
        }
    }
}

/// Three ascending squad targets for a month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub tier1: f64,
    pub tier2: f64,
    pub tier3: f64,
}

impl TierThresholds {
    pub fn new(tier1: f64, tier2: f64, tier3: f64) -> Self {
        Self {
            tier1,
            tier2,
            tier3,
        }
    }

    pub fn evaluate(&self, achieved: f64) -> TargetTierResult {
        evaluate_tier(achieved, self.tier1, self.tier2, self.tier3)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetTierResult {
    pub active_tier_value: f64,
    pub active_tier_index: u8,
    pub gap: f64,
    pub completion_percent: f64,
    pub pace: Pace,
}

/// Pick the tier currently being chased and measure progress against it.
///
/// Tiers are expected in ascending order. Misordered input is still evaluated
/// deterministically: the checks run from tier3 down to tier1 and the first match wins.
pub fn evaluate_tier(achieved: f64, tier1: f64, tier2: f64, tier3: f64) -> TargetTierResult {
    let (active_tier_value, active_tier_index) = if achieved >= tier3 || achieved >= tier2 {
        (tier3, 3)
    } else if achieved >= tier1 {
        (tier2, 2)
    } else {
        (tier1, 1)
    };

    if achieved >= tier3 {
        return TargetTierResult {
            active_tier_value,
            active_tier_index,
            gap: 0.0,
            completion_percent: 100.0,
            pace: Pace::Fast,
        };
    }

    let gap = (active_tier_value - achieved).max(0.0);
    let completion_percent = if active_tier_value > 0.0 {
        (achieved / active_tier_value * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };

    TargetTierResult {
        active_tier_value,
        active_tier_index,
        gap,
        completion_percent,
        pace: Pace::from_completion(completion_percent),
    }
}
