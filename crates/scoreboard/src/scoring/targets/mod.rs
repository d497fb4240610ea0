mod milestone;
mod tier;

pub use milestone::{evaluate_milestone, Level, MilestoneResult, MILESTONES};
pub use tier::{evaluate_tier, Pace, TargetTierResult, TierThresholds};
