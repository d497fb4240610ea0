//! Cycle-scoped contribution scoring, squad ranking and target-tier evaluation.
//!
//! The engine reads from three collaborators described in [`sources`]: a facts store, a
//! member directory and the per-month target configuration. Everything else in this module
//! is pure computation over the values they return.

pub mod calculator;
pub mod cycle;
pub mod domain;
pub mod ranking;
pub mod router;
pub mod service;
pub mod sources;
pub mod targets;

#[cfg(test)]
mod tests;

pub use calculator::{score_facts, MemberScoreCalculator};
pub use cycle::{cycle_windows, resolve, resolve_window, CycleLabel, CycleWindow, ReportingMonth};
pub use domain::{
    MemberIdentity, MemberScore, PartialTargetWeights, RawBehaviorFacts, ScoreCategory,
    ScoreComponent, ScoringError, TargetWeights, TenureBands,
};
pub use ranking::{
    MemberFailure, PopulationRanker, RankedMember, RankingOptions, RankingOutcome,
    SquadAggregate, SquadStatus,
};
pub use router::dashboard_router;
pub use service::{DashboardService, DashboardSnapshot, Leaderboard, SquadTarget};
pub use sources::{DirectorySource, FactsSource, SourceError, TargetConfigSource, DEFAULT_SQUAD};
pub use targets::{
    evaluate_milestone, evaluate_tier, Level, MilestoneResult, Pace, TargetTierResult,
    TierThresholds, MILESTONES,
};
