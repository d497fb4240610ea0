use async_trait::async_trait;

use super::cycle::{CycleWindow, ReportingMonth};
use super::domain::{MemberIdentity, PartialTargetWeights, RawBehaviorFacts};
use super::targets::TierThresholds;

/// Squad assigned to brands the directory has no mapping for.
pub const DEFAULT_SQUAD: &str = "Squad A";

/// Record store holding customer and transaction facts.
#[async_trait]
pub trait FactsSource: Send + Sync {
    /// Aggregate the member's facts over the inclusive window.
    async fn fetch_raw_behavior_facts(
        &self,
        member: &MemberIdentity,
        window: &CycleWindow,
    ) -> Result<RawBehaviorFacts, SourceError>;
}

/// Member, brand and squad directory.
#[async_trait]
pub trait DirectorySource: Send + Sync {
    async fn list_active_members(&self) -> Result<Vec<MemberIdentity>, SourceError>;

    /// Squad a brand belongs to, `None` when the brand is unmapped.
    async fn resolve_squad(&self, brand: &str) -> Result<Option<String>, SourceError>;
}

/// Persisted per-month target configuration.
#[async_trait]
pub trait TargetConfigSource: Send + Sync {
    async fn fetch_weights(
        &self,
        month: &ReportingMonth,
    ) -> Result<PartialTargetWeights, SourceError>;

    async fn fetch_squad_tiers(
        &self,
        month: &ReportingMonth,
        squad: &str,
    ) -> Result<TierThresholds, SourceError>;
}

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),
    #[error("source did not respond before the deadline")]
    Timeout,
}
