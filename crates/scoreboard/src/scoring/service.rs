use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::cycle::{resolve, CycleWindow};
use super::domain::{MemberIdentity, ScoringError, TargetWeights};
use super::ranking::{
    MemberFailure, PopulationRanker, RankedMember, RankingOptions, RankingOutcome, SquadAggregate,
};
use super::sources::{DirectorySource, FactsSource, TargetConfigSource};
use super::targets::{evaluate_milestone, MilestoneResult, TargetTierResult, TierThresholds};

/// Everything the dashboard shows for one member, one month and one cycle.
#[derive(Debug, Serialize)]
pub struct DashboardSnapshot {
    pub window: CycleWindow,
    pub member: RankedMember,
    pub milestone: MilestoneResult,
    pub squads: Vec<SquadAggregate>,
    pub personal_share_percent: f64,
    pub squad_target: SquadTarget,
    pub population: usize,
    /// Members left out of the ranking because their facts could not be loaded.
    pub skipped: Vec<MemberFailure>,
}

/// Progress of the member's squad against its configured tiers.
#[derive(Debug, Clone, Serialize)]
pub struct SquadTarget {
    pub squad_name: String,
    pub achieved: f64,
    pub thresholds: TierThresholds,
    pub result: TargetTierResult,
}

/// Full ranking for one month and one cycle.
#[derive(Debug, Serialize)]
pub struct Leaderboard {
    pub window: CycleWindow,
    pub weights: TargetWeights,
    #[serde(flatten)]
    pub outcome: RankingOutcome,
}

/// Composes window resolution, scoring, ranking and target evaluation.
pub struct DashboardService<D, F, T> {
    directory: Arc<D>,
    facts: Arc<F>,
    targets: Arc<T>,
    options: RankingOptions,
}

impl<D, F, T> DashboardService<D, F, T>
where
    D: DirectorySource + 'static,
    F: FactsSource + 'static,
    T: TargetConfigSource + 'static,
{
    pub fn new(
        directory: Arc<D>,
        facts: Arc<F>,
        targets: Arc<T>,
        options: RankingOptions,
    ) -> Self {
        Self {
            directory,
            facts,
            targets,
            options,
        }
    }

    /// Build the dashboard payload for `member_id`.
    ///
    /// Failures loading the member's own facts, the directory or the target configuration
    /// abort the call; failures for other members are reported in `skipped`.
    pub async fn snapshot(
        &self,
        member_id: &str,
        month: &str,
        cycle_label: &str,
    ) -> Result<DashboardSnapshot, ScoringError> {
        let window = resolve(month, cycle_label)?;
        let weights = self.weights_for(&window).await?;
        let members = self.active_members().await?;

        if !members.iter().any(|member| member.username == member_id) {
            return Err(ScoringError::NotFound(member_id.to_string()));
        }

        let mut outcome = self.ranker().rank_all(&members, &window, &weights).await;

        if let Some(failure) = outcome.take_failure(member_id) {
            warn!(
                member = member_id,
                error = %failure.error,
                "requesting member could not be scored"
            );
            return Err(failure.error);
        }

        let member = outcome
            .member(member_id)
            .cloned()
            .ok_or_else(|| ScoringError::NotFound(member_id.to_string()))?;
        let squad = outcome
            .squad(&member.squad_name)
            .cloned()
            .ok_or_else(|| ScoringError::NotFound(member.squad_name.clone()))?;

        let thresholds = self
            .targets
            .fetch_squad_tiers(&window.month, &squad.squad_name)
            .await
            .map_err(|source| {
                ScoringError::unavailable(
                    format!("loading {} targets for {}", squad.squad_name, window.month),
                    source,
                )
            })?;

        let squad_target = SquadTarget {
            squad_name: squad.squad_name.clone(),
            achieved: squad.total_deposit_amount,
            thresholds,
            result: thresholds.evaluate(squad.total_deposit_amount),
        };

        info!(
            member = member_id,
            month = %window.month,
            window = %window.label,
            score = member.score.score,
            global_rank = member.global_rank,
            squad_rank = member.squad_rank,
            "dashboard snapshot built"
        );

        Ok(DashboardSnapshot {
            window,
            milestone: evaluate_milestone(member.score.score),
            personal_share_percent: squad.personal_share_percent(member.score.score),
            squad_target,
            population: members.len(),
            squads: outcome.squads,
            skipped: outcome.failures,
            member,
        })
    }

    /// Rank the whole active population for a month and cycle.
    pub async fn leaderboard(
        &self,
        month: &str,
        cycle_label: &str,
    ) -> Result<Leaderboard, ScoringError> {
        let window = resolve(month, cycle_label)?;
        let weights = self.weights_for(&window).await?;
        let members = self.active_members().await?;
        let outcome = self.ranker().rank_all(&members, &window, &weights).await;

        Ok(Leaderboard {
            window,
            weights,
            outcome,
        })
    }

    fn ranker(&self) -> PopulationRanker<D, F> {
        PopulationRanker::new(
            Arc::clone(&self.directory),
            Arc::clone(&self.facts),
            self.options,
        )
    }

    async fn weights_for(&self, window: &CycleWindow) -> Result<TargetWeights, ScoringError> {
        let partial = self
            .targets
            .fetch_weights(&window.month)
            .await
            .map_err(|source| {
                ScoringError::unavailable(format!("loading weights for {}", window.month), source)
            })?;
        TargetWeights::from_partial(&partial)
    }

    async fn active_members(&self) -> Result<Vec<MemberIdentity>, ScoringError> {
        self.directory
            .list_active_members()
            .await
            .map_err(|source| ScoringError::unavailable("listing active members", source))
    }
}
