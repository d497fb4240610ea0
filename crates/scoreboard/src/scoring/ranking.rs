use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, Serializer};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::calculator::MemberScoreCalculator;
use super::cycle::CycleWindow;
use super::domain::{MemberIdentity, MemberScore, ScoringError, TargetWeights};
use super::sources::{DirectorySource, FactsSource, SourceError, DEFAULT_SQUAD};

/// Fan-out controls for a ranking pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingOptions {
    /// Upper bound on members scored at the same time.
    pub max_concurrency: usize,
    /// Per-member deadline; a member exceeding it is reported as failed.
    pub member_timeout: Option<Duration>,
}

impl Default for RankingOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
            member_timeout: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedMember {
    #[serde(flatten)]
    pub score: MemberScore,
    pub squad_name: String,
    pub global_rank: usize,
    pub squad_rank: usize,
}

impl RankedMember {
    pub fn username(&self) -> &str {
        &self.score.member.username
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SquadStatus {
    Leading,
    Behind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SquadAggregate {
    pub squad_name: String,
    pub total_score: i64,
    pub total_deposit_amount: f64,
    pub member_count: usize,
    pub status: SquadStatus,
}

impl SquadAggregate {
    /// Share of the squad total contributed by `score`, as a percentage.
    pub fn personal_share_percent(&self, score: i64) -> f64 {
        if self.total_score == 0 {
            0.0
        } else {
            score as f64 / self.total_score as f64 * 100.0
        }
    }
}

/// Member left out of a ranking because its score could not be computed.
#[derive(Debug, Serialize)]
pub struct MemberFailure {
    pub member: MemberIdentity,
    #[serde(rename = "reason", serialize_with = "serialize_error")]
    pub error: ScoringError,
}

fn serialize_error<S: Serializer>(error: &ScoringError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

#[derive(Debug, Default, Serialize)]
pub struct RankingOutcome {
    pub ranked: Vec<RankedMember>,
    pub squads: Vec<SquadAggregate>,
    pub failures: Vec<MemberFailure>,
}

impl RankingOutcome {
    pub fn member(&self, username: &str) -> Option<&RankedMember> {
        self.ranked
            .iter()
            .find(|entry| entry.username() == username)
    }

    pub fn squad(&self, squad_name: &str) -> Option<&SquadAggregate> {
        self.squads
            .iter()
            .find(|squad| squad.squad_name == squad_name)
    }

    pub fn leaderboard(&self, limit: usize) -> &[RankedMember] {
        &self.ranked[..limit.min(self.ranked.len())]
    }

    /// Remove and return the failure recorded for `username`, if any.
    pub fn take_failure(&mut self, username: &str) -> Option<MemberFailure> {
        let index = self
            .failures
            .iter()
            .position(|failure| failure.member.username == username)?;
        Some(self.failures.remove(index))
    }
}

/// Scores a whole population concurrently and derives global and squad ranks.
pub struct PopulationRanker<D, F> {
    directory: Arc<D>,
    facts: Arc<F>,
    options: RankingOptions,
}

impl<D, F> PopulationRanker<D, F>
where
    D: DirectorySource + 'static,
    F: FactsSource + 'static,
{
    pub fn new(directory: Arc<D>, facts: Arc<F>, options: RankingOptions) -> Self {
        Self {
            directory,
            facts,
            options,
        }
    }

    /// Rank `members` over `window`.
    ///
    /// Members whose score cannot be computed are reported in `failures` and left out of
    /// every rank and aggregate. Dropping the returned future aborts in-flight branches.
    pub async fn rank_all(
        &self,
        members: &[MemberIdentity],
        window: &CycleWindow,
        weights: &TargetWeights,
    ) -> RankingOutcome {
        let calculator = MemberScoreCalculator::new(*weights);
        let permits = Arc::new(Semaphore::new(self.options.max_concurrency.max(1)));
        let mut branches = JoinSet::new();

        for (index, member) in members.iter().cloned().enumerate() {
            let directory = Arc::clone(&self.directory);
            let facts = Arc::clone(&self.facts);
            let permits = Arc::clone(&permits);
            let window = *window;
            let timeout = self.options.member_timeout;

            branches.spawn(async move {
                let outcome = match permits.acquire_owned().await {
                    Ok(_permit) => {
                        let branch =
                            score_member(&*directory, &*facts, calculator, &member, &window);
                        match timeout {
                            Some(limit) => match tokio::time::timeout(limit, branch).await {
                                Ok(result) => result,
                                Err(_) => Err(ScoringError::unavailable(
                                    format!("scoring member '{}'", member.username),
                                    SourceError::Timeout,
                                )),
                            },
                            None => branch.await,
                        }
                    }
                    Err(_) => Err(ScoringError::unavailable(
                        format!("scoring member '{}'", member.username),
                        SourceError::Unavailable("ranking worker pool closed".to_string()),
                    )),
                };
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<Result<(String, MemberScore), ScoringError>>> =
            (0..members.len()).map(|_| None).collect();
        while let Some(joined) = branches.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(err) => warn!(error = %err, "member scoring task did not complete"),
            }
        }

        let mut scored = Vec::with_capacity(members.len());
        let mut failures = Vec::new();
        for (member, slot) in members.iter().zip(slots) {
            match slot {
                Some(Ok((squad_name, score))) => scored.push((squad_name, score)),
                Some(Err(error)) => failures.push(MemberFailure {
                    member: member.clone(),
                    error,
                }),
                None => failures.push(MemberFailure {
                    member: member.clone(),
                    error: ScoringError::unavailable(
                        format!("scoring member '{}'", member.username),
                        SourceError::Unavailable("scoring task aborted".to_string()),
                    ),
                }),
            }
        }

        for failure in &failures {
            warn!(
                member = %failure.member.username,
                error = %failure.error,
                "member excluded from ranking"
            );
        }

        let ranked = assign_ranks(scored);
        let squads = aggregate_squads(&ranked);

        info!(
            window = %window.label,
            month = %window.month,
            ranked = ranked.len(),
            failed = failures.len(),
            squads = squads.len(),
            "population ranked"
        );

        RankingOutcome {
            ranked,
            squads,
            failures,
        }
    }
}

async fn score_member<D, F>(
    directory: &D,
    facts: &F,
    calculator: MemberScoreCalculator,
    member: &MemberIdentity,
    window: &CycleWindow,
) -> Result<(String, MemberScore), ScoringError>
where
    D: DirectorySource + ?Sized,
    F: FactsSource + ?Sized,
{
    let squad_name = directory
        .resolve_squad(&member.brand)
        .await
        .map_err(|source| {
            ScoringError::unavailable(
                format!("resolving squad for brand '{}'", member.brand),
                source,
            )
        })?
        .unwrap_or_else(|| DEFAULT_SQUAD.to_string());

    let score = calculator.compute(member, window, facts).await?;
    Ok((squad_name, score))
}

/// Stable sort by score descending, then number globally and within each squad.
///
/// `scored` must be in the caller's input order; equal scores keep that order.
pub(crate) fn assign_ranks(mut scored: Vec<(String, MemberScore)>) -> Vec<RankedMember> {
    scored.sort_by(|(_, left), (_, right)| right.score.cmp(&left.score));

    let mut squad_positions: HashMap<String, usize> = HashMap::new();
    scored
        .into_iter()
        .enumerate()
        .map(|(position, (squad_name, score))| {
            let squad_position = squad_positions.entry(squad_name.clone()).or_insert(0);
            *squad_position += 1;
            RankedMember {
                score,
                global_rank: position + 1,
                squad_rank: *squad_position,
                squad_name,
            }
        })
        .collect()
}

/// Squad totals in order of first appearance in the ranking.
///
/// A squad leads only when its total is strictly above every other squad's total;
/// tied leaders are all reported as behind.
pub(crate) fn aggregate_squads(ranked: &[RankedMember]) -> Vec<SquadAggregate> {
    let mut squads: Vec<SquadAggregate> = Vec::new();
    let mut index_by_name: HashMap<&str, usize> = HashMap::new();

    for entry in ranked {
        let index = *index_by_name
            .entry(entry.squad_name.as_str())
            .or_insert_with(|| {
                squads.push(SquadAggregate {
                    squad_name: entry.squad_name.clone(),
                    total_score: 0,
                    total_deposit_amount: 0.0,
                    member_count: 0,
                    status: SquadStatus::Behind,
                });
                squads.len() - 1
            });

        let squad = &mut squads[index];
        squad.total_score += entry.score.score;
        squad.total_deposit_amount += entry.score.facts.deposits;
        squad.member_count += 1;
    }

    let totals: Vec<i64> = squads.iter().map(|squad| squad.total_score).collect();
    for (index, squad) in squads.iter_mut().enumerate() {
        let leads = totals
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != index)
            .all(|(_, total)| squad.total_score > *total);
        squad.status = if leads {
            SquadStatus::Leading
        } else {
            SquadStatus::Behind
        };
    }

    squads
}
