use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::scoring::{
    CycleWindow, DashboardService, DirectorySource, FactsSource, MemberIdentity,
    PartialTargetWeights, RawBehaviorFacts, RankingOptions, ReportingMonth, SourceError,
    TargetConfigSource, TierThresholds,
};

pub(super) fn member(username: &str, brand: &str) -> MemberIdentity {
    MemberIdentity::new(username, brand, "day")
}

/// Facts worth exactly `score` points under default weights (5 per retained customer).
pub(super) fn facts_worth(score: u64) -> RawBehaviorFacts {
    RawBehaviorFacts {
        retention_count: score / 5,
        ..RawBehaviorFacts::default()
    }
}

#[derive(Default)]
pub(super) struct MemoryDirectory {
    members: Vec<MemberIdentity>,
    squads: HashMap<String, String>,
    listing_error: Option<SourceError>,
}

impl MemoryDirectory {
    pub(super) fn with_member(mut self, member: MemberIdentity) -> Self {
        self.members.push(member);
        self
    }

    pub(super) fn with_squad(mut self, brand: &str, squad: &str) -> Self {
        self.squads.insert(brand.to_string(), squad.to_string());
        self
    }

    pub(super) fn failing_listing(mut self) -> Self {
        self.listing_error = Some(SourceError::Unavailable("directory offline".to_string()));
        self
    }

    pub(super) fn members(&self) -> Vec<MemberIdentity> {
        self.members.clone()
    }
}

#[async_trait]
impl DirectorySource for MemoryDirectory {
    async fn list_active_members(&self) -> Result<Vec<MemberIdentity>, SourceError> {
        match &self.listing_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.members.clone()),
        }
    }

    async fn resolve_squad(&self, brand: &str) -> Result<Option<String>, SourceError> {
        Ok(self.squads.get(brand).cloned())
    }
}

/// Facts keyed by username, with optional failures, delays and in-flight tracking.
#[derive(Default)]
pub(super) struct MemoryFacts {
    facts: HashMap<String, RawBehaviorFacts>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    default_delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl MemoryFacts {
    pub(super) fn with_facts(mut self, username: &str, facts: RawBehaviorFacts) -> Self {
        self.facts.insert(username.to_string(), facts);
        self
    }

    pub(super) fn failing_for(mut self, username: &str) -> Self {
        self.failing.insert(username.to_string());
        self
    }

    pub(super) fn delayed_for(mut self, username: &str, delay: Duration) -> Self {
        self.delays.insert(username.to_string(), delay);
        self
    }

    pub(super) fn delayed(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    pub(super) fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FactsSource for MemoryFacts {
    async fn fetch_raw_behavior_facts(
        &self,
        member: &MemberIdentity,
        _window: &CycleWindow,
    ) -> Result<RawBehaviorFacts, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);

        let delay = self
            .delays
            .get(&member.username)
            .copied()
            .or(self.default_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&member.username) {
            return Err(SourceError::Unavailable(format!(
                "facts for {} are unavailable",
                member.username
            )));
        }

        Ok(self
            .facts
            .get(&member.username)
            .copied()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub(super) struct MemoryTargets {
    weights: PartialTargetWeights,
    tiers: HashMap<String, TierThresholds>,
    weights_error: Option<SourceError>,
}

impl MemoryTargets {
    pub(super) fn with_weights(mut self, weights: PartialTargetWeights) -> Self {
        self.weights = weights;
        self
    }

    pub(super) fn with_tiers(mut self, squad: &str, tiers: TierThresholds) -> Self {
        self.tiers.insert(squad.to_string(), tiers);
        self
    }

    pub(super) fn failing_weights(mut self) -> Self {
        self.weights_error = Some(SourceError::Timeout);
        self
    }
}

#[async_trait]
impl TargetConfigSource for MemoryTargets {
    async fn fetch_weights(
        &self,
        _month: &ReportingMonth,
    ) -> Result<PartialTargetWeights, SourceError> {
        match &self.weights_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.weights),
        }
    }

    async fn fetch_squad_tiers(
        &self,
        month: &ReportingMonth,
        squad: &str,
    ) -> Result<TierThresholds, SourceError> {
        self.tiers
            .get(squad)
            .copied()
            .ok_or_else(|| SourceError::Unavailable(format!("no tiers for {squad} in {month}")))
    }
}

pub(super) type MemoryService = DashboardService<MemoryDirectory, MemoryFacts, MemoryTargets>;

pub(super) fn build_service(
    directory: MemoryDirectory,
    facts: MemoryFacts,
    targets: MemoryTargets,
) -> Arc<MemoryService> {
    Arc::new(DashboardService::new(
        Arc::new(directory),
        Arc::new(facts),
        Arc::new(targets),
        RankingOptions::default(),
    ))
}

/// Two squads: amy and bob in Squad A (acme), cat in Squad B (globex).
pub(super) fn sample_service() -> Arc<MemoryService> {
    build_service(
        MemoryDirectory::default()
            .with_member(member("amy", "acme"))
            .with_member(member("bob", "acme"))
            .with_member(member("cat", "globex"))
            .with_squad("acme", "Squad A")
            .with_squad("globex", "Squad B"),
        MemoryFacts::default()
            .with_facts(
                "amy",
                RawBehaviorFacts {
                    deposits: 400_000.0,
                    retention_count: 160,
                    ..RawBehaviorFacts::default()
                },
            )
            .with_facts(
                "bob",
                RawBehaviorFacts {
                    deposits: 200_000.0,
                    retention_count: 40,
                    ..RawBehaviorFacts::default()
                },
            )
            .with_facts("cat", facts_worth(500)),
        MemoryTargets::default()
            .with_tiers("Squad A", TierThresholds::new(500_000.0, 1_000_000.0, 1_500_000.0))
            .with_tiers("Squad B", TierThresholds::new(100.0, 200.0, 300.0)),
    )
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
