use super::cycle::CycleWindow;
use super::domain::{
    MemberIdentity, MemberScore, RawBehaviorFacts, ScoreCategory, ScoreComponent, ScoringError,
    TargetWeights,
};
use super::sources::FactsSource;

/// Stateless calculator applying one month's weights to raw behavior facts.
#[derive(Debug, Clone, Copy)]
pub struct MemberScoreCalculator {
    weights: TargetWeights,
}

impl MemberScoreCalculator {
    pub fn new(weights: TargetWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &TargetWeights {
        &self.weights
    }

    /// Fetch the member's facts for exactly `window` and score them.
    pub async fn compute<F>(
        &self,
        member: &MemberIdentity,
        window: &CycleWindow,
        facts: &F,
    ) -> Result<MemberScore, ScoringError>
    where
        F: FactsSource + ?Sized,
    {
        let raw = facts
            .fetch_raw_behavior_facts(member, window)
            .await
            .map_err(|source| {
                ScoringError::unavailable(
                    format!("fetching facts for member '{}'", member.username),
                    source,
                )
            })?;

        Ok(self.score(member.clone(), *window, raw))
    }

    pub fn score(
        &self,
        member: MemberIdentity,
        window: CycleWindow,
        facts: RawBehaviorFacts,
    ) -> MemberScore {
        let (components, score) = score_facts(&facts, &self.weights);

        MemberScore {
            member,
            window,
            facts,
            components,
            score,
        }
    }
}

/// Each category is rounded on its own before the terms are summed.
pub fn score_facts(
    facts: &RawBehaviorFacts,
    weights: &TargetWeights,
) -> (Vec<ScoreComponent>, i64) {
    let components: Vec<ScoreComponent> = ScoreCategory::ALL
        .iter()
        .map(|&category| {
            let raw = facts.raw(category);
            let weight = weights.weight(category);
            ScoreComponent {
                category,
                raw,
                weight,
                points: (raw * weight).round() as i64,
            }
        })
        .collect();

    let total = components.iter().map(|component| component.points).sum();
    (components, total)
}
