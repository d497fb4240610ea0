use serde::{Deserialize, Serialize};

/// Individual score milestones, ascending.
pub const MILESTONES: [i64; 3] = [1000, 1500, 2000];

const SILVER_FLOOR: i64 = 500;
const GOLD_FLOOR: i64 = 1000;
const PLATINUM_FLOOR: i64 = 1500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl Level {
    pub fn for_score(score: i64) -> Self {
        if score < SILVER_FLOOR {
            Level::Bronze
        } else if score < GOLD_FLOOR {
            Level::Silver
        } else if score < PLATINUM_FLOOR {
            Level::Gold
        } else {
            Level::Platinum
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Level::Bronze => "Bronze",
            Level::Silver => "Silver",
            Level::Gold => "Gold",
            Level::Platinum => "Platinum",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MilestoneResult {
    pub level: Level,
    /// Smallest milestone not yet reached, `None` once the ladder is cleared.
    pub next_milestone: Option<i64>,
    pub gap_to_next_milestone: i64,
    pub progress_percent: f64,
}

/// Place a score on the level ladder and measure progress to the next milestone.
pub fn evaluate_milestone(score: i64) -> MilestoneResult {
    let level = Level::for_score(score);
    let next_index = MILESTONES.iter().position(|&milestone| score < milestone);

    let Some(index) = next_index else {
        return MilestoneResult {
            level,
            next_milestone: None,
            gap_to_next_milestone: 0,
            progress_percent: 100.0,
        };
    };

    let current = MILESTONES[index];
    let previous = if index == 0 { 0 } else { MILESTONES[index - 1] };
    let progress = (score - previous) as f64 / (current - previous) as f64 * 100.0;

    MilestoneResult {
        level,
        next_milestone: Some(current),
        gap_to_next_milestone: current - score,
        progress_percent: progress.clamp(0.0, 100.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clearing_final_milestone_reports_full_progress() {
        let result = evaluate_milestone(2000);
        assert_eq!(result.level, Level::Platinum);
        assert_eq!(result.gap_to_next_milestone, 0);
        assert_eq!(result.progress_percent, 100.0);
        assert_eq!(result.next_milestone, None);

        assert_eq!(evaluate_milestone(3400).gap_to_next_milestone, 0);
    }

    #[test]
    fn midpoint_of_second_band_is_half_way() {
        let result = evaluate_milestone(1250);
        assert_eq!(result.level, Level::Gold);
        assert_eq!(result.next_milestone, Some(1500));
        assert_eq!(result.gap_to_next_milestone, 250);
        assert_eq!(result.progress_percent, 50.0);
    }

    #[test]
    fn first_band_measures_from_zero() {
        let result = evaluate_milestone(400);
        assert_eq!(result.level, Level::Bronze);
        assert_eq!(result.gap_to_next_milestone, 600);
        assert_eq!(result.progress_percent, 40.0);

        let silver = evaluate_milestone(750);
        assert_eq!(silver.level, Level::Silver);
        assert_eq!(silver.next_milestone, Some(1000));
    }

    #[test]
    fn reaching_a_milestone_starts_the_next_band() {
        let result = evaluate_milestone(1500);
        assert_eq!(result.level, Level::Platinum);
        assert_eq!(result.next_milestone, Some(2000));
        assert_eq!(result.gap_to_next_milestone, 500);
        assert_eq!(result.progress_percent, 0.0);
    }

    #[test]
    fn negative_scores_clamp_progress() {
        let result = evaluate_milestone(-20);
        assert_eq!(result.level, Level::Bronze);
        assert_eq!(result.progress_percent, 0.0);
        assert_eq!(result.gap_to_next_milestone, 1020);
    }
}
