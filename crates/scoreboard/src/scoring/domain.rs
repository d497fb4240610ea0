use serde::{Deserialize, Serialize};

use super::cycle::CycleWindow;
use super::sources::SourceError;

/// Directory entry for a salesperson taking part in the scoreboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberIdentity {
    pub username: String,
    pub brand: String,
    pub shift: String,
}

impl MemberIdentity {
    pub fn new(
        username: impl Into<String>,
        brand: impl Into<String>,
        shift: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            brand: brand.into(),
            shift: shift.into(),
        }
    }
}

/// Customers bucketed by consecutive active days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenureBands {
    pub days_4_to_7: u64,
    pub days_8_to_11: u64,
    pub days_12_to_15: u64,
    pub days_16_to_19: u64,
    pub days_20_plus: u64,
}

impl TenureBands {
    pub fn total(&self) -> u64 {
        [
            self.days_8_to_11,
            self.days_12_to_15,
            self.days_16_to_19,
            self.days_20_plus,
        ]
        .into_iter()
        .fold(self.days_4_to_7, u64::saturating_add)
    }

    /// Add another set of bands, saturating at `u64::MAX`.
    pub fn accumulate(&mut self, other: &TenureBands) {
        self.days_4_to_7 = self.days_4_to_7.saturating_add(other.days_4_to_7);
        self.days_8_to_11 = self.days_8_to_11.saturating_add(other.days_8_to_11);
        self.days_12_to_15 = self.days_12_to_15.saturating_add(other.days_12_to_15);
        self.days_16_to_19 = self.days_16_to_19.saturating_add(other.days_16_to_19);
        self.days_20_plus = self.days_20_plus.saturating_add(other.days_20_plus);
    }
}

/// Aggregated behavioral counts for one member over one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBehaviorFacts {
    pub deposits: f64,
    pub retention_count: u64,
    pub reactivation_count: u64,
    pub referral_count: u64,
    pub tenure_bands: TenureBands,
    pub total_active_customers: u64,
}

impl RawBehaviorFacts {
    /// Raw quantity feeding the given score category.
    pub fn raw(&self, category: ScoreCategory) -> f64 {
        match category {
            ScoreCategory::DepositAmount => self.deposits,
            ScoreCategory::Retention => self.retention_count as f64,
            ScoreCategory::Reactivation => self.reactivation_count as f64,
            ScoreCategory::Recommend => self.referral_count as f64,
            ScoreCategory::Days4To7 => self.tenure_bands.days_4_to_7 as f64,
            ScoreCategory::Days8To11 => self.tenure_bands.days_8_to_11 as f64,
            ScoreCategory::Days12To15 => self.tenure_bands.days_12_to_15 as f64,
            ScoreCategory::Days16To19 => self.tenure_bands.days_16_to_19 as f64,
            ScoreCategory::Days20Plus => self.tenure_bands.days_20_plus as f64,
        }
    }

    /// Adds another slice of facts. Active customers is a gauge, so the larger value wins.
    pub fn accumulate(&mut self, other: &RawBehaviorFacts) {
        self.deposits += other.deposits;
        self.retention_count = self.retention_count.saturating_add(other.retention_count);
        self.reactivation_count = self
            .reactivation_count
            .saturating_add(other.reactivation_count);
        self.referral_count = self.referral_count.saturating_add(other.referral_count);
        self.tenure_bands.accumulate(&other.tenure_bands);
        self.total_active_customers = self
            .total_active_customers
            .max(other.total_active_customers);
    }
}

/// The nine weighted contributions that make up a member score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreCategory {
    DepositAmount,
    Retention,
    Reactivation,
    Recommend,
    Days4To7,
    Days8To11,
    Days12To15,
    Days16To19,
    Days20Plus,
}

impl ScoreCategory {
    pub const ALL: [ScoreCategory; 9] = [
        ScoreCategory::DepositAmount,
        ScoreCategory::Retention,
        ScoreCategory::Reactivation,
        ScoreCategory::Recommend,
        ScoreCategory::Days4To7,
        ScoreCategory::Days8To11,
        ScoreCategory::Days12To15,
        ScoreCategory::Days16To19,
        ScoreCategory::Days20Plus,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ScoreCategory::DepositAmount => "Deposit amount",
            ScoreCategory::Retention => "Retention",
            ScoreCategory::Reactivation => "Dormant reactivated",
            ScoreCategory::Recommend => "Referrals",
            ScoreCategory::Days4To7 => "Active 4-7 days",
            ScoreCategory::Days8To11 => "Active 8-11 days",
            ScoreCategory::Days12To15 => "Active 12-15 days",
            ScoreCategory::Days16To19 => "Active 16-19 days",
            ScoreCategory::Days20Plus => "Active 20+ days",
        }
    }
}

/// Weight applied to deposits when the month does not configure one.
pub const DEFAULT_DEPOSIT_WEIGHT: f64 = 0.001;
/// Weight applied to every count category when the month does not configure one.
pub const DEFAULT_COUNT_WEIGHT: f64 = 5.0;

/// Per-month multipliers, fully resolved and validated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetWeights {
    pub deposit_amount: f64,
    pub retention: f64,
    pub reactivation: f64,
    pub recommend: f64,
    pub days_4_to_7: f64,
    pub days_8_to_11: f64,
    pub days_12_to_15: f64,
    pub days_16_to_19: f64,
    pub days_20_plus: f64,
}

impl Default for TargetWeights {
    fn default() -> Self {
        Self {
            deposit_amount: DEFAULT_DEPOSIT_WEIGHT,
            retention: DEFAULT_COUNT_WEIGHT,
            reactivation: DEFAULT_COUNT_WEIGHT,
            recommend: DEFAULT_COUNT_WEIGHT,
            days_4_to_7: DEFAULT_COUNT_WEIGHT,
            days_8_to_11: DEFAULT_COUNT_WEIGHT,
            days_12_to_15: DEFAULT_COUNT_WEIGHT,
            days_16_to_19: DEFAULT_COUNT_WEIGHT,
            days_20_plus: DEFAULT_COUNT_WEIGHT,
        }
    }
}

impl TargetWeights {
    /// Fill absent fields with defaults and reject non-positive multipliers.
    pub fn from_partial(partial: &PartialTargetWeights) -> Result<Self, ScoringError> {
        let defaults = Self::default();
        let weights = Self {
            deposit_amount: partial.deposit_amount.unwrap_or(defaults.deposit_amount),
            retention: partial.retention.unwrap_or(defaults.retention),
            reactivation: partial.reactivation.unwrap_or(defaults.reactivation),
            recommend: partial.recommend.unwrap_or(defaults.recommend),
            days_4_to_7: partial.days_4_to_7.unwrap_or(defaults.days_4_to_7),
            days_8_to_11: partial.days_8_to_11.unwrap_or(defaults.days_8_to_11),
            days_12_to_15: partial.days_12_to_15.unwrap_or(defaults.days_12_to_15),
            days_16_to_19: partial.days_16_to_19.unwrap_or(defaults.days_16_to_19),
            days_20_plus: partial.days_20_plus.unwrap_or(defaults.days_20_plus),
        };

        for category in ScoreCategory::ALL {
            let weight = weights.weight(category);
            if !weight.is_finite() || weight <= 0.0 {
                return Err(ScoringError::InvalidArgument(format!(
                    "weight for {} must be a positive number, got {weight}",
                    category.label()
                )));
            }
        }

        Ok(weights)
    }

    pub fn weight(&self, category: ScoreCategory) -> f64 {
        match category {
            ScoreCategory::DepositAmount => self.deposit_amount,
            ScoreCategory::Retention => self.retention,
            ScoreCategory::Reactivation => self.reactivation,
            ScoreCategory::Recommend => self.recommend,
            ScoreCategory::Days4To7 => self.days_4_to_7,
            ScoreCategory::Days8To11 => self.days_8_to_11,
            ScoreCategory::Days12To15 => self.days_12_to_15,
            ScoreCategory::Days16To19 => self.days_16_to_19,
            ScoreCategory::Days20Plus => self.days_20_plus,
        }
    }
}

/// Weights as stored by the target configuration; any field may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialTargetWeights {
    pub deposit_amount: Option<f64>,
    pub retention: Option<f64>,
    pub reactivation: Option<f64>,
    pub recommend: Option<f64>,
    pub days_4_to_7: Option<f64>,
    pub days_8_to_11: Option<f64>,
    pub days_12_to_15: Option<f64>,
    pub days_16_to_19: Option<f64>,
    pub days_20_plus: Option<f64>,
}

impl PartialTargetWeights {
    /// Copy over any field that is set in `other` but still missing here.
    pub fn fill_missing(&mut self, other: &PartialTargetWeights) {
        self.deposit_amount = self.deposit_amount.or(other.deposit_amount);
        self.retention = self.retention.or(other.retention);
        self.reactivation = self.reactivation.or(other.reactivation);
        self.recommend = self.recommend.or(other.recommend);
        self.days_4_to_7 = self.days_4_to_7.or(other.days_4_to_7);
        self.days_8_to_11 = self.days_8_to_11.or(other.days_8_to_11);
        self.days_12_to_15 = self.days_12_to_15.or(other.days_12_to_15);
        self.days_16_to_19 = self.days_16_to_19.or(other.days_16_to_19);
        self.days_20_plus = self.days_20_plus.or(other.days_20_plus);
    }
}

/// Single weighted term of a member score, kept for transparent breakdowns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub category: ScoreCategory,
    pub raw: f64,
    pub weight: f64,
    pub points: i64,
}

/// Contribution score for one member over one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberScore {
    pub member: MemberIdentity,
    pub window: CycleWindow,
    pub facts: RawBehaviorFacts,
    pub components: Vec<ScoreComponent>,
    pub score: i64,
}

/// Failure taxonomy shared by every engine operation.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("data unavailable while {context}: {source}")]
    DataUnavailable {
        context: String,
        #[source]
        source: SourceError,
    },
    #[error("member '{0}' not found in the active directory")]
    NotFound(String),
}

impl ScoringError {
    pub(crate) fn unavailable(context: impl Into<String>, source: SourceError) -> Self {
        Self::DataUnavailable {
            context: context.into(),
            source,
        }
    }
}
