use crate::scoring::{
    PartialTargetWeights, RawBehaviorFacts, ReportingMonth, TenureBands, TierThresholds,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer};
use std::io::Read;

use super::LedgerImportError;

#[derive(Debug, Clone)]
pub(crate) struct FactsRecord {
    pub(crate) occurred_at: NaiveDateTime,
    pub(crate) username: String,
    pub(crate) brand: String,
    pub(crate) shift: String,
    pub(crate) facts: RawBehaviorFacts,
}

#[derive(Debug, Clone)]
pub(crate) struct TargetRecord {
    pub(crate) month: ReportingMonth,
    pub(crate) squad: String,
    pub(crate) tiers: Option<TierThresholds>,
    pub(crate) weights: PartialTargetWeights,
}

pub(crate) fn parse_facts<R: Read>(reader: R) -> Result<Vec<FactsRecord>, LedgerImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for (index, record) in csv_reader.deserialize::<FactsRow>().enumerate() {
        let row = record?;
        let line = index + 2;
        let occurred_at = parse_timestamp(&row.date).ok_or_else(|| {
            LedgerImportError::InvalidRow {
                line,
                reason: format!("unrecognized date '{}'", row.date),
            }
        })?;
        if row.username.is_empty() {
            return Err(LedgerImportError::InvalidRow {
                line,
                reason: "username is empty".to_string(),
            });
        }
        if !row.deposits.is_finite() {
            return Err(LedgerImportError::InvalidRow {
                line,
                reason: "deposits must be a finite amount".to_string(),
            });
        }

        records.push(FactsRecord {
            occurred_at,
            facts: RawBehaviorFacts {
                deposits: row.deposits,
                retention_count: row.retention,
                reactivation_count: row.reactivation,
                referral_count: row.referrals,
                tenure_bands: TenureBands {
                    days_4_to_7: row.days_4_7,
                    days_8_to_11: row.days_8_11,
                    days_12_to_15: row.days_12_15,
                    days_16_to_19: row.days_16_19,
                    days_20_plus: row.days_20_plus,
                },
                total_active_customers: row.active_customers,
            },
            username: row.username,
            brand: row.brand,
            shift: row.shift,
        });
    }

    Ok(records)
}

pub(crate) fn parse_targets<R: Read>(reader: R) -> Result<Vec<TargetRecord>, LedgerImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for (index, record) in csv_reader.deserialize::<TargetRow>().enumerate() {
        let row = record?;
        let line = index + 2;
        let month = ReportingMonth::parse(&row.month).map_err(|err| {
            LedgerImportError::InvalidRow {
                line,
                reason: err.to_string(),
            }
        })?;

        let tiers = match (row.tier1, row.tier2, row.tier3) {
            (Some(tier1), Some(tier2), Some(tier3)) => {
                Some(TierThresholds::new(tier1, tier2, tier3))
            }
            (None, None, None) => None,
            _ => {
                return Err(LedgerImportError::InvalidRow {
                    line,
                    reason: "tier1, tier2 and tier3 must be set together".to_string(),
                })
            }
        };

        records.push(TargetRecord {
            month,
            squad: row.squad,
            tiers,
            weights: PartialTargetWeights {
                deposit_amount: row.deposit_amount,
                retention: row.retention,
                reactivation: row.reactivation,
                recommend: row.recommend,
                days_4_to_7: row.days_4_7,
                days_8_to_11: row.days_8_11,
                days_12_to_15: row.days_12_15,
                days_16_to_19: row.days_16_19,
                days_20_plus: row.days_20_plus,
            },
        });
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct FactsRow {
    date: String,
    username: String,
    #[serde(default)]
    brand: String,
    #[serde(default)]
    shift: String,
    #[serde(default, deserialize_with = "empty_as_zero")]
    deposits: f64,
    #[serde(default, deserialize_with = "empty_as_zero")]
    retention: u64,
    #[serde(default, deserialize_with = "empty_as_zero")]
    reactivation: u64,
    #[serde(default, deserialize_with = "empty_as_zero")]
    referrals: u64,
    #[serde(default, deserialize_with = "empty_as_zero")]
    days_4_7: u64,
    #[serde(default, deserialize_with = "empty_as_zero")]
    days_8_11: u64,
    #[serde(default, deserialize_with = "empty_as_zero")]
    days_12_15: u64,
    #[serde(default, deserialize_with = "empty_as_zero")]
    days_16_19: u64,
    #[serde(default, deserialize_with = "empty_as_zero")]
    days_20_plus: u64,
    #[serde(default, deserialize_with = "empty_as_zero")]
    active_customers: u64,
}

#[derive(Debug, Deserialize)]
struct TargetRow {
    month: String,
    #[serde(default)]
    squad: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    tier1: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    tier2: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    tier3: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    deposit_amount: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    retention: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    reactivation: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    recommend: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    days_4_7: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    days_8_11: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    days_12_15: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    days_16_19: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    days_20_plus: Option<f64>,
}

fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|err| serde::de::Error::custom(format!("'{value}': {err}"))),
    }
}

fn empty_as_zero<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr + Default,
    T::Err: std::fmt::Display,
{
    empty_as_none(deserializer).map(Option::unwrap_or_default)
}

/// Row timestamps are read as the wall-clock time the row states. An RFC 3339 offset is
/// dropped rather than converted, so every accepted form shares the windows' calendar.
fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local());
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }

    None
}
