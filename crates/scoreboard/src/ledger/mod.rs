//! CSV-backed collaborators for the scoring engine.
//!
//! [`FactsLedger`] reads a daily facts export and serves both the facts store and the member
//! directory. [`TargetSheet`] reads the monthly target configuration.

mod parser;

use crate::scoring::{
    CycleWindow, DirectorySource, FactsSource, MemberIdentity, PartialTargetWeights,
    RawBehaviorFacts, ReportingMonth, SourceError, TargetConfigSource, TierThresholds,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use parser::FactsRecord;

#[derive(Debug)]
pub enum LedgerImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: usize, reason: String },
}

impl std::fmt::Display for LedgerImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerImportError::Io(err) => write!(f, "failed to read ledger export: {}", err),
            LedgerImportError::Csv(err) => write!(f, "invalid ledger CSV data: {}", err),
            LedgerImportError::InvalidRow { line, reason } => {
                write!(f, "invalid ledger row on line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for LedgerImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LedgerImportError::Io(err) => Some(err),
            LedgerImportError::Csv(err) => Some(err),
            LedgerImportError::InvalidRow { .. } => None,
        }
    }
}

impl From<std::io::Error> for LedgerImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for LedgerImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Daily facts rows for every member, plus the brand to squad assignments.
#[derive(Debug, Clone, Default)]
pub struct FactsLedger {
    records: Vec<FactsRecord>,
    members: Vec<MemberIdentity>,
    squads: HashMap<String, String>,
}

impl FactsLedger {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LedgerImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LedgerImportError> {
        let records = parser::parse_facts(reader)?;

        // A member belongs to exactly one brand; squads are resolved from it.
        let mut brands: HashMap<&str, &str> = HashMap::new();
        let mut members = Vec::new();
        for (index, record) in records.iter().enumerate() {
            match brands.get(record.username.as_str()) {
                Some(brand) if *brand != record.brand => {
                    return Err(LedgerImportError::InvalidRow {
                        line: index + 2,
                        reason: format!(
                            "member '{}' is listed under brand '{}' and '{}'",
                            record.username, brand, record.brand
                        ),
                    });
                }
                Some(_) => {}
                None => {
                    brands.insert(&record.username, &record.brand);
                    members.push(MemberIdentity::new(
                        record.username.clone(),
                        record.brand.clone(),
                        record.shift.clone(),
                    ));
                }
            }
        }

        debug!(rows = records.len(), members = members.len(), "facts ledger loaded");
        Ok(Self {
            records,
            members,
            squads: HashMap::new(),
        })
    }

    /// Assign brands to squads. Later assignments for the same brand replace earlier ones.
    pub fn with_squads<I, B, S>(mut self, squads: I) -> Self
    where
        I: IntoIterator<Item = (B, S)>,
        B: Into<String>,
        S: Into<String>,
    {
        self.squads.extend(
            squads
                .into_iter()
                .map(|(brand, squad)| (brand.into(), squad.into())),
        );
        self
    }

    /// Distinct members in the order they first appear in the export.
    pub fn members(&self) -> &[MemberIdentity] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum the member's rows falling inside the window.
    pub fn aggregate(&self, member: &MemberIdentity, window: &CycleWindow) -> RawBehaviorFacts {
        self.records
            .iter()
            .filter(|record| record.username == member.username && record.brand == member.brand)
            .filter(|record| window.contains(record.occurred_at))
            .fold(RawBehaviorFacts::default(), |mut total, record| {
                total.accumulate(&record.facts);
                total
            })
    }
}

#[async_trait]
impl FactsSource for FactsLedger {
    async fn fetch_raw_behavior_facts(
        &self,
        member: &MemberIdentity,
        window: &CycleWindow,
    ) -> Result<RawBehaviorFacts, SourceError> {
        Ok(self.aggregate(member, window))
    }
}

#[async_trait]
impl DirectorySource for FactsLedger {
    async fn list_active_members(&self) -> Result<Vec<MemberIdentity>, SourceError> {
        Ok(self.members.clone())
    }

    async fn resolve_squad(&self, brand: &str) -> Result<Option<String>, SourceError> {
        Ok(self.squads.get(brand).cloned())
    }
}

#[derive(Debug, Clone, Default)]
struct MonthTargets {
    weights: PartialTargetWeights,
    tiers: HashMap<String, TierThresholds>,
}

/// Monthly weights and per-squad tier thresholds.
#[derive(Debug, Clone, Default)]
pub struct TargetSheet {
    months: HashMap<ReportingMonth, MonthTargets>,
}

impl TargetSheet {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LedgerImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LedgerImportError> {
        let mut months: HashMap<ReportingMonth, MonthTargets> = HashMap::new();

        for record in parser::parse_targets(reader)? {
            let entry = months.entry(record.month).or_default();
            entry.weights.fill_missing(&record.weights);
            if let Some(tiers) = record.tiers {
                if !record.squad.is_empty() {
                    entry.tiers.entry(record.squad).or_insert(tiers);
                }
            }
        }

        Ok(Self { months })
    }

    pub fn months(&self) -> Vec<ReportingMonth> {
        let mut months: Vec<_> = self.months.keys().copied().collect();
        months.sort();
        months
    }

    pub fn tiers(&self, month: &ReportingMonth, squad: &str) -> Option<TierThresholds> {
        self.months
            .get(month)
            .and_then(|targets| targets.tiers.get(squad))
            .copied()
    }
}

#[async_trait]
impl TargetConfigSource for TargetSheet {
    async fn fetch_weights(
        &self,
        month: &ReportingMonth,
    ) -> Result<PartialTargetWeights, SourceError> {
        Ok(self
            .months
            .get(month)
            .map(|targets| targets.weights)
            .unwrap_or_default())
    }

    async fn fetch_squad_tiers(
        &self,
        month: &ReportingMonth,
        squad: &str,
    ) -> Result<TierThresholds, SourceError> {
        self.tiers(month, squad).ok_or_else(|| {
            SourceError::Unavailable(format!("no tiers configured for {squad} in {month}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::resolve;
    use std::io::Cursor;

    const FACTS: &str = "\
date,username,brand,shift,deposits,retention,reactivation,referrals,days_4_7,days_8_11,days_12_15,days_16_19,days_20_plus,active_customers
2024-03-01,amy,acme,day,1000,1,0,0,2,0,0,0,0,10
2024-03-07T23:59:59Z,amy,acme,day,500,0,1,0,0,0,0,0,0,14
2024-03-08,amy,acme,day,2500,0,0,1,0,0,0,0,0,12
2024-03-02,bob,globex,night,300,0,0,0,0,0,0,0,1,3
2024-02-29,amy,acme,day,9999,9,9,9,0,0,0,0,0,99
";

    #[test]
    fn member_switching_brand_is_rejected() {
        let csv = "\
date,username,brand,shift,retention
2024-03-01,amy,acme,day,2
2024-03-02,bob,globex,day,1
2024-03-03,amy,globex,day,3
";
        match FactsLedger::from_reader(Cursor::new(csv)) {
            Err(LedgerImportError::InvalidRow { line, reason }) => {
                assert_eq!(line, 4);
                assert!(reason.contains("amy"), "{reason}");
                assert!(reason.contains("globex"), "{reason}");
            }
            other => panic!("expected an invalid row, got {other:?}"),
        }
    }

    #[test]
    fn members_are_listed_in_first_seen_order() {
        let ledger = FactsLedger::from_reader(Cursor::new(FACTS)).expect("ledger loads");
        let usernames: Vec<_> = ledger
            .members()
            .iter()
            .map(|member| member.username.as_str())
            .collect();
        assert_eq!(usernames, vec!["amy", "bob"]);
        assert_eq!(ledger.len(), 5);
    }

    #[test]
    fn aggregate_respects_inclusive_window_bounds() {
        let ledger = FactsLedger::from_reader(Cursor::new(FACTS)).expect("ledger loads");
        let amy = ledger.members()[0].clone();

        let first_cycle = resolve("2024-03", "Cycle 1").expect("window");
        let facts = ledger.aggregate(&amy, &first_cycle);
        assert_eq!(facts.deposits, 1500.0);
        assert_eq!(facts.retention_count, 1);
        assert_eq!(facts.reactivation_count, 1);
        assert_eq!(facts.referral_count, 0);
        assert_eq!(facts.tenure_bands.days_4_to_7, 2);
        assert_eq!(facts.total_active_customers, 14);

        let month = resolve("2024-03", "All").expect("window");
        let facts = ledger.aggregate(&amy, &month);
        assert_eq!(facts.deposits, 4000.0);
        assert_eq!(facts.referral_count, 1);
    }

    #[tokio::test]
    async fn directory_uses_configured_squads() {
        let ledger = FactsLedger::from_reader(Cursor::new(FACTS))
            .expect("ledger loads")
            .with_squads([("acme", "Squad B")]);

        assert_eq!(
            ledger.resolve_squad("acme").await.expect("lookup"),
            Some("Squad B".to_string())
        );
        assert_eq!(ledger.resolve_squad("globex").await.expect("lookup"), None);
        assert_eq!(
            ledger.list_active_members().await.expect("members").len(),
            2
        );
    }

    #[test]
    fn from_path_propagates_io_errors() {
        match FactsLedger::from_path("./does-not-exist.csv") {
            Err(LedgerImportError::Io(_)) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }

    const TARGETS: &str = "\
month,squad,tier1,tier2,tier3,deposit_amount,retention
2024-03,,,,,0.002,
2024-03,Squad A,1000,2000,3000,,6
2024-03,Squad B,500,800,1200,,
2024-03,Squad A,1,2,3,,
2024-04,Squad A,10,20,30,,
";

    #[tokio::test]
    async fn target_sheet_merges_weights_and_keeps_first_tiers() {
        let sheet = TargetSheet::from_reader(Cursor::new(TARGETS)).expect("sheet loads");
        let march = ReportingMonth::parse("2024-03").expect("month");

        let weights = sheet.fetch_weights(&march).await.expect("weights");
        assert_eq!(weights.deposit_amount, Some(0.002));
        assert_eq!(weights.retention, Some(6.0));
        assert_eq!(weights.recommend, None);

        let tiers = sheet
            .fetch_squad_tiers(&march, "Squad A")
            .await
            .expect("tiers");
        assert_eq!(tiers, TierThresholds::new(1000.0, 2000.0, 3000.0));

        assert_eq!(sheet.months().len(), 2);
    }

    #[tokio::test]
    async fn target_sheet_reports_missing_entries() {
        let sheet = TargetSheet::from_reader(Cursor::new(TARGETS)).expect("sheet loads");
        let may = ReportingMonth::parse("2024-05").expect("month");

        let weights = sheet.fetch_weights(&may).await.expect("weights");
        assert_eq!(weights, PartialTargetWeights::default());

        match sheet.fetch_squad_tiers(&may, "Squad A").await {
            Err(SourceError::Unavailable(message)) => assert!(message.contains("2024-05")),
            other => panic!("expected unavailable, got {other:?}"),
        }
    }
}
