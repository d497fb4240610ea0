use metrics_exporter_prometheus::PrometheusHandle;
use scoreboard::config::parse_squad_assignment;
use scoreboard::error::AppError;
use scoreboard::ledger::{FactsLedger, TargetSheet};
use scoreboard::scoring::{DashboardService, RankingOptions, ReportingMonth};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type LedgerService = DashboardService<FactsLedger, FactsLedger, TargetSheet>;

/// Load the CSV exports behind the service. Missing paths yield empty collaborators.
pub(crate) fn load_ledgers(
    facts_csv: Option<&Path>,
    targets_csv: Option<&Path>,
    squads: &[(String, String)],
) -> Result<(FactsLedger, TargetSheet), AppError> {
    let facts = match facts_csv {
        Some(path) => FactsLedger::from_path(path)?,
        None => FactsLedger::default(),
    }
    .with_squads(squads.iter().cloned());

    let targets = match targets_csv {
        Some(path) => TargetSheet::from_path(path)?,
        None => TargetSheet::default(),
    };

    info!(
        rows = facts.len(),
        members = facts.members().len(),
        target_months = targets.months().len(),
        "ledgers loaded"
    );

    Ok((facts, targets))
}

pub(crate) fn ledger_service(
    facts: FactsLedger,
    targets: TargetSheet,
    options: RankingOptions,
) -> Arc<LedgerService> {
    let ledger = Arc::new(facts);
    Arc::new(DashboardService::new(
        Arc::clone(&ledger),
        ledger,
        Arc::new(targets),
        options,
    ))
}

pub(crate) fn parse_month(raw: &str) -> Result<ReportingMonth, String> {
    ReportingMonth::parse(raw).map_err(|err| err.to_string())
}

pub(crate) fn parse_squad(raw: &str) -> Result<(String, String), String> {
    parse_squad_assignment(raw).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parsers_accept_valid_values() {
        assert_eq!(
            parse_month("2024-07").expect("month parses").to_string(),
            "2024-07"
        );
        assert_eq!(
            parse_squad("acme=Squad B").expect("squad parses"),
            ("acme".to_string(), "Squad B".to_string())
        );
    }

    #[test]
    fn cli_parsers_explain_failures() {
        assert!(parse_month("July").expect_err("invalid").contains("YYYY-MM"));
        assert!(parse_squad("acme").expect_err("invalid").contains("brand=squad"));
    }

    #[test]
    fn missing_paths_produce_empty_ledgers() {
        let (facts, targets) =
            load_ledgers(None, None, &[("acme".to_string(), "Squad B".to_string())])
                .expect("empty ledgers load");
        assert!(facts.is_empty());
        assert!(targets.months().is_empty());
    }

    #[test]
    fn unreadable_paths_surface_ledger_errors() {
        let result = load_ledgers(Some(Path::new("./missing-facts.csv")), None, &[]);
        assert!(matches!(result, Err(AppError::Ledger(_))));
    }
}
