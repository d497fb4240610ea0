use crate::infra::{ledger_service, load_ledgers, parse_month, parse_squad, LedgerService};
use clap::Args;
use scoreboard::error::AppError;
use scoreboard::scoring::{
    cycle_windows, resolve_window, CycleLabel, CycleWindow, DashboardSnapshot, Leaderboard,
    RankingOptions, ReportingMonth,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct LedgerArgs {
    /// Daily facts export (CSV)
    #[arg(long)]
    pub(crate) facts_csv: PathBuf,
    /// Monthly targets export (CSV). Without it default weights apply and tiers are unavailable.
    #[arg(long)]
    pub(crate) targets_csv: Option<PathBuf>,
    /// Reporting month (YYYY-MM)
    #[arg(long, value_parser = parse_month)]
    pub(crate) month: ReportingMonth,
    /// Cycle label: All, "Cycle 1" .. "Cycle 4"
    #[arg(long, default_value = "All")]
    pub(crate) cycle: String,
    /// Brand to squad assignment, repeatable (BRAND=SQUAD)
    #[arg(long = "squad", value_parser = parse_squad)]
    pub(crate) squads: Vec<(String, String)>,
    /// Print JSON instead of a text report
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DashboardArgs {
    /// Username to build the dashboard for
    #[arg(long)]
    pub(crate) member: String,
    #[command(flatten)]
    pub(crate) ledger: LedgerArgs,
}

#[derive(Args, Debug)]
pub(crate) struct LeaderboardArgs {
    /// Number of ranked members to print
    #[arg(long, default_value_t = 10)]
    pub(crate) limit: usize,
    #[command(flatten)]
    pub(crate) ledger: LedgerArgs,
}

#[derive(Args, Debug)]
pub(crate) struct WindowsArgs {
    /// Reporting month (YYYY-MM)
    #[arg(long, value_parser = parse_month)]
    pub(crate) month: ReportingMonth,
}

pub(crate) async fn run_dashboard(args: DashboardArgs) -> Result<(), AppError> {
    let DashboardArgs { member, ledger } = args;
    let service = build_service(&ledger)?;
    let snapshot = service
        .snapshot(&member, &ledger.month.to_string(), &ledger.cycle)
        .await?;

    if ledger.json {
        print_json(&snapshot);
    } else {
        print!("{}", render_dashboard(&snapshot));
    }
    Ok(())
}

pub(crate) async fn run_leaderboard(args: LeaderboardArgs) -> Result<(), AppError> {
    let LeaderboardArgs { limit, ledger } = args;
    let service = build_service(&ledger)?;
    let mut leaderboard = service
        .leaderboard(&ledger.month.to_string(), &ledger.cycle)
        .await?;
    leaderboard.outcome.ranked.truncate(limit);

    if ledger.json {
        print_json(&leaderboard);
    } else {
        print!("{}", render_leaderboard(&leaderboard));
    }
    Ok(())
}

pub(crate) fn run_windows(args: WindowsArgs) -> Result<(), AppError> {
    print!("{}", render_windows(args.month));
    Ok(())
}

fn build_service(args: &LedgerArgs) -> Result<Arc<LedgerService>, AppError> {
    let (facts, targets) = load_ledgers(
        Some(args.facts_csv.as_path()),
        args.targets_csv.as_deref(),
        &args.squads,
    )?;
    Ok(ledger_service(facts, targets, RankingOptions::default()))
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("unable to render JSON: {err}"),
    }
}

fn describe_window(window: &CycleWindow) -> String {
    format!(
        "{} {} ({} -> {}, {} days)",
        window.month,
        window.label,
        window.start_date(),
        window.end_date(),
        window.days()
    )
}

pub(crate) fn render_dashboard(snapshot: &DashboardSnapshot) -> String {
    let member = &snapshot.member;
    let mut out = String::new();

    out.push_str(&format!("Scoreboard for {}\n", member.username()));
    out.push_str(&format!("Window: {}\n", describe_window(&snapshot.window)));
    out.push_str(&format!(
        "Score {} | rank {} of {} | squad {} rank {}\n",
        member.score.score,
        member.global_rank,
        snapshot.population,
        member.squad_name,
        member.squad_rank
    ));

    out.push_str("Breakdown:\n");
    for component in &member.score.components {
        out.push_str(&format!(
            "  - {}: {} x {} = {}\n",
            component.category.label(),
            component.raw,
            component.weight,
            component.points
        ));
    }

    let milestone = &snapshot.milestone;
    match milestone.next_milestone {
        Some(next) => out.push_str(&format!(
            "Level {} | {} points to {} ({:.0}%)\n",
            milestone.level.label(),
            milestone.gap_to_next_milestone,
            next,
            milestone.progress_percent
        )),
        None => out.push_str(&format!(
            "Level {} | every milestone reached\n",
            milestone.level.label()
        )),
    }

    out.push_str(&format!(
        "Share of squad score: {:.1}%\n",
        snapshot.personal_share_percent
    ));

    let target = &snapshot.squad_target;
    out.push_str(&format!(
        "Squad target: tier {} of {:.0} | achieved {:.0} | gap {:.0} | {:.0}% ({})\n",
        target.result.active_tier_index,
        target.result.active_tier_value,
        target.achieved,
        target.result.gap,
        target.result.completion_percent,
        target.result.pace.label()
    ));

    out.push_str("Squads:\n");
    for squad in &snapshot.squads {
        out.push_str(&format!(
            "  - {}: {} points, {} members ({:?})\n",
            squad.squad_name, squad.total_score, squad.member_count, squad.status
        ));
    }

    if !snapshot.skipped.is_empty() {
        out.push_str("Skipped members:\n");
        for failure in &snapshot.skipped {
            out.push_str(&format!(
                "  - {}: {}\n",
                failure.member.username, failure.error
            ));
        }
    }

    out
}

pub(crate) fn render_leaderboard(leaderboard: &Leaderboard) -> String {
    let mut out = String::new();
    out.push_str(&format!("Leaderboard {}\n", describe_window(&leaderboard.window)));

    if leaderboard.outcome.ranked.is_empty() {
        out.push_str("  no ranked members\n");
    }
    for entry in &leaderboard.outcome.ranked {
        out.push_str(&format!(
            "{:>3}. {:<16} {:>6}  {} #{}\n",
            entry.global_rank,
            entry.username(),
            entry.score.score,
            entry.squad_name,
            entry.squad_rank
        ));
    }

    for squad in &leaderboard.outcome.squads {
        out.push_str(&format!(
            "Squad {}: {} points, deposits {:.2} ({:?})\n",
            squad.squad_name, squad.total_score, squad.total_deposit_amount, squad.status
        ));
    }

    for failure in &leaderboard.outcome.failures {
        out.push_str(&format!(
            "Skipped {}: {}\n",
            failure.member.username, failure.error
        ));
    }

    out
}

pub(crate) fn render_windows(month: ReportingMonth) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n",
        describe_window(&resolve_window(month, CycleLabel::All))
    ));
    for window in cycle_windows(month) {
        out.push_str(&format!("  {}\n", describe_window(&window)));
    }
    out
}
