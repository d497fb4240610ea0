use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use super::domain::ScoringError;

/// Calendar month a reporting cycle belongs to, written as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReportingMonth {
    first_day: NaiveDate,
    next_first_day: NaiveDate,
}

impl ReportingMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, ScoringError> {
        let invalid =
            || ScoringError::InvalidArgument(format!("{year:04}-{month:02} is not a valid month"));

        let first_day = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let next_first_day = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(invalid)?;

        Ok(Self {
            first_day,
            next_first_day,
        })
    }

    pub fn parse(raw: &str) -> Result<Self, ScoringError> {
        let trimmed = raw.trim();
        let invalid =
            || ScoringError::InvalidArgument(format!("month '{raw}' must be formatted as YYYY-MM"));

        let (year, month) = trimmed.split_once('-').ok_or_else(invalid)?;
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if year.len() != 4 || month.len() != 2 || !all_digits(year) || !all_digits(month) {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;

        Self::new(year, month)
    }

    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    pub fn month(&self) -> u32 {
        self.first_day.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    pub fn days_in_month(&self) -> u32 {
        (self.next_first_day - self.first_day).num_days() as u32
    }

    pub fn last_day(&self) -> NaiveDate {
        self.day(self.days_in_month())
    }

    /// Calendar day of this month, 1-indexed. Callers keep `day` within the month.
    fn day(&self, day: u32) -> NaiveDate {
        self.first_day + Duration::days(i64::from(day.saturating_sub(1)))
    }

    /// Final millisecond of the month.
    fn end_instant(&self) -> NaiveDateTime {
        self.next_first_day.and_time(NaiveTime::MIN) - Duration::milliseconds(1)
    }
}

impl fmt::Display for ReportingMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for ReportingMonth {
    type Err = ScoringError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

impl Serialize for ReportingMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReportingMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Reporting slice of a month selectable on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CycleLabel {
    All,
    #[serde(rename = "Cycle 1")]
    Cycle1,
    #[serde(rename = "Cycle 2")]
    Cycle2,
    #[serde(rename = "Cycle 3")]
    Cycle3,
    #[serde(rename = "Cycle 4")]
    Cycle4,
}

impl CycleLabel {
    pub const CYCLES: [CycleLabel; 4] = [
        CycleLabel::Cycle1,
        CycleLabel::Cycle2,
        CycleLabel::Cycle3,
        CycleLabel::Cycle4,
    ];

    /// Strict parse; `None` for anything that is not a known label.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        match normalized.as_str() {
            "all" => Some(Self::All),
            "cycle1" => Some(Self::Cycle1),
            "cycle2" => Some(Self::Cycle2),
            "cycle3" => Some(Self::Cycle3),
            "cycle4" => Some(Self::Cycle4),
            _ => None,
        }
    }

    /// Parse, treating unknown labels as the whole month.
    pub fn parse_lenient(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_else(|| {
            debug!(label = raw, "unrecognized cycle label, using whole month");
            Self::All
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            CycleLabel::All => "All",
            CycleLabel::Cycle1 => "Cycle 1",
            CycleLabel::Cycle2 => "Cycle 2",
            CycleLabel::Cycle3 => "Cycle 3",
            CycleLabel::Cycle4 => "Cycle 4",
        }
    }

    fn first_day(&self) -> u32 {
        match self {
            CycleLabel::All | CycleLabel::Cycle1 => 1,
            CycleLabel::Cycle2 => 8,
            CycleLabel::Cycle3 => 15,
            CycleLabel::Cycle4 => 22,
        }
    }

    /// Last day of the cycle, or `None` when it runs to the end of the month.
    fn last_day(&self) -> Option<u32> {
        match self {
            CycleLabel::Cycle1 => Some(7),
            CycleLabel::Cycle2 => Some(14),
            CycleLabel::Cycle3 => Some(21),
            CycleLabel::All | CycleLabel::Cycle4 => None,
        }
    }
}

impl fmt::Display for CycleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inclusive date-time window inside one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleWindow {
    pub month: ReportingMonth,
    pub label: CycleLabel,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl CycleWindow {
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at <= self.end
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.date()
    }

    /// Number of calendar days covered.
    pub fn days(&self) -> u32 {
        ((self.end_date() - self.start_date()).num_days() + 1) as u32
    }
}

/// Resolve a `YYYY-MM` month and a cycle label into a concrete window.
///
/// Unknown labels fall back to the whole month; only a malformed month is rejected.
pub fn resolve(month: &str, cycle_label: &str) -> Result<CycleWindow, ScoringError> {
    let month = ReportingMonth::parse(month)?;
    Ok(resolve_window(month, CycleLabel::parse_lenient(cycle_label)))
}

pub fn resolve_window(month: ReportingMonth, label: CycleLabel) -> CycleWindow {
    let start = month.day(label.first_day()).and_time(NaiveTime::MIN);
    let end = match label.last_day() {
        Some(day) => end_of_day(month.day(day)),
        None => month.end_instant(),
    };

    CycleWindow {
        month,
        label,
        start,
        end,
    }
}

/// The four cycle windows of a month, in calendar order.
pub fn cycle_windows(month: ReportingMonth) -> [CycleWindow; 4] {
    CycleLabel::CYCLES.map(|label| resolve_window(month, label))
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::milliseconds(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn all_spans_every_day_of_every_month() {
        for year in [2023, 2024] {
            for month in 1..=12 {
                let reporting = ReportingMonth::new(year, month).expect("valid month");
                let window = resolve(&reporting.to_string(), "All").expect("window resolves");
                assert_eq!(window.start_date(), date(year, month, 1));
                assert_eq!(window.end_date(), reporting.last_day());
                assert_eq!(window.days(), reporting.days_in_month());
                assert_eq!(window.start.time(), NaiveTime::MIN);
                assert_eq!(window.end.hour(), 23);
                assert_eq!(window.end.nanosecond(), 999_000_000);
            }
        }
    }

    #[test]
    fn cycles_are_contiguous_and_cover_the_month() {
        for year in [2023, 2024] {
            for month in 1..=12 {
                let reporting = ReportingMonth::new(year, month).expect("valid month");
                let whole = resolve_window(reporting, CycleLabel::All);
                let cycles = cycle_windows(reporting);

                assert_eq!(cycles[0].start, whole.start);
                assert_eq!(cycles[3].end, whole.end);
                for pair in cycles.windows(2) {
                    assert_eq!(pair[0].end + Duration::milliseconds(1), pair[1].start);
                }
                let covered: u32 = cycles.iter().map(CycleWindow::days).sum();
                assert_eq!(covered, reporting.days_in_month());
            }
        }
    }

    #[test]
    fn fixed_cycles_cover_seven_days() {
        let month = ReportingMonth::parse("2024-03").expect("valid month");
        let [first, second, third, fourth] = cycle_windows(month);
        assert_eq!((first.start_date(), first.end_date()), (date(2024, 3, 1), date(2024, 3, 7)));
        assert_eq!((second.start_date(), second.end_date()), (date(2024, 3, 8), date(2024, 3, 14)));
        assert_eq!((third.start_date(), third.end_date()), (date(2024, 3, 15), date(2024, 3, 21)));
        assert_eq!(fourth.start_date(), date(2024, 3, 22));
        assert_eq!(fourth.end_date(), date(2024, 3, 31));
        assert_eq!(fourth.days(), 10);
    }

    #[test]
    fn fourth_cycle_length_follows_month_length() {
        let february = resolve("2023-02", "Cycle 4").expect("window resolves");
        assert_eq!(february.days(), 7);
        assert_eq!(february.end_date(), date(2023, 2, 28));

        let leap_february = resolve("2024-02", "Cycle 4").expect("window resolves");
        assert_eq!(leap_february.days(), 8);
        assert_eq!(leap_february.end_date(), date(2024, 2, 29));
    }

    #[test]
    fn fixed_cycle_ends_on_last_millisecond_of_day() {
        let window = resolve("2024-05", "Cycle 2").expect("window resolves");
        assert_eq!(
            window.end,
            date(2024, 5, 14)
                .and_hms_milli_opt(23, 59, 59, 999)
                .expect("valid time")
        );
    }

    #[test]
    fn unknown_labels_fall_back_to_whole_month() {
        let window = resolve("2024-06", "Cycle 9").expect("lenient label");
        assert_eq!(window.label, CycleLabel::All);
        assert_eq!(window.days(), 30);

        let window = resolve("2024-06", "").expect("lenient label");
        assert_eq!(window.label, CycleLabel::All);
    }

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!(CycleLabel::parse(" cycle 3 "), Some(CycleLabel::Cycle3));
        assert_eq!(CycleLabel::parse("CYCLE1"), Some(CycleLabel::Cycle1));
        assert_eq!(CycleLabel::parse("all"), Some(CycleLabel::All));
        assert_eq!(CycleLabel::parse("week 2"), None);
    }

    #[test]
    fn malformed_months_are_rejected() {
        for raw in [
            "2024-13", "2024-00", "24-01", "2024/01", "january", "2024-1", "",
            "2024-+3", "+024-03", "-024-03",
        ] {
            match resolve(raw, "All") {
                Err(ScoringError::InvalidArgument(_)) => {}
                other => panic!("expected invalid argument for '{raw}', got {other:?}"),
            }
        }
    }

    #[test]
    fn reporting_month_round_trips_through_display() {
        let month: ReportingMonth = "2025-11".parse().expect("valid month");
        assert_eq!(month.to_string(), "2025-11");
        assert_eq!(month.days_in_month(), 30);
        assert_eq!(month.last_day(), date(2025, 11, 30));
    }
}
