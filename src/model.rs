// 📇 Entity Model - BEL records and their raw monthly performance
//
// Raw values only. Conversion rate, order value and year-to-date totals are
// never stored here; they are derived by the metrics module on every query.

use crate::error::{IssueKind, RecordIssue};
use crate::region::Region;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// LEVEL
// ============================================================================

/// BEL program level, ranked Builder (lowest) to Leader (highest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    Builder,
    Enabler,
    Exploder,
    Leader,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Builder, Level::Enabler, Level::Exploder, Level::Leader];

    /// 1-based rank used for level ordering
    pub fn rank(&self) -> u8 {
        match self {
            Level::Builder => 1,
            Level::Enabler => 2,
            Level::Exploder => 3,
            Level::Leader => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Builder => "Builder",
            Level::Enabler => "Enabler",
            Level::Exploder => "Exploder",
            Level::Leader => "Leader",
        }
    }

    /// Case-insensitive match on the exact level names
    pub fn parse(value: &str) -> Option<Level> {
        let value = value.trim();
        Level::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::parse(s).ok_or_else(|| format!("unknown level: {}", s))
    }
}

// ============================================================================
// MONTH
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// Zero-based position in the calendar year
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Month> {
        Month::ALL.get(index).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        }
    }

    /// Three-letter label for compact tables
    pub fn short_name(&self) -> &'static str {
        &self.name()[..3]
    }

    pub fn from_name(name: &str) -> Option<Month> {
        Month::ALL
            .into_iter()
            .find(|month| month.name().eq_ignore_ascii_case(name.trim()))
    }
}

// ============================================================================
// MONTHLY METRICS
// ============================================================================

/// Raw counters for one BEL in one month
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyMetrics {
    pub clicks: u64,
    pub orders: u64,
    pub revenue: f64,
}

impl MonthlyMetrics {
    pub fn new(clicks: u64, orders: u64, revenue: f64) -> Self {
        MonthlyMetrics { clicks, orders, revenue }
    }

    /// Parse a month entry leniently. Any field that is missing or not a
    /// usable non-negative number contributes zero and is reported.
    pub fn from_json(
        value: &serde_json::Value,
        entity_id: &str,
        location: &str,
        issues: &mut Vec<RecordIssue>,
    ) -> Self {
        let Some(object) = value.as_object() else {
            issues.push(RecordIssue::new(
                entity_id,
                IssueKind::MalformedRecord,
                format!("{}: month entry is not an object", location),
            ));
            return MonthlyMetrics::default();
        };

        let mut count_field = |field: &str| -> u64 {
            match object.get(field).and_then(as_count) {
                Some(count) => count,
                None => {
                    issues.push(RecordIssue::new(
                        entity_id,
                        IssueKind::MalformedRecord,
                        format!("{}: `{}` missing or not a non-negative integer", location, field),
                    ));
                    0
                }
            }
        };

        let clicks = count_field("clicks");
        let orders = count_field("orders");

        let revenue = match object.get("revenue").and_then(serde_json::Value::as_f64) {
            Some(revenue) if revenue.is_finite() && revenue >= 0.0 => revenue,
            _ => {
                issues.push(RecordIssue::new(
                    entity_id,
                    IssueKind::MalformedRecord,
                    format!("{}: `revenue` missing or not a non-negative number", location),
                ));
                0.0
            }
        };

        if orders > clicks {
            issues.push(RecordIssue::new(
                entity_id,
                IssueKind::OrdersExceedClicks,
                format!("{}: {} orders recorded against {} clicks", location, orders, clicks),
            ));
        }

        MonthlyMetrics { clicks, orders, revenue }
    }
}

fn as_count(value: &serde_json::Value) -> Option<u64> {
    if let Some(count) = value.as_u64() {
        return Some(count);
    }
    // Whole floats such as `12.0` are accepted, fractional ones are not
    value
        .as_f64()
        .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0 && *v <= u64::MAX as f64)
        .map(|v| v as u64)
}

/// Months of one year, keyed in calendar order
pub type YearData = BTreeMap<Month, MonthlyMetrics>;

// ============================================================================
// BEL ENTITY
// ============================================================================

/// Validated BEL record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bel {
    /// Referral id, e.g. `KTWADVANT` (country code at positions 1..3)
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub level: Level,
    /// Two-letter code extracted from the id, if the id carries one
    pub country_code: Option<String>,
    /// Always derived from `country_code`, never taken from the dataset
    pub region: Region,
    pub monthly: BTreeMap<i32, YearData>,
}

impl Bel {
    pub fn month(&self, year: i32, month: Month) -> Option<&MonthlyMetrics> {
        self.monthly.get(&year).and_then(|data| data.get(&month))
    }

    pub fn year(&self, year: i32) -> Option<&YearData> {
        self.monthly.get(&year)
    }

    /// True when any month is recorded for `year`
    pub fn has_year(&self, year: i32) -> bool {
        self.monthly.get(&year).is_some_and(|data| !data.is_empty())
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.monthly.keys().copied()
    }

    /// Display country for the id's code; the raw code when unmapped
    pub fn country(&self) -> String {
        match self.country_code.as_deref() {
            Some(code) => crate::region::lookup(code)
                .map(|entry| entry.country.to_string())
                .unwrap_or_else(|| code.to_string()),
            None => "Unknown".to_string(),
        }
    }
}

// ============================================================================
// RAW DOCUMENT (as stored on disk)
// ============================================================================

/// Dataset document: `{ "leaderboard": [ ... ] }`
#[derive(Debug, Deserialize)]
pub struct RawDocument {
    pub leaderboard: Vec<RawBel>,
}

/// Entity as found in the dataset, before validation.
/// Legacy flat fields (clicks, convRate, aov, ...) are ignored.
#[derive(Debug, Deserialize)]
pub struct RawBel {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub level: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    /// Stored region, only cross-checked against the derived one
    #[serde(default)]
    pub region: Option<String>,

    #[serde(rename = "monthlyData", default)]
    pub monthly_data: serde_json::Value,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_level_rank_order() {
        let ranks: Vec<u8> = Level::ALL.iter().map(|l| l.rank()).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
        assert!(Level::Builder < Level::Leader);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse("exploder"), Some(Level::Exploder));
        assert_eq!(Level::parse(" Leader "), Some(Level::Leader));
        assert_eq!(Level::parse("Explorer"), None);
        assert!("Champion".parse::<Level>().is_err());
    }

    #[test]
    fn test_month_names_and_indexes() {
        assert_eq!(Month::from_name("august"), Some(Month::August));
        assert_eq!(Month::August.index(), 7);
        assert_eq!(Month::from_index(11), Some(Month::December));
        assert_eq!(Month::from_index(12), None);
        assert_eq!(Month::September.short_name(), "Sep");
        assert_eq!(Month::from_name("Sept"), None);
    }

    #[test]
    fn test_month_entry_parses_cleanly() {
        let mut issues = Vec::new();
        let m = MonthlyMetrics::from_json(
            &json!({"clicks": 120, "orders": 6, "revenue": 840.5}),
            "KTWTEST01",
            "2025/January",
            &mut issues,
        );
        assert_eq!(m, MonthlyMetrics::new(120, 6, 840.5));
        assert!(issues.is_empty());
    }

    #[test]
    fn test_missing_field_counts_as_zero_and_is_flagged() {
        let mut issues = Vec::new();
        let m = MonthlyMetrics::from_json(
            &json!({"clicks": 50, "revenue": 100.0}),
            "KTWTEST01",
            "2025/March",
            &mut issues,
        );
        assert_eq!(m.orders, 0);
        assert_eq!(m.clicks, 50);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::MalformedRecord);
    }

    #[test]
    fn test_negative_and_fractional_counts_are_rejected() {
        let mut issues = Vec::new();
        let m = MonthlyMetrics::from_json(
            &json!({"clicks": -4, "orders": 1.5, "revenue": -2}),
            "KTWTEST01",
            "2025/April",
            &mut issues,
        );
        assert_eq!(m, MonthlyMetrics::default());
        assert_eq!(issues.len(), 3);
    }

    #[test]
    fn test_whole_float_counts_accepted() {
        let mut issues = Vec::new();
        let m = MonthlyMetrics::from_json(
            &json!({"clicks": 10.0, "orders": 2, "revenue": 30}),
            "KTWTEST01",
            "2025/May",
            &mut issues,
        );
        assert_eq!(m, MonthlyMetrics::new(10, 2, 30.0));
        assert!(issues.is_empty());
    }

    #[test]
    fn test_orders_above_clicks_kept_but_flagged() {
        let mut issues = Vec::new();
        let m = MonthlyMetrics::from_json(
            &json!({"clicks": 3, "orders": 5, "revenue": 50}),
            "KTWTEST01",
            "2025/June",
            &mut issues,
        );
        assert_eq!(m.orders, 5);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::OrdersExceedClicks);
    }

    #[test]
    fn test_non_object_entry() {
        let mut issues = Vec::new();
        let m = MonthlyMetrics::from_json(&json!(42), "KTWTEST01", "2025/July", &mut issues);
        assert_eq!(m, MonthlyMetrics::default());
        assert_eq!(issues[0].kind, IssueKind::MalformedRecord);
    }
}
