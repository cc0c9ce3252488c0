// 🔎 Filter Engine - independent predicates ANDed into one test per row
//
// Every key either matches or passes through. Filtering keeps the input's
// relative order and the result does not depend on which key is applied
// first.

use crate::model::Level;
use crate::region::Region;
use crate::row::Row;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ACTIVITY
// ============================================================================

/// Activity over the active period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    /// Clicked but never ordered
    ClicksOnly,
    /// At least one order
    WithOrders,
    /// No clicks and no orders
    Inactive,
}

impl Activity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Activity::ClicksOnly => "clicks_only",
            Activity::WithOrders => "with_orders",
            Activity::Inactive => "inactive",
        }
    }

    /// Accepts the snake_case names and the short forms `clicks`, `orders`, `none`
    pub fn parse(value: &str) -> Option<Activity> {
        match value.trim().to_ascii_lowercase().as_str() {
            "clicks_only" | "clicks" => Some(Activity::ClicksOnly),
            "with_orders" | "orders" => Some(Activity::WithOrders),
            "inactive" | "none" => Some(Activity::Inactive),
            _ => None,
        }
    }

    fn matches(&self, row: &Row) -> bool {
        let m = &row.metrics;
        match self {
            Activity::ClicksOnly => m.clicks > 0 && m.orders == 0,
            Activity::WithOrders => m.orders > 0,
            Activity::Inactive => m.clicks == 0 && m.orders == 0,
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Activity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Activity::parse(s).ok_or_else(|| format!("unknown activity: {}", s))
    }
}

// ============================================================================
// FILTER SPEC
// ============================================================================

/// `None` / empty string means "all"
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct FilterSpec {
    pub region: Option<Region>,
    pub level: Option<Level>,
    /// Keep only entities with recorded data for this year
    pub year: Option<i32>,
    /// Case-insensitive substring of the name
    pub keyword: String,
    /// Case-insensitive substring of the referral id
    pub referral_id: String,
    /// Two-letter country code
    pub country: Option<String>,
    pub activity: Option<Activity>,
}

impl FilterSpec {
    pub fn all() -> Self {
        FilterSpec::default()
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_keyword(mut self, keyword: &str) -> Self {
        self.keyword = keyword.trim().to_string();
        self
    }

    pub fn with_referral_id(mut self, referral_id: &str) -> Self {
        self.referral_id = referral_id.trim().to_string();
        self
    }

    pub fn with_country(mut self, code: &str) -> Self {
        let code = code.trim();
        self.country = (!code.is_empty()).then(|| code.to_ascii_uppercase());
        self
    }

    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activity = Some(activity);
        self
    }

    /// True when no key narrows the result
    pub fn is_pass_through(&self) -> bool {
        self == &FilterSpec::default()
    }

    /// AND of every active key
    pub fn matches(&self, row: &Row) -> bool {
        if let Some(region) = self.region {
            if row.region != region {
                return false;
            }
        }
        if let Some(level) = self.level {
            if row.level != level {
                return false;
            }
        }
        if let Some(year) = self.year {
            if !row.years.contains(&year) {
                return false;
            }
        }
        if !self.keyword.is_empty() && !contains_ignore_case(&row.name, &self.keyword) {
            return false;
        }
        if !self.referral_id.is_empty() && !contains_ignore_case(&row.id, &self.referral_id) {
            return false;
        }
        if let Some(code) = &self.country {
            if !row.country_code.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(code)) {
                return false;
            }
        }
        if let Some(activity) = self.activity {
            if !activity.matches(row) {
                return false;
            }
        }
        true
    }

    /// Stable: matched rows keep their relative order
    pub fn apply(&self, mut rows: Vec<Row>) -> Vec<Row> {
        rows.retain(|row| self.matches(row));
        rows
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

// ============================================================================
// PARSING ("all" aware)
// ============================================================================

/// `"all"` or empty → None
pub fn parse_region(value: &str) -> Result<Option<Region>, String> {
    if is_all(value) {
        return Ok(None);
    }
    value.parse().map(Some)
}

/// `"all"` or empty → None
pub fn parse_level(value: &str) -> Result<Option<Level>, String> {
    if is_all(value) {
        return Ok(None);
    }
    value.parse().map(Some)
}

/// `"all"` or empty → None
pub fn parse_activity(value: &str) -> Result<Option<Activity>, String> {
    if is_all(value) {
        return Ok(None);
    }
    value.parse().map(Some)
}

fn is_all(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("all")
}

// ============================================================================
// TESTS
// ============================================================================
