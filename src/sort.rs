// ↕️ Sorter - order materialized rows by raw or derived fields
//
// Rows arrive with their metrics already computed, so comparisons only read
// fields. Ties always fall back to ascending id, whatever the direction,
// which makes the order total and repeatable.

use crate::row::Row;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// SORT KEY / DIRECTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Id,
    Name,
    Level,
    Region,
    Country,
    Clicks,
    Orders,
    Revenue,
    Cvr,
    Aov,
}

impl SortKey {
    pub const ALL: [SortKey; 10] = [
        SortKey::Id,
        SortKey::Name,
        SortKey::Level,
        SortKey::Region,
        SortKey::Country,
        SortKey::Clicks,
        SortKey::Orders,
        SortKey::Revenue,
        SortKey::Cvr,
        SortKey::Aov,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Id => "id",
            SortKey::Name => "name",
            SortKey::Level => "level",
            SortKey::Region => "region",
            SortKey::Country => "country",
            SortKey::Clicks => "clicks",
            SortKey::Orders => "orders",
            SortKey::Revenue => "revenue",
            SortKey::Cvr => "cvr",
            SortKey::Aov => "aov",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Id => "Referral ID",
            SortKey::Name => "Name",
            SortKey::Level => "Level",
            SortKey::Region => "Region",
            SortKey::Country => "Country",
            SortKey::Clicks => "Clicks",
            SortKey::Orders => "Orders",
            SortKey::Revenue => "Revenue",
            SortKey::Cvr => "C2O CVR",
            SortKey::Aov => "AOV",
        }
    }

    pub fn parse(value: &str) -> Option<SortKey> {
        match value.trim().to_ascii_lowercase().as_str() {
            "id" | "referral_id" | "referralid" => Some(SortKey::Id),
            "name" => Some(SortKey::Name),
            "level" => Some(SortKey::Level),
            "region" => Some(SortKey::Region),
            "country" => Some(SortKey::Country),
            "clicks" => Some(SortKey::Clicks),
            "orders" => Some(SortKey::Orders),
            "revenue" => Some(SortKey::Revenue),
            "cvr" | "c20cvr" | "c2o_cvr" | "conversion" => Some(SortKey::Cvr),
            "aov" => Some(SortKey::Aov),
            _ => None,
        }
    }

    /// Text keys read naturally ascending, figures and level descending
    pub fn default_direction(&self) -> SortDirection {
        match self {
            SortKey::Id | SortKey::Name | SortKey::Region | SortKey::Country => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }

    /// Next key in `ALL`, wrapping
    pub fn next(&self) -> SortKey {
        let i = SortKey::ALL.iter().position(|k| k == self).unwrap_or(0);
        SortKey::ALL[(i + 1) % SortKey::ALL.len()]
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::parse(s).ok_or_else(|| format!("unknown sort key: {}", s))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn reversed(&self) -> SortDirection {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            _ => Err(format!("unknown sort direction: {}", s)),
        }
    }
}

// ============================================================================
// COMPARISON
// ============================================================================

/// Case-folded comparison, raw string as a secondary key so distinct
/// strings never compare equal
fn compare_text(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| a.cmp(b))
}

/// Primary comparison for `key`, ascending
pub fn compare_by(a: &Row, b: &Row, key: SortKey) -> Ordering {
    match key {
        SortKey::Id => compare_text(&a.id, &b.id),
        SortKey::Name => compare_text(&a.name, &b.name),
        SortKey::Level => a.level.rank().cmp(&b.level.rank()),
        SortKey::Region => compare_text(a.region.as_str(), b.region.as_str()),
        SortKey::Country => compare_text(&a.country, &b.country),
        SortKey::Clicks => a.metrics.clicks.cmp(&b.metrics.clicks),
        SortKey::Orders => a.metrics.orders.cmp(&b.metrics.orders),
        SortKey::Revenue => a.metrics.revenue.total_cmp(&b.metrics.revenue),
        SortKey::Cvr => a.metrics.cvr.total_cmp(&b.metrics.cvr),
        SortKey::Aov => a.metrics.aov.total_cmp(&b.metrics.aov),
    }
}

/// Sort in place; direction applies to `key` only, id tie-break stays ascending
pub fn sort_rows(rows: &mut [Row], key: SortKey, direction: SortDirection) {
    rows.sort_by(|a, b| {
        let primary = compare_by(a, b, key);
        let primary = match direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    });
}

// ============================================================================
// TESTS
// ============================================================================
