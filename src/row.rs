// Materialized leaderboard row: entity fields plus metrics for one period

use crate::metrics::{self, Metrics};
use crate::model::{Bel, Level};
use crate::region::Region;
use serde::Serialize;

/// What every presentation collaborator receives. Metrics are computed
/// once here and never recomputed downstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub level: Level,
    pub region: Region,
    pub country_code: Option<String>,
    pub country: String,
    /// Years with recorded data, oldest first
    pub years: Vec<i32>,
    pub year: i32,
    pub cutoff_month_index: usize,
    pub metrics: Metrics,
}

impl Row {
    pub fn materialize(bel: &Bel, year: i32, cutoff_month_index: usize) -> Self {
        Row {
            id: bel.id.clone(),
            name: bel.name.clone(),
            email: bel.email.clone(),
            level: bel.level,
            region: bel.region,
            country_code: bel.country_code.clone(),
            country: bel.country(),
            years: bel.years().filter(|&y| bel.has_year(y)).collect(),
            year,
            cutoff_month_index,
            metrics: metrics::aggregate(bel, year, cutoff_month_index),
        }
    }

    /// Name cut to `max_len` characters with a trailing "..."
    pub fn short_name(&self, max_len: usize) -> String {
        if self.name.chars().count() <= max_len {
            self.name.clone()
        } else {
            let kept: String = self.name.chars().take(max_len.saturating_sub(3)).collect();
            format!("{}...", kept)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::bel;
    use crate::model::Month;

    #[test]
    fn test_materialize_carries_fields_and_metrics() {
        let b = bel(
            "KTWADVANT",
            Level::Exploder,
            &[(2024, Month::May, 10, 1, 50.0), (2025, Month::January, 200, 4, 400.0), (2025, Month::October, 99, 9, 9.0)],
        );
        let row = Row::materialize(&b, 2025, 8);
        assert_eq!(row.id, "KTWADVANT");
        assert_eq!(row.region, Region::Taiwan);
        assert_eq!(row.country, "Taiwan");
        assert_eq!(row.years, vec![2024, 2025]);
        assert_eq!(row.metrics.clicks, 200);
        assert!((row.metrics.cvr - 2.0).abs() < 1e-9);
        assert!((row.metrics.aov - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_name() {
        let mut row = Row::materialize(&bel("KTWADVANT", Level::Builder, &[]), 2025, 8);
        row.name = "Maxwell Walker".to_string();
        assert_eq!(row.short_name(24), "Maxwell Walker");
        assert_eq!(row.short_name(10), "Maxwell...");
        row.name = "Zoë Ångström-Łukasiewicz".to_string();
        assert_eq!(row.short_name(8), "Zoë Å...");
    }
}
