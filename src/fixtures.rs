// Test fixtures shared by the module tests

use crate::model::{Bel, Level, Month, MonthlyMetrics, YearData};
use crate::region;
use std::collections::BTreeMap;

/// Entity with explicit `(year, month, clicks, orders, revenue)` entries
pub fn bel(id: &str, level: Level, entries: &[(i32, Month, u64, u64, f64)]) -> Bel {
    let mut monthly: BTreeMap<i32, YearData> = BTreeMap::new();
    for &(year, month, clicks, orders, revenue) in entries {
        monthly
            .entry(year)
            .or_default()
            .insert(month, MonthlyMetrics::new(clicks, orders, revenue));
    }

    let resolution = region::resolve(id);
    Bel {
        id: id.to_string(),
        name: format!("BEL {}", id),
        email: None,
        level,
        country_code: resolution.code,
        region: resolution.region,
        monthly,
    }
}

/// Entity whose `year` is filled from January onward with `(clicks, orders, revenue)`
pub fn bel_with_year(id: &str, level: Level, year: i32, months: &[(u64, u64, f64)]) -> Bel {
    let entries: Vec<(i32, Month, u64, u64, f64)> = months
        .iter()
        .zip(Month::ALL)
        .map(|(&(clicks, orders, revenue), month)| (year, month, clicks, orders, revenue))
        .collect();
    bel(id, level, &entries)
}

pub fn named(mut bel: Bel, name: &str) -> Bel {
    bel.name = name.to_string();
    bel
}
