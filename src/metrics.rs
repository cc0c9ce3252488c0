// 📊 Metrics Calculator - CVR, AOV and year-to-date totals
//
// Pure functions over raw monthly records. Every view (leaderboard, account
// list, dashboard, per-level and per-region tables) goes through here.
//
// Group ratios are always derived from summed clicks/orders/revenue, never by
// averaging each entity's own ratio.

use crate::cutoff;
use crate::model::{Bel, Level, Month, MonthlyMetrics};
use crate::region::Region;
use serde::Serialize;

// ============================================================================
// RATIOS
// ============================================================================

/// Click-to-order conversion rate in percent; 0 when there were no clicks
pub fn cvr(orders: u64, clicks: u64) -> f64 {
    if clicks == 0 {
        0.0
    } else {
        orders as f64 / clicks as f64 * 100.0
    }
}

/// Average order value; 0 when there were no orders
pub fn aov(revenue: f64, orders: u64) -> f64 {
    if orders == 0 {
        0.0
    } else {
        revenue / orders as f64
    }
}

// ============================================================================
// TOTALS / METRICS
// ============================================================================

/// Summed raw counters over some set of months and entities
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub clicks: u64,
    pub orders: u64,
    pub revenue: f64,
}

impl Totals {
    pub fn add_month(&mut self, month: &MonthlyMetrics) {
        self.clicks = self.clicks.saturating_add(month.clicks);
        self.orders = self.orders.saturating_add(month.orders);
        self.revenue += month.revenue;
    }

    pub fn merge(&mut self, other: &Totals) {
        self.clicks = self.clicks.saturating_add(other.clicks);
        self.orders = self.orders.saturating_add(other.orders);
        self.revenue += other.revenue;
    }
}

/// Totals plus the ratios derived from them
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub clicks: u64,
    pub orders: u64,
    pub revenue: f64,
    pub cvr: f64,
    pub aov: f64,
}

impl Metrics {
    /// The only place ratios are derived
    pub fn from_totals(totals: Totals) -> Self {
        Metrics {
            clicks: totals.clicks,
            orders: totals.orders,
            revenue: totals.revenue,
            cvr: cvr(totals.orders, totals.clicks),
            aov: aov(totals.revenue, totals.orders),
        }
    }

    pub fn totals(&self) -> Totals {
        Totals {
            clicks: self.clicks,
            orders: self.orders,
            revenue: self.revenue,
        }
    }
}

// ============================================================================
// PER ENTITY
// ============================================================================

/// Raw sums for months `[0, cutoff)` of `year`; missing months add nothing
pub fn totals(entity: &Bel, year: i32, cutoff_month_index: usize) -> Totals {
    let mut totals = Totals::default();
    let Some(year_data) = entity.year(year) else {
        return totals;
    };

    for month in &Month::ALL[..cutoff::clamp(cutoff_month_index)] {
        if let Some(entry) = year_data.get(month) {
            totals.add_month(entry);
        }
    }
    totals
}

pub fn aggregate(entity: &Bel, year: i32, cutoff_month_index: usize) -> Metrics {
    Metrics::from_totals(totals(entity, year, cutoff_month_index))
}

// ============================================================================
// PER GROUP
// ============================================================================

/// Sum raw totals across the group first, then derive the ratios
pub fn aggregate_group<'a, I>(entities: I, year: i32, cutoff_month_index: usize) -> Metrics
where
    I: IntoIterator<Item = &'a Bel>,
{
    let mut sum = Totals::default();
    for entity in entities {
        sum.merge(&totals(entity, year, cutoff_month_index));
    }
    Metrics::from_totals(sum)
}

/// One row of a per-level or per-region performance table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMetrics<K> {
    pub key: K,
    pub bel_count: usize,
    pub metrics: Metrics,
}

fn breakdown<'a, K, F>(entities: &[&'a Bel], keys: &[K], key_of: F, year: i32, cutoff_month_index: usize) -> Vec<GroupMetrics<K>>
where
    K: Copy + PartialEq,
    F: Fn(&Bel) -> K,
{
    keys.iter()
        .map(|&key| {
            let members: Vec<&Bel> = entities.iter().copied().filter(|bel| key_of(*bel) == key).collect();
            GroupMetrics {
                key,
                bel_count: members.len(),
                metrics: aggregate_group(members, year, cutoff_month_index),
            }
        })
        .collect()
}

/// Every level in rank order, including empty ones
pub fn breakdown_by_level(entities: &[&Bel], year: i32, cutoff_month_index: usize) -> Vec<GroupMetrics<Level>> {
    breakdown(entities, &Level::ALL, |bel| bel.level, year, cutoff_month_index)
}

/// Populated regions in table order
pub fn breakdown_by_region(entities: &[&Bel], year: i32, cutoff_month_index: usize) -> Vec<GroupMetrics<Region>> {
    breakdown(entities, &Region::ALL, |bel| bel.region, year, cutoff_month_index)
        .into_iter()
        .filter(|group| group.bel_count > 0)
        .collect()
}

/// Headline numbers for the dashboard cards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub year: i32,
    pub cutoff_month_index: usize,
    pub bel_count: usize,
    pub metrics: Metrics,
}

pub fn dashboard_summary(entities: &[&Bel], year: i32, cutoff_month_index: usize) -> DashboardSummary {
    DashboardSummary {
        year,
        cutoff_month_index: cutoff::clamp(cutoff_month_index),
        bel_count: entities.len(),
        metrics: aggregate_group(entities.iter().copied(), year, cutoff_month_index),
    }
}

// ============================================================================
// MONTHLY SERIES
// ============================================================================

/// Metrics for a single month of the active window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthPoint {
    pub month: Month,
    pub metrics: Metrics,
}

/// One point per active month; months past the cutoff are not in the series
pub fn monthly_series(entity: &Bel, year: i32, cutoff_month_index: usize) -> Vec<MonthPoint> {
    group_monthly_series(std::iter::once(entity), year, cutoff_month_index)
}

/// Per-month sums across a group, ratios derived from each month's sums
pub fn group_monthly_series<'a, I>(entities: I, year: i32, cutoff_month_index: usize) -> Vec<MonthPoint>
where
    I: IntoIterator<Item = &'a Bel>,
{
    let active = &Month::ALL[..cutoff::clamp(cutoff_month_index)];
    let mut sums = vec![Totals::default(); active.len()];

    for entity in entities {
        let Some(year_data) = entity.year(year) else {
            continue;
        };
        for (slot, month) in sums.iter_mut().zip(active) {
            if let Some(entry) = year_data.get(month) {
                slot.add_month(entry);
            }
        }
    }

    active
        .iter()
        .zip(sums)
        .map(|(&month, totals)| MonthPoint {
            month,
            metrics: Metrics::from_totals(totals),
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
