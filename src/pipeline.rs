// 🔁 Leaderboard Pipeline - DataStore → Metrics → Filter → Sort → Page
//
// Each call runs the whole flow against the immutable snapshot. Results of
// the unpaginated stage are memoised per query; a cached result is the same
// rows in the same order a fresh computation would produce.

use crate::cutoff;
use crate::error::RecordIssue;
use crate::filter::{self, FilterSpec};
use crate::metrics::{self, DashboardSummary, GroupMetrics, MonthPoint};
use crate::model::{Bel, Level};
use crate::paginate::{self, Page};
use crate::region::Region;
use crate::row::Row;
use crate::sort::{self, SortDirection, SortKey};
use crate::store::DataStore;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Memoised queries kept before the cache starts over
const CACHE_CAPACITY: usize = 256;

// ============================================================================
// QUERY
// ============================================================================

/// Everything that determines a leaderboard result; doubles as the cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LeaderboardQuery {
    pub filter: FilterSpec,
    pub sort_key: SortKey,
    pub direction: SortDirection,
    /// Year the metrics are computed for
    pub year: i32,
    pub cutoff_month_index: usize,
}

impl LeaderboardQuery {
    /// Unfiltered, highest revenue first
    pub fn new(year: i32, cutoff_month_index: usize) -> Self {
        LeaderboardQuery {
            filter: FilterSpec::all(),
            sort_key: SortKey::Revenue,
            direction: SortDirection::Desc,
            year,
            cutoff_month_index: cutoff::clamp(cutoff_month_index),
        }
    }

    /// Cutoff derived from the calendar position of `reference`
    pub fn as_of(year: i32, reference: NaiveDate) -> Self {
        Self::new(year, cutoff::cutoff_month_index(year, reference))
    }

    /// The reference year, cut off at the reference month
    pub fn year_to_date(reference: NaiveDate) -> Self {
        Self::as_of(reference.year(), reference)
    }

    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_sort(mut self, key: SortKey, direction: SortDirection) -> Self {
        self.sort_key = key;
        self.direction = direction;
        self
    }
}

// ============================================================================
// QUERY PARAMETERS
// ============================================================================

/// Loosely typed query as it arrives from a command line or a URL
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryParams {
    pub year: Option<i32>,
    /// Overrides the cutoff the reference date implies
    pub cutoff: Option<usize>,
    pub region: Option<String>,
    pub level: Option<String>,
    /// Keep only entities with recorded data for this year
    pub data_year: Option<i32>,
    pub keyword: Option<String>,
    pub referral_id: Option<String>,
    pub country: Option<String>,
    pub activity: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
}

impl QueryParams {
    /// Validate every key; the first bad value is reported
    pub fn resolve(&self, reference: NaiveDate, default_year: i32) -> Result<LeaderboardQuery, String> {
        let year = self.year.unwrap_or(default_year);
        let mut query = match self.cutoff {
            Some(cutoff_month_index) => LeaderboardQuery::new(year, cutoff_month_index),
            None => LeaderboardQuery::as_of(year, reference),
        };

        let mut spec = FilterSpec::all();
        spec.region = filter::parse_region(self.region.as_deref().unwrap_or_default())?;
        spec.level = filter::parse_level(self.level.as_deref().unwrap_or_default())?;
        spec.activity = filter::parse_activity(self.activity.as_deref().unwrap_or_default())?;
        spec.year = self.data_year;
        spec = spec
            .with_keyword(self.keyword.as_deref().unwrap_or_default())
            .with_referral_id(self.referral_id.as_deref().unwrap_or_default())
            .with_country(self.country.as_deref().unwrap_or_default());
        query.filter = spec;

        if let Some(sort) = self.sort.as_deref().filter(|s| !s.trim().is_empty()) {
            let key: SortKey = sort.parse()?;
            query.sort_key = key;
            query.direction = key.default_direction();
        }
        if let Some(direction) = self.direction.as_deref().filter(|d| !d.trim().is_empty()) {
            query.direction = direction.parse()?;
        }
        Ok(query)
    }
}

// ============================================================================
// ACCOUNT DETAIL
// ============================================================================

/// One entity's row, its month-by-month figures and any load issues
#[derive(Debug, Clone, Serialize)]
pub struct AccountDetail {
    pub row: Row,
    pub monthly: Vec<MonthPoint>,
    pub issues: Vec<RecordIssue>,
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct Pipeline {
    store: Arc<DataStore>,
    cache: RwLock<HashMap<LeaderboardQuery, Arc<Vec<Row>>>>,
}

impl Pipeline {
    pub fn new(store: Arc<DataStore>) -> Self {
        Pipeline {
            store,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    /// The reference year when the dataset has it, else the newest recorded year
    pub fn default_year(&self, reference: NaiveDate) -> i32 {
        let years = self.store.years();
        if years.contains(&reference.year()) {
            return reference.year();
        }
        years.first().copied().unwrap_or_else(|| reference.year())
    }

    /// One row per entity in dataset order, metrics computed once each
    pub fn materialize(&self, year: i32, cutoff_month_index: usize) -> Vec<Row> {
        self.store
            .entities()
            .iter()
            .map(|bel| Row::materialize(bel, year, cutoff_month_index))
            .collect()
    }

    /// Full uncached run, unpaginated
    pub fn compute(&self, query: &LeaderboardQuery) -> Vec<Row> {
        let rows = self.materialize(query.year, query.cutoff_month_index);
        let mut rows = query.filter.apply(rows);
        sort::sort_rows(&mut rows, query.sort_key, query.direction);
        rows
    }

    /// Filtered and sorted rows, served from the memo cache when possible
    pub fn rows(&self, query: &LeaderboardQuery) -> Arc<Vec<Row>> {
        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(rows) = cache.get(query) {
                debug!(rows = rows.len(), "leaderboard cache hit");
                return Arc::clone(rows);
            }
        }

        let rows = Arc::new(self.compute(query));
        debug!(rows = rows.len(), year = query.year, cutoff = query.cutoff_month_index, "leaderboard computed");

        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        if cache.len() >= CACHE_CAPACITY {
            cache.clear();
        }
        cache.insert(query.clone(), Arc::clone(&rows));
        rows
    }

    pub fn page(&self, query: &LeaderboardQuery, page_size: usize, page_index: usize) -> Page<Row> {
        paginate::page(self.rows(query).as_slice(), page_size, page_index)
    }

    /// Entities behind the query's rows, in result order
    pub fn entities(&self, query: &LeaderboardQuery) -> Vec<&Bel> {
        self.rows(query)
            .iter()
            .filter_map(|row| self.store.get(&row.id))
            .collect()
    }

    /// Dashboard totals over the filtered set, ratios from summed totals
    pub fn summary(&self, query: &LeaderboardQuery) -> DashboardSummary {
        metrics::dashboard_summary(&self.entities(query), query.year, query.cutoff_month_index)
    }

    pub fn level_breakdown(&self, query: &LeaderboardQuery) -> Vec<GroupMetrics<Level>> {
        metrics::breakdown_by_level(&self.entities(query), query.year, query.cutoff_month_index)
    }

    pub fn region_breakdown(&self, query: &LeaderboardQuery) -> Vec<GroupMetrics<Region>> {
        metrics::breakdown_by_region(&self.entities(query), query.year, query.cutoff_month_index)
    }

    pub fn account(&self, id: &str, year: i32, cutoff_month_index: usize) -> Option<AccountDetail> {
        let bel = self.store.get(id)?;
        Some(AccountDetail {
            row: Row::materialize(bel, year, cutoff_month_index),
            monthly: metrics::monthly_series(bel, year, cutoff_month_index),
            issues: self.store.report().issues_for(id).cloned().collect(),
        })
    }

    pub fn cache_len(&self) -> usize {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn clear_cache(&self) {
        self.cache.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{bel, bel_with_year};
    use crate::model::Month;

    fn pipeline(n: usize) -> Pipeline {
        let codes = ["TW", "US", "DE", "JP", "BR"];
        let entities = (0..n)
            .map(|i| {
                let id = format!("K{}{:06}", codes[i % codes.len()], i);
                let level = Level::ALL[i % Level::ALL.len()];
                let clicks = 100 + (i as u64 * 7) % 50;
                let orders = (i as u64 * 3) % 10;
                bel_with_year(&id, level, 2025, &[(clicks, orders, orders as f64 * 42.5), (10, 1, 20.0)])
            })
            .collect();
        Pipeline::new(Arc::new(DataStore::from_entities(entities)))
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        let p = pipeline(40);
        let query = LeaderboardQuery::new(2025, 8).with_sort(SortKey::Cvr, SortDirection::Desc);
        let first = p.compute(&query);
        let second = p.compute(&query);
        assert_eq!(first, second);
        assert_eq!(first.len(), 40);
    }

    #[test]
    fn test_cached_result_matches_fresh_computation() {
        let p = pipeline(30);
        let query = LeaderboardQuery::new(2025, 8).with_filter(FilterSpec::all().with_level(Level::Leader));

        let cached = p.rows(&query);
        assert_eq!(p.cache_len(), 1);
        let again = p.rows(&query);
        assert!(Arc::ptr_eq(&cached, &again));
        assert_eq!(*cached, p.compute(&query));

        p.clear_cache();
        assert_eq!(p.cache_len(), 0);
    }

    #[test]
    fn test_twenty_three_rows_paginate_to_last_page() {
        let p = pipeline(23);
        let query = LeaderboardQuery::new(2025, 12);
        let sizes: Vec<usize> = (0..3).map(|i| p.page(&query, 10, i).items.len()).collect();
        assert_eq!(sizes, vec![10, 10, 3]);

        let clamped = p.page(&query, 10, 5);
        assert_eq!(clamped.page_index, 2);
        assert_eq!(clamped.items.len(), 3);
    }

    #[test]
    fn test_summary_uses_filtered_set() {
        let p = pipeline(20);
        let query = LeaderboardQuery::new(2025, 12).with_filter(FilterSpec::all().with_region(Region::Europe));
        let summary = p.summary(&query);
        assert_eq!(summary.bel_count, p.rows(&query).len());

        let clicks: u64 = p.rows(&query).iter().map(|r| r.metrics.clicks).sum();
        assert_eq!(summary.metrics.clicks, clicks);
    }

    #[test]
    fn test_breakdowns_cover_filtered_entities() {
        let p = pipeline(20);
        let query = LeaderboardQuery::new(2025, 12);
        let levels = p.level_breakdown(&query);
        assert_eq!(levels.len(), 4);
        assert_eq!(levels.iter().map(|g| g.bel_count).sum::<usize>(), 20);

        let regions = p.region_breakdown(&query);
        assert_eq!(regions.iter().map(|g| g.bel_count).sum::<usize>(), 20);
        assert!(regions.iter().any(|g| g.key == Region::LatinAmerica));
    }

    #[test]
    fn test_account_detail() {
        let b = bel(
            "KTWADVANT",
            Level::Exploder,
            &[(2025, Month::January, 100, 2, 80.0), (2025, Month::September, 500, 50, 900.0)],
        );
        let p = Pipeline::new(Arc::new(DataStore::from_entities(vec![b])));

        let detail = p.account("KTWADVANT", 2025, 8).expect("account exists");
        assert_eq!(detail.monthly.len(), 8);
        assert_eq!(detail.row.metrics.clicks, 100);
        assert!(detail.issues.is_empty());
        assert!(p.account("KXXNOBODY", 2025, 8).is_none());
    }

    #[test]
    fn test_query_params_resolve() {
        let reference = NaiveDate::from_ymd_opt(2025, 9, 8).expect("valid date");
        let params = QueryParams {
            region: Some("europe".to_string()),
            level: Some("all".to_string()),
            sort: Some("cvr".to_string()),
            country: Some("de".to_string()),
            ..QueryParams::default()
        };
        let query = params.resolve(reference, 2025).expect("valid params");
        assert_eq!(query.cutoff_month_index, 8);
        assert_eq!(query.filter.region, Some(Region::Europe));
        assert_eq!(query.filter.level, None);
        assert_eq!(query.filter.country.as_deref(), Some("DE"));
        assert_eq!((query.sort_key, query.direction), (SortKey::Cvr, SortDirection::Desc));

        let explicit = QueryParams {
            year: Some(2024),
            cutoff: Some(20),
            sort: Some("name".to_string()),
            direction: Some("desc".to_string()),
            ..QueryParams::default()
        };
        let query = explicit.resolve(reference, 2025).expect("valid params");
        assert_eq!((query.year, query.cutoff_month_index), (2024, 12));
        assert_eq!((query.sort_key, query.direction), (SortKey::Name, SortDirection::Desc));

        let bad = QueryParams {
            level: Some("Champion".to_string()),
            ..QueryParams::default()
        };
        assert!(bad.resolve(reference, 2025).is_err());
    }

    #[test]
    fn test_default_year_prefers_reference_year() {
        let p = pipeline(3);
        let reference = NaiveDate::from_ymd_opt(2025, 9, 8).expect("valid date");
        assert_eq!(p.default_year(reference), 2025);
        let later = NaiveDate::from_ymd_opt(2027, 1, 1).expect("valid date");
        assert_eq!(p.default_year(later), 2025);
    }

    #[test]
    fn test_year_to_date_query_uses_reference_month() {
        let reference = NaiveDate::from_ymd_opt(2025, 9, 8).expect("valid date");
        let query = LeaderboardQuery::year_to_date(reference);
        assert_eq!(query.year, 2025);
        assert_eq!(query.cutoff_month_index, 8);

        let past = LeaderboardQuery::as_of(2024, reference);
        assert_eq!(past.cutoff_month_index, 12);
    }
}
