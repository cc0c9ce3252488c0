// 🗄️ DataStore - immutable snapshot of the BEL dataset
//
// Loaded once, validated once, then only read. A load either yields a
// complete store or an error; there is no partially populated state.

use crate::error::{IssueKind, LoadError, RecordIssue};
use crate::model::{Bel, Level, Month, MonthlyMetrics, RawBel, RawDocument, YearData};
use crate::region;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

// ============================================================================
// VALIDATION REPORT
// ============================================================================

/// Everything noticed while loading, for the `validate` command and `/api/issues`
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    /// Entities accepted into the store
    pub loaded: usize,
    /// Ids (or positions, for records without an id) left out of the store
    pub quarantined: Vec<String>,
    pub issues: Vec<RecordIssue>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty() && self.quarantined.is_empty()
    }

    pub fn counts_by_kind(&self) -> BTreeMap<IssueKind, usize> {
        let mut counts = BTreeMap::new();
        for issue in &self.issues {
            *counts.entry(issue.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn issues_for<'a>(&'a self, entity_id: &'a str) -> impl Iterator<Item = &'a RecordIssue> + 'a {
        self.issues.iter().filter(move |issue| issue.entity_id == entity_id)
    }

    pub fn summary(&self) -> String {
        format!(
            "Loaded: {}, Quarantined: {}, Issues: {}",
            self.loaded,
            self.quarantined.len(),
            self.issues.len()
        )
    }
}

// ============================================================================
// DATA STORE
// ============================================================================

#[derive(Debug)]
pub struct DataStore {
    /// Dataset order is preserved; filtering relies on it for stability
    entities: Vec<Bel>,
    index: HashMap<String, usize>,
    report: ValidationReport,
    fingerprint: String,
}

impl DataStore {
    /// Read and validate a dataset file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let store = Self::from_json_str(&content)?;
        info!(path = %path.display(), "dataset loaded from file");
        Ok(store)
    }

    /// Parse and validate an in-memory dataset document
    pub fn from_json_str(content: &str) -> Result<Self, LoadError> {
        let document: RawDocument = serde_json::from_str(content)?;

        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        let fingerprint = format!("{:x}", hasher.finalize());

        let store = Self::from_raw(document.leaderboard, fingerprint);
        info!(
            entities = store.entities.len(),
            quarantined = store.report.quarantined.len(),
            issues = store.report.issues.len(),
            "dataset validated"
        );
        Ok(store)
    }

    /// Build a store from already-validated entities
    pub fn from_entities(entities: Vec<Bel>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(&entities).unwrap_or_default());
        let fingerprint = format!("{:x}", hasher.finalize());

        let mut report = ValidationReport::default();
        let mut kept = Vec::with_capacity(entities.len());
        let mut index = HashMap::new();
        for bel in entities {
            if index.contains_key(&bel.id) {
                report.issues.push(RecordIssue::new(&bel.id, IssueKind::DuplicateId, "id already loaded"));
                report.quarantined.push(bel.id.clone());
                continue;
            }
            index.insert(bel.id.clone(), kept.len());
            kept.push(bel);
        }
        report.loaded = kept.len();

        DataStore {
            entities: kept,
            index,
            report,
            fingerprint,
        }
    }

    fn from_raw(raw: Vec<RawBel>, fingerprint: String) -> Self {
        let mut report = ValidationReport::default();
        let mut entities = Vec::with_capacity(raw.len());
        let mut index = HashMap::new();

        for (position, record) in raw.into_iter().enumerate() {
            let Some(bel) = build_entity(record, position, &mut report) else {
                continue;
            };

            if index.contains_key(&bel.id) {
                warn!(id = %bel.id, "duplicate id quarantined");
                report.issues.push(RecordIssue::new(
                    &bel.id,
                    IssueKind::DuplicateId,
                    format!("record #{} reuses an id already loaded", position),
                ));
                report.quarantined.push(bel.id);
                continue;
            }

            index.insert(bel.id.clone(), entities.len());
            entities.push(bel);
        }

        report.loaded = entities.len();

        DataStore {
            entities,
            index,
            report,
            fingerprint,
        }
    }

    pub fn entities(&self) -> &[Bel] {
        &self.entities
    }

    pub fn get(&self, id: &str) -> Option<&Bel> {
        self.index.get(id).map(|&i| &self.entities[i])
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Every year with recorded data, newest first
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.entities.iter().flat_map(|bel| bel.years()).collect();
        years.sort_unstable_by(|a, b| b.cmp(a));
        years.dedup();
        years
    }

    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    /// SHA-256 of the source document; identifies this snapshot
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

// ============================================================================
// RECORD VALIDATION
// ============================================================================

fn build_entity(raw: RawBel, position: usize, report: &mut ValidationReport) -> Option<Bel> {
    let label = raw
        .id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| format!("#{}", position));

    let quarantine = |report: &mut ValidationReport, detail: String| {
        warn!(record = %label, %detail, "record quarantined");
        report.issues.push(RecordIssue::new(&label, IssueKind::MalformedRecord, detail));
        report.quarantined.push(label.clone());
    };

    let Some(id) = raw.id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty()) else {
        quarantine(report, "missing id".to_string());
        return None;
    };

    let Some(name) = raw.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) else {
        quarantine(report, "missing name".to_string());
        return None;
    };

    let level = match raw.level.as_deref().map(Level::parse) {
        Some(Some(level)) => level,
        Some(None) => {
            quarantine(report, format!("level {:?} outside Builder/Enabler/Exploder/Leader", raw.level.unwrap_or_default()));
            return None;
        }
        None => {
            quarantine(report, "missing level".to_string());
            return None;
        }
    };

    let resolution = region::resolve(&id);
    if !resolution.known {
        report.issues.push(RecordIssue::new(
            &id,
            IssueKind::UnknownRegionCode,
            format!("country code {:?} not in region table, using Others", resolution.code.as_deref().unwrap_or("")),
        ));
    }

    if let Some(stored) = raw.region.as_deref().filter(|s| !s.trim().is_empty()) {
        if !stored.trim().eq_ignore_ascii_case(resolution.region.as_str()) {
            report.issues.push(RecordIssue::new(
                &id,
                IssueKind::RegionMismatch,
                format!("stored region {:?}, derived {:?}", stored, resolution.region.as_str()),
            ));
        }
    }

    let monthly = parse_monthly_data(&id, &raw.monthly_data, &mut report.issues);
    debug!(%id, years = monthly.len(), "record accepted");

    Some(Bel {
        id,
        name,
        email: raw.email.filter(|e| !e.trim().is_empty()),
        level,
        country_code: resolution.code,
        region: resolution.region,
        monthly,
    })
}

fn parse_monthly_data(
    id: &str,
    value: &serde_json::Value,
    issues: &mut Vec<RecordIssue>,
) -> BTreeMap<i32, YearData> {
    let mut monthly = BTreeMap::new();

    let years = match value {
        serde_json::Value::Null => return monthly,
        serde_json::Value::Object(years) => years,
        _ => {
            issues.push(RecordIssue::new(id, IssueKind::MalformedRecord, "monthlyData is not an object"));
            return monthly;
        }
    };

    for (year_key, months) in years {
        let Ok(year) = year_key.trim().parse::<i32>() else {
            issues.push(RecordIssue::new(
                id,
                IssueKind::MalformedRecord,
                format!("year key {:?} is not a number", year_key),
            ));
            continue;
        };

        let Some(months) = months.as_object() else {
            issues.push(RecordIssue::new(
                id,
                IssueKind::MalformedRecord,
                format!("{}: months are not an object", year),
            ));
            continue;
        };

        let mut year_data = YearData::new();
        for (month_key, entry) in months {
            let Some(month) = Month::from_name(month_key) else {
                issues.push(RecordIssue::new(
                    id,
                    IssueKind::MalformedRecord,
                    format!("{}: unknown month {:?}", year, month_key),
                ));
                continue;
            };
            // Explicit nulls are "no data", same as an absent key
            if entry.is_null() {
                continue;
            }
            let location = format!("{}/{}", year, month.name());
            year_data.insert(month, MonthlyMetrics::from_json(entry, id, &location, issues));
        }

        monthly.insert(year, year_data);
    }

    monthly
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Region;

    const DATASET: &str = r#"{
        "leaderboard": [
            {
                "id": "KTWADVANT", "name": "Maxwell Walker", "level": "Exploder",
                "region": "Taiwan", "clicks": 1280, "convRate": "2.73%",
                "monthlyData": {
                    "2024": { "December": {"clicks": 100, "orders": 4, "revenue": 400} },
                    "2025": {
                        "January": {"clicks": 120, "orders": 6, "revenue": 840.5},
                        "February": {"clicks": 80, "revenue": 10}
                    }
                }
            },
            { "id": "KUSOLVACE", "name": "Olivia Chen", "level": "Builder", "region": "Europe" },
            { "id": "KZZNOBODY", "name": "Nobody", "level": "Leader" },
            { "id": "KDEIMULER", "name": "Liam Muller", "level": "Champion" },
            { "name": "No Id", "level": "Builder" },
            { "id": "KTWADVANT", "name": "Duplicate", "level": "Builder" }
        ]
    }"#;

    #[test]
    fn test_load_keeps_valid_records_in_order() {
        let store = DataStore::from_json_str(DATASET).unwrap();
        let ids: Vec<&str> = store.entities().iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["KTWADVANT", "KUSOLVACE", "KZZNOBODY"]);
        assert_eq!(store.report().loaded, 3);
    }

    #[test]
    fn test_quarantine_unknown_level_missing_id_and_duplicates() {
        let store = DataStore::from_json_str(DATASET).unwrap();
        let quarantined = &store.report().quarantined;
        assert_eq!(quarantined, &vec!["KDEIMULER".to_string(), "#4".to_string(), "KTWADVANT".to_string()]);
        assert_eq!(store.get("KTWADVANT").unwrap().name, "Maxwell Walker");
        assert!(store.get("KDEIMULER").is_none());
    }

    #[test]
    fn test_region_is_derived_and_mismatch_flagged() {
        let store = DataStore::from_json_str(DATASET).unwrap();
        assert_eq!(store.get("KUSOLVACE").unwrap().region, Region::NorthAmerica);
        assert_eq!(store.get("KZZNOBODY").unwrap().region, Region::Others);

        let counts = store.report().counts_by_kind();
        assert_eq!(counts.get(&IssueKind::RegionMismatch), Some(&1));
        assert_eq!(counts.get(&IssueKind::UnknownRegionCode), Some(&1));
        assert_eq!(store.report().issues_for("KUSOLVACE").count(), 1);
    }

    #[test]
    fn test_dataset_region_labels_do_not_mismatch() {
        let store = DataStore::from_json_str(
            r#"{"leaderboard": [
                {"id": "KTWADVANT", "name": "A", "level": "Builder", "region": "Taiwan"},
                {"id": "KJPTANAKA", "name": "B", "level": "Builder", "region": "Japan"},
                {"id": "KAUHARRIS", "name": "C", "level": "Builder", "region": "AAU / NZ"},
                {"id": "KRUIVANOV", "name": "D", "level": "Builder", "region": "Russia & CIS"}
            ]}"#,
        )
        .unwrap();
        let counts = store.report().counts_by_kind();
        assert_eq!(counts.get(&IssueKind::RegionMismatch), None);
        assert_eq!(counts.get(&IssueKind::UnknownRegionCode), None);
        assert_eq!(store.get("KRUIVANOV").unwrap().region, Region::RussiaCis);
    }

    #[test]
    fn test_malformed_month_field_is_zero() {
        let store = DataStore::from_json_str(DATASET).unwrap();
        let bel = store.get("KTWADVANT").unwrap();
        let feb = bel.month(2025, Month::February).unwrap();
        assert_eq!(feb.orders, 0);
        assert_eq!(feb.clicks, 80);
        assert!(store
            .report()
            .issues_for("KTWADVANT")
            .any(|i| i.kind == IssueKind::MalformedRecord));
    }

    #[test]
    fn test_years_newest_first() {
        let store = DataStore::from_json_str(DATASET).unwrap();
        assert_eq!(store.years(), vec![2025, 2024]);
    }

    #[test]
    fn test_parse_failure_is_fatal() {
        assert!(matches!(DataStore::from_json_str("{\"leaderboard\": 3}"), Err(LoadError::Parse(_))));
        assert!(matches!(DataStore::from_json_str("not json"), Err(LoadError::Parse(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = DataStore::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_bad_year_and_month_keys_skipped() {
        let doc = r#"{"leaderboard": [{
            "id": "KJPTANAKA", "name": "Kenji Tanaka", "level": "Leader",
            "monthlyData": {
                "twenty": {"January": {"clicks": 1, "orders": 0, "revenue": 0}},
                "2025": {"Sept": {"clicks": 1, "orders": 0, "revenue": 0}, "March": null}
            }
        }]}"#;
        let store = DataStore::from_json_str(doc).unwrap();
        let bel = store.get("KJPTANAKA").unwrap();
        assert_eq!(bel.years().collect::<Vec<_>>(), vec![2025]);
        assert!(!bel.has_year(2025));
        assert_eq!(store.report().issues.len(), 2);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = DataStore::from_json_str(DATASET).unwrap();
        let b = DataStore::from_json_str(DATASET).unwrap();
        let c = DataStore::from_json_str(r#"{"leaderboard": []}"#).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }
}
