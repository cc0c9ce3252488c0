// 📤 CSV Export - the filtered, sorted, unpaginated result as a spreadsheet
//
// Rows are written exactly in the order received. Money and ratios carry two
// decimals; counts are written as integers.

use crate::error::ExportError;
use crate::filter::FilterSpec;
use crate::row::Row;
use chrono::NaiveDate;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

pub const CSV_HEADER: [&str; 10] = [
    "Referral ID",
    "Name",
    "Level",
    "Clicks",
    "Orders",
    "Revenue",
    "C2O CVR (%)",
    "AOV",
    "Region",
    "Country",
];

const FILENAME_PREFIX: &str = "BEL_Performance_Leaderboard_";
const MAX_SUMMARY_LEN: usize = 50;

// ============================================================================
// WRITING
// ============================================================================

/// Write header plus one record per row; returns the number of rows written
pub fn write_csv<W: Write>(rows: &[Row], writer: W) -> Result<usize, ExportError> {
    if rows.is_empty() {
        return Err(ExportError::Empty);
    }

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for row in rows {
        wtr.write_record([
            row.id.clone(),
            row.name.clone(),
            row.level.to_string(),
            row.metrics.clicks.to_string(),
            row.metrics.orders.to_string(),
            format!("{:.2}", row.metrics.revenue),
            format!("{:.2}", row.metrics.cvr),
            format!("{:.2}", row.metrics.aov),
            row.region.to_string(),
            row.country.clone(),
        ])?;
    }
    wtr.flush()?;
    Ok(rows.len())
}

pub fn to_csv_string(rows: &[Row]) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_csv(rows, &mut buf)?;
    String::from_utf8(buf).map_err(|e| ExportError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

pub fn write_csv_file<P: AsRef<Path>>(rows: &[Row], path: P) -> Result<usize, ExportError> {
    let path = path.as_ref();
    if rows.is_empty() {
        return Err(ExportError::Empty);
    }
    let file = File::create(path)?;
    let written = write_csv(rows, file)?;
    info!(rows = written, path = %path.display(), "leaderboard exported");
    Ok(written)
}

// ============================================================================
// FILENAME
// ============================================================================

/// `_key_value` pairs for every active filter key, sanitized and capped
pub fn filter_summary(filter: &FilterSpec) -> String {
    let mut summary = String::new();
    if !filter.keyword.is_empty() {
        summary.push_str(&format!("_name_{}", filter.keyword));
    }
    if !filter.referral_id.is_empty() {
        summary.push_str(&format!("_id_{}", filter.referral_id));
    }
    if let Some(level) = filter.level {
        summary.push_str(&format!("_level_{}", level));
    }
    if let Some(region) = filter.region {
        summary.push_str(&format!("_region_{}", region));
    }
    if let Some(country) = &filter.country {
        summary.push_str(&format!("_country_{}", country));
    }
    if let Some(activity) = filter.activity {
        summary.push_str(&format!("_activity_{}", activity));
    }

    summary
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .take(MAX_SUMMARY_LEN)
        .collect()
}

pub fn export_filename(filter: &FilterSpec, date: NaiveDate) -> String {
    format!("{}{}{}.csv", FILENAME_PREFIX, date.format("%Y-%m-%d"), filter_summary(filter))
}

// ============================================================================
// TESTS
// ============================================================================
