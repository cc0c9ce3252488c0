// ⚠️ Errors and record issues
//
// Loading the dataset is the only fatal path. Everything wrong inside an
// individual record is a RecordIssue: collected, reported, never raised.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// FATAL ERRORS
// ============================================================================

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dataset: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("no data to export, adjust the filters and try again")]
    Empty,

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

// ============================================================================
// NON-FATAL RECORD ISSUES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum IssueKind {
    /// A field is missing or unusable; it contributes zero (or the record is quarantined)
    MalformedRecord,
    /// The id carries no known country code; region resolves to Others
    UnknownRegionCode,
    /// A month reports more orders than clicks
    OrdersExceedClicks,
    /// The dataset's stored region disagrees with the derived one
    RegionMismatch,
    /// A later record reuses an id already loaded
    DuplicateId,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::MalformedRecord => "MalformedRecord",
            IssueKind::UnknownRegionCode => "UnknownRegionCode",
            IssueKind::OrdersExceedClicks => "OrdersExceedClicks",
            IssueKind::RegionMismatch => "RegionMismatch",
            IssueKind::DuplicateId => "DuplicateId",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordIssue {
    pub entity_id: String,
    pub kind: IssueKind,
    pub detail: String,
}

impl RecordIssue {
    pub fn new(entity_id: &str, kind: IssueKind, detail: impl Into<String>) -> Self {
        RecordIssue {
            entity_id: entity_id.to_string(),
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for RecordIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.entity_id, self.detail)
    }
}
