// 🌏 Region Lookup - country code → region, one table for every caller
//
// The referral id carries a two-letter country code right after its
// one-letter program prefix (`KTWADVANT` → `TW`). Region is always derived
// from that code through COUNTRY_TABLE; the region string stored in the
// dataset is never trusted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bumped whenever COUNTRY_TABLE changes a mapping
pub const REGION_TABLE_VERSION: u32 = 3;

/// Byte offset of the country code inside a referral id
const CODE_OFFSET: usize = 1;
const CODE_LEN: usize = 2;

// ============================================================================
// REGION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "North America")]
    NorthAmerica,
    #[serde(rename = "Europe")]
    Europe,
    #[serde(rename = "Japan")]
    Japan,
    #[serde(rename = "Korea")]
    Korea,
    #[serde(rename = "China")]
    China,
    #[serde(rename = "Taiwan")]
    Taiwan,
    #[serde(rename = "India")]
    India,
    #[serde(rename = "ASEAN")]
    Asean,
    #[serde(rename = "AAU / NZ")]
    AustraliaNewZealand,
    #[serde(rename = "LATAM")]
    LatinAmerica,
    #[serde(rename = "ME&A")]
    MiddleEastAfrica,
    #[serde(rename = "Russia & CIS")]
    RussiaCis,
    /// Sentinel for ids whose code is missing or unmapped
    #[serde(rename = "Others")]
    Others,
}

impl Region {
    pub const ALL: [Region; 13] = [
        Region::NorthAmerica,
        Region::Europe,
        Region::Japan,
        Region::Korea,
        Region::China,
        Region::Taiwan,
        Region::India,
        Region::Asean,
        Region::AustraliaNewZealand,
        Region::LatinAmerica,
        Region::MiddleEastAfrica,
        Region::RussiaCis,
        Region::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::NorthAmerica => "North America",
            Region::Europe => "Europe",
            Region::Japan => "Japan",
            Region::Korea => "Korea",
            Region::China => "China",
            Region::Taiwan => "Taiwan",
            Region::India => "India",
            Region::Asean => "ASEAN",
            Region::AustraliaNewZealand => "AAU / NZ",
            Region::LatinAmerica => "LATAM",
            Region::MiddleEastAfrica => "ME&A",
            Region::RussiaCis => "Russia & CIS",
            Region::Others => "Others",
        }
    }

    /// Case-insensitive match on the display name
    pub fn parse(value: &str) -> Option<Region> {
        let value = value.trim();
        Region::ALL
            .into_iter()
            .find(|region| region.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::parse(s).ok_or_else(|| format!("unknown region: {}", s))
    }
}

// ============================================================================
// COUNTRY TABLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountryEntry {
    pub code: &'static str,
    pub country: &'static str,
    pub region: Region,
}

const fn entry(code: &'static str, country: &'static str, region: Region) -> CountryEntry {
    CountryEntry { code, country, region }
}

pub static COUNTRY_TABLE: &[CountryEntry] = &[
    // North America
    entry("US", "United States", Region::NorthAmerica),
    entry("CA", "Canada", Region::NorthAmerica),
    entry("MX", "Mexico", Region::NorthAmerica),
    // Europe
    entry("GB", "United Kingdom", Region::Europe),
    entry("DE", "Germany", Region::Europe),
    entry("FR", "France", Region::Europe),
    entry("IT", "Italy", Region::Europe),
    entry("ES", "Spain", Region::Europe),
    entry("NL", "Netherlands", Region::Europe),
    entry("SE", "Sweden", Region::Europe),
    entry("NO", "Norway", Region::Europe),
    entry("DK", "Denmark", Region::Europe),
    entry("FI", "Finland", Region::Europe),
    entry("CH", "Switzerland", Region::Europe),
    entry("AT", "Austria", Region::Europe),
    entry("BE", "Belgium", Region::Europe),
    entry("PT", "Portugal", Region::Europe),
    entry("IE", "Ireland", Region::Europe),
    entry("PL", "Poland", Region::Europe),
    entry("CZ", "Czech Republic", Region::Europe),
    entry("HU", "Hungary", Region::Europe),
    entry("GR", "Greece", Region::Europe),
    // Single-country regions
    entry("JP", "Japan", Region::Japan),
    entry("KR", "South Korea", Region::Korea),
    entry("CN", "China", Region::China),
    entry("TW", "Taiwan", Region::Taiwan),
    entry("IN", "India", Region::India),
    // ASEAN
    entry("TH", "Thailand", Region::Asean),
    entry("VN", "Vietnam", Region::Asean),
    entry("PH", "Philippines", Region::Asean),
    entry("ID", "Indonesia", Region::Asean),
    entry("MY", "Malaysia", Region::Asean),
    entry("SG", "Singapore", Region::Asean),
    entry("MM", "Myanmar", Region::Asean),
    entry("KH", "Cambodia", Region::Asean),
    entry("LA", "Laos", Region::Asean),
    entry("BN", "Brunei", Region::Asean),
    // AAU / NZ
    entry("AU", "Australia", Region::AustraliaNewZealand),
    entry("NZ", "New Zealand", Region::AustraliaNewZealand),
    // LATAM
    entry("BR", "Brazil", Region::LatinAmerica),
    entry("AR", "Argentina", Region::LatinAmerica),
    entry("CL", "Chile", Region::LatinAmerica),
    entry("CO", "Colombia", Region::LatinAmerica),
    entry("PE", "Peru", Region::LatinAmerica),
    entry("UY", "Uruguay", Region::LatinAmerica),
    entry("EC", "Ecuador", Region::LatinAmerica),
    entry("BO", "Bolivia", Region::LatinAmerica),
    entry("PY", "Paraguay", Region::LatinAmerica),
    entry("VE", "Venezuela", Region::LatinAmerica),
    // ME&A
    entry("AE", "United Arab Emirates", Region::MiddleEastAfrica),
    entry("SA", "Saudi Arabia", Region::MiddleEastAfrica),
    entry("IL", "Israel", Region::MiddleEastAfrica),
    entry("TR", "Turkey", Region::MiddleEastAfrica),
    entry("EG", "Egypt", Region::MiddleEastAfrica),
    entry("ZA", "South Africa", Region::MiddleEastAfrica),
    entry("NG", "Nigeria", Region::MiddleEastAfrica),
    entry("KE", "Kenya", Region::MiddleEastAfrica),
    entry("MA", "Morocco", Region::MiddleEastAfrica),
    entry("TN", "Tunisia", Region::MiddleEastAfrica),
    entry("GH", "Ghana", Region::MiddleEastAfrica),
    entry("ET", "Ethiopia", Region::MiddleEastAfrica),
    // Russia & CIS
    entry("RU", "Russia", Region::RussiaCis),
    entry("BY", "Belarus", Region::RussiaCis),
    entry("KZ", "Kazakhstan", Region::RussiaCis),
    entry("KG", "Kyrgyzstan", Region::RussiaCis),
    entry("TJ", "Tajikistan", Region::RussiaCis),
    entry("TM", "Turkmenistan", Region::RussiaCis),
    entry("UZ", "Uzbekistan", Region::RussiaCis),
    entry("AM", "Armenia", Region::RussiaCis),
    entry("AZ", "Azerbaijan", Region::RussiaCis),
    entry("GE", "Georgia", Region::RussiaCis),
    entry("MD", "Moldova", Region::RussiaCis),
    entry("UA", "Ukraine", Region::RussiaCis),
];

/// Look up a two-letter code (case-insensitive)
pub fn lookup(code: &str) -> Option<&'static CountryEntry> {
    COUNTRY_TABLE
        .iter()
        .find(|entry| entry.code.eq_ignore_ascii_case(code))
}

/// Extract the country code from a referral id.
/// None when the id is too short or the code is not two ASCII letters.
pub fn country_code_from_id(id: &str) -> Option<String> {
    let code = id.get(CODE_OFFSET..CODE_OFFSET + CODE_LEN)?;
    if code.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(code.to_ascii_uppercase())
    } else {
        None
    }
}

/// Result of resolving an id against the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub code: Option<String>,
    pub region: Region,
    /// False when the code was missing or not in the table
    pub known: bool,
}

pub fn resolve(id: &str) -> Resolution {
    let code = country_code_from_id(id);
    match code.as_deref().and_then(lookup) {
        Some(entry) => Resolution {
            code,
            region: entry.region,
            known: true,
        },
        None => Resolution {
            code,
            region: Region::Others,
            known: false,
        },
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_unique_and_well_formed() {
        let mut seen = HashSet::new();
        for entry in COUNTRY_TABLE {
            assert_eq!(entry.code.len(), 2, "{}", entry.code);
            assert!(entry.code.chars().all(|c| c.is_ascii_uppercase()), "{}", entry.code);
            assert!(seen.insert(entry.code), "duplicate code {}", entry.code);
            assert_ne!(entry.region, Region::Others, "{} mapped to sentinel", entry.code);
        }
    }

    #[test]
    fn test_every_real_region_has_a_country() {
        for region in Region::ALL.iter().filter(|r| **r != Region::Others) {
            assert!(
                COUNTRY_TABLE.iter().any(|e| e.region == *region),
                "{} has no countries",
                region
            );
        }
    }

    #[test]
    fn test_table_snapshot() {
        let expected = [
            ("US", Region::NorthAmerica),
            ("MX", Region::NorthAmerica),
            ("DE", Region::Europe),
            ("GB", Region::Europe),
            ("JP", Region::Japan),
            ("KR", Region::Korea),
            ("CN", Region::China),
            ("TW", Region::Taiwan),
            ("IN", Region::India),
            ("SG", Region::Asean),
            ("TH", Region::Asean),
            ("MY", Region::Asean),
            ("AU", Region::AustraliaNewZealand),
            ("BR", Region::LatinAmerica),
            ("ZA", Region::MiddleEastAfrica),
            ("RU", Region::RussiaCis),
            ("UA", Region::RussiaCis),
        ];
        for (code, region) in expected {
            assert_eq!(lookup(code).map(|e| e.region), Some(region), "{}", code);
        }
        assert_eq!(lookup("HK"), None);
        assert_eq!(COUNTRY_TABLE.len(), 73);
        assert_eq!(REGION_TABLE_VERSION, 3);
    }

    #[test]
    fn test_display_names_match_dataset_labels() {
        let labels: Vec<&str> = Region::ALL.iter().map(|r| r.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "North America", "Europe", "Japan", "Korea", "China", "Taiwan", "India",
                "ASEAN", "AAU / NZ", "LATAM", "ME&A", "Russia & CIS", "Others",
            ]
        );
        assert_eq!(resolve("KTWADVANT").region, Region::Taiwan);
        assert_eq!("AAU / NZ".parse::<Region>(), Ok(Region::AustraliaNewZealand));
        assert_eq!("taiwan".parse::<Region>(), Ok(Region::Taiwan));
        assert_eq!(
            serde_json::to_string(&Region::MiddleEastAfrica).unwrap(),
            "\"ME&A\""
        );
    }

    #[test]
    fn test_russia_and_cis_codes_are_known() {
        for id in ["KRUIVANOV", "KBYPETROV", "KKZNURLAN", "KUAKOVALE"] {
            let r = resolve(id);
            assert_eq!(r.region, Region::RussiaCis, "{}", id);
            assert!(r.known, "{}", id);
        }
    }

    #[test]
    fn test_code_extraction() {
        assert_eq!(country_code_from_id("KTWADVANT"), Some("TW".to_string()));
        assert_eq!(country_code_from_id("kdeimuler"), Some("DE".to_string()));
        assert_eq!(country_code_from_id("K1"), None);
        assert_eq!(country_code_from_id("K12ABC"), None);
        assert_eq!(country_code_from_id(""), None);
    }

    #[test]
    fn test_unknown_code_resolves_to_others() {
        let r = resolve("KZZNOBODY");
        assert_eq!(r.region, Region::Others);
        assert_eq!(r.code, Some("ZZ".to_string()));
        assert!(!r.known);

        let r = resolve("KUSOLVACE");
        assert_eq!(r.region, Region::NorthAmerica);
        assert!(r.known);
    }

    #[test]
    fn test_non_ascii_id_does_not_panic() {
        let r = resolve("KÜXTEST");
        assert_eq!(r.region, Region::Others);
        assert_eq!(r.code, None);
    }

    #[test]
    fn test_region_parse_round_trip() {
        for region in Region::ALL {
            assert_eq!(Region::parse(region.as_str()), Some(region));
        }
        assert_eq!(Region::parse("europe"), Some(Region::Europe));
        assert_eq!(Region::parse("Atlantis"), None);
    }
}
