//! Request and response shapes for the legislation REST contract (§4.3, §6).
//!
//! Every optional field defaults on missing/unknown data so that an upstream
//! schema change degrades gracefully instead of failing deserialization
//! (§6 "tolerant parsing", §9).

use serde::{Deserialize, Serialize};

/// Filters accepted by the search-legislation operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LegislationSearchFilter {
    pub query: Option<String>,
    pub year_from: Option<u32>,
    pub year_to: Option<u32>,
    pub legislation_type: Option<String>,
    pub offset: u32,
    pub limit: u32,
}

/// One legislation item as returned by search/lookup.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LegislationItem {
    pub id: String,
    pub title: String,
    pub legislation_type: String,
    pub year: u32,
    pub number: u32,
    pub uri: String,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LegislationSearchResponse {
    pub total: u32,
    pub results: Vec<LegislationItem>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LegislationSection {
    pub number: String,
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SectionsResponse {
    pub sections: Vec<LegislationSection>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FullTextResponse {
    pub text: String,
    pub found: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SectionSearchResult {
    pub legislation_id: String,
    pub legislation_title: String,
    pub legislation_year: u32,
    pub section_number: String,
    pub excerpt: String,
    pub uri: String,
}

impl SectionSearchResult {
    /// §4.5 enrichment flags provisions predating 1963 as historical.
    pub fn is_historical(&self) -> bool {
        self.legislation_year != 0 && self.legislation_year < 1963
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SectionSearchResponse {
    pub results: Vec<SectionSearchResult>,
    pub verified: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Amendment {
    pub description: String,
    pub effective_date: Option<String>,
    pub amending_title: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AmendmentsResponse {
    pub amendments: Vec<Amendment>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ExplanatoryNote {
    pub heading: String,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ExplanatoryNotesResponse {
    pub notes: Vec<ExplanatoryNote>,
}

/// The dataset-statistics snapshot (§4.3 change detection).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct DatasetStatistics {
    pub total_items: u64,
    pub collections: std::collections::BTreeMap<String, u64>,
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct HealthCheckResponse {
    pub status: String,
}
