//! Raw wire schema for Trivy JSON reports.
//!
//! Two document shapes are accepted: the nested `Results` object emitted by
//! current Trivy releases, and the legacy flat form where the document is a
//! top-level array of result objects. [`ReportFormat::detect`] picks the
//! parser; normalization into domain types lives in [`crate::types`].

use serde::{Deserialize, Serialize};

/// Discriminated report shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// `{"Results": [...]}` object, current Trivy output
    Nested,
    /// Top-level array of result objects, legacy output
    LegacyFlat,
}

impl ReportFormat {
    /// Detects the document shape from its discriminator, without attempting
    /// a full decode
    pub fn detect(document: &serde_json::Value) -> Option<Self> {
        match document {
            serde_json::Value::Array(_) => Some(ReportFormat::LegacyFlat),
            serde_json::Value::Object(map)
                if map.contains_key("Results") || map.contains_key("SchemaVersion") =>
            {
                Some(ReportFormat::Nested)
            }
            _ => None,
        }
    }
}

/// Top-level nested report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "SchemaVersion")]
    pub schema_version: Option<u32>,
    // Trivy emits "Results": null when nothing was found
    #[serde(rename = "Results")]
    pub results: Option<Vec<ScanResult>>,
}

/// One scanned target and its findings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanResult {
    #[serde(default)]
    pub target: String,
    pub class: Option<String>,
    #[serde(rename = "Type")]
    pub scan_type: Option<String>,
    pub vulnerabilities: Option<Vec<Vulnerability>>,
    pub misconfigurations: Option<Vec<Misconfiguration>>,
}

/// A package-level vulnerability entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Vulnerability {
    #[serde(rename = "VulnerabilityID", default)]
    pub vulnerability_id: String,
    pub pkg_name: Option<String>,
    pub installed_version: Option<String>,
    pub fixed_version: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub severity: Option<String>,
    #[serde(rename = "PrimaryURL")]
    pub primary_url: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
}

/// A misconfiguration entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Misconfiguration {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "AVDID")]
    pub avd_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub message: Option<String>,
    pub resolution: Option<String>,
    pub severity: Option<String>,
    #[serde(rename = "PrimaryURL")]
    pub primary_url: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
    pub cause_metadata: Option<CauseMetadata>,
    pub occurrences: Option<Vec<Occurrence>>,
}

/// Line-range metadata for a misconfiguration anchored at the result target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CauseMetadata {
    pub resource: Option<String>,
    pub provider: Option<String>,
    pub service: Option<String>,
    pub start_line: Option<u32>,
    pub end_line: Option<u32>,
}

/// One concrete file + line range where a misconfiguration applies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Occurrence {
    #[serde(default)]
    pub filename: String,
    pub location: Option<LineRange>,
}

/// Inclusive 1-indexed line range
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LineRange {
    pub start_line: Option<u32>,
    pub end_line: Option<u32>,
}
