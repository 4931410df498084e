//! Normalized domain types shared by the loader and the dispatcher.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

use crate::error::CommenterError;
use crate::trivy;

/// Severity of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Unknown,
}

impl From<&str> for Severity {
    fn from(raw: &str) -> Self {
        match raw.to_uppercase().as_str() {
            "CRITICAL" => Severity::Critical,
            "HIGH" => Severity::High,
            "MEDIUM" => Severity::Medium,
            "LOW" => Severity::Low,
            _ => Severity::Unknown,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Unknown => "UNKNOWN",
        };
        write!(f, "{}", label)
    }
}

/// A concrete file + line range where a finding applies.
///
/// Paths are workspace-relative as reported by the scanner; normalization
/// against the diff happens in the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub path: String,
    pub start_line: u32,
    pub end_line: u32,
}

/// One reported issue, uniform across the supported report shapes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Rule or vulnerability ID; informational, may be empty
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub primary_url: Option<String>,
    pub references: Vec<String>,
    /// Empty for package-level findings, which are not commentable
    pub locations: Vec<Location>,
}

impl Finding {
    fn from_misconfiguration(target: &str, misconfiguration: trivy::Misconfiguration) -> Self {
        let mut locations = Vec::new();
        if let Some(occurrences) = &misconfiguration.occurrences {
            for occurrence in occurrences {
                let Some(range) = &occurrence.location else {
                    continue;
                };
                let Some(start_line) = range.start_line else {
                    continue;
                };
                let path = if occurrence.filename.is_empty() {
                    target.to_string()
                } else {
                    occurrence.filename.clone()
                };
                locations.push(Location {
                    path,
                    start_line,
                    end_line: range.end_line.unwrap_or(start_line),
                });
            }
        }
        if locations.is_empty() {
            if let Some(cause) = &misconfiguration.cause_metadata {
                if let Some(start_line) = cause.start_line {
                    locations.push(Location {
                        path: target.to_string(),
                        start_line,
                        end_line: cause.end_line.unwrap_or(start_line),
                    });
                }
            }
        }

        let severity = misconfiguration
            .severity
            .as_deref()
            .map(Severity::from)
            .unwrap_or(Severity::Unknown);
        let title = misconfiguration.title.unwrap_or_default();
        let description = misconfiguration
            .message
            .or(misconfiguration.description)
            .unwrap_or_else(|| title.clone());

        Finding {
            id: misconfiguration.id,
            title,
            description,
            severity,
            primary_url: misconfiguration.primary_url,
            references: misconfiguration.references,
            locations,
        }
    }

    fn from_vulnerability(vulnerability: trivy::Vulnerability) -> Self {
        let severity = vulnerability
            .severity
            .as_deref()
            .map(Severity::from)
            .unwrap_or(Severity::Unknown);
        let title = vulnerability.title.unwrap_or_default();
        let description = vulnerability
            .description
            .unwrap_or_else(|| title.clone());

        Finding {
            id: vulnerability.vulnerability_id,
            title,
            description,
            severity,
            primary_url: vulnerability.primary_url,
            references: vulnerability.references,
            // package-level, no line anchor
            locations: Vec::new(),
        }
    }
}

/// Derived, ephemeral request handed to the review-comment client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRequest {
    pub path: String,
    pub body: String,
    pub start_line: u32,
    pub end_line: u32,
}

/// A decoded scan report, uniform regardless of the input shape
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub findings: Vec<Finding>,
}

impl ScanReport {
    /// Loads a report from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        debug!("loading trivy report from {}", path.display());
        let content = std::fs::read_to_string(path)
            .map_err(|err| CommenterError::ReportNotFound(format!("{}: {}", path.display(), err)))?;
        Self::from_json(&content)
    }

    /// Decodes a report from a JSON string, selecting the parser by the
    /// detected document shape
    pub fn from_json(content: &str) -> crate::Result<Self> {
        let document: serde_json::Value = serde_json::from_str(content)
            .map_err(|err| CommenterError::ReportMalformed(err.to_string()))?;

        match trivy::ReportFormat::detect(&document) {
            Some(trivy::ReportFormat::Nested) => {
                let report: trivy::Report = serde_json::from_value(document)
                    .map_err(|err| CommenterError::ReportMalformed(err.to_string()))?;
                Ok(Self::from_results(report.results.unwrap_or_default()))
            }
            Some(trivy::ReportFormat::LegacyFlat) => {
                let results: Vec<trivy::ScanResult> = serde_json::from_value(document)
                    .map_err(|err| CommenterError::ReportMalformed(err.to_string()))?;
                Ok(Self::from_results(results))
            }
            None => Err(CommenterError::ReportMalformed(
                "document is neither a Results report nor a flat result list".to_string(),
            )),
        }
    }

    fn from_results(results: Vec<trivy::ScanResult>) -> Self {
        let mut findings = Vec::new();
        for result in results {
            let target = result.target;
            // every misconfiguration is processed, not just the first per result
            for misconfiguration in result.misconfigurations.unwrap_or_default() {
                findings.push(Finding::from_misconfiguration(&target, misconfiguration));
            }
            for vulnerability in result.vulnerabilities.unwrap_or_default() {
                findings.push(Finding::from_vulnerability(vulnerability));
            }
        }
        ScanReport { findings }
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Counts findings of the given severity
    pub fn count_severity(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|finding| finding.severity == severity)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const NESTED_REPORT: &str = r#"{
        "SchemaVersion": 2,
        "Results": [
            {
                "Target": "main.tf",
                "Class": "config",
                "Type": "terraform",
                "Misconfigurations": [
                    {
                        "ID": "AVD-AWS-0107",
                        "Title": "Ingress open to the world",
                        "Message": "Security group rule allows ingress from public internet.",
                        "Severity": "CRITICAL",
                        "PrimaryURL": "https://avd.aquasec.com/misconfig/avd-aws-0107",
                        "References": ["https://avd.aquasec.com/misconfig/avd-aws-0107"],
                        "CauseMetadata": {"StartLine": 14, "EndLine": 22}
                    },
                    {
                        "ID": "AVD-AWS-0124",
                        "Title": "Missing egress description",
                        "Severity": "LOW",
                        "CauseMetadata": {"StartLine": 30}
                    }
                ]
            },
            {
                "Target": "Cargo.lock",
                "Class": "lang-pkgs",
                "Type": "cargo",
                "Vulnerabilities": [
                    {
                        "VulnerabilityID": "CVE-2024-0001",
                        "PkgName": "acme",
                        "InstalledVersion": "0.1.0",
                        "Severity": "HIGH"
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_nested_report_all_misconfigurations() {
        let report = ScanReport::from_json(NESTED_REPORT).unwrap();
        assert_eq!(report.len(), 3);

        let first = &report.findings[0];
        assert_eq!(first.id, "AVD-AWS-0107");
        assert_eq!(first.severity, Severity::Critical);
        assert_eq!(
            first.description,
            "Security group rule allows ingress from public internet."
        );
        assert_eq!(
            first.locations,
            vec![Location {
                path: "main.tf".to_string(),
                start_line: 14,
                end_line: 22
            }]
        );

        // missing EndLine collapses to a single-line range
        let second = &report.findings[1];
        assert_eq!(second.locations[0].start_line, 30);
        assert_eq!(second.locations[0].end_line, 30);
        // no Message falls back to the title
        assert_eq!(second.description, "Missing egress description");
    }

    #[test]
    fn test_vulnerabilities_have_no_locations() {
        let report = ScanReport::from_json(NESTED_REPORT).unwrap();
        let vulnerability = &report.findings[2];
        assert_eq!(vulnerability.id, "CVE-2024-0001");
        assert_eq!(vulnerability.severity, Severity::High);
        assert!(vulnerability.locations.is_empty());
    }

    #[test]
    fn test_occurrences_fan_out() {
        let raw = r#"{
            "Results": [
                {
                    "Target": "deploy",
                    "Misconfigurations": [
                        {
                            "ID": "KSV001",
                            "Severity": "MEDIUM",
                            "Occurrences": [
                                {"Filename": "deploy/app.yaml", "Location": {"StartLine": 3, "EndLine": 9}},
                                {"Filename": "deploy/job.yaml", "Location": {"StartLine": 12}}
                            ]
                        }
                    ]
                }
            ]
        }"#;

        let report = ScanReport::from_json(raw).unwrap();
        assert_eq!(report.len(), 1);
        let locations = &report.findings[0].locations;
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].path, "deploy/app.yaml");
        assert_eq!(locations[1].path, "deploy/job.yaml");
        assert_eq!(locations[1].end_line, 12);
    }

    #[test]
    fn test_legacy_flat_report() {
        let raw = r#"[
            {
                "Target": "package-lock.json",
                "Vulnerabilities": [
                    {"VulnerabilityID": "CVE-2023-1234", "Severity": "MEDIUM"}
                ]
            }
        ]"#;

        let report = ScanReport::from_json(raw).unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report.findings[0].id, "CVE-2023-1234");
    }

    #[test]
    fn test_empty_and_null_results() {
        let report = ScanReport::from_json(r#"{"Results": []}"#).unwrap();
        assert!(report.is_empty());

        let report = ScanReport::from_json(r#"{"SchemaVersion": 2, "Results": null}"#).unwrap();
        assert!(report.is_empty());

        let report = ScanReport::from_json("[]").unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_malformed_report() {
        assert!(matches!(
            ScanReport::from_json("not json"),
            Err(CommenterError::ReportMalformed(_))
        ));
        assert!(matches!(
            ScanReport::from_json(r#"{"foo": "bar"}"#),
            Err(CommenterError::ReportMalformed(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ScanReport::from_json_file("/nonexistent/report.json"),
            Err(CommenterError::ReportNotFound(_))
        ));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", NESTED_REPORT).unwrap();
        let report = ScanReport::from_json_file(file.path()).unwrap();
        assert_eq!(report.len(), 3);
        assert_eq!(report.count_severity(Severity::Critical), 1);
        assert_eq!(report.count_severity(Severity::High), 1);
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(Severity::from("CRITICAL"), Severity::Critical);
        assert_eq!(Severity::from("high"), Severity::High);
        assert_eq!(Severity::from("Medium"), Severity::Medium);
        assert_eq!(Severity::from("LOW"), Severity::Low);
        assert_eq!(Severity::from("bogus"), Severity::Unknown);
        assert_eq!(Severity::Critical.to_string(), "CRITICAL");
    }
}
