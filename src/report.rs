//! Structured run report for downstream tool consumption.
//!
//! Written as `<freq_name>_report.json` next to the generated files when
//! requested, describing where the tables came from and what they contain.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::GenerationSummary;
use crate::output::OutputFormat;

/// Complete report of a generation run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Tool version
    pub version: String,
    /// Timestamp of run (RFC 3339)
    pub timestamp: String,
    pub freq_name: String,

    pub input: InputInfo,
    pub output: OutputInfo,

    /// Population strata written to the metadata file
    pub strata: Vec<StratumInfo>,

    pub statistics: Statistics,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputInfo {
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputInfo {
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<String>,
    pub precision: usize,
    pub frequencies: String,
    pub metadata: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StratumInfo {
    pub name: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub rows: u64,
    pub distinct_sets: usize,
    pub empty_rows: usize,
    pub blank_a_rows: usize,
    pub blank_b_rows: usize,
}

impl From<&GenerationSummary> for Statistics {
    fn from(s: &GenerationSummary) -> Self {
        Statistics {
            rows: s.rows,
            distinct_sets: s.distinct_sets,
            empty_rows: s.empty_rows,
            blank_a_rows: s.blank_a_rows,
            blank_b_rows: s.blank_b_rows,
        }
    }
}

impl RunReport {
    /// Path of the report for `freq_name` inside `dir`.
    pub fn path_for(dir: &Path, freq_name: &str) -> PathBuf {
        dir.join(format!("{freq_name}_report.json"))
    }

    /// Write the report as JSON into `dir`, returning the written path.
    pub fn write(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let report_path = Self::path_for(dir, &self.freq_name);

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        std::fs::write(&report_path, json)?;
        tracing::info!("Wrote run report to {}", report_path.display());

        Ok(report_path)
    }
}

/// Builder for constructing a RunReport once the tables are written.
#[derive(Debug, Default)]
pub struct RunReportBuilder {
    pub freq_name: String,
    pub input_path: String,
    pub format: OutputFormat,
    pub template_dir: Option<String>,
    pub precision: usize,
}

impl RunReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(self, summary: &GenerationSummary) -> RunReport {
        let now = time::OffsetDateTime::now_utc();
        let timestamp = now
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());

        RunReport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp,
            freq_name: self.freq_name,
            input: InputInfo {
                path: self.input_path,
            },
            output: OutputInfo {
                format: self.format.name().to_string(),
                template_dir: self.template_dir,
                precision: self.precision,
                frequencies: summary.frequency_path.display().to_string(),
                metadata: summary.metadata_path.display().to_string(),
            },
            strata: vec![StratumInfo {
                name: crate::generate::DEFAULT_STRATUM.to_string(),
                weight: 1.0,
            }],
            statistics: Statistics::from(summary),
        }
    }
}
