//! JSON run report for the recompute batch.
//!
//! The file is meant for schedulers and dashboards that need per-program status
//! without scraping terminal output.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use crate::app::pipeline::BatchReport;
use crate::error::IndexError;
use crate::io::write_atomic;

#[derive(Debug, Clone, Serialize)]
pub struct BatchReportFile {
    pub tool: String,
    pub pivot: NaiveDate,
    pub index_as_of: Option<NaiveDate>,
    pub succeeded: usize,
    pub failed: usize,
    pub programs: Vec<ProgramEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgramEntry {
    pub program: String,
    pub status: ProgramStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub months: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_month: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_nominal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_adjusted: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<PathBuf>,
}

impl From<&BatchReport> for BatchReportFile {
    fn from(report: &BatchReport) -> Self {
        let programs = report
            .outcomes
            .iter()
            .map(|o| match &o.result {
                Ok(s) => ProgramEntry {
                    program: o.program.clone(),
                    status: ProgramStatus::Ok,
                    error: None,
                    months: Some(s.months),
                    last_month: Some(s.last),
                    last_nominal: Some(s.last_nominal),
                    last_adjusted: s.last_adjusted,
                    outputs: vec![s.real_output.clone(), s.adjusted_output.clone()],
                },
                Err(e) => ProgramEntry {
                    program: o.program.clone(),
                    status: ProgramStatus::Failed,
                    error: Some(e.to_string()),
                    months: None,
                    last_month: None,
                    last_nominal: None,
                    last_adjusted: None,
                    outputs: Vec::new(),
                },
            })
            .collect();

        Self {
            tool: "rwages".to_string(),
            pivot: report.pivot,
            index_as_of: report.index_as_of,
            succeeded: report.succeeded(),
            failed: report.failed(),
            programs,
        }
    }
}

/// Write the batch report as pretty-printed JSON.
pub fn write_report_json(path: &Path, report: &BatchReport) -> Result<(), IndexError> {
    let file = BatchReportFile::from(report);
    let bytes = serde_json::to_vec_pretty(&file)
        .map_err(|e| IndexError::invalid_input(path, format!("failed to encode report JSON: {e}")))?;
    write_atomic(path, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::{ProgramOutcome, ProgramSummary};

    #[test]
    fn report_lists_failures_with_cause() {
        let d = |m| NaiveDate::from_ymd_opt(2024, m, 1).unwrap();
        let report = BatchReport {
            pivot: d(1),
            index_as_of: Some(d(3)),
            outcomes: vec![
                ProgramOutcome {
                    program: "cic".to_string(),
                    result: Ok(ProgramSummary {
                        months: 3,
                        first: d(1),
                        last: d(3),
                        last_nominal: 150.0,
                        last_adjusted: Some(121.0),
                        real_output: PathBuf::from("datos/cic.csv"),
                        adjusted_output: PathBuf::from("datos/cic_ajustado.csv"),
                    }),
                },
                ProgramOutcome {
                    program: "foncyt".to_string(),
                    result: Err(IndexError::InsufficientHistory { found: 1 }),
                },
            ],
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_report_json(&path, &report).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(json["succeeded"], 1);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["pivot"], "2024-01-01");
        assert_eq!(json["programs"][0]["status"], "ok");
        assert_eq!(json["programs"][1]["status"], "failed");
        assert!(json["programs"][1]["error"].as_str().unwrap().contains("two index points"));
        assert!(json["programs"][1].get("outputs").is_none());
    }
}
