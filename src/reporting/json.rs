//! # JSON Reporting Module / JSON 报告模块
//!
//! A machine-readable summary for CI dashboards and follow-up jobs.
//!
//! 供 CI 仪表板和后续作业使用的机器可读摘要。

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::core::models::{CellOutcome, CellState, MatrixSummary, PublishStatus};
use crate::infra::t;

#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub generated_at: DateTime<Utc>,
    pub success: bool,
    pub total: usize,
    pub passed: usize,
    pub cells: Vec<JsonCell>,
}

#[derive(Debug, Serialize)]
pub struct JsonCell {
    pub id: String,
    pub os: String,
    pub interpreter_version: String,
    pub variant: String,
    pub state: CellState,
    pub history: Vec<CellState>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests_passed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<PublishStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<JsonFailure>,
    pub duration_secs: f64,
}

#[derive(Debug, Serialize)]
pub struct JsonFailure {
    pub stage: CellState,
    pub kind: &'static str,
    pub message: String,
}

impl From<&CellOutcome> for JsonCell {
    fn from(outcome: &CellOutcome) -> Self {
        Self {
            id: outcome.cell.id(),
            os: outcome.cell.os.to_string(),
            interpreter_version: outcome.cell.interpreter_version.to_string(),
            variant: outcome.cell.variant.to_string(),
            state: outcome.final_state(),
            history: outcome.history.clone(),
            success: outcome.is_success(),
            manifest: outcome
                .environment
                .as_ref()
                .map(|env| env.manifest_path.display().to_string()),
            tests_passed: outcome.report.as_ref().map(|r| r.passed),
            exit_code: outcome.report.as_ref().and_then(|r| r.exit_code),
            publish: outcome.publish.clone(),
            failure: outcome.failure.as_ref().map(|f| JsonFailure {
                stage: f.stage,
                kind: f.error.kind(),
                message: f.error.to_string(),
            }),
            duration_secs: outcome.duration.as_secs_f64(),
        }
    }
}

/// Builds the JSON view of a summary.
/// 构建摘要的 JSON 视图。
pub fn build_json_report(summary: &MatrixSummary) -> JsonReport {
    JsonReport {
        generated_at: Utc::now(),
        success: summary.is_success(),
        total: summary.outcomes.len(),
        passed: summary.passed_count(),
        cells: summary.outcomes.iter().map(JsonCell::from).collect(),
    }
}

pub fn write_json_report(summary: &MatrixSummary, output_path: &Path) -> Result<()> {
    let report = build_json_report(summary);
    let content = serde_json::to_string_pretty(&report)?;
    fs::write(output_path, content)
        .with_context(|| t!("report.write_failed", path = output_path.display()).to_string())
}
