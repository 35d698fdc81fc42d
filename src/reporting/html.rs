//! # HTML Reporting Module / HTML 报告模块
//!
//! This module renders the matrix summary as a single self-contained HTML
//! page with `maud`: totals, one row per cell and a collapsible error detail
//! for every failed cell.
//!
//! 此模块使用 `maud` 将矩阵摘要渲染为单个自包含的 HTML 页面：
//! 汇总统计、每个单元一行，以及每个失败单元可折叠的错误详情。

use anyhow::{Context, Result};
use chrono::Local;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::Path;

use crate::core::models::MatrixSummary;
use crate::infra::t;
use crate::reporting::console::{detail_line, status_label};

/// Embedded CSS styles for HTML reports / HTML 报告的嵌入式 CSS 样式
const HTML_STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 2em; color: #24292e; }
h1 { font-size: 1.6em; }
.generated { color: #6a737d; font-size: 0.9em; }
.summary-container { display: flex; gap: 1.5em; margin: 1.5em 0; }
.summary-item { display: flex; flex-direction: column; align-items: center; padding: 0.8em 1.4em; border: 1px solid #e1e4e8; border-radius: 6px; }
.summary-item .count { font-size: 1.8em; font-weight: 600; }
.passed-text { color: #22863a; }
.failed-text { color: #cb2431; }
table { border-collapse: collapse; width: 100%; }
th, td { text-align: left; padding: 0.5em 0.8em; border-bottom: 1px solid #e1e4e8; }
.status-cell { display: inline-block; padding: 0.15em 0.6em; border-radius: 4px; font-weight: 600; }
.status-Passed { background: #dcffe4; color: #22863a; }
.status-Tests-Failed { background: #fff5b1; color: #735c0f; }
.status-Failed { background: #ffeef0; color: #cb2431; }
.duration-cell { text-align: right; font-variant-numeric: tabular-nums; }
details summary { cursor: pointer; color: #0366d6; }
pre.output-content { background: #f6f8fa; padding: 1em; overflow-x: auto; white-space: pre-wrap; }
"#;

fn render(summary: &MatrixSummary) -> Markup {
    let total = summary.outcomes.len();
    let passed = summary.passed_count();
    let failed = total - passed;

    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (t!("html_report.title")) }
                style { (PreEscaped(HTML_STYLE)) }
            }
            body {
                h1 { (t!("html_report.main_header")) }
                p class="generated" {
                    (t!("html_report.generated_at", time = Local::now().format("%Y-%m-%d %H:%M:%S")))
                }
                div class="summary-container" {
                    div class="summary-item" {
                        span class="count" { (total) }
                        span class="label" { (t!("html_report.summary.total")) }
                    }
                    div class="summary-item" {
                        span class="count passed-text" { (passed) }
                        span class="label" { (t!("html_report.summary.passed")) }
                    }
                    div class="summary-item" {
                        span class="count failed-text" { (failed) }
                        span class="label" { (t!("html_report.summary.failed")) }
                    }
                }
                table {
                    thead {
                        tr {
                            th { (t!("html_report.table.cell")) }
                            th { (t!("html_report.table.environment")) }
                            th { (t!("html_report.table.status")) }
                            th class="duration-cell" { (t!("html_report.table.duration")) }
                            th { (t!("html_report.table.detail")) }
                        }
                    }
                    tbody {
                        @for outcome in &summary.outcomes {
                            tr {
                                td { (outcome.cell.id()) }
                                td {
                                    @if let Some(env) = &outcome.environment {
                                        (env.manifest_path.display().to_string())
                                    }
                                }
                                td {
                                    div class={ "status-cell " (outcome.status_class()) } {
                                        (status_label(outcome))
                                    }
                                }
                                td class="duration-cell" {
                                    (format!("{:.2}s", outcome.duration.as_secs_f64()))
                                }
                                td {
                                    (detail_line(outcome))
                                    @if let Some(failure) = &outcome.failure {
                                        details {
                                            summary { (t!("html_report.toggle_output")) }
                                            pre class="output-content" { (failure.error.to_string()) }
                                        }
                                    } @else if let Some(report) = outcome.report.as_ref().filter(|r| !r.passed) {
                                        details {
                                            summary { (t!("html_report.toggle_output")) }
                                            pre class="output-content" { (report.output) }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Generates an HTML report for the matrix summary and writes it to `output_path`.
///
/// 为矩阵摘要生成 HTML 报告并写入 `output_path`。
///
/// # Errors / 错误
/// Returns an error if the output file cannot be written.
/// 如果无法写入输出文件则返回错误。
pub fn generate_html_report(summary: &MatrixSummary, output_path: &Path) -> Result<()> {
    let page = render(summary).into_string();
    fs::write(output_path, page)
        .with_context(|| t!("report.write_failed", path = output_path.display()).to_string())
}
