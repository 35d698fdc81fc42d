//! # Console Reporting Module / 控制台报告模块
//!
//! This module prints the end-of-run summary table and the details of every
//! failed cell, with color coding and internationalization support.
//!
//! 此模块打印运行结束时的摘要表格以及每个失败单元的详细信息，
//! 支持颜色编码和国际化。

use colored::*;

use crate::core::errors::{CellError, RunError};
use crate::core::models::{CellOutcome, CellState, MatrixSummary, PublishStatus};
use crate::infra::t;

/// Localized status label of an outcome.
/// 结果的本地化状态标签。
pub fn status_label(outcome: &CellOutcome) -> String {
    match (outcome.final_state(), &outcome.report) {
        (CellState::Reported, Some(report)) if report.passed => t!("report.status.passed"),
        (CellState::Reported, _) => t!("report.status.tests_failed"),
        _ => t!("report.status.failed"),
    }
    .to_string()
}

/// Short description of where and why a cell ended, for the summary table.
/// 单元结束位置及原因的简短描述，用于摘要表格。
pub fn detail_line(outcome: &CellOutcome) -> String {
    if let Some(failure) = &outcome.failure {
        return format!("{} @ {}", failure.error.kind(), failure.stage);
    }
    match &outcome.publish {
        Some(PublishStatus::Published) => t!("report.publish.published").to_string(),
        Some(PublishStatus::FailedAdvisory(_)) => t!("report.publish.advisory").to_string(),
        Some(PublishStatus::Skipped) => t!("report.publish.skipped").to_string(),
        None => String::new(),
    }
}

/// Prints a formatted summary of the matrix to the console.
///
/// # Output Format / 输出格式
/// ```text
/// --- Matrix Summary ---
///   - Passed        | linux-3.7-none                 |      12.31s | coverage published
///   - Tests Failed  | linux-3.7-extra_a              |      10.02s | coverage published
///   - Failed        | macos-3.7-extra_a              |       4.87s | CapabilityError @ VERIFYING
/// ```
pub fn print_summary(summary: &MatrixSummary) {
    println!("\n{}", t!("report.summary_banner").bold());

    for outcome in &summary.outcomes {
        let status = status_label(outcome);
        let status_colored = match (outcome.final_state(), outcome.is_success()) {
            (_, true) => status.green(),
            (CellState::Reported, false) => status.yellow(),
            _ => status.red(),
        };
        let duration_str = format!("{:.2?}", outcome.duration);
        println!(
            "  - {:<14} | {:<30} | {:>10} | {}",
            status_colored,
            outcome.cell.id(),
            duration_str,
            detail_line(outcome)
        );
    }

    println!(
        "\n{}",
        t!(
            "report.totals",
            passed = summary.passed_count(),
            total = summary.outcomes.len()
        )
    );
}

/// Prints detailed information about every cell that did not succeed:
/// the failing state and error, or the test output for cells whose tests
/// ran and failed.
///
/// 打印每个未成功单元的详细信息：失败时所处的状态和错误，
/// 或者对于测试已运行但失败的单元，打印其测试输出。
pub fn print_failure_details(failed: &[&CellOutcome]) {
    if failed.is_empty() {
        return;
    }

    println!("\n{}", t!("report.failure_banner").red().bold());
    println!("{}", "-".repeat(80));

    for (i, outcome) in failed.iter().enumerate() {
        println!(
            "[{}/{}] {} '{}'",
            i + 1,
            failed.len(),
            t!("report.failure_header").red(),
            outcome.cell.id().cyan()
        );

        if let Some(failure) = &outcome.failure {
            println!(
                "  {}: {} ({})",
                t!("report.failed_in"),
                failure.stage,
                failure.error.kind()
            );
            println!("\n{}", failure.error);
            if let CellError::Run(RunError::HarnessCrashed { output, .. }) = &failure.error {
                println!("\n--- {} ---\n", t!("report.harness_log").yellow());
                println!("{output}");
            }
        } else if let Some(report) = &outcome.report {
            println!("\n--- {} ---\n", t!("report.test_log").yellow());
            println!("{}", report.output.trim_end());
        }
        println!("\n{}", "-".repeat(80));
    }
}
