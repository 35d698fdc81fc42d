//! # Test Runner & Reporter / 测试运行与报告
//!
//! Runs the suite once with coverage enabled and forwards the coverage report.
//! The important distinction here is between tests that ran and failed, which
//! is a [`TestReport`] with `passed: false`, and a harness that could not do
//! its job, which is a [`RunError`].
//!
//! 在启用覆盖率的情况下运行一次测试套件，并转发覆盖率报告。
//! 这里的关键区别在于：测试已运行但失败是 `passed: false` 的 [`TestReport`]，
//! 而测试框架无法完成工作则是 [`RunError`]。

use std::fs;
use std::io::ErrorKind;
use std::time::Instant;

use crate::core::config::{CommandSet, PublishConfig, TestsConfig};
use crate::core::errors::{PublishError, RunError};
use crate::core::models::{PublishStatus, TestReport};
use crate::core::provision::ProvisionedEnvironment;
use crate::infra::command::{CommandTemplate, tail_lines};
use crate::infra::executor::{Executor, ToolStep};

const CRASH_TAIL_LINES: usize = 40;

/// Runs the test suite inside `env`.
///
/// Exit code 0 means the tests passed; an exit code listed in
/// `tests.failure_exit_codes` means they ran and some failed. Any other exit
/// status, a signal, or a command that cannot be started is a [`RunError`],
/// as is a run that leaves no coverage report behind.
///
/// 在 `env` 中运行测试套件。
/// 退出码 0 表示测试通过；`tests.failure_exit_codes` 中列出的退出码表示测试已运行但有失败。
/// 任何其他退出状态、信号终止或无法启动的命令都是 [`RunError`]，
/// 未留下覆盖率报告的运行同样如此。
pub async fn run_tests(
    executor: &dyn Executor,
    env: &ProvisionedEnvironment,
    template: &CommandTemplate,
    tests: &TestsConfig,
) -> Result<TestReport, RunError> {
    let coverage_file = env.layout.coverage_file.clone();

    // A report left over from an earlier run must not count for this one.
    match fs::remove_file(&coverage_file) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            return Err(RunError::SpawnFailed(format!(
                "cannot clear stale coverage report {}: {e}",
                coverage_file.display()
            )));
        }
    }

    let command = env
        .command(ToolStep::RunTests, template)
        .map_err(|e| RunError::SpawnFailed(e.to_string()))?;

    let start = Instant::now();
    let output = executor
        .execute(&command)
        .await
        .map_err(|e| RunError::SpawnFailed(format!("{}: {e}", command.program)))?;
    let duration = start.elapsed();

    let passed = match output.exit_code {
        Some(0) => true,
        Some(code) if tests.failure_exit_codes.contains(&code) => false,
        code => {
            return Err(RunError::HarnessCrashed {
                code,
                output: tail_lines(&output.output, CRASH_TAIL_LINES),
            });
        }
    };

    if !coverage_file.is_file() {
        return Err(RunError::MissingCoverage(coverage_file));
    }

    Ok(TestReport {
        passed,
        coverage_file,
        exit_code: output.exit_code,
        output: output.output,
        duration,
    })
}

/// Uploads the coverage report of `report`. Runs regardless of whether the
/// tests passed.
///
/// With no publish command configured the upload is [`PublishStatus::Skipped`].
/// A failed upload is a [`PublishError`] when `policy.fail_run_on_error` is set
/// and [`PublishStatus::FailedAdvisory`] otherwise.
///
/// 上传 `report` 的覆盖率报告。无论测试是否通过都会执行。
/// 未配置发布命令时为 [`PublishStatus::Skipped`]。
/// 上传失败时，若设置了 `policy.fail_run_on_error` 则为 [`PublishError`]，
/// 否则为 [`PublishStatus::FailedAdvisory`]。
pub async fn publish_report(
    executor: &dyn Executor,
    env: &ProvisionedEnvironment,
    report: &TestReport,
    template: Option<&CommandTemplate>,
    policy: &PublishConfig,
) -> Result<PublishStatus, PublishError> {
    let Some(template) = template else {
        return Ok(PublishStatus::Skipped);
    };

    let failure = match upload(executor, env, template).await {
        Ok(()) => return Ok(PublishStatus::Published),
        Err(reason) => format!("{} ({})", reason, report.coverage_file.display()),
    };

    if policy.fail_run_on_error {
        Err(PublishError::UploadFailed(failure))
    } else {
        Ok(PublishStatus::FailedAdvisory(failure))
    }
}

async fn upload(
    executor: &dyn Executor,
    env: &ProvisionedEnvironment,
    template: &CommandTemplate,
) -> Result<(), String> {
    let command = env
        .command(ToolStep::Publish, template)
        .map_err(|e| e.to_string())?;
    let output = executor
        .execute(&command)
        .await
        .map_err(|e| format!("{}: {e}", command.program))?;
    if output.success() {
        Ok(())
    } else {
        Err(format!(
            "`{}` exited with {:?}: {}",
            command.line(),
            output.exit_code,
            tail_lines(&output.output, 5)
        ))
    }
}

/// A finished test run together with what happened to its upload.
/// 已完成的测试运行及其上传结果。
#[derive(Debug)]
pub struct ReportOutcome {
    pub report: TestReport,
    pub publish: Result<PublishStatus, PublishError>,
}

/// Runs the tests, then publishes their coverage.
///
/// A [`RunError`] stops here and nothing is published. Otherwise the report
/// is kept even when the upload fails, so the caller can still show it.
///
/// 运行测试，然后发布其覆盖率。
/// 出现 [`RunError`] 时在此停止且不发布任何内容。
/// 否则即使上传失败也会保留报告，以便调用方仍可展示。
pub async fn run_and_report(
    executor: &dyn Executor,
    env: &ProvisionedEnvironment,
    commands: &CommandSet,
    tests: &TestsConfig,
    policy: &PublishConfig,
) -> Result<ReportOutcome, RunError> {
    let report = run_tests(executor, env, &commands.run_tests, tests).await?;
    let publish = publish_report(executor, env, &report, commands.publish.as_ref(), policy).await;
    Ok(ReportOutcome { report, publish })
}
