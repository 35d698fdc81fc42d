//! # Cell Execution Engine Module / 单元执行引擎模块
//!
//! This module drives each cell through its lifecycle, from environment
//! selection to the coverage upload, and runs the whole matrix with bounded
//! concurrency. Cells never cancel each other: a failure stays with the cell
//! that produced it.
//!
//! 此模块驱动每个单元走完其生命周期（从环境选择到覆盖率上传），
//! 并以有界并发运行整个矩阵。单元之间从不互相取消：失败只属于产生它的单元。

use colored::*;
use futures::{StreamExt, stream};
use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::core::config::{LicenseConfig, Orchestration};
use crate::core::errors::{CellError, ConfigError, ProvisionError, ProvisionStep};
use crate::core::harness::run_and_report;
use crate::core::license::{materialize_license, verify_capability};
use crate::core::models::{
    CellFailure, CellOutcome, CellState, EnvironmentSpec, MatrixCell, MatrixSummary,
    PublishStatus, TestReport,
};
use crate::core::provision::Provisioner;
use crate::core::selector::select_environment;
use crate::infra::executor::Executor;
use crate::infra::fs::create_cell_workdir;
use crate::infra::t;

/// Everything a cell needs besides the cell itself. Shared read-only by all
/// cells of a run.
///
/// 单元自身之外所需的一切。在一次运行的所有单元之间只读共享。
pub struct CellContext {
    pub orchestration: Orchestration,
    pub executor: Arc<dyn Executor>,
    /// Absolute path of the project under test.
    pub project_root: PathBuf,
    /// The license secret from the trigger environment.
    pub secret: Option<String>,
    /// Parent for the per-cell work directories; the system temp dir when `None`.
    pub workdir_base: Option<PathBuf>,
}

/// Records state transitions and prints one progress line for each.
struct CellTracker {
    id: String,
    history: Vec<CellState>,
    started: Instant,
}

impl CellTracker {
    fn new(cell: &MatrixCell) -> Self {
        Self {
            id: cell.id(),
            history: vec![CellState::Pending],
            started: Instant::now(),
        }
    }

    fn current(&self) -> CellState {
        self.history.last().copied().unwrap_or(CellState::Pending)
    }

    fn enter(&mut self, next: CellState) {
        debug_assert!(
            self.current().can_transition_to(next),
            "illegal transition {} -> {}",
            self.current(),
            next
        );
        self.history.push(next);

        let line = t!("cell.state", cell = &self.id, state = next.as_str());
        match next {
            CellState::Reported => println!("{}", line.green()),
            CellState::Failed => println!("{}", line.red()),
            _ => println!("{}", line.blue()),
        }
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// What a cell collected on its way, kept even if a later step fails.
#[derive(Default)]
struct Progress {
    environment: Option<EnvironmentSpec>,
    report: Option<TestReport>,
    publish: Option<PublishStatus>,
}

/// Runs one cell to a terminal state. Never returns an error: every failure
/// ends up in the outcome, tagged with the state it happened in.
///
/// 将单个单元运行至终止状态。从不返回错误：每个失败都记录在结果中，
/// 并标注其发生时所处的状态。
pub async fn run_cell(cell: MatrixCell, ctx: &CellContext) -> CellOutcome {
    let mut tracker = CellTracker::new(&cell);
    let mut progress = Progress::default();

    let result = drive(&cell, ctx, &mut tracker, &mut progress).await;

    let failure = match result {
        Ok(()) => None,
        Err(error) => {
            let stage = tracker.current();
            println!(
                "{}",
                t!(
                    "cell.failed",
                    cell = &tracker.id,
                    stage = stage.as_str(),
                    kind = error.kind(),
                    error = error.to_string()
                )
                .red()
            );
            tracker.enter(CellState::Failed);
            Some(CellFailure { stage, error })
        }
    };

    CellOutcome {
        duration: tracker.elapsed(),
        cell,
        history: tracker.history,
        environment: progress.environment,
        report: progress.report,
        publish: progress.publish,
        failure,
    }
}

async fn drive(
    cell: &MatrixCell,
    ctx: &CellContext,
    tracker: &mut CellTracker,
    progress: &mut Progress,
) -> Result<(), CellError> {
    let orchestration = &ctx.orchestration;
    let config = &orchestration.config;
    let executor = ctx.executor.as_ref();

    let spec = select_environment(
        &orchestration.environments,
        cell.variant.as_str(),
        &cell.interpreter_version,
    )?;
    progress.environment = Some(spec.clone());

    tracker.enter(CellState::Provisioning);
    let workdir = create_cell_workdir(ctx.workdir_base.as_deref(), &tracker.id).map_err(|e| {
        ProvisionError {
            step: ProvisionStep::CreateWorkdir,
            cause: e.to_string(),
        }
    })?;
    let provisioner = Provisioner {
        executor,
        commands: &orchestration.commands,
        license: &config.license,
        tests: &config.tests,
        project_root: &ctx.project_root,
    };
    let env = provisioner.provision(cell, &spec, workdir).await?;

    tracker.enter(CellState::Verifying);
    match ctx.secret.as_deref() {
        Some(secret) => materialize_license(secret, &env.layout.license_file)?,
        None if spec.requires_capability => {
            return Err(ConfigError::MissingSecret(config.license.secret_env.clone()).into());
        }
        None => println!(
            "{}",
            t!(
                "cell.secret_absent",
                cell = &tracker.id,
                var = &config.license.secret_env
            )
            .yellow()
        ),
    }
    if spec.requires_capability {
        verify_capability(executor, &env, &orchestration.commands.capability_probe).await?;
    } else {
        println!(
            "{}",
            t!("cell.capability_not_required", cell = &tracker.id).dimmed()
        );
    }

    tracker.enter(CellState::Testing);
    let outcome = run_and_report(
        executor,
        &env,
        &orchestration.commands,
        &config.tests,
        &config.publish,
    )
    .await?;

    let report = outcome.report;
    if !report.output.trim().is_empty() {
        println!("{}", report.output.trim());
    }
    let duration = report.duration.as_secs_f64();
    if report.passed {
        println!(
            "{}",
            t!("cell.tests_passed", cell = &tracker.id, duration = format!("{duration:.2}")).green()
        );
    } else {
        println!(
            "{}",
            t!("cell.tests_failed", cell = &tracker.id, duration = format!("{duration:.2}")).red()
        );
    }
    progress.report = Some(report);

    let status = outcome.publish?;
    if let PublishStatus::FailedAdvisory(reason) = &status {
        println!(
            "{}",
            t!("cell.publish_advisory", cell = &tracker.id, reason = reason).yellow()
        );
    }
    progress.publish = Some(status);

    tracker.enter(CellState::Reported);
    Ok(())
}

/// An outcome for a cell whose task never reported back. The state it had
/// reached is unknown, so only `Pending -> Failed` is recorded.
fn abandoned(cell: MatrixCell, error: CellError) -> CellOutcome {
    CellOutcome {
        cell,
        history: vec![CellState::Pending, CellState::Failed],
        environment: None,
        report: None,
        publish: None,
        failure: Some(CellFailure {
            stage: CellState::Pending,
            error,
        }),
        duration: Duration::default(),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// The number of cells that may run at once. A fixed license destination is
/// one file for every cell, so such a run is limited to a single cell.
///
/// 可同时运行的单元数。固定的许可证目标路径是所有单元共用的同一个文件，
/// 因此这样的运行一次只能运行一个单元。
pub fn effective_jobs(requested: usize, cell_count: usize, license: &LicenseConfig) -> usize {
    let jobs = requested.max(1);
    match &license.destination {
        Some(path) if jobs > 1 && cell_count > 1 => {
            println!(
                "{}",
                t!("run.shared_license_serialized", path = path.display()).yellow()
            );
            1
        }
        _ => jobs,
    }
}

/// Runs every cell, at most `jobs` at a time, and returns their outcomes in
/// the order the cells were given.
///
/// Fail-fast is disabled: a failed or panicking cell does not stop its
/// siblings. Cancelling `stop` aborts the cells still running; they end
/// `Failed` with [`CellError::Interrupted`].
///
/// 运行所有单元，最多同时运行 `jobs` 个，并按给定单元的顺序返回结果。
/// 快速失败被禁用：失败或 panic 的单元不会停止其他单元。
/// 取消 `stop` 会中止仍在运行的单元；它们以 [`CellError::Interrupted`] 结束于 `Failed`。
pub async fn run_matrix(
    cells: Vec<MatrixCell>,
    ctx: Arc<CellContext>,
    jobs: usize,
    stop: CancellationToken,
) -> MatrixSummary {
    let jobs = effective_jobs(jobs, cells.len(), &ctx.orchestration.config.license);
    let mut outcomes: Vec<(usize, CellOutcome)> =
        stream::iter(cells.into_iter().enumerate().map(|(index, cell)| {
            let ctx = Arc::clone(&ctx);
            let stop = stop.clone();
            async move {
                if stop.is_cancelled() {
                    return (index, abandoned(cell, CellError::Interrupted));
                }

                let task_cell = cell.clone();
                let mut handle = tokio::spawn(async move { run_cell(task_cell, &ctx).await });

                let outcome = tokio::select! {
                    biased;
                    _ = stop.cancelled() => {
                        handle.abort();
                        abandoned(cell, CellError::Interrupted)
                    }
                    res = &mut handle => match res {
                        Ok(outcome) => outcome,
                        Err(e) if e.is_panic() => {
                            abandoned(cell, CellError::Panicked(panic_message(e.into_panic())))
                        }
                        Err(_) => abandoned(cell, CellError::Interrupted),
                    },
                };
                (index, outcome)
            }
        }))
        .buffer_unordered(jobs)
        .collect()
        .await;

    outcomes.sort_by_key(|(index, _)| *index);
    MatrixSummary {
        outcomes: outcomes.into_iter().map(|(_, outcome)| outcome).collect(),
    }
}
