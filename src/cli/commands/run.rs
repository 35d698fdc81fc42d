//! # Run Command Module / 运行命令模块
//!
//! This module implements the `run` command, which executes every cell of the
//! matrix that belongs to this host (and to this runner, when sharded).
//!
//! 此模块实现了 `run` 命令，执行矩阵中属于当前主机
//! （以及分片时属于当前运行器）的所有单元。

use anyhow::Result;
use colored::*;
use std::path::PathBuf;

use crate::cli::commands::{finish, load_and_localize, setup_signal_handler, shell_context};
use crate::core::execution::run_matrix;
use crate::core::models::{MatrixSummary, Os};
use crate::core::planner::{expand_matrix, plan_execution};
use crate::infra::t;

/// Arguments of the `run` command.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Number of cells to run in parallel
    pub jobs: Option<usize>,
    /// Path to the matrix configuration file
    pub config: PathBuf,
    /// Path to the project under test
    pub project_dir: PathBuf,
    /// Total number of distributed runners (for CI)
    pub total_runners: Option<usize>,
    /// Index of this runner (for CI)
    pub runner_index: Option<usize>,
    /// Run cells for every OS instead of only the host's
    pub all_os: bool,
    /// Optional path for the HTML report
    pub html: Option<PathBuf>,
    /// Optional path for the JSON summary
    pub json: Option<PathBuf>,
    /// Language given with `--lang`, which wins over the configuration file
    pub lang_override: Option<String>,
}

/// Executes the run command with the provided arguments.
///
/// # Returns
/// `Ok` iff every cell was reported with passing tests.
pub async fn execute(options: RunOptions) -> Result<()> {
    let (orchestration, config_path) =
        load_and_localize(&options.config, options.lang_override.as_deref())?;
    println!("{}", t!("run.loading_config", path = config_path.display()));

    let cells = expand_matrix(&orchestration.config.matrix)?;
    let host_os = if options.all_os { None } else { Os::current() };
    let plan = plan_execution(cells, host_os, options.total_runners, options.runner_index)?;

    if plan.filtered_os_count > 0 {
        println!(
            "{}",
            t!(
                "run.filtered_os_cells",
                filtered = plan.filtered_os_count,
                os = host_os.map(|os| os.as_str()).unwrap_or("?")
            )
            .cyan()
        );
    }

    if let (Some(total), Some(index)) = (options.total_runners, options.runner_index) {
        println!(
            "{}",
            t!(
                "run.running_as_split_runner",
                index = index + 1,
                total = total,
                count = plan.cells_to_run.len()
            )
            .bold()
        );
    } else {
        println!(
            "{}",
            t!("run.running_as_single_runner", count = plan.cells_to_run.len()).bold()
        );
    }

    if plan.cells_to_run.is_empty() {
        println!("{}", t!("run.no_cells_to_run").green());
        return Ok(());
    }

    let stop = setup_signal_handler();
    let ctx = shell_context(orchestration, &options.project_dir)?;
    let jobs = options.jobs.unwrap_or(num_cpus::get() / 2 + 1);

    let summary: MatrixSummary = run_matrix(plan.cells_to_run, ctx, jobs, stop).await;
    finish(&summary, options.html.as_deref(), options.json.as_deref())
}
