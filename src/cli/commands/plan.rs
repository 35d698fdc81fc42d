//! # Plan Command Module / 计划命令模块
//!
//! Prints the cells this runner would execute and the environment each one
//! resolves to, without running anything.
//!
//! 打印当前运行器将执行的单元以及每个单元解析得到的环境，不执行任何操作。

use anyhow::Result;
use colored::*;
use std::path::Path;

use crate::cli::commands::load_and_localize;
use crate::core::models::Os;
use crate::core::planner::{expand_matrix, plan_execution};
use crate::infra::t;

pub fn execute(
    config: &Path,
    total_runners: Option<usize>,
    runner_index: Option<usize>,
    all_os: bool,
    lang_override: Option<&str>,
) -> Result<()> {
    let (orchestration, config_path) = load_and_localize(config, lang_override)?;
    println!("{}", t!("run.loading_config", path = config_path.display()));

    let cells = expand_matrix(&orchestration.config.matrix)?;
    let total = cells.len();
    let host_os = if all_os { None } else { Os::current() };
    let plan = plan_execution(cells, host_os, total_runners, runner_index)?;

    println!(
        "\n{}",
        t!("plan.banner", count = plan.cells_to_run.len(), total = total).bold()
    );
    for cell in &plan.cells_to_run {
        let spec = orchestration
            .environments
            .spec_for(cell.variant, &cell.interpreter_version);
        let gate = if spec.requires_capability {
            t!("plan.licensed").yellow()
        } else {
            t!("plan.unlicensed").dimmed()
        };
        println!(
            "  - {:<28} | {:<48} | {}",
            cell.id().cyan(),
            spec.manifest_path.display(),
            gate
        );
    }

    if plan.filtered_os_count > 0 {
        println!(
            "\n{}",
            t!("plan.filtered", count = plan.filtered_os_count).dimmed()
        );
    }
    Ok(())
}
