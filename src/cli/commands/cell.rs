//! # Cell Command Module / 单元命令模块
//!
//! CI runner mode: the hosted CI service expands the matrix itself and starts
//! one job per cell, handing the cell over through trigger inputs. This
//! command runs exactly that cell.
//!
//! CI 运行器模式：托管 CI 服务自行展开矩阵，并为每个单元启动一个作业，
//! 通过触发输入传入该单元。此命令只运行该单元。

use anyhow::Result;
use colored::*;
use std::path::PathBuf;

use crate::cli::commands::{finish, load_and_localize, setup_signal_handler, shell_context};
use crate::core::execution::run_matrix;
use crate::core::models::Os;
use crate::core::planner::expand_matrix;
use crate::core::trigger::TriggerInputs;
use crate::infra::t;

/// Arguments of the `cell` command. Each axis falls back to its
/// `MATRIX_*` environment variable.
#[derive(Debug, Clone, Default)]
pub struct CellOptions {
    pub config: PathBuf,
    pub project_dir: PathBuf,
    pub os: Option<String>,
    pub interpreter_version: Option<String>,
    pub variant: Option<String>,
    pub json: Option<PathBuf>,
    pub lang_override: Option<String>,
}

pub async fn execute(options: CellOptions) -> Result<()> {
    let (orchestration, config_path) =
        load_and_localize(&options.config, options.lang_override.as_deref())?;
    println!("{}", t!("run.loading_config", path = config_path.display()));

    let trigger = TriggerInputs {
        os: options.os,
        interpreter_version: options.interpreter_version,
        variant: options.variant,
        secret: None,
    };
    let cell = trigger.resolve_cell()?;

    // The CI workflow and the config file can drift apart.
    let declared = expand_matrix(&orchestration.config.matrix).unwrap_or_default();
    if !declared.contains(&cell) {
        println!("{}", t!("cell.not_in_matrix", cell = cell.id()).yellow());
    }
    if Os::current().is_some_and(|host| host != cell.os) {
        println!(
            "{}",
            t!("cell.foreign_os", cell = cell.id(), host = std::env::consts::OS).yellow()
        );
    }

    println!("{}", t!("cell.running_single", cell = cell.id()).bold());

    let stop = setup_signal_handler();
    let ctx = shell_context(orchestration, &options.project_dir)?;
    let summary = run_matrix(vec![cell], ctx, 1, stop).await;
    finish(&summary, None, options.json.as_deref())
}
