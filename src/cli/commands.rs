//! # Commands / 子命令
//!
//! One module per subcommand, plus the setup they share.
//!
//! 每个子命令一个模块，以及它们共享的准备逻辑。

pub mod cell;
pub mod init;
pub mod plan;
pub mod run;

use anyhow::{Context, Result};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::core::config::{Orchestration, load_config};
use crate::core::execution::CellContext;
use crate::core::models::MatrixSummary;
use crate::core::trigger::TriggerInputs;
use crate::infra::executor::ShellExecutor;
use crate::infra::fs::absolute_path;
use crate::infra::t;
use crate::reporting::{generate_html_report, print_failure_details, print_summary, write_json_report};
use crate::resolve_locale;

/// Loads the configuration and switches to its language unless `--lang` was given.
pub(crate) fn load_and_localize(
    config: &Path,
    lang_override: Option<&str>,
) -> Result<(Orchestration, PathBuf)> {
    let (orchestration, config_path) = load_config(config)?;
    if lang_override.is_none() {
        rust_i18n::set_locale(&resolve_locale(&orchestration.config.language));
    }
    Ok((orchestration, config_path))
}

/// Builds the shared cell context with the host shell executor.
pub(crate) fn shell_context(
    orchestration: Orchestration,
    project_dir: &Path,
) -> Result<Arc<CellContext>> {
    let project_root = absolute_path(project_dir).with_context(|| {
        t!("run.project_dir_not_found", path = project_dir.display()).to_string()
    })?;
    println!("{}", t!("run.project_root_detected", path = project_root.display()));

    let secret = TriggerInputs::read_secret(&orchestration.config.license.secret_env);
    if secret.is_none() {
        println!(
            "{}",
            t!(
                "run.secret_not_set",
                var = &orchestration.config.license.secret_env
            )
            .yellow()
        );
    }

    Ok(Arc::new(CellContext {
        orchestration,
        executor: Arc::new(ShellExecutor),
        project_root,
        secret,
        workdir_base: None,
    }))
}

/// Sets up a signal handler for graceful shutdown.
pub(crate) fn setup_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            eprintln!("{}", t!("run.signal_listen_failed", error = e));
            return;
        }
        println!("\n{}", t!("run.shutdown_signal").yellow());
        token_clone.cancel();
    });

    token
}

/// Prints the summary, writes the requested reports and turns the aggregate
/// status into the command's result.
pub(crate) fn finish(
    summary: &MatrixSummary,
    html: Option<&Path>,
    json: Option<&Path>,
) -> Result<()> {
    print_summary(summary);

    if let Some(report_path) = html {
        println!("\n{}", t!("report.generating_html", path = report_path.display()));
        if let Err(e) = generate_html_report(summary, report_path) {
            eprintln!("{} {e:#}", t!("report.html_failed").red());
        }
    }
    if let Some(report_path) = json {
        println!("{}", t!("report.generating_json", path = report_path.display()));
        if let Err(e) = write_json_report(summary, report_path) {
            eprintln!("{} {e:#}", t!("report.json_failed").red());
        }
    }

    if summary.is_success() {
        println!("\n{}", t!("run.all_cells_passed").green().bold());
        Ok(())
    } else {
        let failed: Vec<_> = summary.failed().collect();
        print_failure_details(&failed);
        anyhow::bail!(
            t!(
                "run.matrix_failed",
                failed = failed.len(),
                total = summary.outcomes.len()
            )
            .to_string()
        );
    }
}
