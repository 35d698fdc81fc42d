//! # Command-Line Interface / 命令行接口
//!
//! Builds the `clap` command tree with localized help text and dispatches to
//! the subcommands in [`commands`].
//!
//! 使用本地化帮助文本构建 `clap` 命令树，并分派到 [`commands`] 中的子命令。

pub mod commands;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{env, path::PathBuf};

use crate::core::config::DEFAULT_CONFIG_FILE;
use crate::core::trigger::{INTERPRETER_VERSION_ENV, OS_ENV, VARIANT_ENV};
use crate::infra::t;
use crate::resolve_locale;

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for a `--lang <VALUE>` or `--lang=<VALUE>` argument.
///
/// Returns the locale and whether it was given explicitly.
fn pre_parse_language() -> (String, bool) {
    let args: Vec<String> = env::args().collect();
    for (pos, arg) in args.iter().enumerate() {
        if arg == "--lang" {
            if let Some(lang) = args.get(pos + 1) {
                return (resolve_locale(lang), true);
            }
        } else if let Some(lang) = arg.strip_prefix("--lang=") {
            return (resolve_locale(lang), true);
        }
    }
    // Fallback to system language detection
    let system = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    (resolve_locale(&system), false)
}

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .help(t!("cli.arg_config").to_string())
        .value_name("CONFIG")
        .default_value(DEFAULT_CONFIG_FILE)
        .value_parser(clap::value_parser!(PathBuf))
        .action(ArgAction::Set)
}

fn project_dir_arg() -> Arg {
    Arg::new("project-dir")
        .long("project-dir")
        .help(t!("cli.arg_project_dir").to_string())
        .value_name("PROJECT_DIR")
        .default_value(".")
        .value_parser(clap::value_parser!(PathBuf))
        .action(ArgAction::Set)
}

fn sharding_args() -> [Arg; 2] {
    [
        Arg::new("total-runners")
            .long("total-runners")
            .help(t!("cli.arg_total_runners").to_string())
            .value_name("TOTAL_RUNNERS")
            .value_parser(clap::value_parser!(usize))
            .action(ArgAction::Set)
            .requires("runner-index"),
        Arg::new("runner-index")
            .long("runner-index")
            .help(t!("cli.arg_runner_index").to_string())
            .value_name("RUNNER_INDEX")
            .value_parser(clap::value_parser!(usize))
            .action(ArgAction::Set)
            .requires("total-runners"),
    ]
}

fn all_os_arg() -> Arg {
    Arg::new("all-os")
        .long("all-os")
        .help(t!("cli.arg_all_os").to_string())
        .action(ArgAction::SetTrue)
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .help(t!("cli.arg_json").to_string())
        .value_name("JSON")
        .value_parser(clap::value_parser!(PathBuf))
        .action(ArgAction::Set)
}

pub fn build_cli() -> Command {
    Command::new("matrix-orchestrator")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli.about").to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli.arg_lang").to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .subcommand(
            Command::new("run")
                .about(t!("cli.cmd_run_about").to_string())
                .arg(
                    Arg::new("jobs")
                        .short('j')
                        .long("jobs")
                        .help(t!("cli.arg_jobs").to_string())
                        .value_name("JOBS")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set),
                )
                .arg(config_arg())
                .arg(project_dir_arg())
                .args(sharding_args())
                .arg(all_os_arg())
                .arg(
                    Arg::new("html")
                        .long("html")
                        .help(t!("cli.arg_html").to_string())
                        .value_name("HTML")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("cell")
                .about(t!("cli.cmd_cell_about").to_string())
                .arg(config_arg())
                .arg(project_dir_arg())
                .arg(
                    Arg::new("os")
                        .long("os")
                        .help(t!("cli.arg_os").to_string())
                        .value_name("OS")
                        .env(OS_ENV)
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("interpreter-version")
                        .long("interpreter-version")
                        .help(t!("cli.arg_interpreter_version").to_string())
                        .value_name("VERSION")
                        .env(INTERPRETER_VERSION_ENV)
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("variant")
                        .long("variant")
                        .help(t!("cli.arg_variant").to_string())
                        .value_name("VARIANT")
                        .env(VARIANT_ENV)
                        .action(ArgAction::Set),
                )
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("plan")
                .about(t!("cli.cmd_plan_about").to_string())
                .arg(config_arg())
                .args(sharding_args())
                .arg(all_os_arg()),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cli.cmd_init_about").to_string())
                .arg(
                    Arg::new("non-interactive")
                        .long("non-interactive")
                        .help(t!("cli.arg_non_interactive").to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn path_arg(matches: &ArgMatches, id: &str) -> PathBuf {
    matches.get_one::<PathBuf>(id).cloned().unwrap_or_default()
}

pub async fn run() -> Result<()> {
    // Pre-parse language and initialize i18n first.
    let (language, explicit_language) = pre_parse_language();
    rust_i18n::set_locale(&language);

    let matches = build_cli().get_matches();
    let lang_override = explicit_language.then_some(language.clone());

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            commands::run::execute(commands::run::RunOptions {
                jobs: run_matches.get_one::<usize>("jobs").copied(),
                config: path_arg(run_matches, "config"),
                project_dir: path_arg(run_matches, "project-dir"),
                total_runners: run_matches.get_one::<usize>("total-runners").copied(),
                runner_index: run_matches.get_one::<usize>("runner-index").copied(),
                all_os: run_matches.get_flag("all-os"),
                html: run_matches.get_one::<PathBuf>("html").cloned(),
                json: run_matches.get_one::<PathBuf>("json").cloned(),
                lang_override,
            })
            .await?;
        }
        Some(("cell", cell_matches)) => {
            commands::cell::execute(commands::cell::CellOptions {
                config: path_arg(cell_matches, "config"),
                project_dir: path_arg(cell_matches, "project-dir"),
                os: cell_matches.get_one::<String>("os").cloned(),
                interpreter_version: cell_matches
                    .get_one::<String>("interpreter-version")
                    .cloned(),
                variant: cell_matches.get_one::<String>("variant").cloned(),
                json: cell_matches.get_one::<PathBuf>("json").cloned(),
                lang_override,
            })
            .await?;
        }
        Some(("plan", plan_matches)) => {
            commands::plan::execute(
                &path_arg(plan_matches, "config"),
                plan_matches.get_one::<usize>("total-runners").copied(),
                plan_matches.get_one::<usize>("runner-index").copied(),
                plan_matches.get_flag("all-os"),
                lang_override.as_deref(),
            )?;
        }
        Some(("init", init_matches)) => {
            let non_interactive = init_matches.get_flag("non-interactive");

            // Show language detection message if it was auto-detected
            if !explicit_language {
                println!("🌐 {}", t!("init.system_language_detected", lang = &language));
            }
            commands::init::run_init_wizard(&language, non_interactive)?;
        }
        _ => {
            // Clap has already printed help info.
        }
    }
    Ok(())
}
