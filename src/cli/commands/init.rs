//! # Matrix Initialization Module / 矩阵初始化模块
//!
//! This module creates a starter `TestMatrix.toml`, either through an
//! interactive command-line wizard or, with `--non-interactive`, from the
//! built-in defaults.
//!
//! 此模块创建初始的 `TestMatrix.toml`，可以通过交互式命令行向导，
//! 也可以在使用 `--non-interactive` 时直接采用内置默认值。

use anyhow::{Context, Result, bail};
use colored::*;
use dialoguer::{Confirm, Input, MultiSelect, theme::ColorfulTheme};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::config::{DEFAULT_CONFIG_FILE, Orchestration, OrchestratorConfig};
use crate::core::models::{InterpreterVersion, Os, Variant};
use crate::infra::t;

const DEFAULT_NONE_MANIFEST: &str = "devtools/conda-envs/test-env.yaml";
const DEFAULT_EXTRA_MANIFEST: &str = "devtools/conda-envs/extra-env.yaml";
const DEFAULT_VERSIONS: &str = "3.7";

/// Runs the wizard (or writes the defaults) and saves `TestMatrix.toml` in the
/// current directory.
///
/// # Process Flow / 处理流程
/// 1. Check for an existing configuration and confirm overwrite / 检查现有配置并确认覆盖
/// 2. Ask for the operating systems and interpreter versions / 询问操作系统和解释器版本
/// 3. Ask for the manifest of each variant / 询问每个变体的清单
/// 4. Validate, save and print the next steps / 校验、保存并打印后续步骤
pub fn run_init_wizard(language: &str, non_interactive: bool) -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    let config = if non_interactive {
        if path.exists() {
            bail!(t!("init.file_exists", path = DEFAULT_CONFIG_FILE).to_string());
        }
        default_config(language)?
    } else {
        let theme = ColorfulTheme::default();
        println!("\n{}", t!("init.welcome").bold().cyan());
        println!("{}\n", t!("init.description"));

        if !confirm_overwrite(&theme, path)? {
            println!("{}", t!("init.aborted").yellow());
            return Ok(());
        }
        prompt_for_config(&theme, language)?
    };

    let toml_string = config.to_toml_string()?;
    // Whatever the wizard produced must load back.
    Orchestration::from_toml_str(&toml_string)?;

    fs::write(path, toml_string)
        .with_context(|| t!("init.write_failed", path = DEFAULT_CONFIG_FILE).to_string())?;

    println!(
        "\n{} {}",
        "✔".green(),
        t!("init.success", path = DEFAULT_CONFIG_FILE).bold()
    );
    println!("{}", t!("init.usage_hint"));
    Ok(())
}

fn default_config(language: &str) -> Result<OrchestratorConfig> {
    Ok(OrchestratorConfig::starter(
        language,
        vec![Os::Linux, Os::Macos],
        parse_versions(DEFAULT_VERSIONS)?,
        [
            (Variant::None, PathBuf::from(DEFAULT_NONE_MANIFEST)),
            (Variant::ExtraA, PathBuf::from(DEFAULT_EXTRA_MANIFEST)),
        ],
        ".",
    ))
}

/// Parses a comma-separated version list such as `3.7, 3.8`.
fn parse_versions(input: &str) -> Result<Vec<InterpreterVersion>> {
    let versions = input
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::parse::<InterpreterVersion>)
        .collect::<Result<Vec<_>, _>>()?;
    if versions.is_empty() {
        bail!(t!("init.no_versions").to_string());
    }
    Ok(versions)
}

/// Checks if `TestMatrix.toml` exists and asks the user for confirmation to overwrite.
fn confirm_overwrite(theme: &ColorfulTheme, path: &Path) -> Result<bool> {
    if path.exists() {
        Confirm::with_theme(theme)
            .with_prompt(t!("init.overwrite_prompt", path = DEFAULT_CONFIG_FILE))
            .interact()
            .context(t!("init.confirmation_failed").to_string())
    } else {
        Ok(true)
    }
}

fn prompt_for_config(theme: &ColorfulTheme, language: &str) -> Result<OrchestratorConfig> {
    let os_labels: Vec<&str> = Os::ALL.iter().map(Os::as_str).collect();
    let selections = MultiSelect::with_theme(theme)
        .with_prompt(t!("init.os_prompt"))
        .items(&os_labels)
        .defaults(&[true, true, false])
        .interact()?;
    if selections.is_empty() {
        bail!(t!("init.no_os_selected").to_string());
    }
    let os: Vec<Os> = selections.into_iter().map(|i| Os::ALL[i]).collect();

    let versions: String = Input::with_theme(theme)
        .with_prompt(t!("init.versions_prompt"))
        .default(DEFAULT_VERSIONS.into())
        .interact_text()?;
    let interpreter_versions = parse_versions(&versions)?;

    let none_manifest: String = Input::with_theme(theme)
        .with_prompt(t!("init.manifest_prompt", variant = Variant::None.as_str()))
        .default(DEFAULT_NONE_MANIFEST.into())
        .interact_text()?;
    let extra_manifest: String = Input::with_theme(theme)
        .with_prompt(t!("init.manifest_prompt", variant = Variant::ExtraA.as_str()))
        .default(DEFAULT_EXTRA_MANIFEST.into())
        .interact_text()?;

    let coverage_namespace: String = Input::with_theme(theme)
        .with_prompt(t!("init.coverage_prompt"))
        .default(".".into())
        .interact_text()?;

    Ok(OrchestratorConfig::starter(
        language,
        os,
        interpreter_versions,
        [
            (Variant::None, PathBuf::from(none_manifest)),
            (Variant::ExtraA, PathBuf::from(extra_manifest)),
        ],
        &coverage_namespace,
    ))
}
