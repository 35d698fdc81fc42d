//! # Environment Provisioner / 环境准备器
//!
//! Creates the isolated environment of one cell, installs the manifest the
//! selector chose, then builds and installs the project under test into it
//! without resolving the project's own dependencies a second time.
//!
//! 创建单个单元的隔离环境，安装选择器所选的清单，
//! 然后构建并安装被测项目，且不会再次解析项目自身的依赖。

use colored::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::core::config::{CommandSet, LicenseConfig, TestsConfig};
use crate::core::errors::{ConfigError, ProvisionError, ProvisionStep};
use crate::core::models::{EnvironmentSpec, MatrixCell};
use crate::infra::command::{CommandTemplate, TemplateVars, tail_lines};
use crate::infra::executor::{CommandOutput, Executor, StepCommand, ToolStep};
use crate::infra::fs::resolve_against;
use crate::infra::t;

/// How many trailing output lines a step error keeps.
const ERROR_TAIL_LINES: usize = 40;

/// Fixed locations inside one cell's work directory.
/// 单元工作目录中的固定位置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellLayout {
    pub root: PathBuf,
    pub env_dir: PathBuf,
    pub license_file: PathBuf,
    pub coverage_file: PathBuf,
}

impl CellLayout {
    pub fn new(root: &Path, license: &LicenseConfig, tests: &TestsConfig) -> Self {
        let license_file = license
            .destination
            .clone()
            .unwrap_or_else(|| root.join(&license.file_name));
        Self {
            root: root.to_path_buf(),
            env_dir: root.join("env"),
            license_file,
            coverage_file: resolve_against(root, &tests.coverage_file),
        }
    }
}

/// A created environment, exclusively owned by one cell. Dropping it removes
/// the work directory and everything provisioned into it.
///
/// 已创建的环境，由单个单元独占。丢弃它会删除工作目录及其中准备的所有内容。
#[derive(Debug)]
pub struct ProvisionedEnvironment {
    pub spec: EnvironmentSpec,
    pub layout: CellLayout,
    pub project_root: PathBuf,
    vars: TemplateVars,
    envs: Vec<(String, String)>,
    _workdir: TempDir,
}

impl ProvisionedEnvironment {
    pub fn vars(&self) -> &TemplateVars {
        &self.vars
    }

    /// Renders `template` into a command running from the project root with the
    /// cell's environment variables exported.
    ///
    /// 将 `template` 渲染为在项目根目录运行、并导出单元环境变量的命令。
    pub fn command(
        &self,
        step: ToolStep,
        template: &CommandTemplate,
    ) -> Result<StepCommand, ConfigError> {
        let words = template.render(&self.vars)?;
        StepCommand::from_words(step, words, self.project_root.clone(), self.envs.clone())
            .ok_or_else(|| ConfigError::InvalidTemplate {
                name: template.name().to_string(),
                reason: "rendered to an empty command".to_string(),
            })
    }
}

/// Inputs shared by every cell that the provisioner needs.
/// 环境准备器所需的、所有单元共享的输入。
pub struct Provisioner<'a> {
    pub executor: &'a dyn Executor,
    pub commands: &'a CommandSet,
    pub license: &'a LicenseConfig,
    pub tests: &'a TestsConfig,
    pub project_root: &'a Path,
}

impl Provisioner<'_> {
    /// Runs the provisioning steps in order; the first failure aborts the rest.
    ///
    /// 1. create the environment for `spec.interpreter_version`
    /// 2. install the manifest at `spec.manifest_path`
    /// 3. install the project without its dependencies
    /// 4. dump the environment (advisory)
    ///
    /// 按顺序执行准备步骤；第一个失败会中止其余步骤。
    pub async fn provision(
        &self,
        cell: &MatrixCell,
        spec: &EnvironmentSpec,
        workdir: TempDir,
    ) -> Result<ProvisionedEnvironment, ProvisionError> {
        let layout = CellLayout::new(workdir.path(), self.license, self.tests);
        let manifest = resolve_against(self.project_root, &spec.manifest_path);
        let cell_id = cell.id();

        let vars = TemplateVars::new()
            .with("env_dir", layout.env_dir.display().to_string())
            .with("workdir", layout.root.display().to_string())
            .with("version", spec.interpreter_version.as_str())
            .with("manifest", manifest.display().to_string())
            .with("project", self.project_root.display().to_string())
            .with("test_path", self.tests.path.clone())
            .with("coverage_namespace", self.tests.coverage_namespace.clone())
            .with("coverage_file", layout.coverage_file.display().to_string())
            .with("license_file", layout.license_file.display().to_string())
            .with("cell", cell_id.clone())
            .with("os", cell.os.as_str())
            .with("variant", cell.variant.as_str());

        let envs = vec![(
            self.license.export_as.clone(),
            layout.license_file.display().to_string(),
        )];

        let env = ProvisionedEnvironment {
            spec: spec.clone(),
            layout,
            project_root: self.project_root.to_path_buf(),
            vars,
            envs,
            _workdir: workdir,
        };

        self.run_step(
            &env,
            ProvisionStep::CreateEnvironment,
            ToolStep::CreateEnvironment,
            &self.commands.create_environment,
        )
        .await?;
        self.run_step(
            &env,
            ProvisionStep::InstallManifest,
            ToolStep::InstallManifest,
            &self.commands.install_manifest,
        )
        .await?;
        self.run_step(
            &env,
            ProvisionStep::InstallProject,
            ToolStep::InstallProject,
            &self.commands.install_project,
        )
        .await?;

        if let Some(info) = &self.commands.environment_info {
            self.describe(&env, &cell_id, info).await;
        }

        Ok(env)
    }

    async fn run_step(
        &self,
        env: &ProvisionedEnvironment,
        step: ProvisionStep,
        tool: ToolStep,
        template: &CommandTemplate,
    ) -> Result<CommandOutput, ProvisionError> {
        let fail = |cause: String| ProvisionError { step, cause };

        let command = env.command(tool, template).map_err(|e| fail(e.to_string()))?;
        let output = self
            .executor
            .execute(&command)
            .await
            .map_err(|e| fail(format!("{}: {e}", command.program)))?;

        if output.success() {
            Ok(output)
        } else {
            Err(fail(format!(
                "`{}` exited with {:?}\n{}",
                command.line(),
                output.exit_code,
                tail_lines(&output.output, ERROR_TAIL_LINES)
            )))
        }
    }

    /// Prints what ended up installed. Failure here is only a warning.
    async fn describe(&self, env: &ProvisionedEnvironment, cell_id: &str, template: &CommandTemplate) {
        let result = match env.command(ToolStep::EnvironmentInfo, template) {
            Ok(command) => self
                .executor
                .execute(&command)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(output) if output.success() => {
                println!("{}", t!("cell.environment_info", cell = cell_id).dimmed());
                if !output.output.trim().is_empty() {
                    println!("{}", output.output.trim_end());
                }
            }
            Ok(output) => println!(
                "{}",
                t!(
                    "cell.environment_info_failed",
                    cell = cell_id,
                    error = format!("exit code {:?}", output.exit_code)
                )
                .yellow()
            ),
            Err(e) => println!(
                "{}",
                t!("cell.environment_info_failed", cell = cell_id, error = e).yellow()
            ),
        }
    }
}
