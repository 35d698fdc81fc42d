//! # Configuration Module / 配置模块
//!
//! The `TestMatrix.toml` schema: the matrix axes, the variant → manifest
//! table, the license, test and publish settings, and the collaborator command
//! templates. Loading validates everything into typed values up front, so a
//! defect in the file is reported before any cell starts.
//!
//! `TestMatrix.toml` 的结构：矩阵维度、变体到清单的映射表、许可证、测试与发布设置，
//! 以及协作者命令模板。加载时会预先将所有内容校验为类型化的值，
//! 因此文件中的缺陷会在任何单元开始之前被报告。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::errors::ConfigError;
use crate::core::models::{InterpreterVersion, MatrixCell, Os, Variant};
use crate::core::selector::EnvironmentTable;
use crate::infra::command::CommandTemplate;
use crate::infra::t;

/// The default configuration file name.
/// 默认配置文件名。
pub const DEFAULT_CONFIG_FILE: &str = "TestMatrix.toml";

/// Represents the entire orchestrator configuration, loaded from a TOML file.
/// 代表从 TOML 文件加载的整个编排器配置。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorConfig {
    /// The language for the runner's output messages (e.g., "en", "zh-CN").
    /// Defaults to "en" if not specified.
    ///
    /// 运行器输出消息的语言（例如 "en", "zh-CN"）。如果未指定，则默认为 "en"。
    #[serde(default = "default_language")]
    pub language: String,
    pub matrix: MatrixConfig,
    /// Variant name → environment entry. Must cover every variant.
    /// 变体名称 → 环境条目。必须覆盖所有变体。
    pub environments: BTreeMap<String, EnvironmentEntry>,
    #[serde(default)]
    pub license: LicenseConfig,
    #[serde(default)]
    pub tests: TestsConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
}

/// The declared axes of the matrix.
/// 矩阵声明的各个维度。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatrixConfig {
    pub os: Vec<Os>,
    pub interpreter_versions: Vec<InterpreterVersion>,
    #[serde(default = "default_variants")]
    pub variants: Vec<Variant>,
    /// Combinations to drop from the cross product.
    /// 需要从笛卡尔积中剔除的组合。
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<ExcludeRule>,
}

/// A partial cell pattern; a cell is excluded when every field that is set matches.
/// 部分单元模式；当所有已设置的字段都匹配时，该单元被排除。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExcludeRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<Os>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter_version: Option<InterpreterVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<Variant>,
}

impl ExcludeRule {
    pub fn matches(&self, cell: &MatrixCell) -> bool {
        self.os.is_none_or(|os| os == cell.os)
            && self
                .interpreter_version
                .as_ref()
                .is_none_or(|v| *v == cell.interpreter_version)
            && self.variant.is_none_or(|v| v == cell.variant)
    }
}

/// The environment a variant installs.
/// 某个变体所安装的环境。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EnvironmentEntry {
    /// Dependency manifest, relative to the project root unless absolute.
    /// 依赖清单，除非是绝对路径，否则相对于项目根目录。
    pub manifest: PathBuf,
    /// Whether the capability probe must pass before tests run.
    #[serde(default = "default_true")]
    pub requires_capability: bool,
}

/// Where the license secret comes from and where it goes.
/// 许可证密钥的来源和去向。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LicenseConfig {
    /// Trigger environment variable holding the secret.
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
    /// File name inside the cell work directory, used when `destination` is unset.
    #[serde(default = "default_license_file_name")]
    pub file_name: String,
    /// Fixed absolute path for the license file (single-cell CI runners).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
    /// Environment variable exported to every collaborator, pointing at the license file.
    #[serde(default = "default_export_as")]
    pub export_as: String,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            secret_env: default_secret_env(),
            file_name: default_license_file_name(),
            destination: None,
            export_as: default_export_as(),
        }
    }
}

/// How the test suite is invoked and judged.
/// 测试套件的调用方式与判定规则。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TestsConfig {
    #[serde(default = "default_test_path")]
    pub path: String,
    /// Namespace coverage is measured for.
    #[serde(default = "default_coverage_namespace")]
    pub coverage_namespace: String,
    /// Relative path of the coverage report inside the cell work directory.
    #[serde(default = "default_coverage_file")]
    pub coverage_file: PathBuf,
    /// Exit codes meaning "tests ran and some failed". Any other non-zero
    /// code is a harness malfunction.
    ///
    /// 表示"测试已运行但有失败"的退出码。任何其他非零退出码都视为测试框架故障。
    #[serde(default = "default_failure_exit_codes")]
    pub failure_exit_codes: Vec<i32>,
}

impl Default for TestsConfig {
    fn default() -> Self {
        Self {
            path: default_test_path(),
            coverage_namespace: default_coverage_namespace(),
            coverage_file: default_coverage_file(),
            failure_exit_codes: default_failure_exit_codes(),
        }
    }
}

/// Coverage upload policy.
/// 覆盖率上传策略。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublishConfig {
    /// When `true`, a failed upload fails the cell and therefore the run.
    /// When `false`, it is only a warning.
    ///
    /// 为 `true` 时，上传失败会导致单元失败，进而导致整个运行失败；为 `false` 时仅为警告。
    #[serde(default = "default_true")]
    pub fail_run_on_error: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            fail_run_on_error: true,
        }
    }
}

/// Command templates for every external collaborator.
/// An empty string disables an optional command.
///
/// 每个外部协作者的命令模板。空字符串表示禁用可选命令。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandsConfig {
    #[serde(default = "default_create_environment")]
    pub create_environment: String,
    #[serde(default = "default_install_manifest")]
    pub install_manifest: String,
    #[serde(default = "default_install_project")]
    pub install_project: String,
    #[serde(default = "default_environment_info")]
    pub environment_info: String,
    #[serde(default = "default_capability_probe")]
    pub capability_probe: String,
    #[serde(default = "default_run_tests")]
    pub run_tests: String,
    #[serde(default = "default_publish")]
    pub publish: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            create_environment: default_create_environment(),
            install_manifest: default_install_manifest(),
            install_project: default_install_project(),
            environment_info: default_environment_info(),
            capability_probe: default_capability_probe(),
            run_tests: default_run_tests(),
            publish: default_publish(),
        }
    }
}

/// The compiled command templates.
/// 编译后的命令模板。
#[derive(Debug, Clone)]
pub struct CommandSet {
    pub create_environment: CommandTemplate,
    pub install_manifest: CommandTemplate,
    pub install_project: CommandTemplate,
    pub environment_info: Option<CommandTemplate>,
    pub capability_probe: CommandTemplate,
    pub run_tests: CommandTemplate,
    pub publish: Option<CommandTemplate>,
}

impl CommandSet {
    pub fn compile(commands: &CommandsConfig) -> Result<Self, ConfigError> {
        let optional = |name: &str, source: &str| -> Result<Option<CommandTemplate>, ConfigError> {
            if source.trim().is_empty() {
                Ok(None)
            } else {
                CommandTemplate::parse(name, source).map(Some)
            }
        };

        Ok(Self {
            create_environment: CommandTemplate::parse(
                "create_environment",
                &commands.create_environment,
            )?,
            install_manifest: CommandTemplate::parse("install_manifest", &commands.install_manifest)?,
            install_project: CommandTemplate::parse("install_project", &commands.install_project)?,
            environment_info: optional("environment_info", &commands.environment_info)?,
            capability_probe: CommandTemplate::parse("capability_probe", &commands.capability_probe)?,
            run_tests: CommandTemplate::parse("run_tests", &commands.run_tests)?,
            publish: optional("publish", &commands.publish)?,
        })
    }
}

/// A configuration that passed validation, together with the structures
/// derived from it.
///
/// 通过校验的配置，以及由其派生的结构。
#[derive(Debug, Clone)]
pub struct Orchestration {
    pub config: OrchestratorConfig,
    pub environments: EnvironmentTable,
    pub commands: CommandSet,
}

impl Orchestration {
    pub fn from_config(config: OrchestratorConfig) -> Result<Self, ConfigError> {
        let environments = EnvironmentTable::from_config(&config.environments)?;
        let commands = CommandSet::compile(&config.commands)?;
        Ok(Self {
            config,
            environments,
            commands,
        })
    }
}

impl Orchestration {
    /// Parses and validates a TOML document.
    /// 解析并校验 TOML 文档。
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: OrchestratorConfig =
            toml::from_str(content).with_context(|| t!("config.parse_failed").to_string())?;
        Orchestration::from_config(config).with_context(|| t!("config.invalid").to_string())
    }
}

impl OrchestratorConfig {
    /// A starting configuration with one manifest per variant and the
    /// default collaborator commands.
    ///
    /// 一个初始配置：每个变体一个清单，并使用默认的协作者命令。
    pub fn starter(
        language: &str,
        os: Vec<Os>,
        interpreter_versions: Vec<InterpreterVersion>,
        manifests: [(Variant, PathBuf); Variant::COUNT],
        coverage_namespace: &str,
    ) -> Self {
        let environments = manifests
            .into_iter()
            .map(|(variant, manifest)| {
                (
                    variant.as_str().to_string(),
                    EnvironmentEntry {
                        manifest,
                        requires_capability: true,
                    },
                )
            })
            .collect();

        Self {
            language: language.to_string(),
            matrix: MatrixConfig {
                os,
                interpreter_versions,
                variants: default_variants(),
                exclude: Vec::new(),
            },
            environments,
            license: LicenseConfig::default(),
            tests: TestsConfig {
                coverage_namespace: coverage_namespace.to_string(),
                ..TestsConfig::default()
            },
            publish: PublishConfig::default(),
            commands: CommandsConfig::default(),
        }
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context(t!("config.serialize_failed").to_string())
    }
}

/// Reads, parses and validates the configuration file.
/// Returns the validated configuration and the canonical path it was read from.
///
/// 读取、解析并校验配置文件。返回校验后的配置以及读取时使用的规范路径。
pub fn load_config(config_path_arg: &Path) -> Result<(Orchestration, PathBuf)> {
    let config_path = fs::canonicalize(config_path_arg).with_context(|| {
        t!("config.read_failed_path", path = config_path_arg.display()).to_string()
    })?;

    let content = fs::read_to_string(&config_path)
        .with_context(|| t!("config.read_failed_path", path = config_path.display()).to_string())?;

    let orchestration = Orchestration::from_toml_str(&content)?;
    Ok((orchestration, config_path))
}

fn default_language() -> String {
    "en".to_string()
}

fn default_variants() -> Vec<Variant> {
    Variant::ALL.to_vec()
}

fn default_true() -> bool {
    true
}

fn default_secret_env() -> String {
    "LICENSE_SECRET".to_string()
}

fn default_license_file_name() -> String {
    "license.txt".to_string()
}

fn default_export_as() -> String {
    "TOOLKIT_LICENSE".to_string()
}

fn default_test_path() -> String {
    "tests".to_string()
}

fn default_coverage_namespace() -> String {
    ".".to_string()
}

fn default_coverage_file() -> PathBuf {
    PathBuf::from("coverage.xml")
}

fn default_failure_exit_codes() -> Vec<i32> {
    vec![1]
}

fn default_create_environment() -> String {
    "conda create --yes --quiet --prefix {env_dir} python={version}".to_string()
}

fn default_install_manifest() -> String {
    "conda env update --prefix {env_dir} --file {manifest}".to_string()
}

fn default_install_project() -> String {
    "conda run --prefix {env_dir} python -m pip install --no-deps {project}".to_string()
}

fn default_environment_info() -> String {
    "conda list --prefix {env_dir}".to_string()
}

fn default_capability_probe() -> String {
    "conda run --prefix {env_dir} python -c 'import toolkit; assert toolkit.is_licensed()'"
        .to_string()
}

fn default_run_tests() -> String {
    "conda run --prefix {env_dir} python -m pytest -v --cov={coverage_namespace} --cov-report=xml:{coverage_file} {test_path}".to_string()
}

fn default_publish() -> String {
    "codecov --file {coverage_file} --flags {cell}".to_string()
}
