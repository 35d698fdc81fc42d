//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures used throughout the orchestrator:
//! the axes of the matrix (operating system, interpreter version, variant),
//! the expanded `MatrixCell`, the environment specification a cell resolves to,
//! and the report and outcome types produced by running a cell.
//!
//! 此模块定义了整个编排器中使用的核心数据结构：
//! 矩阵的各个维度（操作系统、解释器版本、变体）、展开后的 `MatrixCell`、
//! 单元解析得到的环境规格，以及运行单元所产生的报告和结果类型。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::core::errors::{CellError, ConfigError};

/// The operating system a cell targets.
/// 单元所针对的操作系统。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Os {
    Linux,
    Macos,
    Windows,
}

impl Os {
    pub const ALL: [Os; 3] = [Os::Linux, Os::Macos, Os::Windows];

    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Macos => "macos",
            Os::Windows => "windows",
        }
    }

    /// Returns the operating system this process is running on, if it is one
    /// the matrix knows about.
    /// 返回当前进程运行的操作系统（如果矩阵支持该系统）。
    pub fn current() -> Option<Os> {
        match std::env::consts::OS {
            "linux" => Some(Os::Linux),
            "macos" => Some(Os::Macos),
            "windows" => Some(Os::Windows),
            _ => None,
        }
    }
}

impl FromStr for Os {
    type Err = ConfigError;

    /// Accepts plain names as well as hosted-runner labels such as
    /// `ubuntu-latest`, `macOS-13` or `windows-2022`.
    /// 接受普通名称以及托管运行器标签，例如 `ubuntu-latest`、`macOS-13` 或 `windows-2022`。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let family = lowered.split('-').next().unwrap_or_default();
        match family {
            "linux" | "ubuntu" => Ok(Os::Linux),
            "macos" | "osx" | "darwin" => Ok(Os::Macos),
            "windows" | "win" => Ok(Os::Windows),
            _ => Err(ConfigError::UnknownOs(s.to_string())),
        }
    }
}

impl TryFrom<String> for Os {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated interpreter version such as `3`, `3.7` or `3.10.4`.
/// 经过校验的解释器版本，例如 `3`、`3.7` 或 `3.10.4`。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InterpreterVersion(String);

impl InterpreterVersion {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for InterpreterVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let components: Vec<&str> = trimmed.split('.').collect();
        let well_formed = (1..=3).contains(&components.len())
            && components
                .iter()
                .all(|c| !c.is_empty() && c.chars().all(|ch| ch.is_ascii_digit()));
        if well_formed {
            Ok(InterpreterVersion(trimmed.to_string()))
        } else {
            Err(ConfigError::InvalidVersion(s.to_string()))
        }
    }
}

impl TryFrom<String> for InterpreterVersion {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InterpreterVersion> for String {
    fn from(value: InterpreterVersion) -> Self {
        value.0
    }
}

impl fmt::Display for InterpreterVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The optional add-on program variant of a cell. Every variant maps to exactly
/// one dependency manifest; see [`crate::core::selector::EnvironmentTable`].
///
/// 单元的可选附加程序变体。每个变体恰好映射到一个依赖清单；
/// 参见 [`crate::core::selector::EnvironmentTable`]。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Variant {
    /// No add-on: the default manifest.
    /// 无附加组件：默认清单。
    None,
    /// The alternate manifest carrying the licensed add-on toolkit.
    /// 携带需授权附加工具包的备用清单。
    ExtraA,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::None, Variant::ExtraA];
    pub const COUNT: usize = Self::ALL.len();

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::None => "none",
            Variant::ExtraA => "extra_a",
        }
    }

    /// Dense index used by the environment table. Exhaustive on purpose: adding
    /// a variant without giving it a slot does not compile.
    /// 环境表使用的稠密索引。
    pub(crate) fn index(&self) -> usize {
        match self {
            Variant::None => 0,
            Variant::ExtraA => 1,
        }
    }
}

impl FromStr for Variant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Variant::ALL
            .into_iter()
            .find(|v| v.as_str() == normalized)
            .ok_or_else(|| ConfigError::UnknownVariant(s.to_string()))
    }
}

impl TryFrom<String> for Variant {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One concrete (os, interpreter version, variant) combination of the matrix.
/// Immutable once expanded.
///
/// 矩阵中的一个具体组合（操作系统、解释器版本、变体）。展开后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatrixCell {
    pub os: Os,
    pub interpreter_version: InterpreterVersion,
    pub variant: Variant,
}

impl MatrixCell {
    pub fn new(os: Os, interpreter_version: InterpreterVersion, variant: Variant) -> Self {
        Self {
            os,
            interpreter_version,
            variant,
        }
    }

    /// A stable identifier, e.g. `linux-3.7-none`.
    /// 稳定的标识符，例如 `linux-3.7-none`。
    pub fn id(&self) -> String {
        format!("{}-{}-{}", self.os, self.interpreter_version, self.variant)
    }
}

impl fmt::Display for MatrixCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

/// The environment a cell resolves to: which manifest to install and for which
/// interpreter.
///
/// 单元解析得到的环境：安装哪个清单以及针对哪个解释器。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentSpec {
    /// Human-readable name, the variant it was selected for.
    pub name: String,
    /// The manifest path exactly as configured.
    pub manifest_path: PathBuf,
    pub interpreter_version: InterpreterVersion,
    /// Whether the capability probe gates this environment.
    pub requires_capability: bool,
}

/// The result of running the test suite once.
/// `passed: false` is an ordinary outcome, not an error.
///
/// 运行一次测试套件的结果。`passed: false` 是普通结果，而不是错误。
#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub passed: bool,
    pub coverage_file: PathBuf,
    pub exit_code: Option<i32>,
    #[serde(skip)]
    pub output: String,
    pub duration: Duration,
}

/// What happened to the coverage upload.
/// 覆盖率上传的结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum PublishStatus {
    Published,
    /// Upload failed, but the policy marks it advisory.
    FailedAdvisory(String),
    /// No publish command is configured.
    Skipped,
}

/// The per-cell state machine:
/// `Pending -> Provisioning -> Verifying -> Testing -> Reported`, or `Failed`
/// from any state.
///
/// 单元状态机：`Pending -> Provisioning -> Verifying -> Testing -> Reported`，
/// 或从任意状态进入 `Failed`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    Pending,
    Provisioning,
    Verifying,
    Testing,
    Reported,
    Failed,
}

impl CellState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CellState::Reported | CellState::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: CellState) -> bool {
        use CellState::*;
        match (self, next) {
            (Reported | Failed, _) => false,
            (_, Failed) => true,
            (Pending, Provisioning)
            | (Provisioning, Verifying)
            | (Verifying, Testing)
            | (Testing, Reported) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CellState::Pending => "PENDING",
            CellState::Provisioning => "PROVISIONING",
            CellState::Verifying => "VERIFYING",
            CellState::Testing => "TESTING",
            CellState::Reported => "REPORTED",
            CellState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why and where a cell failed.
/// 单元失败的原因和位置。
#[derive(Debug)]
pub struct CellFailure {
    /// The state the cell was in when the error occurred.
    pub stage: CellState,
    pub error: CellError,
}

/// Everything known about one cell after it ran.
/// 单元运行结束后的全部信息。
#[derive(Debug)]
pub struct CellOutcome {
    pub cell: MatrixCell,
    /// Every state the cell entered, in order, ending in a terminal state.
    pub history: Vec<CellState>,
    pub environment: Option<EnvironmentSpec>,
    pub report: Option<TestReport>,
    pub publish: Option<PublishStatus>,
    pub failure: Option<CellFailure>,
    pub duration: Duration,
}

impl CellOutcome {
    /// The state the cell ended in.
    pub fn final_state(&self) -> CellState {
        self.history.last().copied().unwrap_or(CellState::Pending)
    }

    pub fn reached(&self, state: CellState) -> bool {
        self.history.contains(&state)
    }

    pub fn is_failed(&self) -> bool {
        self.final_state() == CellState::Failed
    }

    /// A cell succeeds only if it was reported and its tests passed.
    /// 仅当单元已报告且测试通过时才算成功。
    pub fn is_success(&self) -> bool {
        self.final_state() == CellState::Reported
            && self.report.as_ref().is_some_and(|r| r.passed)
    }

    /// Gets the appropriate CSS class for the cell status.
    pub fn status_class(&self) -> &'static str {
        match (self.final_state(), &self.report) {
            (CellState::Reported, Some(r)) if r.passed => "status-Passed",
            (CellState::Reported, _) => "status-Tests-Failed",
            _ => "status-Failed",
        }
    }
}

/// The aggregated result of a matrix run.
/// 矩阵运行的汇总结果。
#[derive(Debug)]
pub struct MatrixSummary {
    pub outcomes: Vec<CellOutcome>,
}

impl MatrixSummary {
    /// Success iff every cell was reported with passing tests.
    /// An empty summary counts as success: nothing was asked to run.
    /// 当且仅当每个单元都已报告且测试通过时为成功。
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(CellOutcome::is_success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &CellOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }
}
