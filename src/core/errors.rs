//! # Error Taxonomy / 错误分类
//!
//! Every error here is local to a single cell. None of them is ever
//! propagated to a sibling cell, and a failing test is not an error at all:
//! it is a `TestReport` with `passed: false`.
//!
//! 此处的每个错误都只属于单个单元，绝不会传播到其他单元。
//! 测试失败根本不是错误：它是一个 `passed: false` 的 `TestReport`。

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::models::Variant;

/// A deployment defect in configuration or trigger inputs. Never retried.
/// 配置或触发输入中的部署缺陷。永不重试。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown variant '{0}'")]
    UnknownVariant(String),
    #[error("unknown operating system '{0}'")]
    UnknownOs(String),
    #[error("invalid interpreter version '{0}'")]
    InvalidVersion(String),
    #[error("variant '{0}' has no environment mapping")]
    UnmappedVariant(Variant),
    #[error("secret variable '{0}' is not set in the trigger environment")]
    MissingSecret(String),
    #[error("invalid command template for '{name}': {reason}")]
    InvalidTemplate { name: String, reason: String },
    #[error("the matrix expands to no cells")]
    EmptyMatrix,
    #[error("missing trigger input '{0}'")]
    MissingInput(&'static str),
}

/// The secret could not be written to its destination.
/// 无法将密钥写入目标位置。
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("failed to write license file {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The provisioning steps, in execution order.
/// 按执行顺序排列的环境准备步骤。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisionStep {
    CreateWorkdir,
    CreateEnvironment,
    InstallManifest,
    InstallProject,
}

impl ProvisionStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionStep::CreateWorkdir => "create-workdir",
            ProvisionStep::CreateEnvironment => "create-environment",
            ProvisionStep::InstallManifest => "install-manifest",
            ProvisionStep::InstallProject => "install-project",
        }
    }
}

impl std::fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Environment creation or project build failed at `step`.
/// 环境创建或项目构建在 `step` 步骤失败。
#[derive(Debug, Error)]
#[error("provisioning failed at step '{step}': {cause}")]
pub struct ProvisionError {
    pub step: ProvisionStep,
    pub cause: String,
}

/// The required proprietary capability is not active.
/// 所需的专有能力未激活。
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("capability probe failed, toolkit is not licensed: {detail}")]
    Unlicensed { detail: String },
}

/// The test harness itself malfunctioned. Distinct from tests failing.
/// 测试框架本身出现故障。与测试失败不同。
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to launch the test harness: {0}")]
    SpawnFailed(String),
    #[error("test harness crashed (exit code {code:?})")]
    HarnessCrashed { code: Option<i32>, output: String },
    #[error("coverage report {} was not produced", .0.display())]
    MissingCoverage(PathBuf),
}

/// The coverage upload failed and the policy makes that fatal.
/// 覆盖率上传失败且策略将其视为致命错误。
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("coverage upload failed: {0}")]
    UploadFailed(String),
}

/// Everything that can end a cell in `FAILED`.
/// 所有可能使单元进入 `FAILED` 状态的错误。
#[derive(Debug, Error)]
pub enum CellError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Materialize(#[from] MaterializeError),
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    #[error(transparent)]
    Capability(#[from] CapabilityError),
    #[error(transparent)]
    Run(#[from] RunError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error("interrupted before completion")]
    Interrupted,
    #[error("cell task panicked: {0}")]
    Panicked(String),
}

impl CellError {
    /// Short category label used in summaries.
    /// 摘要中使用的简短类别标签。
    pub fn kind(&self) -> &'static str {
        match self {
            CellError::Config(_) => "ConfigError",
            CellError::Materialize(_) => "IOError",
            CellError::Provision(_) => "ProvisionError",
            CellError::Capability(_) => "CapabilityError",
            CellError::Run(_) => "RunError",
            CellError::Publish(_) => "PublishError",
            CellError::Interrupted => "Interrupted",
            CellError::Panicked(_) => "Panicked",
        }
    }
}
