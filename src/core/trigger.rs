//! # Trigger Inputs / 触发输入
//!
//! The values a CI runner hands to a single cell. They are collected once at
//! the edge and passed explicitly into the components that need them; nothing
//! below this module reads the process environment.
//!
//! CI 运行器传给单个单元的值。它们在边界处收集一次，
//! 并显式传递给需要它们的组件；此模块之下的任何代码都不会读取进程环境。

use std::env;

use crate::core::errors::ConfigError;
use crate::core::models::{InterpreterVersion, MatrixCell, Os, Variant};

pub const OS_ENV: &str = "MATRIX_OS";
pub const INTERPRETER_VERSION_ENV: &str = "MATRIX_INTERPRETER_VERSION";
pub const VARIANT_ENV: &str = "MATRIX_VARIANT";

/// Raw trigger values, not yet validated.
/// 尚未校验的原始触发值。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerInputs {
    pub os: Option<String>,
    pub interpreter_version: Option<String>,
    pub variant: Option<String>,
    /// `None` when the secret variable is unset. An empty value is `Some("")`.
    pub secret: Option<String>,
}

impl TriggerInputs {
    /// Reads the secret from `var`. Unset and non-UTF-8 values both count as absent.
    /// 从 `var` 读取密钥。未设置和非 UTF-8 的值都视为缺失。
    pub fn read_secret(var: &str) -> Option<String> {
        env::var(var).ok()
    }

    /// Validates the trigger values into the cell this runner must execute.
    /// 将触发值校验为此运行器必须执行的单元。
    pub fn resolve_cell(&self) -> Result<MatrixCell, ConfigError> {
        let os: Os = self
            .os
            .as_deref()
            .ok_or(ConfigError::MissingInput(OS_ENV))?
            .parse()?;
        let version: InterpreterVersion = self
            .interpreter_version
            .as_deref()
            .ok_or(ConfigError::MissingInput(INTERPRETER_VERSION_ENV))?
            .parse()?;
        let variant: Variant = self
            .variant
            .as_deref()
            .ok_or(ConfigError::MissingInput(VARIANT_ENV))?
            .parse()?;
        Ok(MatrixCell::new(os, version, variant))
    }
}
