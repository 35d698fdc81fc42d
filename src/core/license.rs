//! # License Materializer & Capability Verifier / 许可证写入与能力校验
//!
//! Writing the secret and checking that it is usable are two separate steps,
//! so [`verify_capability`] works just as well against a license file that
//! already exists outside CI.
//!
//! 写入密钥与检查其是否可用是两个独立的步骤，
//! 因此 [`verify_capability`] 同样适用于 CI 之外已存在的许可证文件。

use std::fs;
use std::path::Path;

use crate::core::errors::{CapabilityError, MaterializeError};
use crate::core::provision::ProvisionedEnvironment;
use crate::infra::command::{CommandTemplate, tail_lines};
use crate::infra::executor::{Executor, ToolStep};

/// Writes `secret` verbatim to `destination`, creating or overwriting it.
///
/// The content is not validated and no newline is added, so an empty secret
/// produces an empty file. Writing the same secret twice leaves the same
/// content behind.
///
/// 将 `secret` 原样写入 `destination`，创建或覆盖该文件。
/// 不校验内容，也不添加换行，因此空密钥会生成空文件。
/// 两次写入相同的密钥会留下相同的内容。
pub fn materialize_license(secret: &str, destination: &Path) -> Result<(), MaterializeError> {
    fs::write(destination, secret.as_bytes()).map_err(|source| MaterializeError::WriteFailed {
        path: destination.to_path_buf(),
        source,
    })
}

/// Runs the capability probe inside `env`. It must succeed only when the
/// licensed toolkit is usable; anything else is [`CapabilityError::Unlicensed`].
///
/// 在 `env` 中运行能力探测。仅当授权工具包可用时才会成功；
/// 其他任何情况均为 [`CapabilityError::Unlicensed`]。
pub async fn verify_capability(
    executor: &dyn Executor,
    env: &ProvisionedEnvironment,
    probe: &CommandTemplate,
) -> Result<(), CapabilityError> {
    let unlicensed = |detail: String| CapabilityError::Unlicensed { detail };

    let command = env
        .command(ToolStep::CapabilityProbe, probe)
        .map_err(|e| unlicensed(e.to_string()))?;
    let output = executor
        .execute(&command)
        .await
        .map_err(|e| unlicensed(format!("probe could not run: {e}")))?;

    if output.success() {
        Ok(())
    } else {
        Err(unlicensed(format!(
            "exit code {:?}\n{}",
            output.exit_code,
            tail_lines(&output.output, 20)
        )))
    }
}
