//! # Executor Module / 执行器模块
//!
//! The narrow interface to external collaborators. Core logic builds a
//! [`StepCommand`] and hands it to an [`Executor`]; it never spawns processes
//! itself. [`ShellExecutor`] runs commands on the host, tests substitute a
//! scripted fake.
//!
//! 与外部协作者之间的窄接口。核心逻辑构建 [`StepCommand`] 并交给 [`Executor`]，
//! 自身从不派生进程。[`ShellExecutor`] 在主机上运行命令，测试中则替换为脚本化的伪实现。

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::infra::command::{display_line, spawn_and_capture};

/// Which collaborator a command talks to.
/// 命令所调用的协作者。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolStep {
    CreateEnvironment,
    InstallManifest,
    InstallProject,
    EnvironmentInfo,
    CapabilityProbe,
    RunTests,
    Publish,
}

impl ToolStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolStep::CreateEnvironment => "create_environment",
            ToolStep::InstallManifest => "install_manifest",
            ToolStep::InstallProject => "install_project",
            ToolStep::EnvironmentInfo => "environment_info",
            ToolStep::CapabilityProbe => "capability_probe",
            ToolStep::RunTests => "run_tests",
            ToolStep::Publish => "publish",
        }
    }
}

impl fmt::Display for ToolStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully rendered invocation of one collaborator.
/// 对某个协作者的一次完整渲染调用。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCommand {
    pub step: ToolStep,
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub envs: Vec<(String, String)>,
}

impl StepCommand {
    /// Builds a command from rendered words; the first word is the program.
    /// Returns `None` for an empty word list.
    pub fn from_words(
        step: ToolStep,
        mut words: Vec<String>,
        cwd: PathBuf,
        envs: Vec<(String, String)>,
    ) -> Option<Self> {
        if words.is_empty() {
            return None;
        }
        let program = words.remove(0);
        Some(Self {
            step,
            program,
            args: words,
            cwd,
            envs,
        })
    }

    /// The command as a copy-pasteable line.
    pub fn line(&self) -> String {
        let mut words = Vec::with_capacity(self.args.len() + 1);
        words.push(self.program.clone());
        words.extend(self.args.iter().cloned());
        display_line(&words)
    }
}

/// What a finished command left behind.
/// 命令结束后的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs collaborator commands. An `Err` means the command could not be run at
/// all; a non-zero exit is an `Ok` with that exit code.
///
/// 运行协作者命令。`Err` 表示命令根本无法运行；非零退出码则是带有该退出码的 `Ok`。
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, command: &StepCommand) -> io::Result<CommandOutput>;
}

/// Executes commands as host processes.
/// 以主机进程的形式执行命令。
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellExecutor;

#[async_trait]
impl Executor for ShellExecutor {
    async fn execute(&self, command: &StepCommand) -> io::Result<CommandOutput> {
        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(&command.cwd)
            .envs(command.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .kill_on_drop(true);

        let (status, output) = spawn_and_capture(cmd).await;
        let status = status?;
        Ok(CommandOutput {
            exit_code: status.code(),
            output,
        })
    }
}
