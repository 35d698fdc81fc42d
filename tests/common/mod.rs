// Shared test helpers for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{TempDir, tempdir};

use matrix_orchestrator::core::config::Orchestration;
use matrix_orchestrator::core::execution::CellContext;
use matrix_orchestrator::core::models::{InterpreterVersion, MatrixCell, Os, Variant};
use matrix_orchestrator::infra::executor::{CommandOutput, Executor, StepCommand, ToolStep};

pub const NONE_MANIFEST: &str = "devtools/conda-envs/test-env.yaml";
pub const EXTRA_MANIFEST: &str = "devtools/conda-envs/extra-env.yaml";
pub const LICENSE_VAR: &str = "TOOLKIT_LICENSE";

/// A configuration whose collaborator commands name the cell, so the
/// scripted executor can tell cells apart.
pub const TEST_CONFIG: &str = r#"
language = "en"

[matrix]
os = ["linux", "macos"]
interpreter_versions = ["3.7"]
variants = ["none", "extra_a"]

[environments.none]
manifest = "devtools/conda-envs/test-env.yaml"

[environments.extra_a]
manifest = "devtools/conda-envs/extra-env.yaml"

[license]
secret_env = "TEST_LICENSE_SECRET"
export_as = "TOOLKIT_LICENSE"

[tests]
path = "tests"
coverage_namespace = "mypackage"

[commands]
create_environment = "fake-env create {cell} --prefix {env_dir} python={version}"
install_manifest = "fake-env update {cell} --prefix {env_dir} --file {manifest}"
install_project = "fake-pip install {cell} --no-deps {project}"
environment_info = ""
capability_probe = "fake-probe {cell} {license_file}"
run_tests = "fake-pytest {cell} --cov={coverage_namespace} --cov-report=xml:{coverage_file} {test_path}"
publish = "fake-codecov {cell} --file {coverage_file}"
"#;

pub fn test_orchestration() -> Orchestration {
    Orchestration::from_toml_str(TEST_CONFIG).expect("test config must be valid")
}

pub fn cell(os: Os, version: &str, variant: Variant) -> MatrixCell {
    MatrixCell::new(os, version.parse::<InterpreterVersion>().unwrap(), variant)
}

/// How a scripted command behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Behavior {
    /// Exit with this code. The test step also writes its coverage report.
    Exit(i32),
    /// Exit with this code without writing a coverage report.
    ExitWithoutCoverage(i32),
    /// Terminated by a signal: no exit code.
    Killed,
    /// The program cannot be started.
    SpawnError,
    /// Succeeds iff the exported license file exists and is not empty.
    LicenseCheck,
    /// The executor panics.
    Panic,
}

/// An `Executor` that follows a script instead of spawning processes and
/// records every command it was asked to run.
pub struct ScriptedExecutor {
    rules: HashMap<(ToolStep, Option<String>), Behavior>,
    calls: Mutex<Vec<StepCommand>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for ScriptedExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        let mut rules = HashMap::new();
        rules.insert((ToolStep::CapabilityProbe, None), Behavior::LicenseCheck);
        Self {
            rules,
            calls: Mutex::new(Vec::new()),
            latency: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Makes every command take `latency`, so concurrent cells overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// The most commands that were ever running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Sets the behavior of `step` for every cell.
    pub fn on(mut self, step: ToolStep, behavior: Behavior) -> Self {
        self.rules.insert((step, None), behavior);
        self
    }

    /// Sets the behavior of `step` for one cell only.
    pub fn on_cell(mut self, step: ToolStep, cell: &MatrixCell, behavior: Behavior) -> Self {
        self.rules.insert((step, Some(cell.id())), behavior);
        self
    }

    pub fn calls(&self) -> Vec<StepCommand> {
        self.calls.lock().unwrap().clone()
    }

    /// The steps run for one cell, in order.
    pub fn steps_for(&self, cell: &MatrixCell) -> Vec<ToolStep> {
        let id = cell.id();
        self.calls()
            .into_iter()
            .filter(|c| c.args.iter().any(|a| *a == id))
            .map(|c| c.step)
            .collect()
    }

    fn behavior_for(&self, command: &StepCommand) -> Behavior {
        let cell_rule = command.args.iter().find_map(|arg| {
            self.rules
                .get(&(command.step, Some(arg.clone())))
                .cloned()
        });
        cell_rule
            .or_else(|| self.rules.get(&(command.step, None)).cloned())
            .unwrap_or(Behavior::Exit(0))
    }
}

fn coverage_target(command: &StepCommand) -> Option<PathBuf> {
    command
        .args
        .iter()
        .find_map(|a| a.strip_prefix("--cov-report=xml:"))
        .map(PathBuf::from)
}

fn exported_license(command: &StepCommand) -> Option<PathBuf> {
    command
        .envs
        .iter()
        .find(|(k, _)| k == LICENSE_VAR)
        .map(|(_, v)| PathBuf::from(v))
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn execute(&self, command: &StepCommand) -> io::Result<CommandOutput> {
        self.calls.lock().unwrap().push(command.clone());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let (exit_code, write_coverage) = match self.behavior_for(command) {
            Behavior::Exit(code) => (Some(code), true),
            Behavior::ExitWithoutCoverage(code) => (Some(code), false),
            Behavior::Killed => (None, false),
            Behavior::SpawnError => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{}: not found", command.program),
                ));
            }
            Behavior::LicenseCheck => {
                let licensed = exported_license(command)
                    .and_then(|path| fs::read(path).ok())
                    .is_some_and(|content| !content.is_empty());
                (Some(if licensed { 0 } else { 1 }), false)
            }
            Behavior::Panic => panic!("scripted executor panic in {}", command.step),
        };

        if write_coverage && command.step == ToolStep::RunTests {
            if let Some(path) = coverage_target(command) {
                fs::write(path, "<coverage version=\"7.0\"/>")?;
            }
        }

        Ok(CommandOutput {
            exit_code,
            output: format!("{} ran {}", command.program, command.step),
        })
    }
}

/// A cell context around a scripted executor. The returned temp dirs hold
/// the project root and the cell work directories.
pub struct Harness {
    pub executor: Arc<ScriptedExecutor>,
    pub project: TempDir,
    pub workdirs: TempDir,
}

impl Harness {
    pub fn new(executor: ScriptedExecutor) -> Self {
        Self {
            executor: Arc::new(executor),
            project: tempdir().expect("Failed to create project directory"),
            workdirs: tempdir().expect("Failed to create work directory base"),
        }
    }

    pub fn context(&self, orchestration: Orchestration, secret: Option<&str>) -> Arc<CellContext> {
        Arc::new(CellContext {
            orchestration,
            executor: self.executor.clone(),
            project_root: self.project.path().to_path_buf(),
            secret: secret.map(str::to_string),
            workdir_base: Some(self.workdirs.path().to_path_buf()),
        })
    }

    /// Number of cell work directories still on disk.
    pub fn leftover_workdirs(&self) -> usize {
        count_entries(self.workdirs.path())
    }
}

pub fn count_entries(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}
