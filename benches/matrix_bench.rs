use async_trait::async_trait;
use criterion::{Criterion, criterion_group, criterion_main};
use matrix_orchestrator::core::config::Orchestration;
use matrix_orchestrator::core::execution::{CellContext, run_matrix};
use matrix_orchestrator::core::planner::{expand_matrix, plan_execution};
use matrix_orchestrator::infra::executor::{CommandOutput, Executor, StepCommand, ToolStep};
use std::hint::black_box;
use std::io;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

const BENCH_CONFIG: &str = r#"
[matrix]
os = ["linux", "macos", "windows"]
interpreter_versions = ["3.7", "3.8", "3.9", "3.10"]
exclude = [{ os = "windows", variant = "extra_a" }]

[environments.none]
manifest = "envs/test-env.yaml"

[environments.extra_a]
manifest = "envs/extra-env.yaml"

[commands]
environment_info = ""
publish = ""
"#;

/// Succeeds at every step without spawning anything.
struct NoopExecutor;

#[async_trait]
impl Executor for NoopExecutor {
    async fn execute(&self, command: &StepCommand) -> io::Result<CommandOutput> {
        if command.step == ToolStep::RunTests {
            if let Some(path) = command
                .args
                .iter()
                .find_map(|a| a.strip_prefix("--cov-report=xml:"))
            {
                std::fs::write(path, "")?;
            }
        }
        Ok(CommandOutput {
            exit_code: Some(0),
            output: String::new(),
        })
    }
}

fn bench_planning(c: &mut Criterion) {
    let orchestration = Orchestration::from_toml_str(BENCH_CONFIG).unwrap();

    c.bench_function("expand_and_plan", |b| {
        b.iter(|| {
            let cells = expand_matrix(black_box(&orchestration.config.matrix)).unwrap();
            plan_execution(cells, None, Some(3), Some(1)).unwrap()
        });
    });
}

fn bench_run_matrix(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let project = tempfile::tempdir().unwrap();
    let orchestration = Orchestration::from_toml_str(BENCH_CONFIG).unwrap();
    let cells = expand_matrix(&orchestration.config.matrix).unwrap();
    let ctx = Arc::new(CellContext {
        orchestration,
        executor: Arc::new(NoopExecutor),
        project_root: project.path().to_path_buf(),
        secret: Some("bench-license".to_string()),
        workdir_base: None,
    });

    c.bench_function("run_matrix_noop", |b| {
        b.to_async(&rt).iter(|| async {
            let summary =
                run_matrix(cells.clone(), ctx.clone(), 4, CancellationToken::new()).await;
            assert!(summary.is_success());
        });
    });
}

criterion_group!(benches, bench_planning, bench_run_matrix);
criterion_main!(benches);
