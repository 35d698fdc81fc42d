//! # Matrix Planner Module / 矩阵计划模块
//!
//! This module expands the declared matrix into cells and decides which of
//! them this runner executes, including filtering by host operating system
//! and handling distributed execution.
//!
//! 此模块将声明的矩阵展开为单元，并决定由当前运行器执行其中哪些单元，
//! 包括按主机操作系统过滤和处理分布式执行。

use anyhow::{Result, bail};
use std::collections::HashSet;

use crate::core::config::MatrixConfig;
use crate::core::errors::ConfigError;
use crate::core::models::{MatrixCell, Os};

/// Expands `os × interpreter_versions × variants` in declared order.
///
/// Duplicate combinations are kept once, at their first position, and cells
/// matching any `exclude` rule are dropped. A matrix that ends up empty is a
/// configuration defect.
///
/// 按声明顺序展开 `os × interpreter_versions × variants`。
/// 重复的组合只保留第一次出现的位置，匹配任何 `exclude` 规则的单元会被剔除。
/// 最终为空的矩阵属于配置缺陷。
pub fn expand_matrix(matrix: &MatrixConfig) -> Result<Vec<MatrixCell>, ConfigError> {
    let mut seen = HashSet::new();
    let mut cells = Vec::with_capacity(
        matrix.os.len() * matrix.interpreter_versions.len() * matrix.variants.len(),
    );

    for &os in &matrix.os {
        for version in &matrix.interpreter_versions {
            for &variant in &matrix.variants {
                let cell = MatrixCell::new(os, version.clone(), variant);
                if matrix.exclude.iter().any(|rule| rule.matches(&cell)) {
                    continue;
                }
                if seen.insert(cell.clone()) {
                    cells.push(cell);
                }
            }
        }
    }

    if cells.is_empty() {
        return Err(ConfigError::EmptyMatrix);
    }
    Ok(cells)
}

/// Represents a complete execution plan for a matrix.
/// 表示矩阵的完整执行计划。
#[derive(Debug)]
pub struct ExecutionPlan {
    /// The cells to execute, filtered by host OS and possibly distributed.
    /// 要执行的单元，按主机操作系统过滤并可能分布式执行。
    pub cells_to_run: Vec<MatrixCell>,
    /// The number of cells filtered out because they target another OS.
    /// 由于针对其他操作系统而被过滤掉的单元数量。
    pub filtered_os_count: usize,
    /// Whether the cells are distributed across multiple runners (CI environment).
    /// 单元是否分布在多个运行器上（CI 环境）。
    pub is_distributed: bool,
}

/// Creates an execution plan for the expanded cells.
///
/// # Arguments
/// * `cells` - The expanded matrix, in declared order
/// * `host_os` - Keep only cells for this OS; `None` keeps every cell
/// * `total_runners` - Optional total number of runners for distributed execution
/// * `runner_index` - Optional index of this runner (0-based)
///
/// 为展开后的单元创建执行计划。
pub fn plan_execution(
    cells: Vec<MatrixCell>,
    host_os: Option<Os>,
    total_runners: Option<usize>,
    runner_index: Option<usize>,
) -> Result<ExecutionPlan> {
    let (host_cells, filtered): (Vec<_>, Vec<_>) = cells
        .into_iter()
        .partition(|cell| host_os.is_none_or(|os| os == cell.os));

    let (cells_to_run, is_distributed) = match (total_runners, runner_index) {
        (Some(total), Some(index)) => {
            if total == 0 {
                bail!("Total runners must be greater than zero.");
            }
            if index >= total {
                bail!("Runner index must be less than total runners.");
            }
            let distributed: Vec<_> = host_cells
                .into_iter()
                .enumerate()
                .filter(|(i, _)| i % total == index)
                .map(|(_, cell)| cell)
                .collect();
            (distributed, true)
        }
        (None, None) => (host_cells, false),
        _ => bail!("Both --total-runners and --runner-index must be provided."),
    };

    Ok(ExecutionPlan {
        cells_to_run,
        filtered_os_count: filtered.len(),
        is_distributed,
    })
}
