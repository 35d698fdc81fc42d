//! # Core Module / 核心模块
//!
//! This module contains the core functionality of the orchestrator:
//! data models, configuration, the per-cell components and the matrix
//! controller that ties them together.
//!
//! 此模块包含编排器的核心功能：
//! 数据模型、配置、各单元组件以及将它们串联起来的矩阵控制器。

pub mod config;
pub mod errors;
pub mod execution;
pub mod harness;
pub mod license;
pub mod models;
pub mod planner;
pub mod provision;
pub mod selector;
pub mod trigger;

// Re-exports
pub use execution::{CellContext, run_cell, run_matrix};
pub use models::{CellOutcome, MatrixSummary};
