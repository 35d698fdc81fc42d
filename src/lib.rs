//! # Matrix Orchestrator Library / Matrix Orchestrator 库
//!
//! This library provides the core functionality for the Matrix Orchestrator
//! tool, a configuration-driven CI orchestrator that expands an
//! operating system × interpreter version × variant matrix into independent
//! cells. Each cell provisions its own environment, activates a licensed
//! toolkit, runs the test suite with coverage and publishes the report.
//!
//! 此库为 Matrix Orchestrator 工具提供核心功能。
//! 这是一个配置驱动的 CI 编排器，它将操作系统 × 解释器版本 × 变体矩阵
//! 展开为相互独立的单元。每个单元准备自己的环境、激活授权工具包、
//! 在启用覆盖率的情况下运行测试套件并发布报告。
//!
//! ## Modules / 模块
//!
//! - `core` - Data models, configuration and the per-cell lifecycle
//! - `infra` - Command templates, process execution and work directories
//! - `reporting` - Console, HTML and JSON reports
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 数据模型、配置和单元生命周期
//! - `infra` - 命令模板、进程执行和工作目录
//! - `reporting` - 控制台、HTML 和 JSON 报告
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use core::config;
pub use core::execution;
pub use core::models;

/// Maps a requested locale onto one the translations exist for.
/// 将请求的语言区域映射到已有翻译的语言区域。
pub fn resolve_locale(requested: &str) -> String {
    let available_locales = rust_i18n::available_locales!();

    if available_locales.contains(&requested) {
        return requested.to_string();
    }
    requested
        .split(['-', '_'])
        .next()
        .and_then(|lang_code| {
            available_locales
                .iter()
                .find(|available| {
                    available
                        .split('-')
                        .next()
                        .is_some_and(|code| code.eq_ignore_ascii_case(lang_code))
                })
                .map(|available| available.to_string())
        })
        .unwrap_or_else(|| "en".to_string())
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
