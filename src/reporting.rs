//! # Reporting Module / 报告模块
//!
//! This module handles the generation and display of matrix reports in
//! multiple formats: a colored console summary, a styled HTML page and a
//! machine-readable JSON summary.
//!
//! 此模块处理多种格式的矩阵报告生成和显示：
//! 彩色控制台摘要、样式化 HTML 页面以及机器可读的 JSON 摘要。

pub mod console;
pub mod html;
pub mod json;

// Re-export common reporting functions
pub use console::{print_failure_details, print_summary};
pub use html::generate_html_report;
pub use json::write_json_report;
