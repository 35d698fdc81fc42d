//! # File System Operations Module / 文件系统操作模块
//!
//! This module provides utilities for file system operations,
//! such as creating the isolated per-cell work directory.
//!
//! 此模块提供文件系统操作的实用功能，例如创建每个单元独立的工作目录。

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Turns a cell id into something safe to use in a directory name.
/// 将单元标识转换为可安全用于目录名称的字符串。
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

/// Creates a unique, temporary work directory for one cell.
/// The directory and everything in it (environment prefix, license file,
/// coverage report) is removed when the returned `TempDir` is dropped.
///
/// # Arguments
/// * `base` - Optional parent directory; the system temp dir is used when `None`
/// * `cell_id` - Id of the cell, used to make the directory recognizable
///
/// 为单个单元创建唯一的临时工作目录。
/// 当返回的 `TempDir` 被丢弃时，该目录及其中的所有内容
/// （环境前缀、许可证文件、覆盖率报告）都会被删除。
pub fn create_cell_workdir(base: Option<&Path>, cell_id: &str) -> std::io::Result<TempDir> {
    let prefix = format!("matrix_orchestrator_{}_", sanitize(cell_id));
    let mut builder = tempfile::Builder::new();
    builder.prefix(&prefix);
    match base {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            builder.tempdir_in(dir)
        }
        None => builder.tempdir(),
    }
}

/// Gets the absolute path from a potentially relative path.
///
/// # Arguments
/// * `path` - Path to canonicalize
///
/// # Returns
/// Canonicalized absolute path, or an error if the path doesn't exist
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).with_context(|| format!("Failed to resolve path: {}", path.display()))
}

/// Resolves `path` against `root` unless it is already absolute.
/// 除非 `path` 已是绝对路径，否则相对于 `root` 解析它。
pub fn resolve_against(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
