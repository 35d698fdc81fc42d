//! # License, Selector and Trigger Unit Tests / 许可证、选择器与触发输入单元测试
//!
//! The small, synchronous pieces a cell is built from: writing the license
//! file, resolving a variant to its manifest, validating trigger inputs and
//! laying out the cell work directory.
//!
//! 构成单元的小型同步部件：写入许可证文件、将变体解析为清单、
//! 校验触发输入以及规划单元工作目录。

mod common;

use std::fs;
use std::path::{Path, PathBuf};

use common::{EXTRA_MANIFEST, NONE_MANIFEST, test_orchestration};
use matrix_orchestrator::core::config::{LicenseConfig, TestsConfig};
use matrix_orchestrator::core::errors::{ConfigError, MaterializeError};
use matrix_orchestrator::core::license::materialize_license;
use matrix_orchestrator::core::models::{Os, Variant};
use matrix_orchestrator::core::provision::CellLayout;
use matrix_orchestrator::core::selector::select_environment;
use matrix_orchestrator::core::trigger::{OS_ENV, TriggerInputs, VARIANT_ENV};
use matrix_orchestrator::infra::fs::{create_cell_workdir, resolve_against, sanitize};

#[cfg(test)]
mod materialize_tests {
    use super::*;

    #[test]
    fn test_secret_is_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("license.txt");

        materialize_license("KEY-123\nline two", &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "KEY-123\nline two");
    }

    #[test]
    fn test_materialize_is_idempotent_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("license.txt");

        materialize_license("old-secret-that-is-longer", &path).unwrap();
        materialize_license("new", &path).unwrap();
        materialize_license("new", &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_empty_secret_writes_an_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("license.txt");

        materialize_license("", &path).unwrap();
        assert!(path.exists());
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_unwritable_destination_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("license.txt");

        match materialize_license("secret", &path) {
            Err(MaterializeError::WriteFailed { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("expected WriteFailed, got {other:?}"),
        }
    }
}

#[cfg(test)]
mod selector_tests {
    use super::*;

    #[test]
    fn test_every_declared_variant_selects_its_manifest() {
        let orchestration = test_orchestration();
        let version = "3.7".parse().unwrap();

        let none = select_environment(&orchestration.environments, "none", &version).unwrap();
        let extra = select_environment(&orchestration.environments, "extra_a", &version).unwrap();

        assert_eq!(none.manifest_path, Path::new(NONE_MANIFEST));
        assert_eq!(extra.manifest_path, Path::new(EXTRA_MANIFEST));
        assert_eq!(extra.interpreter_version.as_str(), "3.7");
        assert!(extra.requires_capability);
    }

    #[test]
    fn test_selection_is_a_pure_lookup() {
        let orchestration = test_orchestration();
        let version = "3.8".parse().unwrap();
        let first = select_environment(&orchestration.environments, "extra_a", &version).unwrap();
        let second = select_environment(&orchestration.environments, "extra_a", &version).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_undeclared_variant_is_rejected() {
        let orchestration = test_orchestration();
        let version = "3.7".parse().unwrap();
        assert_eq!(
            select_environment(&orchestration.environments, "extra_b", &version),
            Err(ConfigError::UnknownVariant("extra_b".to_string()))
        );
    }
}

#[cfg(test)]
mod trigger_tests {
    use super::*;

    fn inputs(os: Option<&str>, version: Option<&str>, variant: Option<&str>) -> TriggerInputs {
        TriggerInputs {
            os: os.map(str::to_string),
            interpreter_version: version.map(str::to_string),
            variant: variant.map(str::to_string),
            secret: None,
        }
    }

    #[test]
    fn test_runner_labels_resolve_to_a_cell() {
        let cell = inputs(Some("ubuntu-latest"), Some("3.7"), Some("extra_a"))
            .resolve_cell()
            .unwrap();
        assert_eq!(cell.os, Os::Linux);
        assert_eq!(cell.variant, Variant::ExtraA);
        assert_eq!(cell.id(), "linux-3.7-extra_a");
    }

    #[test]
    fn test_missing_inputs_name_their_variable() {
        assert_eq!(
            inputs(None, Some("3.7"), Some("none")).resolve_cell(),
            Err(ConfigError::MissingInput(OS_ENV))
        );
        assert_eq!(
            inputs(Some("linux"), Some("3.7"), None).resolve_cell(),
            Err(ConfigError::MissingInput(VARIANT_ENV))
        );
    }

    #[test]
    fn test_invalid_inputs_are_rejected() {
        assert_eq!(
            inputs(Some("linux"), Some("3.7"), Some("extra_z")).resolve_cell(),
            Err(ConfigError::UnknownVariant("extra_z".to_string()))
        );
        assert_eq!(
            inputs(Some("linux"), Some("latest"), Some("none")).resolve_cell(),
            Err(ConfigError::InvalidVersion("latest".to_string()))
        );
    }

    #[test]
    fn test_unset_secret_reads_as_absent() {
        assert_eq!(
            TriggerInputs::read_secret("MATRIX_ORCHESTRATOR_SURELY_UNSET_SECRET"),
            None
        );
    }
}

#[cfg(test)]
mod layout_tests {
    use super::*;

    #[test]
    fn test_layout_places_files_inside_the_workdir() {
        let root = Path::new("/work/cell");
        let layout = CellLayout::new(root, &LicenseConfig::default(), &TestsConfig::default());

        assert_eq!(layout.env_dir, root.join("env"));
        assert_eq!(layout.license_file, root.join("license.txt"));
        assert_eq!(layout.coverage_file, root.join("coverage.xml"));
    }

    #[test]
    fn test_fixed_license_destination_wins() {
        let license = LicenseConfig {
            destination: Some(PathBuf::from("/opt/toolkit/license.txt")),
            ..LicenseConfig::default()
        };
        let layout = CellLayout::new(Path::new("/work/cell"), &license, &TestsConfig::default());
        assert_eq!(layout.license_file, PathBuf::from("/opt/toolkit/license.txt"));
    }

    #[test]
    fn test_resolve_against_keeps_absolute_paths() {
        let root = Path::new("/project");
        assert_eq!(resolve_against(root, Path::new("envs/a.yaml")), root.join("envs/a.yaml"));

        let absolute = std::env::temp_dir().join("a.yaml");
        assert_eq!(resolve_against(root, &absolute), absolute);
    }

    #[test]
    fn test_cell_workdir_is_named_and_removed_on_drop() {
        let base = tempfile::tempdir().unwrap();
        let workdir = create_cell_workdir(Some(base.path()), "linux-3.7-extra_a").unwrap();
        let path = workdir.path().to_path_buf();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("matrix_orchestrator_linux-3.7-extra_a_"));
        assert!(path.is_dir());

        drop(workdir);
        assert!(!path.exists());
        assert_eq!(sanitize("a/b c:d"), "a_b_c_d");
    }
}
