//! # Planner Module Unit Tests / Planner 模块单元测试
//!
//! Matrix expansion and execution planning: declared order, duplicates,
//! exclusions, host filtering and splitting across runners.
//!
//! 矩阵展开与执行计划：声明顺序、重复项、排除规则、主机过滤以及跨运行器拆分。

use std::collections::HashSet;

use matrix_orchestrator::core::config::{ExcludeRule, MatrixConfig};
use matrix_orchestrator::core::errors::ConfigError;
use matrix_orchestrator::core::models::{MatrixCell, Os, Variant};
use matrix_orchestrator::core::planner::{expand_matrix, plan_execution};

fn matrix(os: &[Os], versions: &[&str], variants: &[Variant]) -> MatrixConfig {
    MatrixConfig {
        os: os.to_vec(),
        interpreter_versions: versions.iter().map(|v| v.parse().unwrap()).collect(),
        variants: variants.to_vec(),
        exclude: Vec::new(),
    }
}

fn ids(cells: &[MatrixCell]) -> Vec<String> {
    cells.iter().map(MatrixCell::id).collect()
}

#[cfg(test)]
mod expand_tests {
    use super::*;

    #[test]
    fn test_expansion_follows_declared_order() {
        let config = matrix(
            &[Os::Macos, Os::Linux],
            &["3.8", "3.7"],
            &[Variant::ExtraA, Variant::None],
        );
        let cells = expand_matrix(&config).unwrap();
        assert_eq!(
            ids(&cells),
            vec![
                "macos-3.8-extra_a",
                "macos-3.8-none",
                "macos-3.7-extra_a",
                "macos-3.7-none",
                "linux-3.8-extra_a",
                "linux-3.8-none",
                "linux-3.7-extra_a",
                "linux-3.7-none",
            ]
        );
    }

    #[test]
    fn test_duplicates_are_kept_once_at_first_position() {
        let config = matrix(
            &[Os::Linux, Os::Linux],
            &["3.7", "3.7"],
            &[Variant::None, Variant::ExtraA, Variant::None],
        );
        let cells = expand_matrix(&config).unwrap();
        assert_eq!(ids(&cells), vec!["linux-3.7-none", "linux-3.7-extra_a"]);
    }

    #[test]
    fn test_exclude_rules_drop_matching_cells() {
        let mut config = matrix(&[Os::Linux, Os::Windows], &["3.7"], &Variant::ALL);
        config.exclude.push(ExcludeRule {
            os: Some(Os::Windows),
            variant: Some(Variant::ExtraA),
            ..Default::default()
        });

        let cells = expand_matrix(&config).unwrap();
        assert_eq!(
            ids(&cells),
            vec!["linux-3.7-none", "linux-3.7-extra_a", "windows-3.7-none"]
        );
    }

    #[test]
    fn test_empty_matrix_is_a_config_error() {
        assert_eq!(
            expand_matrix(&matrix(&[], &["3.7"], &Variant::ALL)),
            Err(ConfigError::EmptyMatrix)
        );

        let mut everything_excluded = matrix(&[Os::Linux], &["3.7"], &Variant::ALL);
        everything_excluded.exclude.push(ExcludeRule::default());
        assert_eq!(
            expand_matrix(&everything_excluded),
            Err(ConfigError::EmptyMatrix)
        );
    }
}

#[cfg(test)]
mod plan_tests {
    use super::*;

    fn six_cells() -> Vec<MatrixCell> {
        expand_matrix(&matrix(
            &[Os::Linux, Os::Macos, Os::Windows],
            &["3.7"],
            &Variant::ALL,
        ))
        .unwrap()
    }

    #[test]
    fn test_host_filter_keeps_only_host_cells() {
        let plan = plan_execution(six_cells(), Some(Os::Macos), None, None).unwrap();
        assert_eq!(ids(&plan.cells_to_run), vec!["macos-3.7-none", "macos-3.7-extra_a"]);
        assert_eq!(plan.filtered_os_count, 4);
        assert!(!plan.is_distributed);
    }

    #[test]
    fn test_no_host_filter_keeps_everything() {
        let plan = plan_execution(six_cells(), None, None, None).unwrap();
        assert_eq!(plan.cells_to_run.len(), 6);
        assert_eq!(plan.filtered_os_count, 0);
    }

    #[test]
    fn test_runners_split_cells_round_robin() {
        let plan = plan_execution(six_cells(), None, Some(4), Some(1)).unwrap();
        assert!(plan.is_distributed);
        assert_eq!(
            ids(&plan.cells_to_run),
            vec!["linux-3.7-extra_a", "windows-3.7-extra_a"]
        );
    }

    #[test]
    fn test_runner_shares_partition_the_matrix() {
        let total = 4;
        let mut seen = HashSet::new();
        let mut count = 0;
        for index in 0..total {
            let plan = plan_execution(six_cells(), None, Some(total), Some(index)).unwrap();
            count += plan.cells_to_run.len();
            seen.extend(ids(&plan.cells_to_run));
        }
        assert_eq!(count, 6);
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn test_invalid_runner_arguments() {
        let zero = plan_execution(six_cells(), None, Some(0), Some(0)).unwrap_err();
        assert!(zero.to_string().contains("greater than zero"));

        let out_of_range = plan_execution(six_cells(), None, Some(2), Some(2)).unwrap_err();
        assert!(out_of_range.to_string().contains("less than total runners"));

        let half = plan_execution(six_cells(), None, Some(2), None).unwrap_err();
        assert!(half.to_string().contains("must be provided"));
    }
}
