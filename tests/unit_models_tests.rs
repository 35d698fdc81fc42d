//! # Models Module Unit Tests / Models 模块单元测试
//!
//! Parsing of the matrix axes, cell identity and the cell state machine.
//!
//! 矩阵维度的解析、单元标识以及单元状态机。

use matrix_orchestrator::core::errors::ConfigError;
use matrix_orchestrator::core::models::{
    CellState, InterpreterVersion, MatrixCell, Os, Variant,
};

#[cfg(test)]
mod axis_parsing_tests {
    use super::*;

    #[test]
    fn test_os_accepts_plain_names_and_runner_labels() {
        assert_eq!("linux".parse::<Os>().unwrap(), Os::Linux);
        assert_eq!("ubuntu-latest".parse::<Os>().unwrap(), Os::Linux);
        assert_eq!("macOS-13".parse::<Os>().unwrap(), Os::Macos);
        assert_eq!("windows-2022".parse::<Os>().unwrap(), Os::Windows);
    }

    #[test]
    fn test_unknown_os_is_rejected() {
        assert_eq!(
            "solaris".parse::<Os>(),
            Err(ConfigError::UnknownOs("solaris".to_string()))
        );
    }

    #[test]
    fn test_interpreter_version_validation() {
        for ok in ["3", "3.7", "3.10.4"] {
            assert_eq!(ok.parse::<InterpreterVersion>().unwrap().as_str(), ok);
        }
        for bad in ["", "3.", "three", "3.7.1.2", "3.x"] {
            assert_eq!(
                bad.parse::<InterpreterVersion>(),
                Err(ConfigError::InvalidVersion(bad.to_string())),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_variant_parsing_is_lenient_about_case_and_dashes() {
        assert_eq!("none".parse::<Variant>().unwrap(), Variant::None);
        assert_eq!("EXTRA-A".parse::<Variant>().unwrap(), Variant::ExtraA);
        assert_eq!(
            "extra_b".parse::<Variant>(),
            Err(ConfigError::UnknownVariant("extra_b".to_string()))
        );
    }

    #[test]
    fn test_axes_deserialize_through_validation() {
        #[derive(serde::Deserialize)]
        struct Axes {
            os: Os,
            version: InterpreterVersion,
            variant: Variant,
        }

        let axes: Axes =
            toml::from_str("os = \"ubuntu-latest\"\nversion = \"3.8\"\nvariant = \"extra_a\"")
                .unwrap();
        assert_eq!(axes.os, Os::Linux);
        assert_eq!(axes.version.as_str(), "3.8");
        assert_eq!(axes.variant, Variant::ExtraA);

        assert!(toml::from_str::<Axes>("os = \"linux\"\nversion = \"3.8b\"\nvariant = \"none\"").is_err());
    }
}

#[cfg(test)]
mod cell_tests {
    use super::*;

    #[test]
    fn test_cell_id_is_stable() {
        let cell = MatrixCell::new(Os::Macos, "3.7".parse().unwrap(), Variant::ExtraA);
        assert_eq!(cell.id(), "macos-3.7-extra_a");
        assert_eq!(cell.to_string(), cell.id());
    }
}

#[cfg(test)]
mod state_machine_tests {
    use super::*;
    use CellState::*;

    #[test]
    fn test_forward_transitions_follow_the_lifecycle() {
        assert!(Pending.can_transition_to(Provisioning));
        assert!(Provisioning.can_transition_to(Verifying));
        assert!(Verifying.can_transition_to(Testing));
        assert!(Testing.can_transition_to(Reported));

        assert!(!Pending.can_transition_to(Testing));
        assert!(!Provisioning.can_transition_to(Testing));
        assert!(!Verifying.can_transition_to(Reported));
    }

    #[test]
    fn test_failed_is_reachable_from_every_live_state() {
        for state in [Pending, Provisioning, Verifying, Testing] {
            assert!(state.can_transition_to(Failed), "{state}");
            assert!(!state.is_terminal());
        }
    }

    #[test]
    fn test_terminal_states_have_no_successor() {
        for terminal in [Reported, Failed] {
            assert!(terminal.is_terminal());
            for next in [Pending, Provisioning, Verifying, Testing, Reported, Failed] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }
}
