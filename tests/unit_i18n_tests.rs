//! # I18n Unit Tests / 国际化单元测试
//!
//! Locale resolution and the translated CLI output.
//!
//! 语言区域解析以及翻译后的命令行输出。

mod common;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

use matrix_orchestrator::resolve_locale;

#[test]
fn test_exact_locales_are_kept() {
    assert_eq!(resolve_locale("en"), "en");
    assert_eq!(resolve_locale("zh-CN"), "zh-CN");
}

#[test]
fn test_system_locales_fall_back_to_their_language() {
    assert_eq!(resolve_locale("en-US"), "en");
    assert_eq!(resolve_locale("en_GB"), "en");
    assert_eq!(resolve_locale("zh-TW"), "zh-CN");
    assert_eq!(resolve_locale("ZH"), "zh-CN");
}

#[test]
fn test_unknown_locales_fall_back_to_english() {
    assert_eq!(resolve_locale("fr-FR"), "en");
    assert_eq!(resolve_locale(""), "en");
}

#[test]
fn test_lang_flag_translates_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("TestMatrix.toml");
    std::fs::write(&config, common::TEST_CONFIG).unwrap();

    Command::cargo_bin("matrix-orchestrator")
        .unwrap()
        .env("NO_COLOR", "1")
        .arg("plan")
        .arg("--lang=zh-CN")
        .arg("--config")
        .arg(&config)
        .arg("--all-os")
        .assert()
        .success()
        .stdout(predicate::str::contains("计划运行 4 / 4 个单元"));
}

#[test]
fn test_config_language_applies_without_lang_flag() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("TestMatrix.toml");
    std::fs::write(
        &config,
        common::TEST_CONFIG.replace("language = \"en\"", "language = \"zh-CN\""),
    )
    .unwrap();

    Command::cargo_bin("matrix-orchestrator")
        .unwrap()
        .env("NO_COLOR", "1")
        .arg("plan")
        .arg("--config")
        .arg(&config)
        .arg("--all-os")
        .assert()
        .success()
        .stdout(predicate::str::contains("计划运行"));
}
