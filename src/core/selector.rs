//! # Environment Selector / 环境选择器
//!
//! Maps a variant to exactly one environment entry. The table is total: it is
//! built once at startup and refuses a configuration that leaves any variant
//! unmapped, so lookups afterwards cannot fall through to a default.
//!
//! 将变体映射到唯一的环境条目。该映射表是完备的：它在启动时构建一次，
//! 并拒绝任何遗漏变体映射的配置，因此之后的查找不会落入默认值。

use std::collections::BTreeMap;

use crate::core::config::EnvironmentEntry;
use crate::core::errors::ConfigError;
use crate::core::models::{EnvironmentSpec, InterpreterVersion, Variant};

/// A closed, variant-indexed table of environment entries.
/// 以变体为索引的封闭环境条目表。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentTable {
    entries: [EnvironmentEntry; Variant::COUNT],
}

impl EnvironmentTable {
    /// Builds the table from the `[environments]` section.
    ///
    /// Fails with `UnknownVariant` for a key that names no variant, and with
    /// `UnmappedVariant` for a variant that has no key.
    ///
    /// 根据 `[environments]` 部分构建映射表。
    /// 键名不对应任何变体时返回 `UnknownVariant`，变体缺少键时返回 `UnmappedVariant`。
    pub fn from_config(raw: &BTreeMap<String, EnvironmentEntry>) -> Result<Self, ConfigError> {
        let mut slots: [Option<EnvironmentEntry>; Variant::COUNT] = Default::default();
        for (key, entry) in raw {
            let variant: Variant = key.parse()?;
            slots[variant.index()] = Some(entry.clone());
        }

        let mut entries = Vec::with_capacity(Variant::COUNT);
        for variant in Variant::ALL {
            let entry = slots[variant.index()]
                .take()
                .ok_or(ConfigError::UnmappedVariant(variant))?;
            entries.push(entry);
        }

        let entries = entries
            .try_into()
            .map_err(|_| ConfigError::UnmappedVariant(Variant::None))?;
        Ok(Self { entries })
    }

    pub fn entry(&self, variant: Variant) -> &EnvironmentEntry {
        &self.entries[variant.index()]
    }

    /// The environment spec for a known variant. Infallible: the table is total.
    /// 已知变体的环境规格。不会失败：映射表是完备的。
    pub fn spec_for(&self, variant: Variant, version: &InterpreterVersion) -> EnvironmentSpec {
        let entry = self.entry(variant);
        EnvironmentSpec {
            name: variant.as_str().to_string(),
            manifest_path: entry.manifest.clone(),
            interpreter_version: version.clone(),
            requires_capability: entry.requires_capability,
        }
    }
}

/// Resolves a variant identifier, as received from the trigger, to its
/// environment spec. The manifest path is returned unchanged.
///
/// Pure lookup. An undeclared variant is a deployment defect and fails with
/// [`ConfigError::UnknownVariant`].
///
/// 将从触发器收到的变体标识解析为其环境规格。清单路径原样返回。
/// 纯查找操作。未声明的变体属于部署缺陷，返回 [`ConfigError::UnknownVariant`]。
pub fn select_environment(
    table: &EnvironmentTable,
    variant: &str,
    version: &InterpreterVersion,
) -> Result<EnvironmentSpec, ConfigError> {
    let variant: Variant = variant.parse()?;
    Ok(table.spec_for(variant, version))
}
