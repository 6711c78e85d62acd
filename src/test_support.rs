//! Test-only builders for configuration trees and mounts.

use crate::core::mount::MountSpec;
use crate::core::value::ConfigValue;

/// String scalar.
pub fn s(value: &str) -> ConfigValue {
    ConfigValue::String(value.to_string())
}

/// Sequence of values.
pub fn seq(items: Vec<ConfigValue>) -> ConfigValue {
    ConfigValue::Sequence(items)
}

/// Mapping from string keys.
pub fn map(entries: Vec<(&str, ConfigValue)>) -> ConfigValue {
    ConfigValue::Mapping(
        entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect(),
    )
}

/// Mount between two absolute paths.
pub fn mount(host: &str, container: &str) -> MountSpec {
    MountSpec::new(host, container).expect("valid mount")
}
