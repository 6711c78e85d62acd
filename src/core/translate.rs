//! Tree translation: apply the path remapper to every path-like scalar.

use crate::core::mount::MountSpec;
use crate::core::remap::{Direction, remap_path};
use crate::core::value::ConfigValue;

/// Default path-likeness test: absolute, more than a bare `/`, single line.
///
/// Conservative on purpose. A missed path stays visible in the output where
/// it can be diagnosed; rewriting an opaque token would corrupt it silently.
pub fn default_path_predicate(scalar: &str) -> bool {
    scalar.starts_with('/') && scalar.len() > 1 && !scalar.contains('\n')
}

/// Rewrite every path-like string in `value` for the target namespace.
pub fn translate(value: &ConfigValue, direction: Direction, mounts: &[MountSpec]) -> ConfigValue {
    translate_with(value, direction, mounts, &default_path_predicate)
}

/// As [`translate`], with a caller-supplied path-likeness predicate.
///
/// Produces a new tree with identical shape: mapping keys, sequence lengths,
/// and nesting are untouched, and only string leaves that pass `is_path` and
/// fall under a mount are rewritten. Strings under no mount, and scalars the
/// remapper cannot handle, pass through unchanged; a single odd scalar never
/// aborts the walk. The input tree must be finite and acyclic, which the
/// data model guarantees.
pub fn translate_with(
    value: &ConfigValue,
    direction: Direction,
    mounts: &[MountSpec],
    is_path: &dyn Fn(&str) -> bool,
) -> ConfigValue {
    match value {
        ConfigValue::Mapping(entries) => ConfigValue::Mapping(
            entries
                .iter()
                .map(|(key, child)| {
                    (key.clone(), translate_with(child, direction, mounts, is_path))
                })
                .collect(),
        ),
        ConfigValue::Sequence(items) => ConfigValue::Sequence(
            items
                .iter()
                .map(|item| translate_with(item, direction, mounts, is_path))
                .collect(),
        ),
        ConfigValue::String(scalar) if is_path(scalar) => {
            match remap_path(scalar, direction, mounts) {
                Some(rewritten) => ConfigValue::String(rewritten),
                None => value.clone(),
            }
        }
        other => other.clone(),
    }
}
