//! Deep merge functionality for YAML configurations.
//!
//! Implements key-by-key merging where overlay values override base values.
//! Sequences and integer-keyed entries are appended, never overwritten by index.

use super::types::ConfigMapping;
use serde_yaml::Value;

/// Deep merge two mappings, with `overlay` taking precedence over `base`.
///
/// - Integer keys: appended under the next free index when already present in base
/// - Sequences on both sides: overlay entries are appended to base entries
/// - Mappings on both sides: merged recursively
/// - Anything else (scalars, nulls, type changes): overlay replaces base
///
/// Neither input is modified.
///
/// # Example
/// ```
/// use magerun_config::config::deep_merge;
///
/// let base = serde_yaml::from_str("server: { port: 8080, host: localhost }\nfeatures: [a, b]")
///     .unwrap();
/// let overlay = serde_yaml::from_str("server: { port: 9000 }\nfeatures: [c]").unwrap();
/// let merged = deep_merge(&base, &overlay);
/// let expected: serde_yaml::Mapping =
///     serde_yaml::from_str("server: { port: 9000, host: localhost }\nfeatures: [a, b, c]")
///         .unwrap();
/// assert_eq!(merged, expected);
/// ```
pub fn deep_merge(base: &ConfigMapping, overlay: &ConfigMapping) -> ConfigMapping {
    let mut merged = base.clone();
    merge_into(&mut merged, overlay);
    merged
}

/// Merge multiple mappings in order, with later mappings taking precedence.
///
/// Equivalent to folding `deep_merge` over the list, starting from an empty mapping.
pub fn deep_merge_all<'a>(layers: impl IntoIterator<Item = &'a ConfigMapping>) -> ConfigMapping {
    let mut merged = ConfigMapping::new();
    for layer in layers {
        merge_into(&mut merged, layer);
    }
    merged
}

fn merge_into(base: &mut ConfigMapping, overlay: &ConfigMapping) {
    for (key, overlay_value) in overlay {
        if is_index_key(key) {
            if base.contains_key(key) {
                let next = next_index(base);
                base.insert(Value::Number(next.into()), overlay_value.clone());
            } else {
                base.insert(key.clone(), overlay_value.clone());
            }
            continue;
        }

        if let Some(base_value) = base.get_mut(key) {
            match (base_value, overlay_value) {
                (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
                    merge_into(base_map, overlay_map);
                    continue;
                }
                (Value::Sequence(base_seq), Value::Sequence(overlay_seq)) => {
                    base_seq.extend(overlay_seq.iter().cloned());
                    continue;
                }
                _ => {}
            }
        }

        base.insert(key.clone(), overlay_value.clone());
    }
}

fn is_index_key(key: &Value) -> bool {
    matches!(key, Value::Number(n) if n.is_i64() || n.is_u64())
}

/// One past the largest integer key, or 0 when there is none.
///
/// When the largest key is `i64::MAX` the lowest unused non-negative index is
/// used instead.
fn next_index(mapping: &ConfigMapping) -> i64 {
    let max = mapping
        .keys()
        .filter_map(|k| match k {
            Value::Number(n) => n.as_i64(),
            _ => None,
        })
        .max();

    match max {
        None => 0,
        Some(max) => max
            .checked_add(1)
            .unwrap_or_else(|| first_free_index(mapping)),
    }
}

fn first_free_index(mapping: &ConfigMapping) -> i64 {
    (0..=i64::MAX)
        .find(|index| !mapping.contains_key(Value::Number((*index).into())))
        .unwrap_or(i64::MAX)
}
