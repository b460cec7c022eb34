//! Configuration value types and key-path helpers.

use serde::Serialize;
use serde_yaml::{Mapping, Value};

/// An ordered configuration tree: string or integer keys, scalar, sequence or
/// nested mapping values.
pub type ConfigMapping = Mapping;

/// Origin of one layer in the cascade, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigLayer {
    /// Baseline config shipped with the tool (lowest priority)
    Dist = 0,
    /// Config files found in plugin module folders
    Plugin = 1,
    /// System-wide config (/etc or %WINDIR%)
    System = 2,
    /// Per-user config in the home directory
    User = 3,
    /// Project config under app/etc of the project root
    Project = 4,
    /// Dotfile next to the stop file, merged onto the project layer
    StopFile = 5,
    /// Caller-supplied runtime overrides (highest priority)
    Initial = 6,
}

impl std::fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigLayer::Dist => write!(f, "dist"),
            ConfigLayer::Plugin => write!(f, "plugin"),
            ConfigLayer::System => write!(f, "system"),
            ConfigLayer::User => write!(f, "user"),
            ConfigLayer::Project => write!(f, "project"),
            ConfigLayer::StopFile => write!(f, "stopfile"),
            ConfigLayer::Initial => write!(f, "initial"),
        }
    }
}

/// Descend `mapping` key by key.
///
/// A segment matches a string key first, then an integer key with the same
/// digits; inside a sequence it is used as an index. Returns `None` as soon
/// as a segment is absent, and for an empty path.
pub fn lookup<'a, S: AsRef<str>>(mapping: &'a ConfigMapping, keys: &[S]) -> Option<&'a Value> {
    let (first, rest) = keys.split_first()?;
    lookup_value(mapping_entry(mapping, first.as_ref())?, rest)
}

/// Descend from any value. An empty path yields `value` itself.
pub fn lookup_value<'a, S: AsRef<str>>(value: &'a Value, keys: &[S]) -> Option<&'a Value> {
    let mut current = value;

    for key in keys {
        let key = key.as_ref();
        current = match current {
            Value::Mapping(map) => mapping_entry(map, key)?,
            Value::Sequence(seq) => seq.get(key.parse::<usize>().ok()?)?,
            Value::Tagged(tagged) => match &tagged.value {
                Value::Mapping(map) => mapping_entry(map, key)?,
                _ => return None,
            },
            _ => return None,
        };
    }

    Some(current)
}

fn mapping_entry<'a>(mapping: &'a ConfigMapping, key: &str) -> Option<&'a Value> {
    if let Some(value) = mapping.get(key) {
        return Some(value);
    }
    let index = key.parse::<i64>().ok()?;
    mapping.get(Value::Number(index.into()))
}

/// Insert `value` at the nested key path, creating intermediate mappings.
///
/// Non-mapping values found along the way are replaced. An empty path is a
/// no-op.
pub fn insert_path<S: AsRef<str>>(mapping: &mut ConfigMapping, keys: &[S], value: Value) {
    let Some((last, parents)) = keys.split_last() else {
        return;
    };

    let mut current = mapping;
    for key in parents {
        let key = Value::String(key.as_ref().to_string());
        let needs_reset = !matches!(current.get(&key), Some(Value::Mapping(_)));
        if needs_reset {
            current.insert(key.clone(), Value::Mapping(Mapping::new()));
        }
        current = match current.get_mut(&key) {
            Some(Value::Mapping(next)) => next,
            _ => return,
        };
    }

    current.insert(Value::String(last.as_ref().to_string()), value);
}

/// Render a scalar key or value the way the config files spell it.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A command alias declared under `commands.aliases`.
///
/// `cf: "cache:flush --reinit"` becomes name `cf`, command `cache:flush`,
/// params `["--reinit"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandAlias {
    pub name: String,
    pub command: String,
    pub params: Vec<String>,
}

impl CommandAlias {
    /// Parse one `alias: "command params..."` entry. Blank definitions yield `None`.
    pub fn parse(name: &str, definition: &str) -> Option<Self> {
        let mut words = definition.split_whitespace().map(str::to_string);
        let command = words.next()?;
        Some(Self {
            name: name.to_string(),
            command,
            params: words.collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(yaml: &str) -> ConfigMapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_lookup_nested() {
        let map = mapping("a:\n  b:\n    c: 42\n");
        assert_eq!(lookup(&map, &["a", "b", "c"]), Some(&Value::from(42)));
    }

    #[test]
    fn test_lookup_absent_path_is_none() {
        let map = mapping("a:\n  b: 1\n");
        assert_eq!(lookup(&map, &["a", "b", "c"]), None);
        assert_eq!(lookup(&map, &["x"]), None);
        assert_eq!(lookup::<&str>(&map, &[]), None);
    }

    #[test]
    fn test_lookup_sequence_index_and_integer_key() {
        let map = mapping("list: [a, b]\nnum:\n  7: seven\n");
        assert_eq!(lookup(&map, &["list", "1"]), Some(&Value::from("b")));
        assert_eq!(lookup(&map, &["num", "7"]), Some(&Value::from("seven")));
        assert_eq!(lookup(&map, &["list", "x"]), None);
    }

    #[test]
    fn test_lookup_value_empty_path_is_root() {
        let root = Value::Mapping(mapping("a: {b: 1}\n"));
        assert_eq!(lookup_value::<&str>(&root, &[]), Some(&root));
        assert_eq!(lookup_value(&root, &["a", "b"]), Some(&Value::from(1)));
        assert_eq!(lookup_value(&Value::from(3), &["a"]), None);
    }

    #[test]
    fn test_insert_path_creates_parents() {
        let mut map = mapping("a: 1\n");
        insert_path(&mut map, &["a", "b", "c"], Value::from(true));
        insert_path(&mut map, &["d"], Value::from("x"));
        assert_eq!(map, mapping("a:\n  b:\n    c: true\nd: x\n"));
    }

    #[test]
    fn test_command_alias_parse() {
        let alias = CommandAlias::parse("cf", "  cache:flush   --reinit -v ").unwrap();
        assert_eq!(alias.command, "cache:flush");
        assert_eq!(alias.params, vec!["--reinit", "-v"]);
        assert!(CommandAlias::parse("empty", "   ").is_none());
    }

    #[test]
    fn test_layer_order() {
        assert!(ConfigLayer::Dist < ConfigLayer::Plugin);
        assert!(ConfigLayer::Project < ConfigLayer::StopFile);
        assert!(ConfigLayer::StopFile < ConfigLayer::Initial);
        assert_eq!(ConfigLayer::StopFile.to_string(), "stopfile");
    }
}
