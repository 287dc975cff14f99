//! Layered merging of TOML trees.

use std::collections::HashSet;

/// Dotted paths of the leaf fields set by a configuration file.
pub type FieldSources = HashSet<String>;

/// Deep-merge `overlay` into `base`, recording every leaf it sets.
///
/// - Tables merge recursively per-field.
/// - Scalars and arrays from the overlay **replace** the base value.
pub fn deep_merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };

                match base_table.get_mut(key) {
                    Some(base_val) if overlay_val.is_table() => {
                        deep_merge_tracking(base_val, overlay_val, &path, sources);
                    },
                    Some(base_val) => {
                        *base_val = overlay_val.clone();
                        sources.insert(path);
                    },
                    None => {
                        base_table.insert(key.clone(), overlay_val.clone());
                        record_all_leaves(overlay_val, &path, sources);
                    },
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            sources.insert(prefix.to_owned());
        },
    }
}

fn record_all_leaves(value: &toml::Value, path: &str, sources: &mut FieldSources) {
    match value {
        toml::Value::Table(table) => {
            for (key, child) in table {
                record_all_leaves(child, &format!("{path}.{key}"), sources);
            }
        },
        _ => {
            sources.insert(path.to_owned());
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_merge_replaces_scalars_and_keeps_siblings() {
        let mut base = parse("[logging]\nlevel = \"info\"\nformat = \"compact\"\n");
        let overlay = parse("[logging]\nlevel = \"debug\"\n");
        let mut sources = FieldSources::new();

        deep_merge_tracking(&mut base, &overlay, "", &mut sources);

        assert_eq!(base["logging"]["level"].as_str(), Some("debug"));
        assert_eq!(base["logging"]["format"].as_str(), Some("compact"));
        assert!(sources.contains("logging.level"));
        assert!(!sources.contains("logging.format"));
    }

    #[test]
    fn test_merge_replaces_arrays() {
        let mut base = parse("[authorizer]\nignored_resources = [\"a\", \"b\"]\n");
        let overlay = parse("[authorizer]\nignored_resources = [\"c\"]\n");
        let mut sources = FieldSources::new();

        deep_merge_tracking(&mut base, &overlay, "", &mut sources);

        let ignored = base["authorizer"]["ignored_resources"].as_array().unwrap();
        assert_eq!(ignored.len(), 1);
    }

    #[test]
    fn test_merge_records_new_tables() {
        let mut base = parse("[roles]\n");
        let overlay = parse("[roles]\neditor = [\"things,get\"]\n");
        let mut sources = FieldSources::new();

        deep_merge_tracking(&mut base, &overlay, "", &mut sources);

        assert!(sources.contains("roles.editor"));
    }
}
