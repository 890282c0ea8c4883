//! Library configuration tree
//!
//! Options are addressed by dotted keys (`"use.react"`). The tree is plain
//! JSON so it can ship inside a boot program unchanged.
//!
//! Every spawned context boots with `LangConfig::default()`, never with the
//! parent's current tree.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json, json};

/// Configuration options for one context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LangConfig {
    tree: Json,
}

impl Default for LangConfig {
    fn default() -> Self {
        Self {
            tree: json!({ "use": { "react": true } }),
        }
    }
}

impl LangConfig {
    /// Set an option, creating intermediate tables as needed
    ///
    /// A non-table value sitting on the path is replaced by a table.
    pub fn lang(&mut self, key: &str, val: Json) {
        let pieces: Vec<&str> = key.split('.').collect();
        let tree = std::mem::take(&mut self.tree);
        self.tree = set_path(tree, &pieces, val);
    }

    /// Look up an option; `None` when any piece of the path is missing
    pub fn get_config(&self, key: &str) -> Option<&Json> {
        key.split('.')
            .try_fold(&self.tree, |node, piece| node.get(piece))
    }

    /// The whole tree
    pub fn as_json(&self) -> &Json {
        &self.tree
    }
}

/// Rebuild `node` with `val` stored at `path`
fn set_path(node: Json, path: &[&str], val: Json) -> Json {
    let Some((piece, rest)) = path.split_first() else {
        return val;
    };
    let mut table = match node {
        Json::Object(table) => table,
        _ => Map::new(),
    };
    let child = table.remove(*piece).unwrap_or(Json::Null);
    table.insert(piece.to_string(), set_path(child, rest, val));
    Json::Object(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tree() {
        let config = LangConfig::default();
        assert_eq!(config.get_config("use.react"), Some(&json!(true)));
        assert_eq!(config.get_config("use"), Some(&json!({ "react": true })));
    }

    #[test]
    fn test_missing_key() {
        let config = LangConfig::default();
        assert_eq!(config.get_config("use.vue"), None);
        assert_eq!(config.get_config("nothing.here.at.all"), None);
    }

    #[test]
    fn test_set_nested() {
        let mut config = LangConfig::default();
        config.lang("use.react", json!(false));
        config.lang("log.level.default", json!("debug"));
        assert_eq!(config.get_config("use.react"), Some(&json!(false)));
        assert_eq!(config.get_config("log.level.default"), Some(&json!("debug")));
    }

    #[test]
    fn test_set_through_scalar() {
        let mut config = LangConfig::default();
        config.lang("use.react.version", json!(18));
        assert_eq!(config.get_config("use.react.version"), Some(&json!(18)));
    }

    #[test]
    fn test_set_keeps_siblings() {
        let mut config = LangConfig::default();
        config.lang("use.vue", json!(true));
        config.lang("use", json!({ "react": false, "vue": true }));
        config.lang("use.svelte", json!(1));
        assert_eq!(
            config.as_json(),
            &json!({ "use": { "react": false, "vue": true, "svelte": 1 } })
        );
    }

    #[test]
    fn test_serializes_as_plain_tree() {
        let text = serde_json::to_string(&LangConfig::default()).unwrap();
        assert_eq!(text, r#"{"use":{"react":true}}"#);
    }
}
