//! # Command Map
//!
//! Hierarchical, concurrent lookup for registered commands. Slash commands
//! key on their whitespace-delimited path; component and modal handlers key
//! on delimiter-split custom ids with wildcard leaves.
//!
//! Nodes use concurrent maps for children and exact leaves, so lookups never
//! block behind registration. Wildcard leaves live in an insertion-ordered
//! bucket: when several patterns match one custom id, the first registered
//! wins. Removal never reclaims empty intermediate nodes; the node count is
//! bounded by the total number of commands ever registered.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.1.0: Wildcard leaves with normalized-pattern duplicate detection
//! - 1.0.0: Exact path trie

pub mod wildcard;

use std::sync::{Arc, RwLock};

use dashmap::DashMap;

use crate::core::InteractionError;
use wildcard::{CompiledPattern, WildcardSyntax};

pub use wildcard::split_pattern;

/// A successful lookup: the stored value plus any wildcard captures in
/// pattern order.
#[derive(Debug, Clone)]
pub struct SearchResult<T> {
    pub value: T,
    pub captures: Vec<(String, String)>,
}

struct WildcardEntry<T> {
    pattern: CompiledPattern,
    value: T,
}

struct CommandMapNode<T> {
    children: DashMap<String, Arc<CommandMapNode<T>>>,
    exact: DashMap<String, T>,
    wildcards: RwLock<Vec<WildcardEntry<T>>>,
}

impl<T> CommandMapNode<T> {
    fn new() -> Self {
        CommandMapNode {
            children: DashMap::new(),
            exact: DashMap::new(),
            wildcards: RwLock::new(Vec::new()),
        }
    }
}

/// One trie of registered commands.
pub struct CommandMap<T: Clone> {
    root: Arc<CommandMapNode<T>>,
    syntax: WildcardSyntax,
}

impl<T: Clone> CommandMap<T> {
    pub fn new(syntax: WildcardSyntax) -> Self {
        CommandMap {
            root: Arc::new(CommandMapNode::new()),
            syntax,
        }
    }

    fn descend_or_create(&self, path: &[String]) -> Arc<CommandMapNode<T>> {
        let mut node = Arc::clone(&self.root);
        for segment in path {
            let next = node
                .children
                .entry(segment.clone())
                .or_insert_with(|| Arc::new(CommandMapNode::new()))
                .clone();
            node = next;
        }
        node
    }

    /// Insert a value at `path`. When `allow_wildcards` is set and the last
    /// segment uses the wildcard syntax, the segment is compiled into an
    /// anchored regex leaf; otherwise it is an exact leaf. A duplicate exact
    /// key or a wildcard with an identical normalized pattern is refused.
    pub fn insert(
        &self,
        path: &[String],
        value: T,
        allow_wildcards: bool,
    ) -> Result<(), InteractionError> {
        let (last, prefix) = path.split_last().ok_or_else(|| {
            InteractionError::parse_failed("cannot insert a command at an empty path")
        })?;
        let node = self.descend_or_create(prefix);

        if allow_wildcards {
            if let Some(pattern) = wildcard::compile(last, &self.syntax)? {
                let mut bucket = node.wildcards.write().unwrap();
                if bucket
                    .iter()
                    .any(|entry| entry.pattern.normalized == pattern.normalized)
                {
                    return Err(InteractionError::DuplicateCommand {
                        path: path.join(" "),
                    });
                }
                bucket.push(WildcardEntry { pattern, value });
                return Ok(());
            }
        }

        let result = match node.exact.entry(last.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(InteractionError::DuplicateCommand {
                path: path.join(" "),
            }),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(value);
                Ok(())
            }
        };
        result
    }

    /// Look up `path`, preferring an exact leaf over wildcard leaves. On a
    /// wildcard hit the captures are returned as `(name, value)` pairs in
    /// pattern order.
    pub fn lookup(&self, path: &[&str]) -> Result<SearchResult<T>, InteractionError> {
        let miss = || InteractionError::UnknownCommand {
            path: path.join(" "),
        };
        let (last, prefix) = path.split_last().ok_or_else(miss)?;

        let mut node = Arc::clone(&self.root);
        for segment in prefix {
            let next = node.children.get(*segment).map(|n| Arc::clone(&n));
            node = next.ok_or_else(miss)?;
        }

        if let Some(value) = node.exact.get(*last) {
            return Ok(SearchResult {
                value: value.clone(),
                captures: Vec::new(),
            });
        }

        let bucket = node.wildcards.read().unwrap();
        for entry in bucket.iter() {
            if let Some(found) = entry.pattern.regex.captures(last) {
                let captures = entry
                    .pattern
                    .capture_names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| {
                        let value = found.get(i + 1).map(|m| m.as_str()).unwrap_or_default();
                        (name.clone(), value.to_string())
                    })
                    .collect();
                return Ok(SearchResult {
                    value: entry.value.clone(),
                    captures,
                });
            }
        }

        Err(miss())
    }

    /// Remove the value at `path`. Wildcard leaves are matched by normalized
    /// pattern. Intermediate nodes are left in place.
    pub fn remove(&self, path: &[String], allow_wildcards: bool) -> bool {
        let Some((last, prefix)) = path.split_last() else {
            return false;
        };

        let mut node = Arc::clone(&self.root);
        for segment in prefix {
            let Some(next) = node.children.get(segment).map(|n| Arc::clone(&n)) else {
                return false;
            };
            node = next;
        }

        if allow_wildcards {
            if let Ok(Some(pattern)) = wildcard::compile(last, &self.syntax) {
                let mut bucket = node.wildcards.write().unwrap();
                let before = bucket.len();
                bucket.retain(|entry| entry.pattern.normalized != pattern.normalized);
                return bucket.len() != before;
            }
        }

        node.exact.remove(last).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;

    fn map() -> CommandMap<u32> {
        CommandMap::new(WildcardSyntax::default())
    }

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_insert_and_lookup() {
        let map = map();
        map.insert(&path(&["ping"]), 1, false).unwrap();
        map.insert(&path(&["admin", "kick"]), 2, false).unwrap();

        assert_eq!(map.lookup(&["ping"]).unwrap().value, 1);
        let found = map.lookup(&["admin", "kick"]).unwrap();
        assert_eq!(found.value, 2);
        assert!(found.captures.is_empty());
    }

    #[test]
    fn test_lookup_miss_is_unknown_command() {
        let map = map();
        map.insert(&path(&["ping"]), 1, false).unwrap();

        let err = map.lookup(&["pong"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownCommand);
        let err = map.lookup(&["admin", "kick"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownCommand);
    }

    #[test]
    fn test_duplicate_exact_insert_refused() {
        let map = map();
        map.insert(&path(&["ping"]), 1, false).unwrap();
        let err = map.insert(&path(&["ping"]), 2, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateCommand);
    }

    #[test]
    fn test_wildcard_capture() {
        let map = map();
        map.insert(&path(&["vote:{id:int}"]), 7, true).unwrap();

        let found = map.lookup(&["vote:42"]).unwrap();
        assert_eq!(found.value, 7);
        assert_eq!(found.captures, vec![("id".to_string(), "42".to_string())]);
    }

    #[test]
    fn test_exact_preferred_over_wildcard() {
        let map = map();
        map.insert(&path(&["vote:{id}"]), 1, true).unwrap();
        map.insert(&path(&["vote:special"]), 2, true).unwrap();

        assert_eq!(map.lookup(&["vote:special"]).unwrap().value, 2);
        assert_eq!(map.lookup(&["vote:other"]).unwrap().value, 1);
    }

    #[test]
    fn test_first_inserted_wildcard_wins() {
        let map = map();
        map.insert(&path(&["p:{id:int}"]), 1, true).unwrap();
        map.insert(&path(&["p:{token}"]), 2, true).unwrap();

        // "p:42" matches both; the earlier insertion wins.
        assert_eq!(map.lookup(&["p:42"]).unwrap().value, 1);
        // "p:abc" only matches the alpha pattern.
        assert_eq!(map.lookup(&["p:abc"]).unwrap().value, 2);
    }

    #[test]
    fn test_duplicate_normalized_pattern_refused() {
        let map = map();
        map.insert(&path(&["a:{x}"]), 1, true).unwrap();
        let err = map.insert(&path(&["a:{y}"]), 2, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateCommand);
    }

    #[test]
    fn test_wildcards_disabled_are_literal() {
        let map = map();
        map.insert(&path(&["literal:{id}"]), 1, false).unwrap();

        assert_eq!(map.lookup(&["literal:{id}"]).unwrap().value, 1);
        assert!(map.lookup(&["literal:42"]).is_err());
    }

    #[test]
    fn test_remove_exact_and_wildcard() {
        let map = map();
        map.insert(&path(&["ping"]), 1, false).unwrap();
        map.insert(&path(&["vote:{id}"]), 2, true).unwrap();

        assert!(map.remove(&path(&["ping"]), false));
        assert!(!map.remove(&path(&["ping"]), false));
        assert!(map.lookup(&["ping"]).is_err());

        assert!(map.remove(&path(&["vote:{renamed}"]), true));
        assert!(map.lookup(&["vote:42"]).is_err());
    }

    #[test]
    fn test_multi_segment_wildcard_leaf() {
        let map = map();
        map.insert(&path(&["game", "move:{square:alpha}"]), 9, true)
            .unwrap();

        let found = map.lookup(&["game", "move:e4"]).unwrap();
        assert_eq!(found.value, 9);
        assert_eq!(
            found.captures,
            vec![("square".to_string(), "e4".to_string())]
        );
    }

    #[test]
    fn test_concurrent_insert_and_lookup() {
        use std::sync::Arc as StdArc;
        let map = StdArc::new(map());
        let mut handles = Vec::new();

        for i in 0..8u32 {
            let map = StdArc::clone(&map);
            handles.push(std::thread::spawn(move || {
                map.insert(&path(&["cmd", &format!("sub{i}")]), i, false)
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        for i in 0..8u32 {
            let sub = format!("sub{i}");
            assert_eq!(map.lookup(&["cmd", &sub]).unwrap().value, i);
        }
    }
}
