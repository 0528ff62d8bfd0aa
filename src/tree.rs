//! Nested field/file trees built from flat bracket-notation keys.
//!
//! Form posts flatten nested structure into keys like `a[b][]`; this module
//! rebuilds the tree. The shape is discovered at runtime, so nodes are a
//! tagged variant over {scalar value, ordered list, ordered map} rather
//! than anything reflective. Map entries keep insertion order.

use indexmap::IndexMap;
use serde::ser::{Serialize, Serializer};

/// One node of a decoded form tree.
///
/// The leaf type is generic: field trees carry `String` leaves, file trees
/// carry placeholder ids during construction and upload handles after
/// substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<V> {
    /// A leaf value.
    Value(V),
    /// An ordered list, produced by append (`[]`) key segments.
    List(Vec<Node<V>>),
    /// An ordered map, produced by literal key segments.
    Map(IndexMap<String, Node<V>>),
}

impl<V> Node<V> {
    /// The leaf value, when this node is one.
    pub fn value(&self) -> Option<&V> {
        match self {
            Node::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Looks up a map entry by key.
    pub fn get(&self, key: &str) -> Option<&Node<V>> {
        match self {
            Node::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Indexes a list node; on a map node, falls back to the decimal key.
    ///
    /// The fallback makes maps whose keys form a contiguous `0..n-1` run
    /// read like lists. That is an access convenience only — numeric keys
    /// are stored as map entries, and map semantics stay authoritative.
    pub fn at(&self, index: usize) -> Option<&Node<V>> {
        match self {
            Node::List(items) => items.get(index),
            Node::Map(entries) => entries.get(index.to_string().as_str()),
            Node::Value(_) => None,
        }
    }

    /// Number of direct children; leaf values have none.
    pub fn len(&self) -> usize {
        match self {
            Node::Value(_) => 0,
            Node::List(items) => items.len(),
            Node::Map(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Node::Value(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Node::List(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Node::Map(_))
    }

    /// The list items, when this node is a list.
    pub fn as_list(&self) -> Option<&[Node<V>]> {
        match self {
            Node::List(items) => Some(items),
            _ => None,
        }
    }

    /// The map entries, when this node is a map.
    pub fn as_map(&self) -> Option<&IndexMap<String, Node<V>>> {
        match self {
            Node::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Consumes the tree, transforming every leaf with a fallible closure
    /// while keeping the structure intact. Used to substitute placeholder
    /// ids with upload handles after the file tree is built.
    pub fn try_map_values<W, E, F>(self, f: &mut F) -> Result<Node<W>, E>
    where
        F: FnMut(V) -> Result<W, E>,
    {
        Ok(match self {
            Node::Value(value) => Node::Value(f(value)?),
            Node::List(items) => Node::List(
                items
                    .into_iter()
                    .map(|item| item.try_map_values(f))
                    .collect::<Result<_, E>>()?,
            ),
            Node::Map(entries) => Node::Map(
                entries
                    .into_iter()
                    .map(|(key, child)| Ok((key, child.try_map_values(f)?)))
                    .collect::<Result<_, E>>()?,
            ),
        })
    }
}

impl<V: Serialize> Serialize for Node<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Value(value) => value.serialize(serializer),
            Node::List(items) => serializer.collect_seq(items),
            Node::Map(entries) => serializer.collect_map(entries),
        }
    }
}

/// One step of a bracket-notation key path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum KeySegment {
    /// An empty `[]` group: append at the next integer index.
    Append,
    /// A literal key, numeric-looking or not.
    Key(String),
}

/// Parses a bracket-notation key into its path segments.
///
/// `"a[b][]"` becomes `[a, b, <append>]`. Malformed bracket syntax degrades
/// gracefully instead of failing: an unterminated group swallows the rest
/// of the key as literal text, and stray characters after a `]` attach to
/// the segment just parsed.
fn parse_key(key: &str) -> Vec<KeySegment> {
    let Some(open) = key.find('[') else {
        return vec![KeySegment::Key(key.to_string())];
    };

    let mut segments = vec![KeySegment::Key(key[..open].to_string())];
    let mut rest = &key[open..];

    while let Some(tail) = rest.strip_prefix('[') {
        let Some(close) = tail.find(']') else {
            segments.push(KeySegment::Key(tail.to_string()));
            break;
        };

        let group = &tail[..close];
        segments.push(if group.is_empty() {
            KeySegment::Append
        } else {
            KeySegment::Key(group.to_string())
        });
        rest = &tail[close + 1..];

        let next_open = rest.find('[').unwrap_or(rest.len());
        if next_open > 0 {
            attach_trailing(&mut segments, &rest[..next_open]);
            rest = &rest[next_open..];
        }
    }

    segments
}

/// Folds stray text after a `]` into the preceding segment. An append
/// group that gains trailing text stops being an append marker.
fn attach_trailing(segments: &mut Vec<KeySegment>, trailing: &str) {
    if let Some(last) = segments.last_mut() {
        match last {
            KeySegment::Append => *last = KeySegment::Key(trailing.to_string()),
            KeySegment::Key(text) => text.push_str(trailing),
        }
    }
}

/// Builds a nested tree from an ordered sequence of (key, value) pairs.
///
/// The root is always a map node. Intermediate path segments create map
/// nodes, append markers create list nodes and push a fresh element per
/// occurrence, and terminal segments set the leaf. Writes that conflict
/// with the established structure overwrite it — last write wins, never an
/// error.
pub fn build_tree<V>(pairs: impl IntoIterator<Item = (String, V)>) -> Node<V> {
    let mut root = Node::Map(IndexMap::new());
    for (key, value) in pairs {
        insert(&mut root, &parse_key(&key), value);
    }
    root
}

fn insert<V>(node: &mut Node<V>, path: &[KeySegment], value: V) {
    match path.split_first() {
        None => *node = Node::Value(value),
        Some((KeySegment::Append, rest)) => {
            if !node.is_list() {
                *node = Node::List(Vec::new());
            }
            if let Node::List(items) = node {
                let mut child = Node::Map(IndexMap::new());
                insert(&mut child, rest, value);
                items.push(child);
            }
        }
        Some((KeySegment::Key(key), rest)) => {
            if !node.is_map() {
                *node = Node::Map(IndexMap::new());
            }
            if let Node::Map(entries) = node {
                let child = entries
                    .entry(key.clone())
                    .or_insert_with(|| Node::Map(IndexMap::new()));
                insert(child, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_key_plain() {
        assert_eq!(parse_key("name"), vec![KeySegment::Key("name".to_string())]);
    }

    #[test]
    fn test_parse_key_nested_and_append() {
        assert_eq!(
            parse_key("a[b][]"),
            vec![
                KeySegment::Key("a".to_string()),
                KeySegment::Key("b".to_string()),
                KeySegment::Append,
            ]
        );
    }

    #[test]
    fn test_parse_key_unterminated_group() {
        assert_eq!(
            parse_key("a[b"),
            vec![
                KeySegment::Key("a".to_string()),
                KeySegment::Key("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_key_trailing_text_attaches() {
        assert_eq!(
            parse_key("a[b]c"),
            vec![
                KeySegment::Key("a".to_string()),
                KeySegment::Key("bc".to_string()),
            ]
        );
        assert_eq!(
            parse_key("a[]x"),
            vec![
                KeySegment::Key("a".to_string()),
                KeySegment::Key("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_flat_keys() {
        let tree = build_tree(text_pairs(&[("a", "1"), ("b", "2")]));
        assert_eq!(tree.get("a").and_then(Node::value).map(String::as_str), Some("1"));
        assert_eq!(tree.get("b").and_then(Node::value).map(String::as_str), Some("2"));
    }

    #[test]
    fn test_nested_append_run() {
        let tree = build_tree(text_pairs(&[("a[b][]", "1"), ("a[b][]", "2")]));
        let run = tree.get("a").and_then(|node| node.get("b")).unwrap();
        assert!(run.is_list());
        assert_eq!(run.len(), 2);
        assert_eq!(run.at(0).and_then(Node::value).map(String::as_str), Some("1"));
        assert_eq!(run.at(1).and_then(Node::value).map(String::as_str), Some("2"));
    }

    #[test]
    fn test_each_append_pushes_fresh_element() {
        let tree = build_tree(text_pairs(&[("a[][x]", "1"), ("a[][y]", "2")]));
        let list = tree.get("a").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(
            list.at(0).and_then(|n| n.get("x")).and_then(Node::value).map(String::as_str),
            Some("1")
        );
        assert_eq!(
            list.at(1).and_then(|n| n.get("y")).and_then(Node::value).map(String::as_str),
            Some("2")
        );
    }

    #[test]
    fn test_numeric_keys_stay_map_entries() {
        let tree = build_tree(text_pairs(&[("a[0]", "x"), ("a[1]", "y"), ("a[5]", "z")]));
        let inner = tree.get("a").unwrap();
        assert!(inner.is_map());
        assert_eq!(inner.get("5").and_then(Node::value).map(String::as_str), Some("z"));
        // `at` bridges the contiguous prefix.
        assert_eq!(inner.at(1).and_then(Node::value).map(String::as_str), Some("y"));
        assert_eq!(inner.at(2), None);
    }

    #[test]
    fn test_scalar_then_descend_overwrites() {
        let tree = build_tree(text_pairs(&[("x", "scalar"), ("x[y]", "nested")]));
        let x = tree.get("x").unwrap();
        assert!(x.is_map());
        assert_eq!(x.get("y").and_then(Node::value).map(String::as_str), Some("nested"));
    }

    #[test]
    fn test_descend_then_scalar_overwrites() {
        let tree = build_tree(text_pairs(&[("x[y]", "nested"), ("x", "scalar")]));
        assert_eq!(tree.get("x").and_then(Node::value).map(String::as_str), Some("scalar"));
    }

    #[test]
    fn test_duplicate_literal_key_last_wins() {
        let tree = build_tree(text_pairs(&[("k", "first"), ("k", "second")]));
        assert_eq!(tree.get("k").and_then(Node::value).map(String::as_str), Some("second"));
    }

    #[test]
    fn test_map_keys_keep_insertion_order() {
        let tree = build_tree(text_pairs(&[("z", "1"), ("a", "2"), ("m", "3")]));
        let keys: Vec<&String> = tree.as_map().unwrap().keys().collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn test_try_map_values_substitutes_leaves() {
        let tree = build_tree(vec![
            ("a[b][]".to_string(), 0u64),
            ("a[b][]".to_string(), 1u64),
        ]);
        let handles = ["zero", "one"];
        let mapped = tree
            .try_map_values(&mut |id| handles.get(id as usize).copied().ok_or(id))
            .unwrap();
        let run = mapped.get("a").and_then(|node| node.get("b")).unwrap();
        assert_eq!(run.at(0).and_then(Node::value), Some(&"zero"));
        assert_eq!(run.at(1).and_then(Node::value), Some(&"one"));
    }

    #[test]
    fn test_try_map_values_propagates_failure() {
        let tree = build_tree(vec![("a".to_string(), 3u64)]);
        let result = tree.try_map_values(&mut |id| Err::<&str, u64>(id));
        assert_eq!(result.unwrap_err(), 3);
    }

    #[test]
    fn test_serialize_shape() {
        let tree = build_tree(text_pairs(&[
            ("a[b][]", "1"),
            ("a[b][]", "2"),
            ("c", "plain"),
        ]));
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"a": {"b": ["1", "2"]}, "c": "plain"})
        );
    }

    #[test]
    fn test_empty_root_serializes_to_empty_object() {
        let tree = build_tree(Vec::<(String, String)>::new());
        assert_eq!(serde_json::to_value(&tree).unwrap(), serde_json::json!({}));
    }
}
