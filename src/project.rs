//! Flat-to-nested projection
//!
//! The store keeps a flat key space where `a.b.c = 34` stands for
//! `a → b → c = 34`. For presentation that is turned back into a tree.
//!
//! Keys are applied in lexicographic order and later keys win. Given
//!
//! ```text
//! a.a   = "aa"
//! a.a.a = "aaa"
//! a.a.b = "aab"
//! ```
//!
//! `a.a` first becomes a leaf, then gets replaced by a branch holding
//! `a` and `b`.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::codec::Value;

/// One level of a projected tree
pub type NestedMap = BTreeMap<String, Node>;

/// A node of a projected tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Leaf(Value),
    Branch(NestedMap),
}

impl Node {
    pub fn as_leaf(&self) -> Option<&Value> {
        match self {
            Node::Leaf(value) => Some(value),
            Node::Branch(_) => None,
        }
    }

    pub fn as_branch(&self) -> Option<&NestedMap> {
        match self {
            Node::Branch(children) => Some(children),
            Node::Leaf(_) => None,
        }
    }

    /// Follow a dotted path below this node
    pub fn lookup(&self, path: &str) -> Option<&Node> {
        path.split('.')
            .try_fold(self, |node, segment| node.as_branch()?.get(segment))
    }
}

/// Project a flat key/value map into a tree
pub fn project(flat: &HashMap<String, Value>) -> NestedMap {
    let mut keys: Vec<&String> = flat.keys().collect();
    keys.sort();

    let mut tree = NestedMap::new();
    for key in keys {
        insert_path(&mut tree, key, flat[key].clone());
    }
    tree
}

/// Project a list of pairs already sorted by key
///
/// This is what [`crate::FlatStore::get_as_slist`] returns.
pub fn project_sorted(slist: &[(String, Value)]) -> NestedMap {
    let mut tree = NestedMap::new();
    for (key, value) in slist {
        insert_path(&mut tree, key, value.clone());
    }
    tree
}

fn insert_path(tree: &mut NestedMap, key: &str, value: Value) {
    let (parents, leaf) = match key.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, key),
    };

    let mut level = tree;
    if let Some(parents) = parents {
        for segment in parents.split('.') {
            level = branch_mut(level, segment);
        }
    }
    level.insert(leaf.to_string(), Node::Leaf(value));
}

/// Descend into `segment`, turning a leaf found there into a branch
fn branch_mut<'a>(level: &'a mut NestedMap, segment: &str) -> &'a mut NestedMap {
    let node = level
        .entry(segment.to_string())
        .or_insert_with(|| Node::Branch(NestedMap::new()));

    if let Node::Leaf(_) = node {
        *node = Node::Branch(NestedMap::new());
    }

    match node {
        Node::Branch(children) => children,
        Node::Leaf(_) => unreachable!("leaf replaced by branch above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_single_level_keys() {
        let tree = project(&flat(&[("title", "Inception".into()), ("year", Value::Int(2010))]));

        assert_eq!(tree.len(), 2);
        assert_eq!(tree["title"], Node::Leaf("Inception".into()));
        assert_eq!(tree["year"], Node::Leaf(Value::Int(2010)));
    }

    #[test]
    fn test_dotted_keys_nest() {
        let tree = project(&flat(&[
            ("a.b.c", Value::Int(34)),
            ("a.b.d", true.into()),
            ("a.e", "x".into()),
        ]));

        let root = Node::Branch(tree);
        assert_eq!(root.lookup("a.b.c").and_then(Node::as_leaf), Some(&Value::Int(34)));
        assert_eq!(root.lookup("a.b.d").and_then(Node::as_leaf), Some(&Value::Bool(true)));
        assert_eq!(root.lookup("a.e").and_then(Node::as_leaf), Some(&Value::Str("x".into())));
        assert!(root.lookup("a.b").and_then(Node::as_branch).is_some());
    }

    #[test]
    fn test_later_keys_override_leaf() {
        let tree = project(&flat(&[
            ("a.a.b", "aab".into()),
            ("a.a", "aa".into()),
            ("a.a.a", "aaa".into()),
        ]));

        let root = Node::Branch(tree);
        let a_a = root.lookup("a.a").and_then(Node::as_branch).unwrap();
        assert_eq!(a_a.len(), 2);
        assert_eq!(a_a["a"], Node::Leaf("aaa".into()));
        assert_eq!(a_a["b"], Node::Leaf("aab".into()));
    }

    #[test]
    fn test_project_sorted_matches_project() {
        let pairs = vec![
            ("m.x".to_string(), Value::Int(1)),
            ("m.y".to_string(), Value::Real(2.5)),
            ("z".to_string(), Value::Bool(false)),
        ];
        let map: HashMap<String, Value> = pairs.iter().cloned().collect();

        assert_eq!(project_sorted(&pairs), project(&map));
    }

    #[test]
    fn test_serializes_to_plain_json() {
        let tree = project(&flat(&[
            ("movie.title", "Inception".into()),
            ("movie.watched", false.into()),
            ("movie.rating", Value::Real(8.8)),
        ]));

        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "movie": { "rating": 8.8, "title": "Inception", "watched": false }
            })
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(project(&HashMap::new()).is_empty());
    }
}
