//! # Ordered Document Model
//!
//! An order-preserving tree of key/value entries. Every other component
//! reads and produces [`Node`] values.
//!
//! ## Invariants
//!
//! - Map entries keep insertion order, through parsing and serialization.
//! - Duplicate keys are permitted inside an [`OrderedMap`] until
//!   [`OrderedMap::merge_duplicates`] collapses them.
//! - Merging is total: two values under the same key always combine
//!   (map + map merges recursively, list + list concatenates, anything
//!   else is replaced by the later value).
//!
//! ## Text Conversion
//!
//! `Node` implements `Serialize`/`Deserialize` by hand so that both
//! `serde_yaml` and `serde_json` stream map entries in document order.
//! Non-string YAML keys (`200:`) are stringified; YAML tags are dropped.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, EnumAccess, MapAccess, SeqAccess, VariantAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Number;

use crate::error::OdmError;

/// A node of the ordered document tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Node {
    /// `null` / `~`.
    #[default]
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Numeric scalar (integer or float).
    Number(Number),
    /// String scalar.
    String(String),
    /// Ordered map.
    Map(OrderedMap),
    /// Ordered list.
    List(Vec<Node>),
}

impl Node {
    /// Parse YAML text into a node, keeping key order and duplicate keys.
    pub fn from_yaml_str(text: &str) -> Result<Self, OdmError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Parse JSON text into a node, keeping key order and duplicate keys.
    pub fn from_json_str(text: &str) -> Result<Self, OdmError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to YAML text.
    pub fn to_yaml_string(&self) -> Result<String, OdmError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Serialize to pretty-printed JSON text.
    pub fn to_json_string(&self) -> Result<String, OdmError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialize to compact JSON text.
    pub fn to_json_compact(&self) -> Result<String, OdmError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Build a float node; non-finite values become `Null`.
    pub fn float(value: f64) -> Self {
        Number::from_f64(value).map(Node::Number).unwrap_or(Node::Null)
    }

    /// Short name of the node kind, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "boolean",
            Node::Number(_) => "number",
            Node::String(_) => "string",
            Node::Map(_) => "map",
            Node::List(_) => "list",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&OrderedMap> {
        match self {
            Node::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut OrderedMap> {
        match self {
            Node::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Node::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up `key` when this node is a map.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Combine `later` into `self`.
    ///
    /// - Two maps merge key by key; new keys are appended.
    /// - Two lists concatenate, except that elements the earlier list
    ///   already holds are not appended again, so `merge(d, d) == d`.
    /// - Anything else: `later` replaces `self` in place.
    pub fn merge(&mut self, later: Node) {
        match (self, later) {
            (Node::Map(earlier), Node::Map(later)) => earlier.merge(later),
            (Node::List(earlier), Node::List(later)) => merge_lists(earlier, later),
            (slot, later) => *slot = later,
        }
    }

    /// Collapse duplicate keys anywhere below this node.
    pub fn merge_duplicates(self) -> Node {
        match self {
            Node::Map(map) => Node::Map(map.merge_duplicates()),
            Node::List(items) => Node::List(items.into_iter().map(Node::merge_duplicates).collect()),
            other => other,
        }
    }

    /// Render a scalar the way a map key or a loose string concatenation
    /// would see it. Composite nodes render as compact JSON.
    pub fn to_plain_string(&self) -> String {
        match self {
            Node::Null => "null".to_string(),
            Node::Bool(b) => b.to_string(),
            Node::Number(n) => n.to_string(),
            Node::String(s) => s.clone(),
            Node::Map(_) | Node::List(_) => self.to_json_compact().unwrap_or_default(),
        }
    }
}

/// Append the elements of `later` that the earlier list does not already hold.
fn merge_lists(earlier: &mut Vec<Node>, later: Vec<Node>) {
    let existing = earlier.len();
    for item in later {
        if !earlier[..existing].contains(&item) {
            earlier.push(item);
        }
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::String(s.to_string())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::String(s)
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Bool(b)
    }
}

impl From<i64> for Node {
    fn from(n: i64) -> Self {
        Node::Number(n.into())
    }
}

impl From<u64> for Node {
    fn from(n: u64) -> Self {
        Node::Number(n.into())
    }
}

impl From<OrderedMap> for Node {
    fn from(m: OrderedMap) -> Self {
        Node::Map(m)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::List(items)
    }
}

/// An ordered list of `(key, value)` entries.
///
/// Lookups return the first entry with a matching key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderedMap {
    entries: Vec<(String, Node)>,
}

impl OrderedMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Append an entry without looking for an existing key.
    pub fn push(&mut self, key: impl Into<String>, value: Node) {
        self.entries.push((key.into(), value));
    }

    /// Replace the value of an existing key in place, or append.
    ///
    /// Returns the replaced value.
    pub fn insert(&mut self, key: impl Into<String>, value: Node) -> Option<Node> {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Append `value`, or merge it into the existing entry for `key`.
    pub fn set(&mut self, key: impl Into<String>, value: Node) {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => slot.merge(value),
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Node> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Merge every entry of `later` into `self` (later wins on conflicts).
    pub fn merge(&mut self, later: OrderedMap) {
        for (key, value) in later.entries {
            self.set(key, value);
        }
    }

    /// Collapse duplicate keys recursively, merging later entries into the
    /// first occurrence.
    pub fn merge_duplicates(self) -> OrderedMap {
        let mut out = OrderedMap::new();
        for (key, value) in self.entries {
            out.set(key, value.merge_duplicates());
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Visit every map entry depth-first, yielding the breadcrumb of the
    /// containing map, the entry key and the entry value. List elements
    /// contribute their index to the breadcrumb.
    pub fn walk<F>(&self, visitor: &mut F)
    where
        F: FnMut(&[String], &str, &Node),
    {
        let mut path = Vec::new();
        walk_map(self, &mut path, visitor);
    }

    /// Find the values whose key path matches `pattern`, where `*` matches
    /// any single key. Returns the breadcrumb of the map holding each match
    /// (the final key is not included) together with the value.
    pub fn select<'a>(&'a self, pattern: &[&str]) -> Vec<(Vec<String>, &'a Node)> {
        let mut out = Vec::new();
        select_in(self, pattern, &mut Vec::new(), &mut out);
        out
    }
}

fn walk_map<F>(map: &OrderedMap, path: &mut Vec<String>, visitor: &mut F)
where
    F: FnMut(&[String], &str, &Node),
{
    for (key, value) in map.iter() {
        visitor(path, key, value);
        path.push(key.to_string());
        walk_node(value, path, visitor);
        path.pop();
    }
}

fn walk_node<F>(node: &Node, path: &mut Vec<String>, visitor: &mut F)
where
    F: FnMut(&[String], &str, &Node),
{
    match node {
        Node::Map(map) => walk_map(map, path, visitor),
        Node::List(items) => {
            for (index, item) in items.iter().enumerate() {
                path.push(index.to_string());
                walk_node(item, path, visitor);
                path.pop();
            }
        }
        _ => {}
    }
}

fn select_in<'a>(
    map: &'a OrderedMap,
    pattern: &[&str],
    path: &mut Vec<String>,
    out: &mut Vec<(Vec<String>, &'a Node)>,
) {
    let Some((head, rest)) = pattern.split_first() else {
        return;
    };
    for (key, value) in map.iter() {
        if *head != "*" && *head != key {
            continue;
        }
        if rest.is_empty() {
            out.push((path.clone(), value));
        } else if let Node::Map(inner) = value {
            path.push(key.to_string());
            select_in(inner, rest, path, out);
            path.pop();
        }
    }
}

impl IntoIterator for OrderedMap {
    type Item = (String, Node);
    type IntoIter = std::vec::IntoIter<(String, Node)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, Node)> for OrderedMap {
    fn from_iter<I: IntoIterator<Item = (String, Node)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<(String, Node)> for OrderedMap {
    fn extend<I: IntoIterator<Item = (String, Node)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

// ---------------------------------------------------------------------------
// serde
// ---------------------------------------------------------------------------

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Null => serializer.serialize_unit(),
            Node::Bool(b) => serializer.serialize_bool(*b),
            Node::Number(n) => n.serialize(serializer),
            Node::String(s) => serializer.serialize_str(s),
            Node::Map(map) => map.serialize(serializer),
            Node::List(items) => serializer.collect_seq(items),
        }
    }
}

impl Serialize for OrderedMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            out.serialize_entry(key, value)?;
        }
        out.end()
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }
}

impl<'de> Deserialize<'de> for OrderedMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Node::deserialize(deserializer)? {
            Node::Map(map) => Ok(map),
            Node::Null => Ok(OrderedMap::new()),
            other => Err(de::Error::custom(format!(
                "expected a map, found {}",
                other.kind_name()
            ))),
        }
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any YAML or JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Node, D::Error> {
        Node::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Node, E> {
        Ok(Node::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Node, E> {
        Ok(Node::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Node, E> {
        Ok(Node::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Node, E> {
        Ok(Node::float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Node, E> {
        Ok(Node::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Node, E> {
        Ok(Node::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Node, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Node>()? {
            items.push(item);
        }
        Ok(Node::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Node, A::Error> {
        let mut map = OrderedMap::new();
        while let Some((key, value)) = access.next_entry::<Node, Node>()? {
            map.push(key.to_plain_string(), value);
        }
        Ok(Node::Map(map))
    }

    // YAML tags (`!Tag value`) arrive as single-variant enums; keep the value.
    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<Node, A::Error> {
        let (_tag, variant): (String, _) = data.variant()?;
        variant.newtype_variant::<Node>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Node {
        Node::from_yaml_str(text).expect("valid yaml")
    }

    fn map(text: &str) -> OrderedMap {
        match yaml(text) {
            Node::Map(m) => m,
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn yaml_parse_keeps_key_order() {
        let m = map("zeta: 1\nalpha: 2\nmid: 3\n");
        let keys: Vec<&str> = m.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn yaml_parse_keeps_duplicate_keys() {
        let m = map("a: 1\nb: 2\na: 3\n");
        assert_eq!(m.len(), 3);
        assert_eq!(m.get("a"), Some(&Node::from(1i64)));
    }

    #[test]
    fn numeric_yaml_keys_are_stringified() {
        let m = map("200:\n  description: ok\n404: missing\n");
        let keys: Vec<&str> = m.keys().collect();
        assert_eq!(keys, vec!["200", "404"]);
    }

    #[test]
    fn json_serialization_keeps_order() {
        let m = map("b: 1\na: [x, y]\n");
        let json = Node::Map(m).to_json_compact().unwrap();
        assert_eq!(json, r#"{"b":1,"a":["x","y"]}"#);
    }

    #[test]
    fn json_parse_keeps_order() {
        let node = Node::from_json_str(r#"{"z": {"y": 1, "x": 2}, "a": null}"#).unwrap();
        let inner: Vec<&str> = node.get("z").unwrap().as_map().unwrap().keys().collect();
        assert_eq!(inner, vec!["y", "x"]);
        assert_eq!(node.get("a"), Some(&Node::Null));
    }

    #[test]
    fn yaml_tags_are_dropped() {
        let node = yaml("value: !Custom 5\n");
        assert_eq!(node.get("value"), Some(&Node::from(5i64)));
    }

    #[test]
    fn set_merges_nested_maps() {
        let mut a = map("a: 1\nb:\n  b-1: a\n  b-2: 2\n");
        let b = map("c: 1\nb:\n  b-1: b\n  b-3: 2\n");
        a.merge(b);
        let json = Node::Map(a).to_json_compact().unwrap();
        assert_eq!(json, r#"{"a":1,"b":{"b-1":"b","b-2":2,"b-3":2},"c":1}"#);
    }

    #[test]
    fn set_replaces_scalar_in_place() {
        let mut a = map("a: 1\nb: 2\n");
        a.merge(map("c: 1\nb: 3\n"));
        assert_eq!(Node::Map(a).to_json_compact().unwrap(), r#"{"a":1,"b":3,"c":1}"#);
    }

    #[test]
    fn set_concatenates_lists_without_repeating_items() {
        let mut a = map("tags: [a, b]\n");
        a.set("tags", yaml("[b, c]"));
        assert_eq!(a.get("tags"), Some(&yaml("[a, b, c]")));
    }

    #[test]
    fn mismatched_kinds_are_replaced() {
        let mut a = map("x:\n  y: 1\n");
        a.set("x", Node::from("flat"));
        assert_eq!(a.get("x"), Some(&Node::from("flat")));
    }

    #[test]
    fn merge_duplicates_collapses_whole_tree() {
        let m = map("a:\n  x: 1\n  x: 2\nb: 1\na:\n  y: 3\n");
        let merged = m.merge_duplicates();
        assert_eq!(
            Node::Map(merged).to_json_compact().unwrap(),
            r#"{"a":{"x":2,"y":3},"b":1}"#
        );
    }

    #[test]
    fn walk_yields_breadcrumbs_depth_first() {
        let m = map("a:\n  b: 1\nl:\n  - c: 2\n");
        let mut seen = Vec::new();
        m.walk(&mut |path, key, _| seen.push(format!("{}:{key}", path.join("/"))));
        assert_eq!(seen, vec![":a", "a:b", ":l", "l/0:c"]);
    }

    #[test]
    fn select_matches_wildcards() {
        let m = map(
            "components:\n  schemas:\n    Pet:\n      x-$schema: model.Pet\n    Tag:\n      type: object\n    Cat:\n      x-$schema: model.Cat\n",
        );
        let found = m.select(&["components", "schemas", "*", "x-$schema"]);
        let paths: Vec<String> = found.iter().map(|(p, _)| p.join("/")).collect();
        assert_eq!(paths, vec!["components/schemas/Pet", "components/schemas/Cat"]);
        assert_eq!(found[0].1, &Node::from("model.Pet"));
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut m = map("a: 1\nb: 2\n");
        let old = m.insert("a", Node::from(9i64));
        assert_eq!(old, Some(Node::from(1i64)));
        assert_eq!(m.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
