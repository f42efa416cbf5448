//! # Evaluation Values
//!
//! [`ResolvedValue`] is the closed set of things an expression can evaluate
//! to: plain data, handles into the type graph, schemas and builtins.
//! Unknown names evaluate to [`ResolvedValue::NotFound`] rather than
//! failing, so that a single unresolved reference degrades to an inline
//! diagnostic.
//!
//! Member access is expressed through the [`MemberAccessible`] capability,
//! implemented by type handles, package handles, value maps and schemas.

use std::fmt;
use std::sync::Arc;

use docapi_core::{Modify, Node, Schema, TypeGraph, TypeRef};
use serde_json::Number;

/// The result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Map(ValueMap),
    List(Vec<ResolvedValue>),
    /// A type declaration, field type or method.
    Type(TypeHandle),
    /// An imported package, the base of `model.Pet` chains.
    Package(PackageHandle),
    /// Result of `schema(...)`; accepts chained modifier calls.
    Schema(Box<Schema>),
    Builtin(Builtin),
    NotFound(NotFound),
}

/// An ordered string-keyed map of values. Inserting an existing key
/// replaces the value in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueMap {
    entries: Vec<(String, ResolvedValue)>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ResolvedValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ResolvedValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResolvedValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl IntoIterator for ValueMap {
    type Item = (String, ResolvedValue);
    type IntoIter = std::vec::IntoIter<(String, ResolvedValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, ResolvedValue)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (String, ResolvedValue)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// A type in the graph, with the graph needed to navigate from it.
#[derive(Clone)]
pub struct TypeHandle {
    pub graph: Arc<dyn TypeGraph>,
    pub ty: TypeRef,
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeHandle").field("ty", &self.ty).finish()
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty
    }
}

/// An imported package.
#[derive(Clone)]
pub struct PackageHandle {
    pub graph: Arc<dyn TypeGraph>,
    /// Alias the package was imported under.
    pub alias: String,
    /// Package path.
    pub path: String,
}

impl fmt::Debug for PackageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageHandle")
            .field("alias", &self.alias)
            .field("path", &self.path)
            .finish()
    }
}

impl PartialEq for PackageHandle {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

/// Callable values.
#[derive(Debug, Clone, PartialEq)]
pub enum Builtin {
    /// `schema(x)`
    Schema,
    /// `params(x)`
    Params,
    /// A modifier bound to a schema, e.g. `.required` in
    /// `schema(Pet).required('id')`.
    Modify { target: Box<Schema>, name: String },
}

impl Builtin {
    /// The builtin bound to a global identifier, if any.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "schema" => Some(Self::Schema),
            "params" => Some(Self::Params),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Schema => "schema",
            Self::Params => "params",
            Self::Modify { name, .. } => name,
        }
    }
}

/// A name that did not resolve, with where it was looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFound {
    pub name: String,
    /// Search context: a file, package or parent expression.
    pub context: String,
}

/// Values that expose named members.
pub trait MemberAccessible {
    /// Look up `name`. Missing members yield [`ResolvedValue::NotFound`].
    fn get_member(&self, name: &str) -> ResolvedValue;
}

impl MemberAccessible for TypeHandle {
    fn get_member(&self, name: &str) -> ResolvedValue {
        match self.graph.member(&self.ty, name) {
            Some(ty) => ResolvedValue::Type(TypeHandle {
                graph: Arc::clone(&self.graph),
                ty,
            }),
            None => ResolvedValue::NotFound(NotFound {
                name: name.to_string(),
                context: self
                    .ty
                    .key
                    .clone()
                    .or_else(|| self.ty.name.clone())
                    .unwrap_or_else(|| self.ty.file.clone()),
            }),
        }
    }
}

impl MemberAccessible for PackageHandle {
    fn get_member(&self, name: &str) -> ResolvedValue {
        match self.graph.lookup(&self.path, name) {
            Some(ty) => ResolvedValue::Type(TypeHandle {
                graph: Arc::clone(&self.graph),
                ty,
            }),
            None => ResolvedValue::NotFound(NotFound {
                name: name.to_string(),
                context: self.path.clone(),
            }),
        }
    }
}

impl MemberAccessible for ValueMap {
    fn get_member(&self, name: &str) -> ResolvedValue {
        self.get(name).cloned().unwrap_or_else(|| {
            ResolvedValue::NotFound(NotFound {
                name: name.to_string(),
                context: "object".to_string(),
            })
        })
    }
}

impl MemberAccessible for Schema {
    fn get_member(&self, name: &str) -> ResolvedValue {
        ResolvedValue::Builtin(Builtin::Modify {
            target: Box::new(self.clone()),
            name: name.to_string(),
        })
    }
}

impl ResolvedValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Map(_) => "object",
            Self::List(_) => "array",
            Self::Type(_) => "type",
            Self::Package(_) => "package",
            Self::Schema(_) => "schema",
            Self::Builtin(_) => "function",
            Self::NotFound(_) => "undefined",
        }
    }

    /// True for `Null` and `NotFound`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Null | Self::NotFound(_))
    }

    /// The member-access capability of this value, if it has one.
    pub fn as_accessible(&self) -> Option<&dyn MemberAccessible> {
        match self {
            Self::Type(t) => Some(t),
            Self::Package(p) => Some(p),
            Self::Map(m) => Some(m),
            Self::Schema(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// Lift a document node into a value.
    pub fn from_node(node: Node) -> Self {
        match node {
            Node::Null => Self::Null,
            Node::Bool(b) => Self::Bool(b),
            Node::Number(n) => Self::Number(n),
            Node::String(s) => Self::String(s),
            Node::Map(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_node(v)))
                    .collect(),
            ),
            Node::List(items) => Self::List(items.into_iter().map(Self::from_node).collect()),
        }
    }

    /// Lower plain data (and schemas) into a document node. Returns `None`
    /// if the value contains a type, package, builtin or unresolved name.
    pub fn to_data_node(&self) -> Option<Node> {
        Some(match self {
            Self::Null => Node::Null,
            Self::Bool(b) => Node::Bool(*b),
            Self::Number(n) => Node::Number(n.clone()),
            Self::String(s) => Node::String(s.clone()),
            Self::Map(map) => {
                let mut out = docapi_core::OrderedMap::new();
                for (k, v) in map.iter() {
                    out.push(k, v.to_data_node()?);
                }
                Node::Map(out)
            }
            Self::List(items) => Node::List(
                items
                    .iter()
                    .map(Self::to_data_node)
                    .collect::<Option<Vec<_>>>()?,
            ),
            Self::Schema(schema) => schema.to_node(),
            Self::Type(_) | Self::Package(_) | Self::Builtin(_) | Self::NotFound(_) => return None,
        })
    }
}

impl From<&str> for ResolvedValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<i64> for ResolvedValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<bool> for ResolvedValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Schema> for ResolvedValue {
    fn from(schema: Schema) -> Self {
        Self::Schema(Box::new(schema))
    }
}

/// Record a modifier call on a schema.
pub(crate) fn apply_modify(target: &Schema, name: &str, args: Vec<Node>) -> ResolvedValue {
    ResolvedValue::from(target.clone().with_modify(Modify {
        name: name.to_string(),
        args,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_map_insert_keeps_first_position() {
        let mut map = ValueMap::new();
        map.insert("a", 1i64.into());
        map.insert("b", 2i64.into());
        map.insert("a", 3i64.into());
        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(map.get("a"), Some(&ResolvedValue::from(3i64)));
    }

    #[test]
    fn missing_map_member_is_not_found() {
        let map = ValueMap::new();
        assert!(matches!(map.get_member("x"), ResolvedValue::NotFound(n) if n.name == "x"));
    }

    #[test]
    fn node_round_trip_for_plain_data() {
        let node = Node::from_yaml_str("a: [1, true, null]\nb: {c: text}\n").unwrap();
        let value = ResolvedValue::from_node(node.clone());
        assert_eq!(value.to_data_node(), Some(node));
    }

    #[test]
    fn unresolved_names_do_not_lower_to_data() {
        let value = ResolvedValue::List(vec![ResolvedValue::NotFound(NotFound {
            name: "Pet".into(),
            context: "f.go".into(),
        })]);
        assert_eq!(value.to_data_node(), None);
    }

    #[test]
    fn schema_member_binds_a_modifier() {
        let schema = Schema::Object(Default::default());
        match schema.get_member("required") {
            ResolvedValue::Builtin(Builtin::Modify { name, .. }) => assert_eq!(name, "required"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
