//! # Schema Values
//!
//! The closed set of schema shapes produced by the resolver, and their
//! rendering into the ordered document model.
//!
//! Schemas are immutable once built. Reference and recursion problems are
//! represented as [`Schema::Error`] values inside the tree so that a single
//! bad reference never aborts the surrounding document.
//!
//! ## Rendering
//!
//! | Variant  | Rendered shape                                                   |
//! |----------|------------------------------------------------------------------|
//! | `Object` | `{type: object, description?, properties, example?, modify?}`    |
//! | `Array`  | `{type: array, description?, items}`                             |
//! | `Scalar` | `{type, description?, enum?, default?, example?}`                |
//! | `Ref`    | `{$ref}`                                                         |
//! | `AllOf`  | `{allOf, x-properties}`                                          |
//! | `Any`    | `{description?, x-any: true, oneOf}`                             |
//! | `Error`  | `{error}` when hard, `{x-error}` when soft                       |

use std::collections::BTreeMap;

use crate::odm::{Node, OrderedMap};

/// The primitive schema types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Integer,
    Number,
    String,
    Boolean,
}

impl ScalarKind {
    /// The schema `type` keyword for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
        }
    }

    /// Map a builtin source type name onto a scalar kind.
    ///
    /// Returns `None` for names that are not builtin scalars.
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8" | "uint16"
            | "uint32" | "uint64" | "uintptr" | "byte" | "rune" => Some(Self::Integer),
            "float32" | "float64" => Some(Self::Number),
            "string" => Some(Self::String),
            "bool" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// The kind of a concrete scalar node, if it is one.
    pub fn of_node(node: &Node) -> Option<Self> {
        match node {
            Node::Bool(_) => Some(Self::Boolean),
            Node::Number(n) if n.is_i64() || n.is_u64() => Some(Self::Integer),
            Node::Number(_) => Some(Self::Number),
            Node::String(_) => Some(Self::String),
            _ => None,
        }
    }
}

/// How loudly an inline error should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Rendered as `error`; editors flag it.
    Hard,
    /// Rendered as `x-error`; informational.
    Soft,
}

/// A member of an object schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectProp {
    pub schema: Schema,
    /// Metadata parsed from the field's documentation.
    pub metadata: OrderedMap,
    /// Struct tag entries, e.g. `json:"id"` as `{json: id}`.
    pub tag: BTreeMap<String, String>,
}

impl ObjectProp {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            metadata: OrderedMap::new(),
            tag: BTreeMap::new(),
        }
    }

    fn to_node(&self) -> Node {
        let mut node = self.schema.to_node();
        if !self.metadata.is_empty() {
            if let Node::Map(map) = &mut node {
                map.insert("x-meta", Node::Map(self.metadata.clone()));
            }
        }
        node
    }
}

/// A modifier recorded by a chained call such as `schema(Pet).required('id')`.
#[derive(Debug, Clone, PartialEq)]
pub struct Modify {
    pub name: String,
    pub args: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectSchema {
    pub properties: Vec<(String, ObjectProp)>,
    pub description: Option<String>,
    pub example: Option<Node>,
    pub modify: Vec<Modify>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarSchema {
    pub kind: ScalarKind,
    pub description: Option<String>,
    pub enumeration: Vec<Node>,
    pub default: Option<Node>,
    pub example: Option<Node>,
}

impl ScalarSchema {
    pub fn new(kind: ScalarKind) -> Self {
        Self {
            kind,
            description: None,
            enumeration: Vec::new(),
            default: None,
            example: None,
        }
    }
}

/// A resolved schema tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Object(ObjectSchema),
    Array {
        items: Box<Schema>,
        description: Option<String>,
    },
    Scalar(ScalarSchema),
    /// Pointer to a schema registered elsewhere in the document.
    Ref { target: String },
    /// Composition produced by struct embedding. `flattened` holds the
    /// property projection of every member that exposes properties.
    AllOf {
        members: Vec<Schema>,
        flattened: Vec<(String, ObjectProp)>,
    },
    Any { description: Option<String> },
    Error { message: String, severity: Severity },
}

impl Schema {
    /// A hard inline error.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            severity: Severity::Hard,
        }
    }

    /// A soft inline error.
    pub fn soft_error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            severity: Severity::Soft,
        }
    }

    pub fn any() -> Self {
        Self::Any { description: None }
    }

    pub fn scalar(kind: ScalarKind) -> Self {
        Self::Scalar(ScalarSchema::new(kind))
    }

    pub fn array(items: Schema) -> Self {
        Self::Array {
            items: Box::new(items),
            description: None,
        }
    }

    pub fn reference(target: impl Into<String>) -> Self {
        Self::Ref {
            target: target.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Attach documentation text. Empty text and variants without a
    /// description slot are left untouched.
    pub fn with_description(mut self, text: &str) -> Self {
        if text.is_empty() {
            return self;
        }
        let text = Some(text.to_string());
        match &mut self {
            Self::Object(o) => o.description = text,
            Self::Array { description, .. } => *description = text,
            Self::Scalar(s) => s.description = text,
            Self::Any { description } => *description = text,
            Self::Ref { .. } | Self::AllOf { .. } | Self::Error { .. } => {}
        }
        self
    }

    /// Record a chained modifier. Only object schemas carry modifiers;
    /// other shapes are returned unchanged.
    pub fn with_modify(mut self, modify: Modify) -> Self {
        if let Self::Object(o) = &mut self {
            o.modify.push(modify);
        }
        self
    }

    /// The property projection of this schema: an object's properties or an
    /// all-of's flattened properties.
    pub fn properties(&self) -> Option<&[(String, ObjectProp)]> {
        match self {
            Self::Object(o) => Some(&o.properties),
            Self::AllOf { flattened, .. } => Some(flattened),
            _ => None,
        }
    }

    /// True if this tree contains an inline error anywhere.
    pub fn contains_error(&self) -> bool {
        match self {
            Self::Error { .. } => true,
            Self::Object(o) => o.properties.iter().any(|(_, p)| p.schema.contains_error()),
            Self::Array { items, .. } => items.contains_error(),
            Self::AllOf { members, .. } => members.iter().any(Schema::contains_error),
            Self::Scalar(_) | Self::Ref { .. } | Self::Any { .. } => false,
        }
    }

    /// True if the tree holds an error that renders as `error` rather than
    /// the informational `x-error`.
    pub fn contains_hard_error(&self) -> bool {
        match self {
            Self::Error { severity, .. } => *severity == Severity::Hard,
            Self::Object(o) => o.properties.iter().any(|(_, p)| p.schema.contains_hard_error()),
            Self::Array { items, .. } => items.contains_hard_error(),
            Self::AllOf { members, .. } => members.iter().any(Schema::contains_hard_error),
            Self::Scalar(_) | Self::Ref { .. } | Self::Any { .. } => false,
        }
    }

    /// Render into the ordered document model.
    pub fn to_node(&self) -> Node {
        let mut map = OrderedMap::new();
        match self {
            Self::Object(o) => {
                map.push("type", Node::from("object"));
                push_description(&mut map, &o.description);
                map.push("properties", Node::Map(props_to_map(&o.properties)));
                if let Some(example) = &o.example {
                    map.push("example", example.clone());
                }
                if !o.modify.is_empty() {
                    let items = o
                        .modify
                        .iter()
                        .map(|m| {
                            let mut entry = OrderedMap::new();
                            entry.push("name", Node::from(m.name.as_str()));
                            entry.push("args", Node::List(m.args.clone()));
                            Node::Map(entry)
                        })
                        .collect();
                    map.push("modify", Node::List(items));
                }
            }
            Self::Array { items, description } => {
                map.push("type", Node::from("array"));
                push_description(&mut map, description);
                map.push("items", items.to_node());
            }
            Self::Scalar(s) => {
                map.push("type", Node::from(s.kind.as_str()));
                push_description(&mut map, &s.description);
                if !s.enumeration.is_empty() {
                    map.push("enum", Node::List(s.enumeration.clone()));
                }
                if let Some(default) = &s.default {
                    map.push("default", default.clone());
                }
                if let Some(example) = &s.example {
                    map.push("example", example.clone());
                }
            }
            Self::Ref { target } => {
                map.push("$ref", Node::from(target.as_str()));
            }
            Self::AllOf { members, flattened } => {
                map.push("allOf", Node::List(members.iter().map(Schema::to_node).collect()));
                map.push("x-properties", Node::Map(props_to_map(flattened)));
            }
            Self::Any { description } => {
                push_description(&mut map, description);
                map.push("x-any", Node::Bool(true));
                map.push("oneOf", any_one_of());
            }
            Self::Error { message, severity } => {
                let key = match severity {
                    Severity::Hard => "error",
                    Severity::Soft => "x-error",
                };
                map.push(key, Node::from(message.as_str()));
            }
        }
        Node::Map(map)
    }
}

fn push_description(map: &mut OrderedMap, description: &Option<String>) {
    if let Some(text) = description {
        map.push("description", Node::from(text.as_str()));
    }
}

fn props_to_map(props: &[(String, ObjectProp)]) -> OrderedMap {
    let mut out = OrderedMap::new();
    for (name, prop) in props {
        out.set(name.as_str(), prop.to_node());
    }
    out
}

fn any_one_of() -> Node {
    let kinds = ["array", "boolean", "integer", "number", "object", "string"];
    Node::List(
        kinds
            .iter()
            .map(|kind| {
                let mut entry = OrderedMap::new();
                entry.push("type", Node::from(*kind));
                Node::Map(entry)
            })
            .collect(),
    )
}
