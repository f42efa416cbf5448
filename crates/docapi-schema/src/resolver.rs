//! # Schema Resolver
//!
//! Converts type-graph declarations and evaluated values into [`Schema`]
//! trees. One [`SchemaResolver`] is created per document pass and owns all
//! state of that pass: the reference registry and the recursion counters.
//!
//! ## Resolution Steps
//!
//! 1. A keyed type registered as a document definition renders as
//!    `Ref{#/<definition path>}`, unless the caller asks for the inline form
//!    (`no_ref`, used at the definition site itself).
//! 2. A keyed type entered more than `recursion_bound` times within one
//!    resolution chain renders as a soft `recursive reference` error.
//! 3. Otherwise the type's shape is converted: arrays, pointers (unwrapped),
//!    scalars (with enum constants), identifiers (looked up in the file
//!    context), structs, interfaces (any) and functions (soft error).
//!
//! ## Struct Embedding
//!
//! An untagged embedded member whose schema is a plain object is spliced
//! into the parent's properties. Any other embedded schema (a reference, an
//! all-of) makes the parent an all-of, whose `x-properties` lists the flat
//! property projection of every member.

use std::collections::HashMap;
use std::sync::Arc;

use docapi_core::{
    Field, ObjectProp, ObjectSchema, ScalarKind, ScalarSchema, Schema, TypeGraph, TypeKind, TypeRef,
};
use docapi_expr::{Builtin, EvalError, ResolvedValue};
use tracing::{debug, warn};

/// Default number of times one keyed type may be entered within a single
/// resolution chain.
pub const DEFAULT_RECURSION_BOUND: u32 = 2;

/// Maximum alias hops followed when looking for a definition.
const MAX_DEFINITION_HOPS: usize = 16;

/// Resolver configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverOptions {
    /// How many times one keyed type may be entered per chain.
    pub recursion_bound: u32,
    /// Struct tag that names object properties (e.g. `json`). Field names
    /// are used when unset or when the field has no such tag.
    pub name_tag: Option<String>,
    /// Struct tags consulted in order to name `params(...)` entries.
    pub param_tags: Vec<String>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            recursion_bound: DEFAULT_RECURSION_BOUND,
            name_tag: None,
            param_tags: Vec::new(),
        }
    }
}

/// Per-call resolution flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToSchemaOpts {
    /// Render a registered type inline instead of as a reference.
    pub no_ref: bool,
}

impl ToSchemaOpts {
    pub const INLINE: ToSchemaOpts = ToSchemaOpts { no_ref: true };
}

/// Resolution context for one document pass.
pub struct SchemaResolver {
    graph: Arc<dyn TypeGraph>,
    options: ResolverOptions,
    /// Type key to reference target (`#/components/schemas/Pet`).
    registry: HashMap<String, String>,
    /// Entries per type key along the current chain.
    visits: HashMap<String, u32>,
}

impl SchemaResolver {
    pub fn new(graph: Arc<dyn TypeGraph>, options: ResolverOptions) -> Self {
        Self {
            graph,
            options,
            registry: HashMap::new(),
            visits: HashMap::new(),
        }
    }

    pub fn graph(&self) -> &Arc<dyn TypeGraph> {
        &self.graph
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Record that the type `key` is defined at `definition_path`
    /// (slash-joined, e.g. `components/schemas/Pet`).
    pub fn register(&mut self, key: impl Into<String>, definition_path: &str) {
        let key = key.into();
        let target = format!("#/{definition_path}");
        debug!(key = %key, target = %target, "registered schema definition");
        self.registry.insert(key, target);
    }

    /// Reference target registered for `key`.
    pub fn registered_target(&self, key: &str) -> Option<&str> {
        self.registry.get(key).map(String::as_str)
    }

    /// Number of registered definitions.
    pub fn registered_len(&self) -> usize {
        self.registry.len()
    }

    /// Convert any evaluated value into a schema.
    ///
    /// Types resolve through the graph; plain data becomes an example-bearing
    /// schema of the same shape; schemas pass through; unresolved names
    /// become inline errors.
    pub fn to_schema(&mut self, value: &ResolvedValue, opts: ToSchemaOpts) -> Schema {
        match value {
            ResolvedValue::Type(handle) => self.type_to_schema(&handle.ty, opts),
            ResolvedValue::Schema(schema) => schema.as_ref().clone(),
            ResolvedValue::Map(map) => {
                let properties = map
                    .iter()
                    .map(|(k, v)| (k.to_string(), ObjectProp::new(self.to_schema(v, ToSchemaOpts::default()))))
                    .collect();
                Schema::Object(ObjectSchema {
                    properties,
                    example: value.to_data_node(),
                    ..Default::default()
                })
            }
            ResolvedValue::List(items) => match items.first() {
                Some(first) => Schema::array(self.to_schema(first, ToSchemaOpts::default())),
                None => Schema::array(Schema::any()),
            },
            ResolvedValue::Null => Schema::any(),
            ResolvedValue::Bool(_) | ResolvedValue::Number(_) | ResolvedValue::String(_) => {
                let node = value.to_data_node();
                let kind = node
                    .as_ref()
                    .and_then(ScalarKind::of_node)
                    .unwrap_or(ScalarKind::String);
                Schema::Scalar(ScalarSchema {
                    default: node.clone(),
                    example: node,
                    ..ScalarSchema::new(kind)
                })
            }
            ResolvedValue::NotFound(missing) => Schema::error(format!(
                "can't resolve '{}' in '{}'",
                missing.name, missing.context
            )),
            ResolvedValue::Package(package) => {
                Schema::error(format!("package '{}' is not a schema", package.alias))
            }
            ResolvedValue::Builtin(builtin) => {
                Schema::error(format!("function '{}' is not a schema", builtin.name()))
            }
        }
    }

    /// Apply the `schema` or `params` builtin to evaluated arguments. Only
    /// the first argument is used; a missing one evaluates as `null`.
    pub fn apply_builtin(
        &mut self,
        builtin: &Builtin,
        args: Vec<ResolvedValue>,
    ) -> Result<ResolvedValue, EvalError> {
        let arg = args.into_iter().next().unwrap_or(ResolvedValue::Null);
        match builtin {
            Builtin::Schema => Ok(ResolvedValue::from(self.to_schema(&arg, ToSchemaOpts::default()))),
            Builtin::Params => crate::params::params(self, arg),
            Builtin::Modify { name, .. } => Err(EvalError::Builtin {
                builtin: name.clone(),
                message: "modifiers are applied by the evaluator".to_string(),
            }),
        }
    }

    /// Convert a type into a schema.
    pub fn type_to_schema(&mut self, ty: &TypeRef, opts: ToSchemaOpts) -> Schema {
        if let Some(key) = &ty.key {
            if !opts.no_ref {
                if let Some(target) = self.registry.get(key) {
                    return Schema::reference(target.as_str());
                }
            }
            let count = self.visits.entry(key.clone()).or_insert(0);
            if *count >= self.options.recursion_bound {
                return Schema::soft_error(format!("recursive reference on '{key}'"));
            }
            *count += 1;
        }

        let schema = self.shape(ty);

        if let Some(key) = &ty.key {
            if let Some(count) = self.visits.get_mut(key) {
                *count = count.saturating_sub(1);
            }
        }
        schema
    }

    /// Follow pointers and identifiers to the declaration a type denotes.
    pub fn definition_of(&self, ty: &TypeRef) -> Option<TypeRef> {
        let mut current = ty.clone();
        for _ in 0..MAX_DEFINITION_HOPS {
            current = match &current.kind {
                TypeKind::Pointer(inner) => inner.as_ref().clone(),
                TypeKind::Named(name) => self.graph.resolve_in_file(&current.file, None, name)?,
                TypeKind::Qualified { package, name } => {
                    self.graph.resolve_in_file(&current.file, Some(package), name)?
                }
                _ => return Some(current),
            };
        }
        None
    }

    fn shape(&mut self, ty: &TypeRef) -> Schema {
        let description = ty.doc.full_doc.as_str();
        match &ty.kind {
            TypeKind::Array(elem) => {
                let items = self.type_to_schema(elem, ToSchemaOpts::default());
                Schema::array(items).with_description(description)
            }
            TypeKind::Pointer(inner) => {
                // A pointer is transparent: the pointee keeps the pointer's
                // key and documentation.
                let unwrapped = TypeRef {
                    key: ty.key.clone(),
                    name: ty.name.clone(),
                    file: ty.file.clone(),
                    doc: ty.doc.clone(),
                    kind: inner.kind.clone(),
                };
                self.shape(&unwrapped)
            }
            TypeKind::Scalar(kind) => {
                let mut scalar = ScalarSchema::new(*kind);
                if ty.key.is_some() {
                    let values = self.graph.enum_values(ty);
                    scalar.default = values.first().map(|v| v.value.clone());
                    scalar.enumeration = values.into_iter().map(|v| v.value).collect();
                }
                Schema::Scalar(scalar).with_description(description)
            }
            TypeKind::Named(name) => match self.graph.resolve_in_file(&ty.file, None, name) {
                Some(def) => self
                    .type_to_schema(&def, ToSchemaOpts::default())
                    .with_description(description),
                None => {
                    warn!(name = %name, file = %ty.file, "type not found");
                    Schema::error(format!("can't find type '{name}'"))
                }
            },
            TypeKind::Qualified { package, name } => {
                match self.graph.resolve_in_file(&ty.file, Some(package), name) {
                    Some(def) => self
                        .type_to_schema(&def, ToSchemaOpts::default())
                        .with_description(description),
                    None => {
                        warn!(package = %package, name = %name, file = %ty.file, "type not found");
                        Schema::error(format!("can't find type '{package}.{name}'"))
                    }
                }
            }
            TypeKind::Struct(fields) => self.struct_schema(ty, fields),
            TypeKind::Interface => Schema::any().with_description(description),
            TypeKind::Func => Schema::soft_error(format!(
                "'{}' is a function and has no schema",
                ty.key.as_deref().or(ty.name.as_deref()).unwrap_or("func")
            )),
        }
    }

    fn struct_schema(&mut self, ty: &TypeRef, fields: &[Field]) -> Schema {
        let mut properties = Vec::with_capacity(fields.len());
        let mut members = Vec::new();
        let mut flattened = Vec::new();

        for field in fields {
            let schema = self.type_to_schema(&field.ty, ToSchemaOpts::default());

            if field.embedded && field.tag.is_empty() {
                match schema {
                    Schema::Object(object) => properties.extend(object.properties),
                    other => {
                        flattened.extend(self.projection(&field.ty, &other));
                        members.push(other);
                    }
                }
                continue;
            }

            let Some(name) = self.property_name(field) else {
                continue;
            };
            properties.push((
                name,
                ObjectProp {
                    schema,
                    metadata: field.metadata().clone(),
                    tag: field.tag.clone(),
                },
            ));
        }

        let object = Schema::Object(ObjectSchema {
            properties,
            description: None,
            example: None,
            modify: Vec::new(),
        })
        .with_description(&ty.doc.full_doc);

        if members.is_empty() {
            return object;
        }
        if let Some(own) = object.properties() {
            flattened.extend(own.iter().cloned());
        }
        members.push(object);
        Schema::AllOf { members, flattened }
    }

    /// Flat properties contributed by an embedded member. References are
    /// looked through by resolving their definition inline.
    fn projection(&mut self, ty: &TypeRef, schema: &Schema) -> Vec<(String, ObjectProp)> {
        if let Some(props) = schema.properties() {
            return props.to_vec();
        }
        if !matches!(schema, Schema::Ref { .. }) {
            return Vec::new();
        }
        let Some(def) = self.definition_of(ty) else {
            return Vec::new();
        };
        self.type_to_schema(&def, ToSchemaOpts::INLINE)
            .properties()
            .map(<[_]>::to_vec)
            .unwrap_or_default()
    }

    /// Property name of a struct field, or `None` if the field is omitted.
    fn property_name(&self, field: &Field) -> Option<String> {
        if let Some(name) = field.metadata().get("name").and_then(|n| n.as_str()) {
            return Some(name.to_string());
        }
        let tags = self.options.name_tag.iter().map(String::as_str);
        tagged_name(field, tags)
    }

    /// Name of a `params(...)` entry.
    pub(crate) fn param_name(&self, field: &Field) -> Option<String> {
        if let Some(name) = field.metadata().get("name").and_then(|n| n.as_str()) {
            return Some(name.to_string());
        }
        let tags = self
            .options
            .param_tags
            .iter()
            .chain(self.options.name_tag.iter())
            .map(String::as_str);
        tagged_name(field, tags)
    }
}

/// First tag among `tags` that names the field; `-` omits it.
fn tagged_name<'a>(field: &Field, tags: impl Iterator<Item = &'a str>) -> Option<String> {
    for tag in tags {
        let Some(value) = field.tag.get(tag) else {
            continue;
        };
        let name = value.split(',').next().unwrap_or_default();
        if name == "-" {
            return None;
        }
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }
    Some(field.name.clone())
}
