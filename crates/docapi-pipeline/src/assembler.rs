//! # Document Assembler
//!
//! Completes an ordered document in three passes:
//!
//! 1. **Registration.** Every `components/schemas/<Name>/x-$schema` whose
//!    value is a type path registers that type as the definition at
//!    `#/components/schemas/<Name>`. Later encounters render as `$ref`.
//! 2. **Expansion.** Depth-first over the document:
//!    - `x-$` keys are host directives. A type path expands to a type
//!      document, an expression is evaluated, maps and lists are expanded
//!      recursively. The result goes through the [`ScriptHost`]; a map
//!      reply is spliced into the parent at the directive's position, any
//!      other reply stays under the directive key.
//!    - `js-` keys are expression directives stored without the prefix.
//! 3. **Merge.** Duplicate keys are deep-merged across the whole tree.
//!
//! A directive that fails leaves `{error: <message>}` in its place and a
//! [`Diagnostic`] in the pass report; the rest of the document is still
//! completed.

use std::collections::BTreeMap;
use std::sync::Arc;

use docapi_core::{Node, OrderedMap, Schema, TypeGraph, TypeKind, TypeRef};
use docapi_expr::{eval_str, ExprError, ResolvedValue};
use docapi_schema::{ResolverOptions, SchemaResolver, ToSchemaOpts};
use tracing::{debug, error, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::host::{IdentityHost, ProcessHost, ScriptHost};
use crate::predicate::{expression_key, is_host_directive, ExpressionForm, DEFINITION_PATTERN};
use crate::scope::FileScope;

/// A directive that could not be expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Dot-joined key path of the directive.
    pub path: String,
    pub message: String,
}

/// Result of one document pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Completed {
    pub document: Node,
    pub diagnostics: Vec<Diagnostic>,
    /// Schemas written into the document that carry a hard `error` node.
    pub inline_errors: usize,
}

impl Completed {
    /// True if any directive failed or any inline error schema was produced.
    /// Soft `x-error` nodes do not count.
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty() || self.inline_errors > 0
    }
}

/// Drives document completion. Immutable; each call to
/// [`Assembler::complete`] runs an independent pass.
pub struct Assembler {
    graph: Arc<dyn TypeGraph>,
    host: Arc<dyn ScriptHost>,
    options: ResolverOptions,
    imports: BTreeMap<String, String>,
}

impl Assembler {
    pub fn new(graph: Arc<dyn TypeGraph>, options: ResolverOptions) -> Self {
        Self {
            graph,
            host: Arc::new(IdentityHost),
            options,
            imports: BTreeMap::new(),
        }
    }

    pub fn with_host(mut self, host: Arc<dyn ScriptHost>) -> Self {
        self.host = host;
        self
    }

    /// Import aliases available to expressions outside source files.
    pub fn with_imports(mut self, imports: BTreeMap<String, String>) -> Self {
        self.imports = imports;
        self
    }

    /// Build an assembler from configuration, starting the script host if
    /// one is configured.
    pub fn from_config(graph: Arc<dyn TypeGraph>, config: &PipelineConfig) -> Result<Self, PipelineError> {
        let mut assembler =
            Self::new(graph, config.resolver_options()).with_imports(config.imports.clone());
        if let Some(script) = &config.script {
            let host = ProcessHost::from_command_line(&script.command, script.timeout())?;
            assembler = assembler.with_host(Arc::new(host));
        }
        Ok(assembler)
    }

    pub fn graph(&self) -> &Arc<dyn TypeGraph> {
        &self.graph
    }

    /// Complete a document. The root must be a map.
    pub fn complete(&self, document: Node) -> Result<Completed, PipelineError> {
        let root = match document {
            Node::Map(root) => root,
            other => {
                return Err(PipelineError::NotAMap {
                    found: other.kind_name(),
                })
            }
        };
        let mut pass = Pass::new(self);
        pass.register(&root);
        let expanded = pass.expand_map(root, &mut Vec::new());
        Ok(Completed {
            document: Node::Map(expanded).merge_duplicates(),
            diagnostics: pass.diagnostics,
            inline_errors: pass.inline_errors,
        })
    }

    /// Parse YAML (or JSON) text and complete it.
    pub fn complete_str(&self, text: &str) -> Result<Completed, PipelineError> {
        self.complete(Node::from_yaml_str(text)?)
    }

    /// Evaluate one expression, optionally in the context of a source file,
    /// and lower the result to a document node.
    pub fn evaluate(&self, code: &str, file: Option<&str>) -> Result<Node, ExprError> {
        let mut pass = Pass::new(self);
        let value = pass.evaluate(code, file)?;
        Ok(pass.lower(&value))
    }

    /// Schema of the type at `path`, inline. `None` if the path does not
    /// resolve.
    pub fn type_schema(&self, path: &str) -> Option<Node> {
        let ty = self.graph.resolve_type_path(path)?;
        let mut pass = Pass::new(self);
        Some(pass.resolver.type_to_schema(&ty, ToSchemaOpts::INLINE).to_node())
    }
}

/// Mutable state of one document pass.
struct Pass<'a> {
    assembler: &'a Assembler,
    resolver: SchemaResolver,
    diagnostics: Vec<Diagnostic>,
    inline_errors: usize,
}

impl<'a> Pass<'a> {
    fn new(assembler: &'a Assembler) -> Self {
        Self {
            assembler,
            resolver: SchemaResolver::new(Arc::clone(&assembler.graph), assembler.options.clone()),
            diagnostics: Vec::new(),
            inline_errors: 0,
        }
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    fn register(&mut self, root: &OrderedMap) {
        let graph = Arc::clone(&self.assembler.graph);
        for (crumbs, value) in root.select(&DEFINITION_PATTERN) {
            let Some(raw) = value.as_str() else {
                continue;
            };
            let path = graph.normalize_path(raw);
            if !graph.owns_path(&path) {
                continue;
            }
            match graph.resolve_type_path(&path).and_then(|ty| ty.key) {
                Some(key) => self.resolver.register(key, &crumbs.join("/")),
                None => warn!(
                    path = %path,
                    at = %crumbs.join("."),
                    "can't find schema definition"
                ),
            }
        }
    }

    // ------------------------------------------------------------------
    // Expansion
    // ------------------------------------------------------------------

    fn expand_map(&mut self, map: OrderedMap, crumbs: &mut Vec<String>) -> OrderedMap {
        let mut out = OrderedMap::new();
        for (key, value) in map {
            if is_host_directive(&key) {
                debug!(key = %key, at = %crumbs.join("."), "expanding host directive");
                match self.host_directive(&key, value, crumbs) {
                    Ok(Node::Map(reply)) => out.extend(reply),
                    Ok(reply) => out.push(key, reply),
                    Err(message) => {
                        let node = self.fail(crumbs, &key, message);
                        out.push(key, node);
                    }
                }
                continue;
            }

            if let Some(name) = expression_key(&key) {
                let name = name.to_string();
                let node = self.expression_directive(&key, value, None, crumbs);
                out.push(name, node);
                continue;
            }

            crumbs.push(key.clone());
            let value = self.expand_node(value, crumbs);
            crumbs.pop();
            out.push(key, value);
        }
        out
    }

    fn expand_node(&mut self, node: Node, crumbs: &mut Vec<String>) -> Node {
        match node {
            Node::Map(map) => Node::Map(self.expand_map(map, crumbs)),
            Node::List(items) => Node::List(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| {
                        crumbs.push(index.to_string());
                        let item = self.expand_node(item, crumbs);
                        crumbs.pop();
                        item
                    })
                    .collect(),
            ),
            other => other,
        }
    }

    fn host_directive(&mut self, key: &str, value: Node, crumbs: &mut Vec<String>) -> Result<Node, String> {
        let expanded = match value {
            Node::String(text) => self.expand_directive_string(&text, crumbs)?,
            Node::Map(_) | Node::List(_) => {
                crumbs.push(key.to_string());
                let expanded = self.expand_node(value, crumbs);
                crumbs.pop();
                expanded
            }
            other => other,
        };
        self.assembler
            .host
            .filter(key, expanded, crumbs)
            .map_err(|e| e.to_string())
    }

    /// Expand the string value of a host directive: a type path becomes a
    /// type document, an expression is evaluated, other text is kept.
    fn expand_directive_string(&mut self, text: &str, crumbs: &[String]) -> Result<Node, String> {
        let graph = Arc::clone(&self.assembler.graph);
        let path = graph.normalize_path(text);
        if graph.owns_path(&path) {
            return Ok(match graph.resolve_type_path(&path) {
                Some(ty) => self.type_document(&ty, crumbs),
                None => {
                    warn!(path = %path, at = %crumbs.join("."), "can't resolve path");
                    let mut map = OrderedMap::new();
                    map.push(text, Node::from(format!("error, can't resolve path: {text}")));
                    Node::Map(map)
                }
            });
        }
        self.expand_value_string(text, None)
            .map(|expanded| expanded.unwrap_or_else(|| Node::from(text)))
    }

    /// Evaluate a string if it is an expression. `Ok(None)` means the
    /// string is plain text.
    fn expand_value_string(&mut self, text: &str, file: Option<&str>) -> Result<Option<Node>, String> {
        let form = ExpressionForm::detect(text);
        let Some(code) = form.code() else {
            return Ok(None);
        };
        match self.evaluate(code, file) {
            Ok(value) if form.is_marked() => Ok(Some(self.lower(&value))),
            Ok(value) if !value.is_nullish() => Ok(Some(self.lower(&value))),
            Ok(_) => Ok(None),
            Err(e) if form.is_marked() => Err(e.to_string()),
            Err(_) => Ok(None),
        }
    }

    fn expression_directive(
        &mut self,
        key: &str,
        value: Node,
        file: Option<&str>,
        crumbs: &[String],
    ) -> Node {
        let Node::String(code) = value else {
            let message = format!(
                "value of '{key}' must be a string expression, found {}",
                value.kind_name()
            );
            return self.fail(crumbs, key, message);
        };
        match self.evaluate(&code, file) {
            Ok(value) => self.lower(&value),
            Err(e) => self.fail(crumbs, key, e.to_string()),
        }
    }

    // ------------------------------------------------------------------
    // Type documents
    // ------------------------------------------------------------------

    /// `{doc, summary, description, meta, schema?, x-type-doc: true}` for
    /// a declaration. The schema is inline at the type's own definition
    /// site and omitted for functions.
    fn type_document(&mut self, ty: &TypeRef, crumbs: &[String]) -> Node {
        let mut doc = OrderedMap::new();
        doc.push("doc", Node::from(ty.doc.full_doc.as_str()));
        doc.push("summary", Node::from(ty.doc.summary.as_str()));
        doc.push("description", Node::from(ty.doc.description.as_str()));

        let mut meta_crumbs = crumbs.to_vec();
        meta_crumbs.push("meta".to_string());
        let meta = self.expand_meta(ty.doc.meta.clone(), &ty.file, &mut meta_crumbs);
        doc.push("meta", Node::Map(meta));

        if !matches!(ty.kind, TypeKind::Func) {
            let at_definition = match (&ty.key, self.definition_site(crumbs)) {
                (Some(key), Some(site)) => self.resolver.registered_target(key) == Some(site.as_str()),
                _ => false,
            };
            let opts = ToSchemaOpts {
                no_ref: at_definition,
            };
            let schema = self.resolver.type_to_schema(ty, opts);
            doc.push("schema", self.render(&schema));
        }
        doc.push("x-type-doc", Node::Bool(true));
        Node::Map(doc)
    }

    /// `#/components/schemas/<Name>` when `crumbs` is a definition site.
    fn definition_site(&self, crumbs: &[String]) -> Option<String> {
        let pattern = &DEFINITION_PATTERN[..DEFINITION_PATTERN.len() - 1];
        let matches = crumbs.len() == pattern.len()
            && pattern.iter().zip(crumbs).all(|(p, c)| *p == "*" || p == c);
        matches.then(|| format!("#/{}", crumbs.join("/")))
    }

    /// Expand doc-comment metadata: `js-` keys and every expression form
    /// are evaluated with `file` in scope.
    fn expand_meta(&mut self, meta: OrderedMap, file: &str, crumbs: &mut Vec<String>) -> OrderedMap {
        let mut out = OrderedMap::new();
        for (key, value) in meta {
            if let Some(name) = expression_key(&key) {
                let name = name.to_string();
                let node = self.expression_directive(&key, value, Some(file), crumbs);
                out.push(name, node);
                continue;
            }
            let node = match value {
                Node::String(text) => match self.expand_value_string(&text, Some(file)) {
                    Ok(Some(node)) => node,
                    Ok(None) => Node::String(text),
                    Err(message) => self.fail(crumbs, &key, message),
                },
                Node::Map(map) => {
                    crumbs.push(key.clone());
                    let map = self.expand_meta(map, file, crumbs);
                    crumbs.pop();
                    Node::Map(map)
                }
                other => other,
            };
            out.push(key, node);
        }
        out
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    fn evaluate(&mut self, code: &str, file: Option<&str>) -> Result<ResolvedValue, ExprError> {
        let imports = &self.assembler.imports;
        let mut scope = FileScope::new(&mut self.resolver, file, imports);
        eval_str(code, &mut scope)
    }

    /// Lower an evaluated value into the document. Types become their
    /// schemas, unresolved names become inline errors.
    fn lower(&mut self, value: &ResolvedValue) -> Node {
        match value {
            ResolvedValue::Map(map) => Node::Map(
                map.iter()
                    .map(|(k, v)| (k.to_string(), self.lower(v)))
                    .collect(),
            ),
            ResolvedValue::List(items) => Node::List(items.iter().map(|v| self.lower(v)).collect()),
            ResolvedValue::Schema(schema) => self.render(schema),
            ResolvedValue::Type(_)
            | ResolvedValue::NotFound(_)
            | ResolvedValue::Package(_)
            | ResolvedValue::Builtin(_) => {
                let schema = self.resolver.to_schema(value, ToSchemaOpts::default());
                self.render(&schema)
            }
            plain => plain.to_data_node().unwrap_or_default(),
        }
    }

    /// Render a schema into the document, counting hard errors.
    fn render(&mut self, schema: &Schema) -> Node {
        if schema.contains_hard_error() {
            self.inline_errors += 1;
        }
        schema.to_node()
    }

    fn fail(&mut self, crumbs: &[String], key: &str, message: String) -> Node {
        let path = crumbs
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(key))
            .collect::<Vec<_>>()
            .join(".");
        error!(path = %path, message = %message, "directive failed");
        let mut node = OrderedMap::new();
        node.push("error", Node::from(message.as_str()));
        self.diagnostics.push(Diagnostic { path, message });
        Node::Map(node)
    }
}


#[cfg(test)]
mod proptests {
    use docapi_core::MemoryTypeGraph;
    use proptest::prelude::*;

    use super::*;

    fn node_strategy() -> impl Strategy<Value = Node> {
        let leaf = prop_oneof![
            Just(Node::Null),
            any::<bool>().prop_map(Node::Bool),
            any::<i64>().prop_map(Node::from),
            "[a-zA-Z0-9_ .()]{0,12}".prop_map(Node::String),
        ];
        leaf.prop_recursive(3, 32, 5, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Node::List),
                prop::collection::vec(("[a-c]{1,2}", inner), 0..5)
                    .prop_map(|entries| Node::Map(entries.into_iter().collect())),
            ]
        })
    }

    fn map_strategy() -> impl Strategy<Value = OrderedMap> {
        prop::collection::vec(("[a-c]{1,2}", node_strategy()), 0..5)
            .prop_map(|entries| entries.into_iter().collect())
    }

    fn assembler() -> Assembler {
        let graph = MemoryTypeGraph::from_yaml_str("packages: []").expect("manifest loads");
        Assembler::new(Arc::new(graph), ResolverOptions::default())
    }

    proptest! {
        /// Without directives, completion only collapses duplicate keys.
        #[test]
        fn plain_documents_are_only_merged(doc in map_strategy()) {
            let done = assembler().complete(Node::Map(doc.clone())).unwrap();
            prop_assert!(done.diagnostics.is_empty());
            prop_assert_eq!(done.document, Node::Map(doc.merge_duplicates()));
        }

        /// Completing a completed plain document changes nothing.
        #[test]
        fn completion_is_idempotent(doc in map_strategy()) {
            let once = assembler().complete(Node::Map(doc)).unwrap().document;
            let twice = assembler().complete(once.clone()).unwrap().document;
            prop_assert_eq!(once, twice);
        }
    }
}
