//! # Parameter Lists
//!
//! `params(T)` turns the fields of struct `T` into a list of operation
//! parameter entries:
//!
//! ```yaml
//! - name: status          # param tag, name tag, `$name` meta or field name
//!   in: query             # field `$in`, else the struct's `$in`
//!   description: ...      # field documentation
//!   required: true        # field `$required`, when present
//!   schema: { ... }       # the field type's schema
//! ```
//!
//! Untagged embedded structs contribute their own fields in place. Values
//! that are not type handles (an already-built list, say) pass through
//! unchanged so that `params([...])` is harmless.

use std::collections::HashSet;

use docapi_core::{Field, TypeRef};
use docapi_expr::{EvalError, ResolvedValue, ValueMap};
use tracing::debug;

use crate::resolver::{SchemaResolver, ToSchemaOpts};

/// Evaluate `params(value)`.
pub fn params(resolver: &mut SchemaResolver, value: ResolvedValue) -> Result<ResolvedValue, EvalError> {
    let handle = match value {
        ResolvedValue::Type(handle) => handle,
        ResolvedValue::NotFound(missing) => {
            return Err(failure(format!(
                "can't resolve '{}' in '{}'",
                missing.name, missing.context
            )))
        }
        other => return Ok(other),
    };

    let def = resolver
        .definition_of(&handle.ty)
        .filter(TypeRef::is_struct)
        .ok_or_else(|| failure(format!("'{}' is not a struct type", display_name(&handle.ty))))?;

    let struct_in = def.doc.meta.get("in").cloned();
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    collect(resolver, &def, struct_in.as_ref(), &mut seen, &mut entries);
    debug!(target_type = %display_name(&def), count = entries.len(), "expanded params");
    Ok(ResolvedValue::List(entries))
}

fn collect(
    resolver: &mut SchemaResolver,
    def: &TypeRef,
    struct_in: Option<&docapi_core::Node>,
    seen: &mut HashSet<String>,
    out: &mut Vec<ResolvedValue>,
) {
    if let Some(key) = &def.key {
        if !seen.insert(key.clone()) {
            return;
        }
    }
    for field in def.members() {
        if field.embedded && field.tag.is_empty() {
            if let Some(inner) = resolver.definition_of(&field.ty).filter(TypeRef::is_struct) {
                collect(resolver, &inner, struct_in, seen, out);
                continue;
            }
        }
        if let Some(entry) = entry(resolver, field, struct_in) {
            out.push(entry);
        }
    }
}

fn entry(
    resolver: &mut SchemaResolver,
    field: &Field,
    struct_in: Option<&docapi_core::Node>,
) -> Option<ResolvedValue> {
    let name = resolver.param_name(field)?;
    let meta = field.metadata();

    let mut map = ValueMap::new();
    map.insert("name", ResolvedValue::String(name));
    if let Some(location) = meta.get("in").or(struct_in) {
        map.insert("in", ResolvedValue::from_node(location.clone()));
    }
    map.insert(
        "description",
        ResolvedValue::String(field.doc().full_doc.clone()),
    );
    if let Some(required) = meta.get("required") {
        map.insert("required", ResolvedValue::from_node(required.clone()));
    }
    let schema = resolver.type_to_schema(&field.ty, ToSchemaOpts::default());
    map.insert("schema", ResolvedValue::from(schema));
    Some(ResolvedValue::Map(map))
}

fn display_name(ty: &TypeRef) -> &str {
    ty.key.as_deref().or(ty.name.as_deref()).unwrap_or("anonymous type")
}

fn failure(message: String) -> EvalError {
    EvalError::Builtin {
        builtin: "params".to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use docapi_core::{MemoryTypeGraph, TypeGraph};
    use docapi_expr::TypeHandle;

    use super::*;
    use crate::resolver::ResolverOptions;

    const MANIFEST: &str = r#"
packages:
  - path: app/model
    types:
      - name: Paging
        fields:
          - { name: Page, type: int, tag: 'form:"page"', doc: "$in: query" }
      - name: FindParams
        doc: "$in: query"
        fields:
          - { type: Paging, embedded: true }
          - { name: Status, type: "[]string", tag: 'form:"status"', doc: "Status filter\n$required: true" }
          - { name: Token, type: string, tag: 'form:"-"' }
          - { name: Trace, type: string, doc: "$in: header\n$name: X-Trace" }
      - name: Plain
        type: string
"#;

    fn setup() -> (SchemaResolver, Arc<dyn TypeGraph>) {
        let graph: Arc<dyn TypeGraph> =
            Arc::new(MemoryTypeGraph::from_yaml_str(MANIFEST).expect("manifest loads"));
        let resolver = SchemaResolver::new(
            Arc::clone(&graph),
            ResolverOptions {
                param_tags: vec!["form".into()],
                ..Default::default()
            },
        );
        (resolver, graph)
    }

    fn handle(graph: &Arc<dyn TypeGraph>, name: &str) -> ResolvedValue {
        ResolvedValue::Type(TypeHandle {
            graph: Arc::clone(graph),
            ty: graph.lookup("app/model", name).expect("declared"),
        })
    }

    #[test]
    fn struct_fields_become_parameter_entries() {
        let (mut resolver, graph) = setup();
        let value = params(&mut resolver, handle(&graph, "FindParams")).unwrap();
        let node = value.to_data_node().unwrap();
        assert_eq!(
            node.to_json_compact().unwrap(),
            concat!(
                r#"[{"name":"page","in":"query","description":"","schema":{"type":"integer"}},"#,
                r#"{"name":"status","in":"query","description":"Status filter","required":true,"#,
                r#""schema":{"type":"array","description":"Status filter","items":{"type":"string"}}},"#,
                r#"{"name":"X-Trace","in":"header","description":"","schema":{"type":"string"}}]"#
            )
        );
    }

    #[test]
    fn non_struct_types_are_rejected() {
        let (mut resolver, graph) = setup();
        let err = params(&mut resolver, handle(&graph, "Plain")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "params(): 'app/model.Plain' is not a struct type"
        );
    }

    #[test]
    fn plain_values_pass_through() {
        let (mut resolver, _) = setup();
        let list = ResolvedValue::List(vec![ResolvedValue::from("x")]);
        assert_eq!(params(&mut resolver, list.clone()).unwrap(), list);
    }
}
