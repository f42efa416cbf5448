//! Identifier resolution for directive expressions.
//!
//! A free identifier is looked up, in order, as:
//!
//! 1. an import alias of the current source file (`model` in `model.Pet`),
//! 2. a declaration in the current file's own package (`Pet`),
//! 3. a configured import alias (for expressions in the document itself),
//!
//! and evaluates to `NotFound` otherwise.

use std::collections::BTreeMap;
use std::sync::Arc;

use docapi_expr::{
    Builtin, EvalError, NotFound, PackageHandle, ResolvedValue, Resolver, TypeHandle,
};
use docapi_schema::SchemaResolver;

/// Resolver for one expression evaluation.
pub struct FileScope<'a> {
    schemas: &'a mut SchemaResolver,
    /// Source file whose imports and package are in scope.
    file: Option<&'a str>,
    imports: &'a BTreeMap<String, String>,
}

impl<'a> FileScope<'a> {
    pub fn new(
        schemas: &'a mut SchemaResolver,
        file: Option<&'a str>,
        imports: &'a BTreeMap<String, String>,
    ) -> Self {
        Self {
            schemas,
            file,
            imports,
        }
    }

    fn package(&self, alias: &str, path: String) -> ResolvedValue {
        ResolvedValue::Package(PackageHandle {
            graph: Arc::clone(self.schemas.graph()),
            alias: alias.to_string(),
            path,
        })
    }
}

impl Resolver for FileScope<'_> {
    fn resolve(&mut self, name: &str) -> ResolvedValue {
        let graph = Arc::clone(self.schemas.graph());
        if let Some(file) = self.file {
            if let Some(path) = graph.imports(file).remove(name) {
                return self.package(name, path);
            }
            if let Some(ty) = graph.resolve_in_file(file, None, name) {
                return ResolvedValue::Type(TypeHandle { graph, ty });
            }
        }
        if let Some(path) = self.imports.get(name) {
            return self.package(name, path.clone());
        }
        ResolvedValue::NotFound(NotFound {
            name: name.to_string(),
            context: self.file.unwrap_or("document").to_string(),
        })
    }

    fn apply(
        &mut self,
        builtin: &Builtin,
        args: Vec<ResolvedValue>,
    ) -> Result<ResolvedValue, EvalError> {
        self.schemas.apply_builtin(builtin, args)
    }
}

#[cfg(test)]
mod tests {
    use docapi_core::{MemoryTypeGraph, TypeGraph};
    use docapi_schema::ResolverOptions;

    use super::*;

    const MANIFEST: &str = r#"
packages:
  - path: app/handler
    files:
      - path: app/handler/pet.go
        imports: { model: app/model }
    types:
      - name: Local
        file: app/handler/pet.go
  - path: app/model
    types:
      - name: Pet
"#;

    fn schemas() -> SchemaResolver {
        let graph: Arc<dyn TypeGraph> =
            Arc::new(MemoryTypeGraph::from_yaml_str(MANIFEST).expect("manifest loads"));
        SchemaResolver::new(graph, ResolverOptions::default())
    }

    #[test]
    fn file_imports_and_package_come_first() {
        let mut schemas = schemas();
        let imports = BTreeMap::new();
        let mut scope = FileScope::new(&mut schemas, Some("app/handler/pet.go"), &imports);
        assert!(matches!(scope.resolve("model"), ResolvedValue::Package(p) if p.path == "app/model"));
        assert!(matches!(
            scope.resolve("Local"),
            ResolvedValue::Type(t) if t.ty.key.as_deref() == Some("app/handler.Local")
        ));
    }

    #[test]
    fn configured_imports_apply_outside_files() {
        let mut schemas = schemas();
        let imports = BTreeMap::from([("m".to_string(), "app/model".to_string())]);
        let mut scope = FileScope::new(&mut schemas, None, &imports);
        assert!(matches!(scope.resolve("m"), ResolvedValue::Package(p) if p.alias == "m"));
        match scope.resolve("Pet") {
            ResolvedValue::NotFound(missing) => assert_eq!(missing.context, "document"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
