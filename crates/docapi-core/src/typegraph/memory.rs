//! # In-Memory Type Graph
//!
//! A [`TypeGraph`] built from a type manifest: a YAML or JSON document
//! listing packages, their files and import tables, type declarations and
//! method documentation.
//!
//! ```yaml
//! module: github.com/acme/petstore
//! packages:
//!   - path: github.com/acme/petstore/model
//!     files:
//!       - path: github.com/acme/petstore/model/pet.go
//!     types:
//!       - name: Pet
//!         file: github.com/acme/petstore/model/pet.go
//!         doc: Pet is pet model
//!         fields:
//!           - { name: Id, type: int64, tag: 'json:"id"' }
//!       - name: PetStatus
//!         type: string
//!         enum: [{ name: Available, value: available }]
//! ```
//!
//! Type expressions: builtin scalars, `[]T`, `*T`, `pkg.Name`, `Name`,
//! `interface{}` / `any` and `func...`.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use super::{parse_tag, split_package_path, EnumValue, Field, TypeGraph, TypeKind, TypeRef};
use crate::doc::{parse_doc, DocInfo};
use crate::error::{DocapiError, ManifestError, OdmError};
use crate::odm::Node;
use crate::schema::ScalarKind;

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    module: String,
    #[serde(default)]
    packages: Vec<PackageDecl>,
}

#[derive(Debug, Deserialize)]
struct PackageDecl {
    path: String,
    #[serde(default)]
    files: Vec<FileDecl>,
    #[serde(default)]
    types: Vec<TypeDecl>,
    #[serde(default)]
    methods: Vec<MethodDecl>,
}

#[derive(Debug, Deserialize)]
struct FileDecl {
    path: String,
    #[serde(default)]
    imports: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct TypeDecl {
    name: String,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    doc: String,
    #[serde(default, rename = "type")]
    ty: Option<String>,
    #[serde(default)]
    fields: Option<Vec<FieldDecl>>,
    #[serde(default, rename = "enum")]
    enumeration: Vec<EnumDecl>,
}

#[derive(Debug, Deserialize)]
struct FieldDecl {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    tag: String,
    #[serde(default)]
    doc: String,
    #[serde(default)]
    embedded: bool,
}

#[derive(Debug, Deserialize)]
struct EnumDecl {
    name: String,
    value: Node,
}

#[derive(Debug, Deserialize)]
struct MethodDecl {
    receiver: String,
    name: String,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    doc: String,
}

#[derive(Debug, Default)]
struct FileInfo {
    package: String,
    imports: BTreeMap<String, String>,
}

/// Type graph held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryTypeGraph {
    module: String,
    types: HashMap<String, TypeRef>,
    methods: HashMap<String, TypeRef>,
    enums: HashMap<String, Vec<EnumValue>>,
    files: HashMap<String, FileInfo>,
    packages: Vec<String>,
}

impl MemoryTypeGraph {
    /// Load a manifest from YAML (or JSON) text.
    pub fn from_yaml_str(text: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest =
            serde_yaml::from_str(text).map_err(|e| ManifestError::Parse(OdmError::Yaml(e)))?;
        Self::from_manifest(manifest)
    }

    /// Load a manifest file.
    pub fn from_path(path: &Path) -> Result<Self, DocapiError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_yaml_str(&text)?)
    }

    /// Module path that `./` paths are relative to.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Number of named declarations.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn from_manifest(manifest: Manifest) -> Result<Self, ManifestError> {
        let mut graph = MemoryTypeGraph {
            module: manifest.module.trim_end_matches('/').to_string(),
            ..Default::default()
        };

        for package in manifest.packages {
            let pkg = package.path.trim_end_matches('/').to_string();
            graph.packages.push(pkg.clone());
            // The package path doubles as a file context for declarations
            // that name no file.
            graph.files.entry(pkg.clone()).or_insert_with(|| FileInfo {
                package: pkg.clone(),
                imports: BTreeMap::new(),
            });
            for file in package.files {
                graph.files.insert(
                    file.path,
                    FileInfo {
                        package: pkg.clone(),
                        imports: file.imports,
                    },
                );
            }

            for decl in package.types {
                let key = format!("{pkg}.{}", decl.name);
                if graph.types.contains_key(&key) {
                    return Err(ManifestError::DuplicateType { key });
                }
                let file = decl.file.clone().unwrap_or_else(|| pkg.clone());
                let ty = build_type(&key, &file, decl.ty.as_deref(), decl.fields)?;
                let enums: Vec<EnumValue> = decl
                    .enumeration
                    .into_iter()
                    .map(|e| EnumValue {
                        name: e.name,
                        value: e.value,
                    })
                    .collect();
                if !enums.is_empty() {
                    graph.enums.insert(key.clone(), enums);
                }
                graph.types.insert(
                    key.clone(),
                    TypeRef {
                        key: Some(key.clone()),
                        name: Some(decl.name),
                        file,
                        doc: doc_info(&decl.doc, &key)?,
                        kind: ty,
                    },
                );
            }

            for method in package.methods {
                let key = format!("{pkg}.{}.{}", method.receiver, method.name);
                let file = method.file.unwrap_or_else(|| pkg.clone());
                graph.methods.insert(
                    key.clone(),
                    TypeRef {
                        key: Some(key.clone()),
                        name: Some(method.name),
                        file,
                        doc: doc_info(&method.doc, &key)?,
                        kind: TypeKind::Func,
                    },
                );
            }
        }

        Ok(graph)
    }
}

fn doc_info(text: &str, location: &str) -> Result<DocInfo, ManifestError> {
    parse_doc(text).map_err(|source| ManifestError::Doc {
        location: location.to_string(),
        source,
    })
}

fn build_type(
    key: &str,
    file: &str,
    expr: Option<&str>,
    fields: Option<Vec<FieldDecl>>,
) -> Result<TypeKind, ManifestError> {
    if let Some(fields) = fields {
        let mut out = Vec::with_capacity(fields.len());
        for field in fields {
            out.push(build_field(key, file, field)?);
        }
        return Ok(TypeKind::Struct(out));
    }
    match expr {
        Some(expr) => parse_type_expr(expr, file, key),
        None => Ok(TypeKind::Struct(Vec::new())),
    }
}

fn build_field(owner: &str, file: &str, decl: FieldDecl) -> Result<Field, ManifestError> {
    let location = format!("{owner}.{}", decl.name.as_deref().unwrap_or(&decl.ty));
    let kind = parse_type_expr(&decl.ty, file, &location)?;
    let embedded = decl.embedded || decl.name.is_none();
    let name = match decl.name {
        Some(name) => name,
        None => bare_type_name(&decl.ty).ok_or_else(|| ManifestError::InvalidTypeExpr {
            expr: decl.ty.clone(),
            location: location.clone(),
            reason: "embedded fields must name a type".to_string(),
        })?,
    };
    Ok(Field {
        name,
        ty: TypeRef {
            key: None,
            name: None,
            file: file.to_string(),
            doc: doc_info(&decl.doc, &location)?,
            kind,
        },
        tag: parse_tag(&decl.tag),
        embedded,
    })
}

/// `*model.Pet` names `Pet`.
fn bare_type_name(expr: &str) -> Option<String> {
    let expr = expr.trim().trim_start_matches('*');
    let name = expr.rsplit('.').next()?;
    is_identifier(name).then(|| name.to_string())
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Parse a type expression declared in `file`.
pub(crate) fn parse_type_expr(expr: &str, file: &str, location: &str) -> Result<TypeKind, ManifestError> {
    let expr = expr.trim();
    let invalid = |reason: &str| ManifestError::InvalidTypeExpr {
        expr: expr.to_string(),
        location: location.to_string(),
        reason: reason.to_string(),
    };

    if let Some(elem) = expr.strip_prefix("[]") {
        let inner = parse_type_expr(elem, file, location)?;
        return Ok(TypeKind::Array(Box::new(TypeRef::anonymous(file, inner))));
    }
    if let Some(target) = expr.strip_prefix('*') {
        let inner = parse_type_expr(target, file, location)?;
        return Ok(TypeKind::Pointer(Box::new(TypeRef::anonymous(file, inner))));
    }
    if expr == "any" || expr.replace(' ', "") == "interface{}" {
        return Ok(TypeKind::Interface);
    }
    if expr == "func" || expr.starts_with("func(") {
        return Ok(TypeKind::Func);
    }
    if let Some(kind) = ScalarKind::from_type_name(expr) {
        return Ok(TypeKind::Scalar(kind));
    }
    if let Some((package, name)) = expr.split_once('.') {
        if !is_identifier(package) || !is_identifier(name) {
            return Err(invalid("expected 'package.Name'"));
        }
        return Ok(TypeKind::Qualified {
            package: package.to_string(),
            name: name.to_string(),
        });
    }
    if is_identifier(expr) {
        return Ok(TypeKind::Named(expr.to_string()));
    }
    Err(invalid("unsupported type expression"))
}

impl TypeGraph for MemoryTypeGraph {
    fn resolve_type_path(&self, path: &str) -> Option<TypeRef> {
        let path = self.normalize_path(path);
        let (package, member) = split_package_path(&path);
        if member.is_empty() {
            return None;
        }
        match member.split_once('.') {
            None => self.lookup(package, member),
            Some((receiver, method)) => self.methods.get(&format!("{package}.{receiver}.{method}")).cloned(),
        }
    }

    fn owns_path(&self, path: &str) -> bool {
        let path = self.normalize_path(path);
        let (package, member) = split_package_path(&path);
        if member.is_empty() || package.is_empty() {
            return false;
        }
        self.has_package(package)
            || (!self.module.is_empty() && package.starts_with(&format!("{}/", self.module)))
    }

    fn normalize_path(&self, path: &str) -> String {
        match path.strip_prefix("./") {
            Some(rest) if !self.module.is_empty() => format!("{}/{rest}", self.module),
            _ => path.to_string(),
        }
    }

    fn lookup(&self, package: &str, name: &str) -> Option<TypeRef> {
        self.types.get(&format!("{package}.{name}")).cloned()
    }

    fn package_of_file(&self, file: &str) -> Option<String> {
        self.files.get(file).map(|f| f.package.clone())
    }

    fn imports(&self, file: &str) -> BTreeMap<String, String> {
        self.files.get(file).map(|f| f.imports.clone()).unwrap_or_default()
    }

    fn has_package(&self, package: &str) -> bool {
        self.packages.iter().any(|p| p == package)
    }

    fn enum_values(&self, ty: &TypeRef) -> Vec<EnumValue> {
        ty.key
            .as_ref()
            .and_then(|key| self.enums.get(key))
            .cloned()
            .unwrap_or_default()
    }

    fn method(&self, ty: &TypeRef, name: &str) -> Option<TypeRef> {
        let key = ty.key.as_ref()?;
        self.methods.get(&format!("{key}.{name}")).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
module: github.com/acme/petstore
packages:
  - path: github.com/acme/petstore/model
    files:
      - path: github.com/acme/petstore/model/pet.go
    types:
      - name: Pet
        file: github.com/acme/petstore/model/pet.go
        doc: "Pet is pet model\n$:\n  testMeta: a"
        fields:
          - { name: Id, type: int64, tag: 'json:"id"', doc: "Id is Pet ID" }
          - { name: Tags, type: "[]string" }
          - { name: Status, type: PetStatus }
      - name: PetStatus
        file: github.com/acme/petstore/model/pet.go
        type: string
        enum:
          - { name: AvailablePet, value: available }
          - { name: SoldPet, value: sold }
      - name: DelPetParams
        file: github.com/acme/petstore/model/pet.go
        fields:
          - { type: "*GetPetById", embedded: true }
          - { name: ManagePwd, type: string }
      - name: GetPetById
        file: github.com/acme/petstore/model/pet.go
        fields:
          - { name: Id, type: int64 }
  - path: github.com/acme/petstore/handler
    files:
      - path: github.com/acme/petstore/handler/pet.go
        imports: { model: github.com/acme/petstore/model }
    types:
      - name: PetHandler
        file: github.com/acme/petstore/handler/pet.go
        fields:
          - { name: store, type: model.Pet }
    methods:
      - receiver: PetHandler
        name: GetPet
        file: github.com/acme/petstore/handler/pet.go
        doc: "GetPet returns a pet"
"#;

    fn graph() -> MemoryTypeGraph {
        MemoryTypeGraph::from_yaml_str(MANIFEST).expect("manifest loads")
    }

    #[test]
    fn loads_declarations_with_keys() {
        let g = graph();
        let pet = g.lookup("github.com/acme/petstore/model", "Pet").unwrap();
        assert_eq!(pet.key.as_deref(), Some("github.com/acme/petstore/model.Pet"));
        assert_eq!(pet.doc.full_doc, "Pet is pet model");
        assert_eq!(pet.doc.meta.get("testMeta"), Some(&Node::from("a")));
        assert_eq!(pet.members().len(), 3);
        assert_eq!(pet.members()[0].tag.get("json").map(String::as_str), Some("id"));
        assert_eq!(pet.members()[0].doc().full_doc, "Id is Pet ID");
    }

    #[test]
    fn type_expressions_parse_to_kinds() {
        let kind = parse_type_expr("[]*model.Pet", "f.go", "test").unwrap();
        match kind {
            TypeKind::Array(elem) => match elem.kind {
                TypeKind::Pointer(inner) => assert_eq!(
                    inner.kind,
                    TypeKind::Qualified {
                        package: "model".into(),
                        name: "Pet".into()
                    }
                ),
                other => panic!("unexpected element kind {other:?}"),
            },
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(parse_type_expr("interface{}", "f.go", "t").unwrap(), TypeKind::Interface);
        assert_eq!(parse_type_expr("any", "f.go", "t").unwrap(), TypeKind::Interface);
        assert_eq!(
            parse_type_expr("uint8", "f.go", "t").unwrap(),
            TypeKind::Scalar(ScalarKind::Integer)
        );
        assert!(parse_type_expr("map[string]int", "f.go", "t").is_err());
    }

    #[test]
    fn embedded_fields_take_the_type_name() {
        let g = graph();
        let del = g.lookup("github.com/acme/petstore/model", "DelPetParams").unwrap();
        let first = &del.members()[0];
        assert!(first.embedded);
        assert_eq!(first.name, "GetPetById");
    }

    #[test]
    fn resolves_paths_and_methods() {
        let g = graph();
        assert!(g.resolve_type_path("github.com/acme/petstore/model.Pet").is_some());
        assert!(g.resolve_type_path("./model.Pet").is_some());
        let method = g
            .resolve_type_path("github.com/acme/petstore/handler.PetHandler.GetPet")
            .unwrap();
        assert_eq!(method.kind, TypeKind::Func);
        assert_eq!(method.doc.summary, "GetPet returns a pet");
        assert!(g.resolve_type_path("github.com/acme/petstore/model.Missing").is_none());
    }

    #[test]
    fn owns_paths_under_the_module() {
        let g = graph();
        assert!(g.owns_path("github.com/acme/petstore/model.Missing"));
        assert!(g.owns_path("./model.Pet"));
        assert!(!g.owns_path("github.com/other/lib.Thing"));
        assert!(!g.owns_path("just some text"));
        assert!(!g.owns_path("github.com/acme/petstore/model"));
    }

    #[test]
    fn resolves_identifiers_in_file_context() {
        let g = graph();
        let file = "github.com/acme/petstore/handler/pet.go";
        assert!(g.resolve_in_file(file, Some("model"), "Pet").is_some());
        assert!(g.resolve_in_file(file, None, "PetHandler").is_some());
        assert!(g.resolve_in_file(file, Some("nope"), "Pet").is_none());
    }

    #[test]
    fn member_prefers_fields_then_methods() {
        let g = graph();
        let handler = g.lookup("github.com/acme/petstore/handler", "PetHandler").unwrap();
        let field = g.member(&handler, "store").unwrap();
        assert!(field.key.is_none());
        let method = g.member(&handler, "GetPet").unwrap();
        assert_eq!(method.kind, TypeKind::Func);
        assert!(g.member(&handler, "Nothing").is_none());
    }

    #[test]
    fn enum_values_in_declaration_order() {
        let g = graph();
        let status = g.lookup("github.com/acme/petstore/model", "PetStatus").unwrap();
        assert!(status.is_named_scalar());
        let values: Vec<String> = g.enum_values(&status).into_iter().map(|v| v.name).collect();
        assert_eq!(values, vec!["AvailablePet", "SoldPet"]);
    }

    #[test]
    fn duplicate_declarations_are_rejected() {
        let text = "packages:\n  - path: p\n    types:\n      - { name: A, type: string }\n      - { name: A, type: int }\n";
        let err = MemoryTypeGraph::from_yaml_str(text).unwrap_err();
        assert!(matches!(err, ManifestError::DuplicateType { key } if key == "p.A"));
    }
}
