//! # Type Graph
//!
//! The read-only view of source type definitions that the schema resolver
//! and expression evaluator consult. The graph is supplied by the caller
//! through the [`TypeGraph`] trait; [`memory::MemoryTypeGraph`] is the
//! reference provider, loaded from a YAML/JSON type manifest.
//!
//! ## Keys
//!
//! Every named declaration has a stable key of the form
//! `<package path>.<Name>` (methods: `<package path>.<Type>.<Method>`).
//! Anonymous types (field types, array elements) have no key and are
//! always inlined.
//!
//! ## File Context
//!
//! A [`TypeRef`] remembers the file it was declared in. Identifiers inside
//! it (`Pet`, `model.Pet`) are resolved through that file's package and
//! import table.

pub mod memory;

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::doc::DocInfo;
use crate::odm::Node;
use crate::schema::ScalarKind;

/// Handle to a type in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    /// Deduplication key; `None` for anonymous types.
    pub key: Option<String>,
    /// Declared name for named types.
    pub name: Option<String>,
    /// Source file whose imports resolve identifiers inside this type.
    pub file: String,
    /// Documentation attached to the declaration (or field).
    pub doc: DocInfo,
    pub kind: TypeKind,
}

/// Shape of a [`TypeRef`].
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Scalar(ScalarKind),
    /// An identifier resolved in the file's own package.
    Named(String),
    /// `alias.Name`, resolved through the file's imports.
    Qualified { package: String, name: String },
    Array(Box<TypeRef>),
    Pointer(Box<TypeRef>),
    Struct(Vec<Field>),
    Interface,
    Func,
}

/// A struct member.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name. Embedded fields carry the embedded type's bare name.
    pub name: String,
    /// Field type; its `doc` is the field's documentation.
    pub ty: TypeRef,
    /// Parsed struct tag, e.g. `json:"id"` as `{json: id}`.
    pub tag: BTreeMap<String, String>,
    /// Anonymous (embedded) member.
    pub embedded: bool,
}

impl Field {
    pub fn doc(&self) -> &DocInfo {
        &self.ty.doc
    }

    /// The field's doc metadata, parsed from `$` blocks.
    pub fn metadata(&self) -> &crate::odm::OrderedMap {
        &self.ty.doc.meta
    }
}

/// A named constant of an enumerated type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub name: String,
    pub value: Node,
}

impl TypeRef {
    /// An anonymous type declared in `file`.
    pub fn anonymous(file: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            key: None,
            name: None,
            file: file.into(),
            doc: DocInfo::default(),
            kind,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array(_))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.kind, TypeKind::Pointer(_))
    }

    /// True for structs, looking through pointers.
    pub fn is_struct(&self) -> bool {
        match &self.kind {
            TypeKind::Struct(_) => true,
            TypeKind::Pointer(inner) => inner.is_struct(),
            _ => false,
        }
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.kind, TypeKind::Interface)
    }

    /// A declared type whose underlying type is a builtin scalar, such as
    /// `type PetStatus string`.
    pub fn is_named_scalar(&self) -> bool {
        self.key.is_some() && matches!(self.kind, TypeKind::Scalar(_))
    }

    /// Struct members, looking through pointers. Empty for other kinds.
    pub fn members(&self) -> &[Field] {
        match &self.kind {
            TypeKind::Struct(fields) => fields,
            TypeKind::Pointer(inner) => inner.members(),
            _ => &[],
        }
    }

    /// Package path part of the key.
    pub fn package(&self) -> Option<&str> {
        let key = self.key.as_deref()?;
        let (package, _) = split_package_path(key);
        Some(package)
    }
}

/// Read-only access to type definitions.
///
/// Implementations must be cheap to query repeatedly; the resolver does not
/// cache lookups.
pub trait TypeGraph: Send + Sync {
    /// Resolve an absolute type path such as
    /// `github.com/acme/petstore/model.Pet` or
    /// `github.com/acme/petstore/handler.PetHandler.FindPetByStatus`.
    fn resolve_type_path(&self, path: &str) -> Option<TypeRef>;

    /// True if `path` has the shape of a path inside this graph's module.
    /// An owned path may still fail to resolve.
    fn owns_path(&self, path: &str) -> bool;

    /// Normalize a module-relative path (`./model.Pet`) to its absolute
    /// form. Absolute paths are returned unchanged.
    fn normalize_path(&self, path: &str) -> String {
        path.to_string()
    }

    /// Find the declaration `name` in `package`.
    fn lookup(&self, package: &str, name: &str) -> Option<TypeRef>;

    /// Package path that `file` belongs to.
    fn package_of_file(&self, file: &str) -> Option<String>;

    /// Import table of `file`: alias to package path.
    fn imports(&self, file: &str) -> BTreeMap<String, String>;

    /// True if `package` is a known package path.
    fn has_package(&self, package: &str) -> bool;

    /// Enum constants declared for a keyed type, in declaration order.
    fn enum_values(&self, ty: &TypeRef) -> Vec<EnumValue>;

    /// Method `name` declared on the keyed type `ty`.
    fn method(&self, ty: &TypeRef, name: &str) -> Option<TypeRef>;

    /// Resolve an identifier as it appears in `file`: through the import
    /// table when `alias` is given, otherwise in the file's own package.
    fn resolve_in_file(&self, file: &str, alias: Option<&str>, name: &str) -> Option<TypeRef> {
        let package = match alias {
            Some(alias) => self.imports(file).get(alias).cloned()?,
            None => self.package_of_file(file)?,
        };
        self.lookup(&package, name)
    }

    /// Member access on a type: struct field first, then method.
    fn member(&self, ty: &TypeRef, name: &str) -> Option<TypeRef> {
        if let Some(field) = ty.members().iter().find(|f| f.name == name && !f.embedded) {
            return Some(field.ty.clone());
        }
        self.method(ty, name)
    }
}

/// Split `dir/pkg.Member.Sub` into `("dir/pkg", "Member.Sub")`.
///
/// The member part is empty when the last path segment has no `.`.
pub fn split_package_path(path: &str) -> (&str, &str) {
    let segment_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[segment_start..].find('.') {
        Some(dot) => {
            let at = segment_start + dot;
            (&path[..at], &path[at + 1..])
        }
        None => (path, ""),
    }
}

static TAG_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z0-9_\-]+):"([^"]*)""#).expect("tag pattern is valid")
});

/// Parse a struct tag such as `json:"id,omitempty" form:"status"`.
pub fn parse_tag(tag: &str) -> BTreeMap<String, String> {
    let tag = tag.trim().trim_matches('`');
    TAG_ENTRY
        .captures_iter(tag)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_package_path_on_last_segment() {
        assert_eq!(
            split_package_path("github.com/acme/petstore/model.Pet"),
            ("github.com/acme/petstore/model", "Pet")
        );
        assert_eq!(
            split_package_path("github.com/acme/petstore/handler.PetHandler.Find"),
            ("github.com/acme/petstore/handler", "PetHandler.Find")
        );
        assert_eq!(split_package_path("github.com/acme/petstore/model"), ("github.com/acme/petstore/model", ""));
        assert_eq!(split_package_path("model.Pet"), ("model", "Pet"));
    }

    #[test]
    fn parse_tag_reads_every_entry() {
        let tag = parse_tag(r#"`json:"id,omitempty" form:"status"`"#);
        assert_eq!(tag.get("json").map(String::as_str), Some("id,omitempty"));
        assert_eq!(tag.get("form").map(String::as_str), Some("status"));
        assert!(parse_tag("").is_empty());
    }

    #[test]
    fn predicates_look_through_pointers() {
        let inner = TypeRef::anonymous("f.go", TypeKind::Struct(Vec::new()));
        let ptr = TypeRef::anonymous("f.go", TypeKind::Pointer(Box::new(inner)));
        assert!(ptr.is_pointer());
        assert!(ptr.is_struct());
        assert!(!ptr.is_array());
        assert!(ptr.members().is_empty());
    }

    #[test]
    fn named_scalar_requires_a_key() {
        let mut ty = TypeRef::anonymous("f.go", TypeKind::Scalar(ScalarKind::String));
        assert!(!ty.is_named_scalar());
        ty.key = Some("pkg.Status".into());
        assert!(ty.is_named_scalar());
        assert_eq!(ty.package(), Some("pkg"));
    }
}
