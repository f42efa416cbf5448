//! # docapi-core — Foundational Types for docapi
//!
//! This crate defines the data structures every other docapi crate shares.
//! It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Order is data.** Documents are [`odm::Node`] trees whose maps keep
//!    insertion order and tolerate duplicate keys until they are merged.
//!    Text conversion never reorders keys.
//!
//! 2. **Closed unions.** [`Node`], [`Schema`] and [`TypeKind`] are closed
//!    enums matched exhaustively by consumers.
//!
//! 3. **Errors are values in the tree.** Unresolvable references and
//!    recursion produce [`Schema::Error`] nodes, not `Err`. Only text and
//!    manifest failures surface as [`DocapiError`].
//!
//! 4. **Read-only type access.** The schema resolver sees source types only
//!    through the [`TypeGraph`] trait.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `docapi-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `.unwrap()` outside tests.

pub mod doc;
pub mod error;
pub mod odm;
pub mod schema;
pub mod typegraph;

// Re-export primary types for ergonomic imports.
pub use doc::{parse_doc, DocInfo};
pub use error::{DocError, DocapiError, ManifestError, OdmError};
pub use odm::{Node, OrderedMap};
pub use schema::{Modify, ObjectProp, ObjectSchema, ScalarKind, ScalarSchema, Schema, Severity};
pub use typegraph::memory::MemoryTypeGraph;
pub use typegraph::{split_package_path, EnumValue, Field, TypeGraph, TypeKind, TypeRef};
