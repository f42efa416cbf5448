//! # docapi-schema — Schema Resolution
//!
//! Turns type-graph declarations and evaluated directive values into
//! [`Schema`](docapi_core::Schema) trees, and implements the `schema(...)`
//! and `params(...)` builtins of the expression language.
//!
//! ## Resolver (`resolver`)
//!
//! [`SchemaResolver`] holds the per-pass state: which type keys are
//! registered as document definitions (and therefore render as `$ref`),
//! and how often each type has been entered along the current chain.
//! Self-referential types are expanded `recursion_bound` levels deep
//! before degrading to a soft inline error.
//!
//! ## Parameters (`params`)
//!
//! [`params`] expands a struct type into a list of operation parameter
//! entries, honoring `$in`, `$required` and `$name` doc metadata and the
//! configured parameter tags.
//!
//! ## Crate Policy
//!
//! - Depends on `docapi-core` and `docapi-expr` internally.
//! - Resolution never fails: unresolvable references become inline error
//!   schemas. Only builtin misuse (e.g. `params` on a non-struct) returns
//!   an [`EvalError`](docapi_expr::EvalError).

pub mod params;
pub mod resolver;

pub use params::params;
pub use resolver::{ResolverOptions, SchemaResolver, ToSchemaOpts, DEFAULT_RECURSION_BOUND};
