//! # docapi-expr — Directive Expression Language
//!
//! Directive values such as `schema([model.Pet])` or
//! `[...params(model.FindPetByStatusParams), {name: 'extra'}]` are written
//! in a small JavaScript subset. This crate parses them ([`parse`]) and
//! evaluates them ([`evaluate`]) against a caller-supplied [`Resolver`].
//!
//! ## Design
//!
//! - The evaluator holds no state; all lookups go through the resolver, so
//!   results are reproducible for fixed resolver answers.
//! - Unknown identifiers evaluate to [`ResolvedValue::NotFound`], never to
//!   an error.
//! - Parse and type errors are reported as [`ParseError`] / [`EvalError`]
//!   and abort only the expression being evaluated.

pub mod ast;
pub mod error;
pub mod eval;
pub mod parser;
pub mod value;

pub use ast::{Element, Expr, Literal, Property};
pub use error::{EvalError, ExprError, ParseError};
pub use eval::{eval_str, evaluate, Resolver};
pub use parser::{parse, MAX_NESTING};
pub use value::{
    Builtin, MemberAccessible, NotFound, PackageHandle, ResolvedValue, TypeHandle, ValueMap,
};
