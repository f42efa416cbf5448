//! # docapi-cli — Document Completion Command-Line Interface
//!
//! Thin clap front end over [`docapi_pipeline`]. Argument structs and
//! handler functions live here so they can be tested without spawning the
//! binary; `main.rs` only parses, dispatches and prints.
//!
//! ## Subcommands
//!
//! - `complete` — expand every directive in a document and write it out
//! - `eval` — evaluate one expression and print the result
//! - `schema` — print the schema of one type
//!
//! ## Configuration
//!
//! Each subcommand reads `docapi.yaml` (next to the input document, else in
//! the working directory, else `--config`). `--types`, `--recursion-bound`
//! and `--name-tag` override the file.

pub mod complete;
pub mod context;
pub mod eval;
pub mod schema;
