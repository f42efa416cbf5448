//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error types shared by every docapi crate. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Document text errors carry the underlying YAML/JSON parser message.
//! - Doc-comment metadata errors carry the offending block line.
//! - Type manifest errors name the declaration that could not be loaded.
//! - Reference and recursion problems are *not* errors: they are rendered
//!   as inline diagnostic schemas by the resolver.

use thiserror::Error;

/// Top-level error type for docapi.
#[derive(Error, Debug)]
pub enum DocapiError {
    /// Ordered document could not be parsed or serialized.
    #[error("document error: {0}")]
    Document(#[from] OdmError),

    /// Doc-comment metadata could not be parsed.
    #[error("doc comment error: {0}")]
    Doc(#[from] DocError),

    /// Type manifest could not be loaded.
    #[error("type manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error while converting ordered documents to or from text.
#[derive(Error, Debug)]
pub enum OdmError {
    /// YAML text could not be parsed or produced.
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON text could not be parsed or produced.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// The document root must be a map.
    #[error("expected a map at the document root, found {found}")]
    NotAMap {
        /// Kind of node found instead.
        found: &'static str,
    },
}

/// Error while extracting metadata blocks from documentation text.
#[derive(Error, Debug)]
pub enum DocError {
    /// A `$`-block was not valid YAML.
    #[error("invalid metadata block starting at line {line}: {reason}")]
    InvalidMeta {
        /// 1-based line of the block opener within the doc text.
        line: usize,
        /// Parser message.
        reason: String,
    },

    /// A `$`-block parsed to something other than a map.
    #[error("metadata block starting at line {line} must be a map, found {found}")]
    NotAMap {
        /// 1-based line of the block opener within the doc text.
        line: usize,
        /// Kind of node found instead.
        found: &'static str,
    },
}

/// Error while building an in-memory type graph from a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// A type expression string could not be understood.
    #[error("invalid type expression '{expr}' in {location}: {reason}")]
    InvalidTypeExpr {
        /// The type expression as written.
        expr: String,
        /// Declaration that contains the expression.
        location: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The same type was declared twice in one package.
    #[error("duplicate declaration of '{key}'")]
    DuplicateType {
        /// Fully-qualified key of the duplicate.
        key: String,
    },

    /// Documentation attached to a declaration could not be parsed.
    #[error("documentation of '{location}': {source}")]
    Doc {
        /// Declaration whose documentation is invalid.
        location: String,
        /// Underlying doc error.
        #[source]
        source: DocError,
    },

    /// The manifest text itself was malformed.
    #[error("manifest parse error: {0}")]
    Parse(#[from] OdmError),
}
