//! Errors of the document pipeline.
//!
//! Only whole-pass failures surface as [`PipelineError`]. Failures inside
//! a single directive, including [`HostError`], are turned into inline
//! diagnostics by the assembler.

use docapi_core::{ManifestError, OdmError};
use thiserror::Error;

/// The script host could not filter a directive.
#[derive(Error, Debug)]
pub enum HostError {
    /// The host process could not be started.
    #[error("failed to start script host '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Talking to the host process failed.
    #[error("script host i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The host did not answer in time; the process was killed.
    #[error("script host timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// The host exited unsuccessfully.
    #[error("script host exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    /// The request or the reply was not valid JSON.
    #[error("script host message error: {0}")]
    Message(#[from] OdmError),
}

/// A document pass could not run at all.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input document could not be parsed or the output produced.
    #[error("document error: {0}")]
    Document(#[from] OdmError),

    /// The document root is not a map.
    #[error("expected a map at the document root, found {found}")]
    NotAMap { found: &'static str },

    /// The configuration file is malformed.
    #[error("invalid configuration in {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The type manifest could not be loaded.
    #[error("type manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// The script host could not be set up.
    #[error("script host error: {0}")]
    Host(#[from] HostError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
