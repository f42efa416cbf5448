//! # docapi-pipeline — Ordered Document Pipeline
//!
//! Completes an OpenAPI-shaped document whose entries reference source
//! types:
//!
//! ```yaml
//! components:
//!   schemas:
//!     Pet:
//!       x-$schema: github.com/acme/petstore/model.Pet
//! paths:
//!   /pet/findByStatus:
//!     get:
//!       x-$path: github.com/acme/petstore/handler.PetHandler.FindPetByStatus
//!       js-parameters: "[...params(model.FindPetByStatusParams)]"
//! ```
//!
//! ## Modules
//!
//! - `predicate`: directive markers and the expression detection predicate.
//! - `scope`: identifier resolution for expressions (file imports, file
//!   package, configured aliases).
//! - `host`: the [`ScriptHost`] boundary and its identity and process
//!   implementations.
//! - `assembler`: registration, expansion and merge passes.
//! - `config`: `docapi.yaml` loading.
//!
//! ## Crate Policy
//!
//! - A failing directive never aborts the pass; it leaves an inline
//!   `{error}` and a [`Diagnostic`].
//! - The pipeline is synchronous. The process host owns a private
//!   current-thread runtime and blocks on it per directive.

pub mod assembler;
pub mod config;
pub mod error;
pub mod host;
pub mod predicate;
pub mod scope;

pub use assembler::{Assembler, Completed, Diagnostic};
pub use config::{PipelineConfig, ScriptConfig, CONFIG_FILE_NAME};
pub use error::{HostError, PipelineError};
pub use host::{IdentityHost, ProcessHost, ScriptHost, DEFAULT_HOST_TIMEOUT};
pub use predicate::ExpressionForm;
pub use scope::FileScope;
