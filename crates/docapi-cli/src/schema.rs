//! # Schema Subcommand
//!
//! Prints the schema of one type from the manifest, as it would appear
//! inline in a completed document.

use anyhow::bail;
use clap::Args;

use crate::context::{ContextArgs, Format};

/// Arguments for the schema subcommand.
#[derive(Args, Debug, Clone)]
pub struct SchemaArgs {
    /// Type path, e.g. `github.com/acme/petstore/model.Pet` or `./model.Pet`.
    pub type_path: String,

    #[arg(long, value_enum, default_value = "json")]
    pub format: Format,

    #[command(flatten)]
    pub context: ContextArgs,
}

/// Run the subcommand and return the rendered schema.
pub fn run(args: &SchemaArgs) -> anyhow::Result<String> {
    let assembler = args.context.assembler(None)?;
    let Some(schema) = assembler.type_schema(&args.type_path) else {
        bail!("can't find type '{}'", args.type_path);
    };
    args.format.render(&schema)
}
