//! # Eval Subcommand
//!
//! Evaluates one directive expression and prints the lowered result.
//! Useful for checking what a `js-` key or `x-$` value will expand to.

use clap::Args;

use crate::context::{ContextArgs, Format};

/// Arguments for the eval subcommand.
#[derive(Args, Debug, Clone)]
pub struct EvalArgs {
    /// Expression, e.g. `schema([model.Pet])`.
    pub expression: String,

    /// Source file whose imports and package are in scope.
    #[arg(long)]
    pub file: Option<String>,

    #[arg(long, value_enum, default_value = "json")]
    pub format: Format,

    #[command(flatten)]
    pub context: ContextArgs,
}

/// Run the subcommand and return the rendered result.
pub fn run(args: &EvalArgs) -> anyhow::Result<String> {
    let assembler = args.context.assembler(None)?;
    let node = assembler.evaluate(&args.expression, args.file.as_deref())?;
    args.format.render(&node)
}
