//! # Complete Subcommand
//!
//! Reads a document, expands its directives and writes the result.
//!
//! ```text
//! docapi complete openapi.yaml -o openapi.json --strict
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Args;
use docapi_pipeline::Diagnostic;
use tracing::info;

use crate::context::{ContextArgs, Format};

/// Arguments for the complete subcommand.
#[derive(Args, Debug, Clone)]
pub struct CompleteArgs {
    /// Document to complete (YAML or JSON).
    pub input: PathBuf,

    /// Output file. Writes to stdout when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format. Defaults to the output file's extension, else YAML.
    #[arg(long, value_enum)]
    pub format: Option<Format>,

    /// Fail when any directive could not be expanded.
    #[arg(long)]
    pub strict: bool,

    #[command(flatten)]
    pub context: ContextArgs,
}

/// What a completion run produced.
#[derive(Debug)]
pub struct CompleteOutcome {
    /// Rendered document, already written if an output file was given.
    pub rendered: String,
    pub diagnostics: Vec<Diagnostic>,
    pub has_errors: bool,
}

impl CompleteOutcome {
    /// True if `--strict` should turn this run into a failure.
    pub fn fails(&self, strict: bool) -> bool {
        strict && self.has_errors
    }
}

/// Run the subcommand.
pub fn run(args: &CompleteArgs) -> anyhow::Result<CompleteOutcome> {
    let assembler = args.context.assembler(args.input.parent())?;
    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let completed = assembler
        .complete_str(&text)
        .with_context(|| format!("completing {}", args.input.display()))?;

    let format = args
        .format
        .or_else(|| args.output.as_deref().map(Format::for_path))
        .unwrap_or(Format::Yaml);
    let rendered = format.render(&completed.document)?;
    if let Some(output) = &args.output {
        std::fs::write(output, &rendered)
            .with_context(|| format!("writing {}", output.display()))?;
        info!(
            output = %output.display(),
            diagnostics = completed.diagnostics.len(),
            "document completed"
        );
    }

    Ok(CompleteOutcome {
        rendered,
        has_errors: completed.has_errors(),
        diagnostics: completed.diagnostics,
    })
}
