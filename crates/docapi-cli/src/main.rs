//! # docapi CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use std::io::Write as _;
use std::process::ExitCode;

use clap::Parser;
use docapi_cli::{complete, eval, schema};

/// Complete OpenAPI-like documents from source type metadata.
#[derive(Parser, Debug)]
#[command(name = "docapi", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Expand the directives of a document.
    Complete(complete::CompleteArgs),
    /// Evaluate one directive expression.
    Eval(eval::EvalArgs),
    /// Print the schema of a type.
    Schema(schema::SchemaArgs),
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Commands::Complete(args) => {
            let outcome = complete::run(&args)?;
            if args.output.is_none() {
                stdout.write_all(outcome.rendered.as_bytes())?;
            }
            for diagnostic in &outcome.diagnostics {
                eprintln!("{}: {}", diagnostic.path, diagnostic.message);
            }
            if outcome.fails(args.strict) {
                eprintln!("docapi: document has unresolved directives");
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Eval(args) => stdout.write_all(eval::run(&args)?.as_bytes())?,
        Commands::Schema(args) => stdout.write_all(schema::run(&args)?.as_bytes())?,
    }

    Ok(ExitCode::SUCCESS)
}
