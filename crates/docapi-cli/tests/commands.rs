//! Integration tests for the subcommand handlers, run against the petstore
//! fixtures without spawning the binary.

use std::path::PathBuf;

use docapi_cli::complete::{self, CompleteArgs};
use docapi_cli::context::{ContextArgs, Format};
use docapi_cli::eval::{self, EvalArgs};
use docapi_cli::schema::{self, SchemaArgs};

/// Find the repository root.
fn repo_root() -> PathBuf {
    let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    dir.pop(); // crates/
    dir.pop(); // repo root
    dir
}

fn fixture(name: &str) -> PathBuf {
    repo_root().join("fixtures").join("petstore").join(name)
}

fn petstore_context() -> ContextArgs {
    ContextArgs {
        config: Some(fixture("docapi.yaml")),
        ..ContextArgs::default()
    }
}

#[test]
fn complete_writes_json_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("openapi.json");
    let args = CompleteArgs {
        input: fixture("openapi.yaml"),
        output: Some(output.clone()),
        format: None,
        strict: true,
        context: ContextArgs::default(),
    };
    let outcome = complete::run(&args).unwrap();
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    assert!(!outcome.fails(args.strict));

    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(written, outcome.rendered);
    assert!(written.starts_with('{'));
    assert!(written.contains(r#""openapi": "3.0.1""#));
    assert!(written.contains(r##""$ref": "#/components/schemas/Category""##));
}

#[test]
fn complete_defaults_to_yaml_on_stdout() {
    let args = CompleteArgs {
        input: fixture("openapi.yaml"),
        output: None,
        format: None,
        strict: false,
        context: ContextArgs::default(),
    };
    let outcome = complete::run(&args).unwrap();
    assert!(outcome.rendered.starts_with("openapi:"), "{}", outcome.rendered);
}

#[test]
fn strict_fails_on_broken_directives() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.yaml");
    std::fs::write(&input, "info:\n  js-title: \"js: model.Pet +\"\n").unwrap();
    let args = CompleteArgs {
        input,
        output: None,
        format: Some(Format::Json),
        strict: true,
        context: petstore_context(),
    };
    let outcome = complete::run(&args).unwrap();
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].path, "info.js-title");
    assert!(outcome.rendered.contains(r#""error""#));
    assert!(outcome.fails(true));
    assert!(!outcome.fails(false));
}

#[test]
fn eval_uses_configured_imports() {
    let args = EvalArgs {
        expression: "schema(model.PetStatus)".into(),
        file: None,
        format: Format::Json,
        context: petstore_context(),
    };
    let rendered = eval::run(&args).unwrap();
    assert!(rendered.contains(r#""enum""#), "{rendered}");
    assert!(rendered.contains(r#""sold""#), "{rendered}");
}

#[test]
fn eval_reports_parse_errors() {
    let args = EvalArgs {
        expression: "schema(".into(),
        file: None,
        format: Format::Json,
        context: petstore_context(),
    };
    assert!(eval::run(&args).is_err());
}

#[test]
fn schema_inlines_the_requested_type() {
    let args = SchemaArgs {
        type_path: "./model.Pet".into(),
        format: Format::Yaml,
        context: petstore_context(),
    };
    let rendered = schema::run(&args).unwrap();
    assert!(rendered.starts_with("type: object"), "{rendered}");
    assert!(rendered.contains("photoUrls:"), "{rendered}");
}

#[test]
fn schema_rejects_unknown_types() {
    let args = SchemaArgs {
        type_path: "./model.Missing".into(),
        format: Format::Json,
        context: petstore_context(),
    };
    let err = schema::run(&args).unwrap_err();
    assert_eq!(err.to_string(), "can't find type './model.Missing'");
}
