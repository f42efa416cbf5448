//! Integration test: a configured external script filters every `x-$`
//! directive of a completed document.
#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use docapi_core::{MemoryTypeGraph, Node};
use docapi_pipeline::{Assembler, PipelineConfig};

/// Find the repository root.
fn repo_root() -> PathBuf {
    let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    dir.pop(); // crates/
    dir.pop(); // repo root
    dir
}

fn assembler_with_script(command: &str) -> Assembler {
    let text = format!("script:\n  command: {command}\n  timeout_ms: 10000\n");
    let config = PipelineConfig::from_yaml_str(&text, "docapi.yaml").expect("config parses");
    let types = repo_root().join("fixtures").join("petstore").join("types.yaml");
    let graph = MemoryTypeGraph::from_path(&types).expect("manifest loads");
    Assembler::from_config(Arc::new(graph), &config).expect("assembler builds")
}

fn write_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("filter.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("script writes");
    path
}

#[test]
fn echoing_host_sees_the_request_and_its_map_reply_is_spliced() {
    let assembler = assembler_with_script("cat");
    let done = assembler
        .complete_str(
            r#"
paths:
  /pet:
    before: 1
    x-$path: ./handler.PetHandler.GetPet
    after: 2
"#,
        )
        .expect("document completes");
    assert!(done.diagnostics.is_empty(), "{:?}", done.diagnostics);

    let pet = done
        .document
        .get("paths")
        .and_then(|p| p.get("/pet"))
        .expect("path entry");
    let keys: Vec<&str> = pet.as_map().unwrap().keys().collect();
    assert_eq!(keys, vec!["before", "key", "value", "path", "after"]);
    assert_eq!(pet.get("key"), Some(&Node::from("x-$path")));
    assert_eq!(
        pet.get("path"),
        Some(&Node::List(vec![Node::from("paths"), Node::from("/pet")]))
    );
    let value = pet.get("value").expect("expanded value");
    assert_eq!(value.get("x-type-doc"), Some(&Node::Bool(true)));
    assert_eq!(value.get("summary"), Some(&Node::from("GetPet returns a single pet")));
}

#[test]
fn non_map_replies_stay_under_the_directive_key() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "cat >/dev/null\necho '[\"filtered\"]'");
    let assembler = assembler_with_script(&format!("sh {}", script.display()));
    let done = assembler
        .complete_str("info:\n  x-$title: Swagger Petstore\n")
        .expect("document completes");
    assert!(done.diagnostics.is_empty(), "{:?}", done.diagnostics);
    assert_eq!(
        done.document.get("info").and_then(|i| i.get("x-$title")),
        Some(&Node::List(vec![Node::from("filtered")]))
    );
}

#[test]
fn failing_script_leaves_an_inline_error() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "cat >/dev/null\necho boom >&2\nexit 3");
    let assembler = assembler_with_script(&format!("sh {}", script.display()));
    let done = assembler
        .complete_str("info:\n  x-$title: Swagger Petstore\n")
        .expect("document completes");
    assert_eq!(done.diagnostics.len(), 1);
    assert_eq!(done.diagnostics[0].path, "info.x-$title");
    assert!(done.diagnostics[0].message.contains("boom"), "{:?}", done.diagnostics);
    assert!(done.has_errors());
}
