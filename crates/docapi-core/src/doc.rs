//! # Doc-Comment Metadata
//!
//! Splits a declaration's documentation into prose and structured
//! metadata. A line such as `$:` or `$in: query` opens a YAML block that
//! continues while the following lines are indented deeper than the
//! opener:
//!
//! ```text
//! FindPetByStatus returns pets by status
//!
//! $:
//!   params: model.FindPetByStatusParams
//!   response: model.Pet
//! ```
//!
//! Each block is parsed as YAML. A top-level `$` key holding a map is
//! spliced into the result, and `$name` keys lose their `$`. Values are
//! kept verbatim; expression expansion happens later, in the pipeline.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::DocError;
use crate::odm::{Node, OrderedMap};

static META_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ *\$.*:.*$").expect("metadata line pattern is valid")
});

/// Documentation split into prose and metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocInfo {
    /// Prose with every metadata block removed, trimmed.
    pub full_doc: String,
    /// First paragraph of `full_doc`.
    pub summary: String,
    /// Remaining paragraphs of `full_doc`.
    pub description: String,
    /// Merged metadata of every block, in source order.
    pub meta: OrderedMap,
}

struct Block {
    line: usize,
    text: String,
}

/// Parse documentation text into a [`DocInfo`].
pub fn parse_doc(text: &str) -> Result<DocInfo, DocError> {
    let lines: Vec<&str> = text.lines().collect();
    let mut prose = String::new();
    let mut blocks = Vec::new();
    let mut open: Option<(usize, usize)> = None;

    for (index, line) in lines.iter().enumerate() {
        if let Some((start, indent)) = open {
            if line.trim().is_empty() || leading_spaces(line) > indent {
                continue;
            }
            blocks.push(block(&lines, start, index));
            open = None;
        }
        if META_LINE.is_match(line) {
            open = Some((index, leading_spaces(line)));
        } else {
            prose.push_str(line);
            prose.push('\n');
        }
    }
    if let Some((start, _)) = open {
        blocks.push(block(&lines, start, lines.len()));
    }

    let mut meta = OrderedMap::new();
    for block in blocks {
        meta.extend(parse_block(&block)?);
    }

    let full_doc = prose.trim().to_string();
    let (summary, description) = match full_doc.split_once("\n\n") {
        Some((first, rest)) => (first.to_string(), rest.trim_start_matches('\n').to_string()),
        None => (full_doc.clone(), String::new()),
    };

    Ok(DocInfo {
        full_doc,
        summary,
        description,
        meta,
    })
}

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn block(lines: &[&str], start: usize, end: usize) -> Block {
    let indent = leading_spaces(lines[start]);
    let text = lines[start..end]
        .iter()
        .map(|l| l.get(indent..).unwrap_or_else(|| l.trim_start()))
        .collect::<Vec<_>>()
        .join("\n");
    Block {
        line: start + 1,
        text,
    }
}

fn parse_block(block: &Block) -> Result<OrderedMap, DocError> {
    let node = Node::from_yaml_str(&block.text).map_err(|e| DocError::InvalidMeta {
        line: block.line,
        reason: e.to_string(),
    })?;
    let map = match node {
        Node::Map(map) => map,
        other => {
            return Err(DocError::NotAMap {
                line: block.line,
                found: other.kind_name(),
            })
        }
    };

    let mut out = OrderedMap::new();
    for (key, value) in map {
        match (key.as_str(), value) {
            ("$", Node::Map(inner)) => out.extend(inner),
            (k, value) => {
                let k = k.strip_prefix('$').unwrap_or(k);
                out.push(k, value);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_doc_has_no_meta() {
        let info = parse_doc("Pet is pet model").unwrap();
        assert_eq!(info.full_doc, "Pet is pet model");
        assert_eq!(info.summary, "Pet is pet model");
        assert_eq!(info.description, "");
        assert!(info.meta.is_empty());
    }

    #[test]
    fn dollar_block_is_spliced() {
        let info = parse_doc("Pet is pet model\n$:\n  testMeta: a\n").unwrap();
        assert_eq!(info.full_doc, "Pet is pet model");
        assert_eq!(info.meta.get("testMeta"), Some(&Node::from("a")));
    }

    #[test]
    fn named_keys_lose_their_dollar() {
        let info = parse_doc("$in: query").unwrap();
        assert_eq!(info.meta.get("in"), Some(&Node::from("query")));
        assert_eq!(info.full_doc, "");
    }

    #[test]
    fn summary_and_description_split_on_first_paragraph() {
        let text = "GetPet test for pure js\n\nReturns a single pet\n$:\n   params: \"[1]\"\n   response:\n     200: model.Pet\n";
        let info = parse_doc(text).unwrap();
        assert_eq!(info.summary, "GetPet test for pure js");
        assert_eq!(info.description, "Returns a single pet");
        let keys: Vec<&str> = info.meta.keys().collect();
        assert_eq!(keys, vec!["params", "response"]);
        let response = info.meta.get("response").unwrap();
        assert_eq!(response.get("200"), Some(&Node::from("model.Pet")));
    }

    #[test]
    fn block_closes_on_dedent_and_prose_resumes() {
        let text = "$:\n  a: 1\nafter the block\n$b: 2\n";
        let info = parse_doc(text).unwrap();
        assert_eq!(info.full_doc, "after the block");
        let keys: Vec<&str> = info.meta.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn blank_lines_stay_inside_a_block() {
        let text = "$:\n  a: 1\n\n  b: 2\n";
        let info = parse_doc(text).unwrap();
        assert_eq!(info.meta.get("b"), Some(&Node::from(2i64)));
    }

    #[test]
    fn invalid_yaml_reports_the_block_line() {
        let err = parse_doc("summary\n$:\n  a: [unclosed\n").unwrap_err();
        match err {
            DocError::InvalidMeta { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
