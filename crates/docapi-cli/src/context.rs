//! # Shared Command Context
//!
//! Every subcommand needs the same three things: a [`PipelineConfig`], the
//! type graph it names, and an [`Assembler`] built from both. Flags given on
//! the command line override the values read from `docapi.yaml`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context as _};
use clap::{Args, ValueEnum};
use docapi_core::{MemoryTypeGraph, Node};
use docapi_pipeline::{Assembler, PipelineConfig, CONFIG_FILE_NAME};
use tracing::debug;

/// Options shared by all subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct ContextArgs {
    /// Configuration file. Defaults to `docapi.yaml` next to the input, or
    /// in the working directory.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Type manifest (overrides `types` in the configuration).
    #[arg(long)]
    pub types: Option<PathBuf>,

    /// Maximum nesting of a recursive type before it is cut off.
    #[arg(long)]
    pub recursion_bound: Option<u32>,

    /// Struct tag naming object properties, e.g. `json`.
    #[arg(long)]
    pub name_tag: Option<String>,
}

/// Text format for emitted documents.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// Pick a format from a file extension; anything but `.json` is YAML.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Yaml,
        }
    }

    pub fn render(self, node: &Node) -> anyhow::Result<String> {
        let text = match self {
            Format::Yaml => node.to_yaml_string()?,
            Format::Json => {
                let mut text = node.to_json_string()?;
                text.push('\n');
                text
            }
        };
        Ok(text)
    }
}

impl ContextArgs {
    /// Load the configuration. `near` is the directory searched for
    /// `docapi.yaml` when `--config` is not given.
    pub fn load_config(&self, near: Option<&Path>) -> anyhow::Result<PipelineConfig> {
        let mut config = match self.config_path(near) {
            Some(path) => {
                debug!(path = %path.display(), "loading configuration");
                PipelineConfig::load(&path)
                    .with_context(|| format!("loading configuration {}", path.display()))?
            }
            None => PipelineConfig::default(),
        };
        if let Some(types) = &self.types {
            config.types = Some(types.clone());
        }
        if let Some(bound) = self.recursion_bound {
            config.recursion_bound = bound;
        }
        if let Some(tag) = &self.name_tag {
            config.name_tag = Some(tag.clone());
        }
        Ok(config)
    }

    fn config_path(&self, near: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = &self.config {
            return Some(path.clone());
        }
        near.into_iter()
            .chain(std::iter::once(Path::new(".")))
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.is_file())
    }

    /// Load the configuration and the type graph, and build an assembler.
    pub fn assembler(&self, near: Option<&Path>) -> anyhow::Result<Assembler> {
        let config = self.load_config(near)?;
        let Some(types) = config.types.as_deref() else {
            bail!("no type manifest: pass --types or set `types` in {CONFIG_FILE_NAME}");
        };
        let graph = MemoryTypeGraph::from_path(types)
            .with_context(|| format!("loading type manifest {}", types.display()))?;
        debug!(types = graph.len(), module = graph.module(), "type graph loaded");
        Ok(Assembler::from_config(Arc::new(graph), &config)?)
    }
}
