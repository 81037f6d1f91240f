use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::{ContentThresholds, DEFAULT_QUORUM};
use crate::cli::StageArgs;

pub const DEFAULT_DATA_DIR: &str = "MILU23/data";

pub const DEFAULT_MODELS: [&str; 4] = [
    "llava-hf__llava-onevision-qwen2-7b-ov-hf",
    "OpenGVLab__InternVL3-14B",
    "Qwen__Qwen2-VL-7B-Instruct",
    "Qwen__Qwen3-VL-4B-Instruct",
];

#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub corpus_dir: PathBuf,
    pub models: Vec<String>,
    pub thresholds: ContentThresholds,
    pub quorum: usize,
    pub reference_path: PathBuf,
    pub model_outputs_path: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    corpus_dir: Option<PathBuf>,
    models: Option<Vec<String>>,
    quorum: Option<usize>,
    min_concepts: Option<usize>,
    min_triples: Option<usize>,
    reference_path: Option<PathBuf>,
    model_outputs_path: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            corpus_dir: default_corpus_dir(&data_dir),
            models: canonical_models(DEFAULT_MODELS.iter().map(|model| model.to_string())),
            thresholds: ContentThresholds::default(),
            quorum: DEFAULT_QUORUM,
            reference_path: data_dir.join("ground_truth_human_reference.jsonl"),
            model_outputs_path: data_dir.join("lecture_outputs.jsonl"),
            data_dir,
        }
    }

    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = canonical_models(models.into_iter().map(Into::into));
        self
    }

    // Defaults, then the optional config file, then command-line flags.
    pub fn resolve(args: &StageArgs) -> Result<Self> {
        let file = match args.config.as_deref() {
            Some(path) => load_config_file(path)?,
            None => ConfigFile::default(),
        };

        let data_dir = args
            .data_dir
            .clone()
            .or(file.data_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let mut config = Self::new(data_dir);

        if let Some(corpus_dir) = args.corpus_dir.clone().or(file.corpus_dir) {
            config.corpus_dir = corpus_dir;
        }

        if !args.models.is_empty() {
            config = config.with_models(args.models.iter().cloned());
        } else if let Some(models) = file.models {
            config = config.with_models(models);
        }

        if let Some(quorum) = args.quorum.or(file.quorum) {
            config.quorum = quorum.max(1);
        }
        if let Some(min_concepts) = args.min_concepts.or(file.min_concepts) {
            config.thresholds.min_concepts = min_concepts;
        }
        if let Some(min_triples) = args.min_triples.or(file.min_triples) {
            config.thresholds.min_triples = min_triples;
        }
        if let Some(path) = args.reference_path.clone().or(file.reference_path) {
            config.reference_path = path;
        }
        if let Some(path) = args.model_outputs_path.clone().or(file.model_outputs_path) {
            config.model_outputs_path = path;
        }

        info!(
            data_dir = %config.data_dir.display(),
            models = config.models.len(),
            quorum = config.quorum,
            min_concepts = config.thresholds.min_concepts,
            min_triples = config.thresholds.min_triples,
            "resolved pipeline configuration"
        );

        Ok(config)
    }

    pub fn by_slide_dir(&self) -> PathBuf {
        self.data_dir.join("by_slide")
    }

    pub fn analysis_dir(&self) -> PathBuf {
        self.data_dir.join("analysis")
    }

    pub fn fusion_path(&self) -> PathBuf {
        self.data_dir.join("fusion").join("fusion_multi_models.jsonl")
    }

    pub fn model_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::new();
        for (offset, left) in self.models.iter().enumerate() {
            for right in &self.models[offset + 1..] {
                pairs.push((left.as_str(), right.as_str()));
            }
        }
        pairs
    }
}

fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn default_corpus_dir(data_dir: &Path) -> PathBuf {
    match data_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn canonical_models(models: impl Iterator<Item = String>) -> Vec<String> {
    models
        .map(|model| model.trim().to_string())
        .filter(|model| !model.is_empty())
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}
