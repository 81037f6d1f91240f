use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analysis::Annotation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Concepts,
    Triples,
}

impl AnnotationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Concepts => "concepts",
            Self::Triples => "triples",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlidePaths {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationPayload {
    pub source: String,
    pub parsed: Value,
    pub raw: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelAnnotations {
    pub concepts: Option<AnnotationPayload>,
    pub triples: Option<AnnotationPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideRecord {
    #[serde(default)]
    pub lecture: String,
    #[serde(default)]
    pub slide_id: String,
    #[serde(default)]
    pub paths: SlidePaths,
    pub models: BTreeMap<String, Value>,
}

impl SlideRecord {
    pub fn parsed_payload(&self, model: &str, kind: AnnotationKind) -> Option<&Value> {
        self.models
            .get(model)?
            .as_object()?
            .get(kind.as_str())?
            .as_object()?
            .get("parsed")
            .filter(|parsed| !parsed.is_null())
    }

    pub fn annotation(&self, model: &str) -> Annotation {
        Annotation::from_raw(
            self.parsed_payload(model, AnnotationKind::Concepts),
            self.parsed_payload(model, AnnotationKind::Triples),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusedSets {
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default)]
    pub triples: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionRecord {
    #[serde(default)]
    pub lecture: String,
    #[serde(default)]
    pub slide_id: String,
    #[serde(default)]
    pub paths: SlidePaths,
    #[serde(default)]
    pub models: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub triples: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub superlearner: FusedSets,
}

impl FusionRecord {
    pub fn consensus(&self) -> Annotation {
        Annotation::from_keys(&self.superlearner.concepts, &self.superlearner.triples)
    }

    pub fn model_annotation(&self, model: &str) -> Annotation {
        let empty = Vec::new();
        Annotation::from_keys(
            self.models.get(model).unwrap_or(&empty),
            self.triples.get(model).unwrap_or(&empty),
        )
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceRecord {
    #[serde(default)]
    pub slide_number: Value,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub concepts: Value,
    #[serde(default)]
    pub triples: Value,
    #[serde(default)]
    pub raw_output: Value,
}

impl ReferenceRecord {
    // Integers and integer-valued strings such as "2".
    pub fn slide_number(&self) -> Option<u32> {
        match &self.slide_number {
            Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn annotation(&self) -> Annotation {
        Annotation::from_raw(Some(&self.concepts), Some(&self.triples))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputMetadata {
    #[serde(default)]
    pub lecture_number: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputData {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub slide_id: Option<String>,
    #[serde(default)]
    pub parsed: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelOutputRecord {
    #[serde(default)]
    pub lecture: Option<String>,
    #[serde(default)]
    pub metadata: OutputMetadata,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub data: OutputData,
}

impl ModelOutputRecord {
    pub fn annotation_kind(&self) -> Option<AnnotationKind> {
        match self.kind.as_deref()? {
            "concepts" => Some(AnnotationKind::Concepts),
            "triples" => Some(AnnotationKind::Triples),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageOutput {
    pub path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: String,
    pub skipped: bool,
    pub rows: usize,
    pub outputs: Vec<StageOutput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub finished_at: String,
    pub config: crate::config::PipelineConfig,
    pub stages: Vec<StageReport>,
}
