use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use super::StageOutcome;
use super::agreement::{PairAgreementRow, SLIDE_FILE};
use crate::analysis::IndexedName;
use crate::analysis::aggregate::MeanAccumulator;
use crate::config::PipelineConfig;
use crate::util::{read_csv, write_csv};

const STAGE: &str = "concept-overlap";
pub const OVERLAP_FILE: &str = "cross_model_concept_overlap.csv";

const HEADERS: [&str; 4] = ["lecture", "lecture_index", "mean_concept_jaccard", "n_pairs"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptOverlapRow {
    pub lecture: String,
    pub lecture_index: Option<u32>,
    pub mean_concept_jaccard: f64,
    pub n_pairs: usize,
}

pub fn run(config: &PipelineConfig) -> Result<StageOutcome> {
    let slide_path = config.analysis_dir().join(SLIDE_FILE);
    if !slide_path.is_file() {
        warn!(path = %slide_path.display(), "slide-level agreement file not found");
        return Ok(StageOutcome::skipped(STAGE));
    }

    let slide_rows = read_csv::<PairAgreementRow>(&slide_path)?;
    let rows = summarize(&slide_rows);

    let out_path = config.analysis_dir().join(OVERLAP_FILE);
    write_csv(&out_path, &HEADERS, &rows)?;
    info!(path = %out_path.display(), lectures = rows.len(), "wrote cross-model concept overlap");

    Ok(StageOutcome::completed(STAGE, rows.len(), vec![out_path]))
}

pub fn summarize(rows: &[PairAgreementRow]) -> Vec<ConceptOverlapRow> {
    let mut per_lecture = BTreeMap::<IndexedName, MeanAccumulator>::new();
    for row in rows.iter().filter(|row| row.concept_jaccard > 0.0) {
        per_lecture
            .entry(IndexedName::new(&row.lecture))
            .or_default()
            .add(row.concept_jaccard);
    }

    per_lecture
        .into_iter()
        .map(|(lecture, mean)| ConceptOverlapRow {
            lecture: lecture.name,
            lecture_index: lecture.index,
            mean_concept_jaccard: mean.mean(),
            n_pairs: mean.count(),
        })
        .collect()
}
