use std::collections::BTreeMap;

use anyhow::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::StageOutcome;
use crate::analysis::{Annotation, ContentThresholds, IndexedName, gated_pair_scores, tally_by};
use crate::config::PipelineConfig;
use crate::corpus::load_slide_records;
use crate::model::SlideRecord;
use crate::util::write_csv;

const STAGE: &str = "agreement";
pub const SLIDE_FILE: &str = "slide_level_agreement.csv";
pub const LECTURE_FILE: &str = "lecture_level_agreement.csv";
pub const PAIR_FILE: &str = "model_pair_overall.csv";

const SLIDE_HEADERS: [&str; 6] = [
    "lecture",
    "slide_id",
    "model_a",
    "model_b",
    "concept_jaccard",
    "triple_f1",
];
const LECTURE_HEADERS: [&str; 7] = [
    "lecture",
    "lecture_index",
    "model_a",
    "model_b",
    "avg_concept_jaccard",
    "avg_triple_f1",
    "n_slides",
];
const PAIR_HEADERS: [&str; 5] = [
    "model_a",
    "model_b",
    "avg_concept_jaccard",
    "avg_triple_f1",
    "n_slide_pairs",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairAgreementRow {
    pub lecture: String,
    pub slide_id: String,
    pub model_a: String,
    pub model_b: String,
    pub concept_jaccard: f64,
    pub triple_f1: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LectureAgreementRow {
    pub lecture: String,
    pub lecture_index: Option<u32>,
    pub model_a: String,
    pub model_b: String,
    pub avg_concept_jaccard: f64,
    pub avg_triple_f1: f64,
    pub n_slides: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairSummaryRow {
    pub model_a: String,
    pub model_b: String,
    pub avg_concept_jaccard: f64,
    pub avg_triple_f1: f64,
    pub n_slide_pairs: usize,
}

pub fn run(config: &PipelineConfig) -> Result<StageOutcome> {
    let by_slide_dir = config.by_slide_dir();
    if !by_slide_dir.is_dir() {
        warn!(path = %by_slide_dir.display(), "by-slide directory not found");
        return Ok(StageOutcome::skipped(STAGE));
    }

    let records = load_slide_records(&by_slide_dir)?;
    let slide_rows = score_slides(&records, config);
    let lecture_rows = aggregate_lectures(&slide_rows);
    let pair_rows = aggregate_pairs(&slide_rows);

    let analysis_dir = config.analysis_dir();
    let slide_path = analysis_dir.join(SLIDE_FILE);
    let lecture_path = analysis_dir.join(LECTURE_FILE);
    let pair_path = analysis_dir.join(PAIR_FILE);

    write_csv(&slide_path, &SLIDE_HEADERS, &slide_rows)?;
    write_csv(&lecture_path, &LECTURE_HEADERS, &lecture_rows)?;
    write_csv(&pair_path, &PAIR_HEADERS, &pair_rows)?;

    info!(path = %slide_path.display(), "wrote slide-level agreement");
    info!(path = %lecture_path.display(), "wrote lecture-level agreement");
    info!(path = %pair_path.display(), "wrote model-pair summary");
    info!(slide_pairs = slide_rows.len(), "agreement completed");

    Ok(StageOutcome::completed(
        STAGE,
        slide_rows.len(),
        vec![slide_path, lecture_path, pair_path],
    ))
}

pub fn score_slides(records: &[SlideRecord], config: &PipelineConfig) -> Vec<PairAgreementRow> {
    let pairs = config.model_pairs();
    records
        .par_iter()
        .flat_map_iter(|record| score_slide(record, &config.models, &pairs, config.thresholds))
        .collect()
}

pub fn score_slide(
    record: &SlideRecord,
    models: &[String],
    pairs: &[(&str, &str)],
    thresholds: ContentThresholds,
) -> Vec<PairAgreementRow> {
    let annotations = models
        .iter()
        .map(|model| (model.as_str(), record.annotation(model)))
        .collect::<BTreeMap<&str, Annotation>>();
    let empty = Annotation::default();

    pairs
        .iter()
        .map(|(model_a, model_b)| {
            let left = annotations.get(model_a).unwrap_or(&empty);
            let right = annotations.get(model_b).unwrap_or(&empty);
            let scores = gated_pair_scores(left, right, thresholds);
            PairAgreementRow {
                lecture: record.lecture.clone(),
                slide_id: record.slide_id.clone(),
                model_a: model_a.to_string(),
                model_b: model_b.to_string(),
                concept_jaccard: scores.concept_jaccard,
                triple_f1: scores.triple_f1,
            }
        })
        .collect()
}

pub fn aggregate_lectures(rows: &[PairAgreementRow]) -> Vec<LectureAgreementRow> {
    tally_by(
        rows,
        |row| {
            (
                IndexedName::new(&row.lecture),
                row.model_a.clone(),
                row.model_b.clone(),
            )
        },
        |row| (row.concept_jaccard, row.triple_f1),
    )
    .into_iter()
    .map(|((lecture, model_a, model_b), tally)| LectureAgreementRow {
        lecture: lecture.name,
        lecture_index: lecture.index,
        model_a,
        model_b,
        avg_concept_jaccard: tally.concept.mean(),
        avg_triple_f1: tally.triple.mean(),
        n_slides: tally.slides(),
    })
    .collect()
}

pub fn aggregate_pairs(rows: &[PairAgreementRow]) -> Vec<PairSummaryRow> {
    tally_by(
        rows,
        |row| (row.model_a.clone(), row.model_b.clone()),
        |row| (row.concept_jaccard, row.triple_f1),
    )
    .into_iter()
    .map(|((model_a, model_b), tally)| PairSummaryRow {
        model_a,
        model_b,
        avg_concept_jaccard: tally.concept.mean(),
        avg_triple_f1: tally.triple.mean(),
        n_slide_pairs: tally.slides(),
    })
    .collect()
}
