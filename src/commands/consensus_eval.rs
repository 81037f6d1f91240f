use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use super::StageOutcome;
use crate::analysis::{ContentThresholds, IndexedName, gated_pair_scores, tally_by};
use crate::config::PipelineConfig;
use crate::model::FusionRecord;
use crate::util::{read_jsonl, write_csv};

const STAGE: &str = "evaluate-consensus";
pub const SLIDE_FILE: &str = "superlearner_evaluation.csv";
pub const LECTURE_FILE: &str = "superlearner_evaluation_lecture.csv";
pub const OVERALL_FILE: &str = "superlearner_overall.csv";

const SLIDE_HEADERS: [&str; 5] = ["lecture", "slide_id", "model", "concept_jaccard", "triple_f1"];
const LECTURE_HEADERS: [&str; 6] = [
    "lecture",
    "lecture_index",
    "model",
    "mean_concept_jaccard",
    "mean_triple_f1",
    "n_slides",
];
const OVERALL_HEADERS: [&str; 4] = [
    "model",
    "mean_concept_jaccard",
    "mean_triple_f1",
    "n_slide_evals",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsensusSlideRow {
    pub lecture: String,
    pub slide_id: String,
    pub model: String,
    pub concept_jaccard: f64,
    pub triple_f1: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsensusLectureRow {
    pub lecture: String,
    pub lecture_index: Option<u32>,
    pub model: String,
    pub mean_concept_jaccard: f64,
    pub mean_triple_f1: f64,
    pub n_slides: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsensusOverallRow {
    pub model: String,
    pub mean_concept_jaccard: f64,
    pub mean_triple_f1: f64,
    pub n_slide_evals: usize,
}

pub fn run(config: &PipelineConfig) -> Result<StageOutcome> {
    let fusion_path = config.fusion_path();
    if !fusion_path.is_file() {
        warn!(path = %fusion_path.display(), "fusion file not found");
        return Ok(StageOutcome::skipped(STAGE));
    }

    let records = read_jsonl::<FusionRecord>(&fusion_path)?;
    let slide_rows = score_against_consensus(&records, &config.models, config.thresholds);
    let lecture_rows = aggregate_lectures(&slide_rows);
    let overall_rows = aggregate_models(&slide_rows);

    let analysis_dir = config.analysis_dir();
    let slide_path = analysis_dir.join(SLIDE_FILE);
    let lecture_path = analysis_dir.join(LECTURE_FILE);
    let overall_path = analysis_dir.join(OVERALL_FILE);

    write_csv(&slide_path, &SLIDE_HEADERS, &slide_rows)?;
    write_csv(&overall_path, &OVERALL_HEADERS, &overall_rows)?;
    write_csv(&lecture_path, &LECTURE_HEADERS, &lecture_rows)?;

    for row in &overall_rows {
        info!(
            model = %row.model,
            concept_jaccard = %format!("{:.3}", row.mean_concept_jaccard),
            triple_f1 = %format!("{:.3}", row.mean_triple_f1),
            "model vs consensus"
        );
    }
    info!(
        slide_evals = slide_rows.len(),
        path = %analysis_dir.display(),
        "consensus evaluation completed"
    );

    Ok(StageOutcome::completed(
        STAGE,
        slide_rows.len(),
        vec![slide_path, lecture_path, overall_path],
    ))
}

pub fn score_against_consensus(
    records: &[FusionRecord],
    models: &[String],
    thresholds: ContentThresholds,
) -> Vec<ConsensusSlideRow> {
    let mut rows = Vec::with_capacity(records.len() * models.len());
    for record in records {
        let consensus = record.consensus();
        for model in models {
            let scores = gated_pair_scores(&consensus, &record.model_annotation(model), thresholds);
            rows.push(ConsensusSlideRow {
                lecture: record.lecture.clone(),
                slide_id: record.slide_id.clone(),
                model: model.clone(),
                concept_jaccard: scores.concept_jaccard,
                triple_f1: scores.triple_f1,
            });
        }
    }
    rows
}

pub fn aggregate_lectures(rows: &[ConsensusSlideRow]) -> Vec<ConsensusLectureRow> {
    tally_by(
        rows,
        |row| (IndexedName::new(&row.lecture), row.model.clone()),
        |row| (row.concept_jaccard, row.triple_f1),
    )
    .into_iter()
    .map(|((lecture, model), tally)| ConsensusLectureRow {
        lecture: lecture.name,
        lecture_index: lecture.index,
        model,
        mean_concept_jaccard: tally.concept.mean(),
        mean_triple_f1: tally.triple.mean(),
        n_slides: tally.slides(),
    })
    .collect()
}

pub fn aggregate_models(rows: &[ConsensusSlideRow]) -> Vec<ConsensusOverallRow> {
    tally_by(
        rows,
        |row| row.model.clone(),
        |row| (row.concept_jaccard, row.triple_f1),
    )
    .into_iter()
    .map(|(model, tally)| ConsensusOverallRow {
        model,
        mean_concept_jaccard: tally.concept.mean(),
        mean_triple_f1: tally.triple.mean(),
        n_slide_evals: tally.slides(),
    })
    .collect()
}
