use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::StageOutcome;
use crate::analysis::{
    Annotation, IndexedName, ScoreTally, evaluate, normalize_concepts, normalize_triples,
    trailing_index,
};
use crate::config::PipelineConfig;
use crate::model::{AnnotationKind, FusionRecord, ModelOutputRecord, ReferenceRecord};
use crate::util::{read_jsonl, write_csv};

const STAGE: &str = "evaluate-reference";
pub const CONSENSUS_MODEL: &str = "consensus";
pub const SLIDE_FILE: &str = "human_ref_eval_by_slide.csv";
pub const LECTURE_FILE: &str = "human_ref_eval_by_lecture.csv";
pub const GLOBAL_FILE: &str = "human_ref_eval_global_summary.csv";

const SLIDE_HEADERS: [&str; 9] = [
    "lecture",
    "lecture_num",
    "slide_number",
    "model",
    "type",
    "concept_jaccard",
    "triple_precision",
    "triple_recall",
    "triple_f1",
];
const LECTURE_HEADERS: [&str; 7] = [
    "lecture",
    "lecture_num",
    "model",
    "avg_concept_jaccard",
    "avg_triple_f1",
    "n_concept_slides",
    "n_triple_slides",
];
const GLOBAL_HEADERS: [&str; 5] = [
    "model",
    "global_avg_concept_jaccard",
    "global_avg_triple_f1",
    "n_concept_slides",
    "n_triple_slides",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub lecture: Option<String>,
    pub lecture_num: Option<u32>,
    pub slide_number: u32,
    pub model: String,
    pub kind: AnnotationKind,
    pub annotation: Annotation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRow {
    pub lecture: Option<String>,
    pub lecture_num: Option<u32>,
    pub slide_number: u32,
    pub model: String,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub concept_jaccard: Option<f64>,
    pub triple_precision: Option<f64>,
    pub triple_recall: Option<f64>,
    pub triple_f1: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceLectureRow {
    pub lecture: Option<String>,
    pub lecture_num: Option<u32>,
    pub model: String,
    pub avg_concept_jaccard: f64,
    pub avg_triple_f1: f64,
    pub n_concept_slides: usize,
    pub n_triple_slides: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceGlobalRow {
    pub model: String,
    pub global_avg_concept_jaccard: f64,
    pub global_avg_triple_f1: f64,
    pub n_concept_slides: usize,
    pub n_triple_slides: usize,
}

pub fn run(config: &PipelineConfig) -> Result<StageOutcome> {
    if !config.reference_path.is_file() {
        warn!(path = %config.reference_path.display(), "reference file not found");
        return Ok(StageOutcome::skipped(STAGE));
    }

    let reference = load_reference(&config.reference_path)?;
    info!(slides = reference.len(), "loaded pseudo-human reference");

    let mut candidates = Vec::new();
    if config.model_outputs_path.is_file() {
        candidates.extend(load_model_candidates(&config.model_outputs_path)?);
    } else {
        warn!(path = %config.model_outputs_path.display(), "model output file not found");
    }

    let fusion_path = config.fusion_path();
    if fusion_path.is_file() {
        candidates.extend(consensus_candidates(&read_jsonl::<FusionRecord>(&fusion_path)?));
    } else {
        warn!(path = %fusion_path.display(), "fusion file not found; consensus not evaluated");
    }

    if candidates.is_empty() {
        warn!("no candidate annotations to evaluate");
        return Ok(StageOutcome::skipped(STAGE));
    }
    info!(records = candidates.len(), "loaded candidate annotations");

    let slide_rows = evaluate_candidates(&candidates, &reference);
    let lecture_rows = aggregate_lectures(&slide_rows);
    let global_rows = aggregate_models(&slide_rows);

    let analysis_dir = config.analysis_dir();
    let slide_path = analysis_dir.join(SLIDE_FILE);
    let lecture_path = analysis_dir.join(LECTURE_FILE);
    let global_path = analysis_dir.join(GLOBAL_FILE);

    write_csv(&slide_path, &SLIDE_HEADERS, &slide_rows)?;
    write_csv(&lecture_path, &LECTURE_HEADERS, &lecture_rows)?;
    write_csv(&global_path, &GLOBAL_HEADERS, &global_rows)?;

    info!(
        slide_rows = slide_rows.len(),
        lecture_rows = lecture_rows.len(),
        models = global_rows.len(),
        "reference evaluation completed"
    );

    Ok(StageOutcome::completed(
        STAGE,
        slide_rows.len(),
        vec![slide_path, lecture_path, global_path],
    ))
}

// Reference annotations keyed by slide number only; a later line for the same slide wins.
pub fn load_reference(path: &Path) -> Result<BTreeMap<u32, Annotation>> {
    let mut reference = BTreeMap::new();
    for record in read_jsonl::<ReferenceRecord>(path)? {
        match record.slide_number() {
            Some(slide_number) => {
                reference.insert(slide_number, record.annotation());
            }
            None => debug!("skipping reference line without slide_number"),
        }
    }
    Ok(reference)
}

pub fn load_model_candidates(path: &Path) -> Result<Vec<Candidate>> {
    Ok(read_jsonl::<ModelOutputRecord>(path)?
        .into_iter()
        .filter_map(model_candidate)
        .collect())
}

pub fn model_candidate(record: ModelOutputRecord) -> Option<Candidate> {
    let kind = record.annotation_kind()?;
    let slide_number = trailing_index(record.data.slide_id.as_deref()?)?;
    let model = record.data.model?;

    let parsed = &record.data.parsed;
    let annotation = match kind {
        AnnotationKind::Concepts => Annotation {
            concepts: normalize_concepts(parsed),
            ..Annotation::default()
        },
        AnnotationKind::Triples => Annotation {
            triples: normalize_triples(parsed),
            ..Annotation::default()
        },
    };

    Some(Candidate {
        lecture: record.lecture,
        lecture_num: record.metadata.lecture_number,
        slide_number,
        model,
        kind,
        annotation,
    })
}

pub fn consensus_candidates(records: &[FusionRecord]) -> Vec<Candidate> {
    let mut candidates = Vec::with_capacity(records.len() * 2);
    for record in records {
        let Some(slide_number) = trailing_index(&record.slide_id) else {
            continue;
        };
        let annotation = record.consensus();
        for kind in [AnnotationKind::Concepts, AnnotationKind::Triples] {
            candidates.push(Candidate {
                lecture: Some(record.lecture.clone()),
                lecture_num: trailing_index(&record.lecture),
                slide_number,
                model: CONSENSUS_MODEL.to_string(),
                kind,
                annotation: annotation.clone(),
            });
        }
    }
    candidates
}

pub fn evaluate_candidates(
    candidates: &[Candidate],
    reference: &BTreeMap<u32, Annotation>,
) -> Vec<EvaluationRow> {
    let mut rows = candidates
        .iter()
        .filter_map(|candidate| {
            let gold = reference.get(&candidate.slide_number)?;
            let scores = evaluate(&candidate.annotation, gold);
            let row = EvaluationRow {
                lecture: candidate.lecture.clone(),
                lecture_num: candidate.lecture_num,
                slide_number: candidate.slide_number,
                model: candidate.model.clone(),
                kind: candidate.kind,
                concept_jaccard: None,
                triple_precision: None,
                triple_recall: None,
                triple_f1: None,
            };
            Some(match candidate.kind {
                AnnotationKind::Concepts => EvaluationRow {
                    concept_jaccard: Some(scores.concept_jaccard),
                    ..row
                },
                AnnotationKind::Triples => EvaluationRow {
                    triple_precision: Some(scores.triples.precision),
                    triple_recall: Some(scores.triples.recall),
                    triple_f1: Some(scores.triples.f1),
                    ..row
                },
            })
        })
        .collect::<Vec<EvaluationRow>>();

    rows.sort_by(|a, b| {
        lecture_key(a)
            .cmp(&lecture_key(b))
            .then(a.slide_number.cmp(&b.slide_number))
            .then_with(|| a.model.cmp(&b.model))
            .then(a.kind.cmp(&b.kind))
    });
    rows
}

fn lecture_key(row: &EvaluationRow) -> IndexedName {
    IndexedName {
        index: row.lecture_num,
        name: row.lecture.clone().unwrap_or_default(),
    }
}

fn add_row(tally: &mut ScoreTally, row: &EvaluationRow) {
    match row.kind {
        AnnotationKind::Concepts => {
            if let Some(score) = row.concept_jaccard {
                tally.concept.add(score);
            }
        }
        AnnotationKind::Triples => {
            if let Some(score) = row.triple_f1 {
                tally.triple.add(score);
            }
        }
    }
}

pub fn aggregate_lectures(rows: &[EvaluationRow]) -> Vec<ReferenceLectureRow> {
    let mut groups = BTreeMap::<(IndexedName, String), (Option<String>, ScoreTally)>::new();
    for row in rows {
        let (_, tally) = groups
            .entry((lecture_key(row), row.model.clone()))
            .or_insert_with(|| (row.lecture.clone(), ScoreTally::default()));
        add_row(tally, row);
    }

    groups
        .into_iter()
        .map(|((key, model), (lecture, tally))| ReferenceLectureRow {
            lecture,
            lecture_num: key.index,
            model,
            avg_concept_jaccard: tally.concept.mean(),
            avg_triple_f1: tally.triple.mean(),
            n_concept_slides: tally.concept.count(),
            n_triple_slides: tally.triple.count(),
        })
        .collect()
}

pub fn aggregate_models(rows: &[EvaluationRow]) -> Vec<ReferenceGlobalRow> {
    let mut groups = BTreeMap::<String, ScoreTally>::new();
    for row in rows {
        add_row(groups.entry(row.model.clone()).or_default(), row);
    }

    groups
        .into_iter()
        .map(|(model, tally)| ReferenceGlobalRow {
            model,
            global_avg_concept_jaccard: tally.concept.mean(),
            global_avg_triple_f1: tally.triple.mean(),
            n_concept_slides: tally.concept.count(),
            n_triple_slides: tally.triple.count(),
        })
        .collect()
}
