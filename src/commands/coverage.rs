use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use super::StageOutcome;
use crate::analysis::trailing_index;
use crate::config::PipelineConfig;
use crate::corpus::scan_by_slide;
use crate::model::{AnnotationKind, SlideRecord};
use crate::util::{read_json_lenient, write_csv};

const STAGE: &str = "coverage";
pub const COVERAGE_FILE: &str = "parsing_coverage.csv";

const HEADERS: [&str; 7] = [
    "model",
    "lecture",
    "lecture_index",
    "concepts_valid",
    "concepts_total",
    "triples_valid",
    "triples_total",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageRow {
    pub model: String,
    pub lecture: String,
    pub lecture_index: Option<u32>,
    pub concepts_valid: usize,
    pub concepts_total: usize,
    pub triples_valid: usize,
    pub triples_total: usize,
}

pub fn run(config: &PipelineConfig) -> Result<StageOutcome> {
    let by_slide_dir = config.by_slide_dir();
    if !by_slide_dir.is_dir() {
        warn!(path = %by_slide_dir.display(), "by-slide directory not found");
        return Ok(StageOutcome::skipped(STAGE));
    }

    let lectures = scan_by_slide(&by_slide_dir)?;

    // (model, lecture position) -> (concepts_valid, triples_valid)
    let mut valid = BTreeMap::<(&str, usize), (usize, usize)>::new();
    for (position, lecture) in lectures.iter().enumerate() {
        for path in &lecture.files {
            let Some(record) = read_json_lenient::<SlideRecord>(path) else {
                continue;
            };
            for model in &config.models {
                let counts = valid.entry((model.as_str(), position)).or_default();
                if record.parsed_payload(model, AnnotationKind::Concepts).is_some() {
                    counts.0 += 1;
                }
                if record.parsed_payload(model, AnnotationKind::Triples).is_some() {
                    counts.1 += 1;
                }
            }
        }
    }

    let mut rows = Vec::new();
    for model in &config.models {
        for (position, lecture) in lectures.iter().enumerate() {
            let total = lecture.files.len();
            if total == 0 {
                continue;
            }
            let (concepts_valid, triples_valid) = valid
                .get(&(model.as_str(), position))
                .copied()
                .unwrap_or_default();

            info!(
                model = %model,
                lecture = %lecture.lecture,
                concepts = %format!("{concepts_valid}/{total} ({:.2}%)", percent(concepts_valid, total)),
                triples = %format!("{triples_valid}/{total} ({:.2}%)", percent(triples_valid, total)),
                "parsing coverage"
            );

            rows.push(CoverageRow {
                model: model.clone(),
                lecture: lecture.lecture.clone(),
                lecture_index: trailing_index(&lecture.lecture),
                concepts_valid,
                concepts_total: total,
                triples_valid,
                triples_total: total,
            });
        }
    }

    let out_path = config.analysis_dir().join(COVERAGE_FILE);
    write_csv(&out_path, &HEADERS, &rows)?;
    info!(path = %out_path.display(), rows = rows.len(), "wrote parsing coverage");

    Ok(StageOutcome::completed(STAGE, rows.len(), vec![out_path]))
}

fn percent(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64 * 100.0
    }
}
