use std::collections::BTreeMap;

use anyhow::Result;
use rayon::prelude::*;
use tracing::{info, warn};

use super::StageOutcome;
use crate::analysis::{Triple, fuse};
use crate::config::PipelineConfig;
use crate::corpus::load_slide_records;
use crate::model::{FusedSets, FusionRecord, SlideRecord};
use crate::util::write_jsonl;

const STAGE: &str = "fuse";

pub fn run(config: &PipelineConfig) -> Result<StageOutcome> {
    let by_slide_dir = config.by_slide_dir();
    if !by_slide_dir.is_dir() {
        warn!(path = %by_slide_dir.display(), "by-slide directory not found");
        return Ok(StageOutcome::skipped(STAGE));
    }

    let records = load_slide_records(&by_slide_dir)?;
    let fused = records
        .par_iter()
        .map(|record| fuse_slide(record, &config.models, config.quorum))
        .collect::<Vec<FusionRecord>>();

    let out_path = config.fusion_path();
    write_jsonl(&out_path, &fused)?;

    let consensus_concepts = fused
        .iter()
        .map(|record| record.superlearner.concepts.len())
        .sum::<usize>();
    let consensus_triples = fused
        .iter()
        .map(|record| record.superlearner.triples.len())
        .sum::<usize>();
    info!(
        slides = fused.len(),
        quorum = config.quorum,
        consensus_concepts,
        consensus_triples,
        path = %out_path.display(),
        "fusion completed"
    );

    Ok(StageOutcome::completed(STAGE, fused.len(), vec![out_path]))
}

pub fn fuse_slide(record: &SlideRecord, models: &[String], quorum: usize) -> FusionRecord {
    let mut concepts = BTreeMap::new();
    let mut triples = BTreeMap::new();
    for model in models {
        let annotation = record.annotation(model);
        concepts.insert(model.clone(), annotation.concepts);
        triples.insert(model.clone(), annotation.triples);
    }

    let consensus = fuse(&concepts, &triples, quorum);

    FusionRecord {
        lecture: record.lecture.clone(),
        slide_id: record.slide_id.clone(),
        paths: record.paths.clone(),
        superlearner: FusedSets {
            triples: consensus.triple_keys(),
            concepts: consensus.concepts,
        },
        models: concepts
            .into_iter()
            .map(|(model, set)| (model, set.into_iter().collect()))
            .collect(),
        triples: triples
            .into_iter()
            .map(|(model, set)| (model, set.iter().map(Triple::key).collect()))
            .collect(),
    }
}
