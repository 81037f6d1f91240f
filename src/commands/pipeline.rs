use anyhow::Result;
use chrono::Utc;
use tracing::info;

use super::{
    StageOutcome, agreement, build_by_slide, concept_overlap, consensus_eval, coverage, fuse,
    reference_eval,
};
use crate::config::PipelineConfig;
use crate::model::PipelineRunManifest;
use crate::util::{now_utc_string, utc_compact_string, write_json_pretty};

pub const RUN_MANIFEST_FILE: &str = "pipeline_run.json";

type Stage = fn(&PipelineConfig) -> Result<StageOutcome>;

const STAGES: [Stage; 7] = [
    build_by_slide::run,
    coverage::run,
    agreement::run,
    concept_overlap::run,
    fuse::run,
    consensus_eval::run,
    reference_eval::run,
];

pub fn run(config: &PipelineConfig) -> Result<PipelineRunManifest> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    info!(run_id = %run_id, data_dir = %config.data_dir.display(), "starting pipeline");

    let mut stages = Vec::with_capacity(STAGES.len());
    for stage in STAGES {
        let outcome = stage(config)?;
        info!(
            stage = outcome.stage,
            skipped = outcome.skipped,
            rows = outcome.rows,
            "stage finished"
        );
        stages.push(outcome.report()?);
    }

    let manifest = PipelineRunManifest {
        manifest_version: 1,
        run_id,
        status: "completed".to_string(),
        started_at,
        finished_at: now_utc_string(),
        config: config.clone(),
        stages,
    };

    let manifest_path = config.analysis_dir().join(RUN_MANIFEST_FILE);
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote pipeline run manifest");

    Ok(manifest)
}
