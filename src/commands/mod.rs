use std::path::PathBuf;

use anyhow::Result;

use crate::model::{StageOutput, StageReport};
use crate::util::sha256_file;

pub mod agreement;
pub mod build_by_slide;
pub mod concept_overlap;
pub mod consensus_eval;
pub mod coverage;
pub mod fuse;
pub mod pipeline;
pub mod reference_eval;

#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub stage: &'static str,
    pub skipped: bool,
    pub rows: usize,
    pub outputs: Vec<PathBuf>,
}

impl StageOutcome {
    pub fn skipped(stage: &'static str) -> Self {
        Self {
            stage,
            skipped: true,
            rows: 0,
            outputs: Vec::new(),
        }
    }

    pub fn completed(stage: &'static str, rows: usize, outputs: Vec<PathBuf>) -> Self {
        Self {
            stage,
            skipped: false,
            rows,
            outputs,
        }
    }

    pub fn report(&self) -> Result<StageReport> {
        let mut outputs = Vec::with_capacity(self.outputs.len());
        for path in &self.outputs {
            outputs.push(StageOutput {
                path: path.display().to_string(),
                sha256: sha256_file(path)?,
            });
        }

        Ok(StageReport {
            stage: self.stage.to_string(),
            skipped: self.skipped,
            rows: self.rows,
            outputs,
        })
    }
}
