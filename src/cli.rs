use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "slidekg",
    version,
    about = "Agreement, consensus and reference evaluation for slide annotations"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    BuildBySlide(StageArgs),
    Coverage(StageArgs),
    Agreement(StageArgs),
    ConceptOverlap(StageArgs),
    Fuse(StageArgs),
    EvaluateConsensus(StageArgs),
    EvaluateReference(StageArgs),
    Run(StageArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct StageArgs {
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub corpus_dir: Option<PathBuf>,

    #[arg(long = "model")]
    pub models: Vec<String>,

    #[arg(long)]
    pub quorum: Option<usize>,

    #[arg(long)]
    pub min_concepts: Option<usize>,

    #[arg(long)]
    pub min_triples: Option<usize>,

    #[arg(long)]
    pub reference_path: Option<PathBuf>,

    #[arg(long)]
    pub model_outputs_path: Option<PathBuf>,
}
