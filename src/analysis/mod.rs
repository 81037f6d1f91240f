pub mod aggregate;
pub mod consensus;
pub mod normalize;
pub mod scoring;
#[cfg(test)]
mod tests;

pub use aggregate::{IndexedName, ScoreTally, sort_indexed_names, tally_by, trailing_index};
pub use consensus::{ConsensusAnnotation, DEFAULT_QUORUM, fuse};
pub use normalize::{
    Annotation, ConceptSet, Triple, TripleSet, normalize_concepts, normalize_term,
    normalize_triples,
};
pub use scoring::{ContentThresholds, PairScores, ReferenceScores, evaluate, gated_pair_scores};
