// Set-overlap metrics. Model-vs-model agreement and evaluation against a
// reference resolve empty inputs differently, so each has its own function.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::normalize::Annotation;

pub const DEFAULT_MIN_CONCEPTS: usize = 2;
pub const DEFAULT_MIN_TRIPLES: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentThresholds {
    pub min_concepts: usize,
    pub min_triples: usize,
}

impl Default for ContentThresholds {
    fn default() -> Self {
        Self {
            min_concepts: DEFAULT_MIN_CONCEPTS,
            min_triples: DEFAULT_MIN_TRIPLES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairScores {
    pub concept_jaccard: f64,
    pub triple_f1: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PrecisionRecall {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceScores {
    pub concept_jaccard: f64,
    pub triples: PrecisionRecall,
}

// Two empty sets score 0.
pub fn pairwise_jaccard<T: Ord>(left: &BTreeSet<T>, right: &BTreeSet<T>) -> f64 {
    let union = left.union(right).count();
    if union == 0 {
        return 0.0;
    }

    left.intersection(right).count() as f64 / union as f64
}

pub fn pairwise_triple_f1<T: Ord>(left: &BTreeSet<T>, right: &BTreeSet<T>) -> f64 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let shared = left.intersection(right).count() as f64;
    let precision = shared / left.len() as f64;
    let recall = shared / right.len() as f64;
    harmonic_mean(precision, recall)
}

// Two empty sets score 1.
pub fn reference_jaccard<T: Ord>(reference: &BTreeSet<T>, candidate: &BTreeSet<T>) -> f64 {
    if reference.is_empty() && candidate.is_empty() {
        return 1.0;
    }
    if reference.is_empty() || candidate.is_empty() {
        return 0.0;
    }

    reference.intersection(candidate).count() as f64
        / reference.union(candidate).count() as f64
}

// Precision is measured over the candidate, recall over the reference.
// A ratio with an empty denominator is vacuously 1.
pub fn reference_precision_recall<T: Ord>(
    reference: &BTreeSet<T>,
    candidate: &BTreeSet<T>,
) -> PrecisionRecall {
    if reference.is_empty() && candidate.is_empty() {
        return PrecisionRecall {
            precision: 1.0,
            recall: 1.0,
            f1: 1.0,
        };
    }

    let hits = reference.intersection(candidate).count() as f64;
    let precision = vacuous_ratio(hits, candidate.len());
    let recall = vacuous_ratio(hits, reference.len());

    PrecisionRecall {
        precision,
        recall,
        f1: harmonic_mean(precision, recall),
    }
}

pub fn gated_pair_scores(
    left: &Annotation,
    right: &Annotation,
    thresholds: ContentThresholds,
) -> PairScores {
    let concept_jaccard = if left.concepts.len() >= thresholds.min_concepts
        && right.concepts.len() >= thresholds.min_concepts
    {
        pairwise_jaccard(&left.concepts, &right.concepts)
    } else {
        0.0
    };

    let triple_f1 = if left.triples.len() >= thresholds.min_triples
        && right.triples.len() >= thresholds.min_triples
    {
        pairwise_triple_f1(&left.triples, &right.triples)
    } else {
        0.0
    };

    PairScores {
        concept_jaccard,
        triple_f1,
    }
}

pub fn evaluate(candidate: &Annotation, reference: &Annotation) -> ReferenceScores {
    ReferenceScores {
        concept_jaccard: reference_jaccard(&reference.concepts, &candidate.concepts),
        triples: reference_precision_recall(&reference.triples, &candidate.triples),
    }
}

fn vacuous_ratio(numerator: f64, denominator: usize) -> f64 {
    if denominator == 0 {
        1.0
    } else {
        numerator / denominator as f64
    }
}

fn harmonic_mean(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}
