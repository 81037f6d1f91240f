use std::collections::{BTreeMap, BTreeSet};

use super::normalize::{ConceptSet, Triple, TripleSet};

pub const DEFAULT_QUORUM: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsensusAnnotation {
    pub concepts: Vec<String>,
    pub triples: Vec<Triple>,
}

impl ConsensusAnnotation {
    pub fn triple_keys(&self) -> Vec<String> {
        self.triples.iter().map(Triple::key).collect()
    }
}

pub fn fuse(
    per_model_concepts: &BTreeMap<String, ConceptSet>,
    per_model_triples: &BTreeMap<String, TripleSet>,
    quorum: usize,
) -> ConsensusAnnotation {
    ConsensusAnnotation {
        concepts: quorum_vote(per_model_concepts.values(), quorum),
        triples: quorum_vote(per_model_triples.values(), quorum),
    }
}

pub fn quorum_vote<'a, T>(sets: impl IntoIterator<Item = &'a BTreeSet<T>>, quorum: usize) -> Vec<T>
where
    T: Ord + Clone + 'a,
{
    let quorum = quorum.max(1);
    let mut support = BTreeMap::<&T, usize>::new();
    for set in sets {
        for item in set {
            *support.entry(item).or_insert(0) += 1;
        }
    }

    support
        .into_iter()
        .filter(|(_, votes)| *votes >= quorum)
        .map(|(item, _)| item.clone())
        .collect()
}
