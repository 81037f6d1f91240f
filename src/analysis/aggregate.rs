use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid digits regex"));

pub fn trailing_index(name: &str) -> Option<u32> {
    DIGITS
        .find_iter(name)
        .last()
        .and_then(|found| found.as_str().parse::<u32>().ok())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexedName {
    pub index: Option<u32>,
    pub name: String,
}

impl IndexedName {
    pub fn new(name: &str) -> Self {
        Self {
            index: trailing_index(name),
            name: name.to_string(),
        }
    }
}

impl Ord for IndexedName {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.index.unwrap_or(u32::MAX), &self.name)
            .cmp(&(other.index.unwrap_or(u32::MAX), &other.name))
    }
}

impl PartialOrd for IndexedName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub fn sort_indexed_names(names: &mut [String]) {
    names.sort_by_cached_key(|name| IndexedName::new(name));
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeanAccumulator {
    sum: f64,
    count: usize,
}

impl MeanAccumulator {
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.sum / self.count.max(1) as f64
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreTally {
    pub concept: MeanAccumulator,
    pub triple: MeanAccumulator,
}

impl ScoreTally {
    pub fn add(&mut self, concept: f64, triple: f64) {
        self.concept.add(concept);
        self.triple.add(triple);
    }

    pub fn slides(&self) -> usize {
        self.concept.count().max(self.triple.count())
    }
}

// Every row counts once in its group, so a global mean weights slides equally
// rather than averaging lecture means.
pub fn tally_by<K, R>(
    rows: &[R],
    key: impl Fn(&R) -> K,
    scores: impl Fn(&R) -> (f64, f64),
) -> BTreeMap<K, ScoreTally>
where
    K: Ord,
{
    let mut groups = BTreeMap::<K, ScoreTally>::new();
    for row in rows {
        let (concept, triple) = scores(row);
        groups.entry(key(row)).or_default().add(concept, triple);
    }
    groups
}
