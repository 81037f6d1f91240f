use std::collections::BTreeSet;

use serde_json::{Map, Value};

pub const CONCEPT_TERM_KEYS: [&str; 4] = ["term", "concept", "name", "label"];

pub const SUBJECT_KEYS: [&str; 4] = ["head", "subject", "source", "s"];
pub const PREDICATE_KEYS: [&str; 4] = ["relation", "predicate", "rel", "p"];
pub const OBJECT_KEYS: [&str; 4] = ["tail", "object", "target", "o"];

pub const TRIPLE_KEY_SEPARATOR: &str = "||";

pub type ConceptSet = BTreeSet<String>;
pub type TripleSet = BTreeSet<Triple>;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Triple {
    pub fn new(subject: &str, predicate: &str, object: &str) -> Option<Self> {
        let triple = Self {
            subject: normalize_role(subject),
            predicate: normalize_role(predicate),
            object: normalize_role(object),
        };

        if triple.subject.is_empty() && triple.predicate.is_empty() && triple.object.is_empty() {
            None
        } else {
            Some(triple)
        }
    }

    pub fn key(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.subject,
            self.predicate,
            self.object,
            sep = TRIPLE_KEY_SEPARATOR
        )
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let mut parts = key.splitn(3, TRIPLE_KEY_SEPARATOR);
        let subject = parts.next()?;
        let predicate = parts.next()?;
        let object = parts.next()?;
        Self::new(subject, predicate, object)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    pub concepts: ConceptSet,
    pub triples: TripleSet,
}

impl Annotation {
    pub fn from_raw(concepts: Option<&Value>, triples: Option<&Value>) -> Self {
        Self {
            concepts: concepts.map(normalize_concepts).unwrap_or_default(),
            triples: triples.map(normalize_triples).unwrap_or_default(),
        }
    }

    pub fn from_keys<'a>(
        concepts: impl IntoIterator<Item = &'a String>,
        triple_keys: impl IntoIterator<Item = &'a String>,
    ) -> Self {
        Self {
            concepts: concepts
                .into_iter()
                .map(|term| normalize_term(term))
                .filter(|term| !term.is_empty())
                .collect(),
            triples: triple_keys
                .into_iter()
                .filter_map(|key| Triple::from_key(key))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum RawShape<'a> {
    Wrapper(&'a [Value]),
    Single(&'a Value),
    List(&'a [Value]),
    Unrecognized,
}

impl<'a> RawShape<'a> {
    pub fn items(self) -> Vec<&'a Value> {
        match self {
            Self::Wrapper(items) | Self::List(items) => items.iter().collect(),
            Self::Single(item) => vec![item],
            Self::Unrecognized => Vec::new(),
        }
    }
}

pub fn detect_shape<'a>(
    raw: &'a Value,
    list_key: &str,
    is_single: impl Fn(&Map<String, Value>) -> bool,
) -> RawShape<'a> {
    match raw {
        Value::Array(items) => RawShape::List(items),
        Value::Object(map) => match map.get(list_key) {
            Some(Value::Array(items)) => RawShape::Wrapper(items),
            _ if is_single(map) => RawShape::Single(raw),
            _ => RawShape::Unrecognized,
        },
        _ => RawShape::Unrecognized,
    }
}

pub fn normalize_term(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}

// Roles never contain '|', so a key always splits back into the same three roles.
fn normalize_role(input: &str) -> String {
    normalize_term(&input.replace('|', " "))
}

pub fn is_single_concept(map: &Map<String, Value>) -> bool {
    CONCEPT_TERM_KEYS.iter().any(|key| map.contains_key(*key))
}

pub fn is_single_triple(map: &Map<String, Value>) -> bool {
    [&SUBJECT_KEYS, &PREDICATE_KEYS, &OBJECT_KEYS]
        .iter()
        .all(|aliases| aliases.iter().any(|key| map.contains_key(*key)))
}

pub fn normalize_concepts(raw: &Value) -> ConceptSet {
    detect_shape(raw, "concepts", is_single_concept)
        .items()
        .into_iter()
        .map(concept_term)
        .filter(|term| !term.is_empty())
        .collect()
}

pub fn normalize_triples(raw: &Value) -> TripleSet {
    detect_shape(raw, "triples", is_single_triple)
        .items()
        .into_iter()
        .filter_map(triple_from_item)
        .collect()
}

fn concept_term(item: &Value) -> String {
    match item {
        Value::Null => String::new(),
        Value::String(text) => normalize_term(text),
        Value::Object(map) => concept_term_from_object(map),
        other => normalize_term(&other.to_string()),
    }
}

fn concept_term_from_object(map: &Map<String, Value>) -> String {
    if let Some(term) = first_string(map, &CONCEPT_TERM_KEYS) {
        return normalize_term(term);
    }

    let joined = map
        .values()
        .filter_map(Value::as_str)
        .collect::<Vec<&str>>()
        .join(" ");
    let joined = normalize_term(&joined);
    if !joined.is_empty() {
        return joined;
    }

    normalize_term(&Value::Object(map.clone()).to_string())
}

fn triple_from_item(item: &Value) -> Option<Triple> {
    match item {
        Value::Object(map) => triple_from_object(map),
        Value::Array(parts) if parts.len() == 3 => {
            let subject = parts[0].as_str()?;
            let predicate = parts[1].as_str()?;
            let object = parts[2].as_str()?;
            Triple::new(subject, predicate, object)
        }
        _ => None,
    }
}

fn triple_from_object(map: &Map<String, Value>) -> Option<Triple> {
    Triple::new(
        first_string(map, &SUBJECT_KEYS).unwrap_or_default(),
        first_string(map, &PREDICATE_KEYS).unwrap_or_default(),
        first_string(map, &OBJECT_KEYS).unwrap_or_default(),
    )
}

fn first_string<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| map.get(*key).and_then(Value::as_str))
}
