use std::collections::{BTreeMap, BTreeSet};

use serde_json::json;

use super::aggregate::MeanAccumulator;
use super::consensus::quorum_vote;
use super::normalize::{RawShape, detect_shape, is_single_concept};
use super::scoring::{
    pairwise_jaccard, pairwise_triple_f1, reference_jaccard, reference_precision_recall,
};
use super::*;

fn concepts(terms: &[&str]) -> ConceptSet {
    terms.iter().map(|term| term.to_string()).collect()
}

fn triple(subject: &str, predicate: &str, object: &str) -> Triple {
    Triple::new(subject, predicate, object).expect("non-empty triple")
}

#[test]
fn normalize_term_trims_lowercases_and_collapses_whitespace() {
    assert_eq!(normalize_term("  Gradient\t  Descent\n"), "gradient descent");
    assert_eq!(normalize_term("   "), "");
}

#[test]
fn normalize_term_is_idempotent() {
    for input in ["  Neural   NETWORK ", "already normal", "\tMixed Case\tTabs "] {
        let once = normalize_term(input);
        assert_eq!(normalize_term(&once), once);
    }
}

#[test]
fn concepts_accept_wrapper_single_and_list_shapes() {
    let wrapper = json!({"concepts": [{"term": "Entropy"}, {"term": " entropy "}, {"term": "Bits"}]});
    let single = json!({"term": "Entropy", "category": "measure"});
    let list = json!([{"concept": "Entropy"}, {"name": "Bits"}]);

    assert_eq!(normalize_concepts(&wrapper), concepts(&["bits", "entropy"]));
    assert_eq!(normalize_concepts(&single), concepts(&["entropy"]));
    assert_eq!(normalize_concepts(&list), concepts(&["bits", "entropy"]));
}

#[test]
fn concept_term_keys_follow_priority_order() {
    let raw = json!([{"label": "Fourth", "name": "Third", "concept": "Second", "term": "First"}]);
    assert_eq!(normalize_concepts(&raw), concepts(&["first"]));
}

#[test]
fn concept_without_known_key_falls_back_to_string_fields() {
    let raw = json!([{"category": "Method", "weight": 3, "text": "Backprop"}]);
    assert_eq!(normalize_concepts(&raw), concepts(&["method backprop"]));
}

#[test]
fn concept_without_string_fields_is_stringified() {
    let raw = json!([{"weight": 3}]);
    assert_eq!(normalize_concepts(&raw), concepts(&["{\"weight\":3}"]));
}

#[test]
fn concept_list_accepts_bare_strings_and_drops_empty_terms() {
    let raw = json!(["  Loss ", "", {"term": "   "}, null]);
    assert_eq!(normalize_concepts(&raw), concepts(&["loss"]));
}

#[test]
fn malformed_concept_payloads_yield_empty_sets() {
    assert!(normalize_concepts(&json!(null)).is_empty());
    assert!(normalize_concepts(&json!("just text")).is_empty());
    assert!(normalize_concepts(&json!(42)).is_empty());
    assert!(normalize_concepts(&json!({"concepts": "not a list"})).is_empty());
    assert!(normalize_concepts(&json!({"unrelated": true})).is_empty());
}

#[test]
fn detect_shape_distinguishes_wrapper_from_single() {
    let wrapper = json!({"concepts": [], "term": "ignored"});
    assert!(matches!(
        detect_shape(&wrapper, "concepts", is_single_concept),
        RawShape::Wrapper(_)
    ));

    let single = json!({"term": "x"});
    assert!(matches!(
        detect_shape(&single, "concepts", is_single_concept),
        RawShape::Single(_)
    ));
}

#[test]
fn triple_aliases_canonicalize_identically() {
    let verbose = json!({"head": "A", "relation": "causes", "tail": "B"});
    let terse = json!({"s": "a", "p": "Causes", "o": " b "});

    let left = normalize_triples(&verbose);
    let right = normalize_triples(&terse);
    assert_eq!(left, right);
    assert_eq!(
        left.iter().next().map(Triple::key).as_deref(),
        Some("a||causes||b")
    );
}

#[test]
fn triples_accept_wrapper_and_list_shapes() {
    let wrapper = json!({"triples": [
        {"subject": "CPU", "predicate": "executes", "object": "Instructions"},
        {"source": "cpu", "rel": "EXECUTES", "target": "instructions"},
        {"head": "RAM", "relation": "stores", "tail": "data"}
    ]});
    assert_eq!(normalize_triples(&wrapper).len(), 2);

    let list = json!([["Cache", "speeds up", "Access"], ["too", "short"]]);
    assert_eq!(
        normalize_triples(&list),
        BTreeSet::from([triple("cache", "speeds up", "access")])
    );
}

#[test]
fn triples_keep_partial_roles_but_drop_all_empty() {
    let raw = json!([
        {"s": "", "p": "  ", "o": ""},
        {"s": "Only subject"},
        {"s": 5, "p": "is", "o": "number"}
    ]);

    let triples = normalize_triples(&raw);
    assert!(triples.contains(&triple("only subject", "", "")));
    assert!(triples.contains(&triple("", "is", "number")));
    assert_eq!(triples.len(), 2);
}

#[test]
fn single_triple_requires_all_three_roles() {
    assert_eq!(
        normalize_triples(&json!({"subject": "x", "predicate": "y", "object": "z"})).len(),
        1
    );
    assert!(normalize_triples(&json!({"subject": "x", "predicate": "y"})).is_empty());
}

#[test]
fn triple_key_round_trips_through_from_key() {
    let original = triple("Sorting", "has complexity", "n log n");
    assert_eq!(Triple::from_key(&original.key()), Some(original));
    assert_eq!(Triple::from_key("no separators"), None);
    assert_eq!(Triple::from_key("||||"), None);
}

#[test]
fn separator_inside_a_role_still_round_trips() {
    let split = triple("a||b", "r", "c|");
    assert_eq!(split.subject, "a b");
    assert_eq!(split.object, "c");
    assert_eq!(Triple::from_key(&split.key()), Some(split.clone()));

    let normalized = normalize_triples(&json!([{"s": "a||b", "p": "r", "o": "c|"}]));
    let fused_back = normalized
        .iter()
        .filter_map(|item| Triple::from_key(&item.key()))
        .collect::<TripleSet>();
    assert_eq!(fused_back, normalized);
    assert!(normalized.contains(&split));
}

#[test]
fn pairwise_jaccard_matches_worked_example() {
    let model1 = concepts(&["x", "y"]);
    let model2 = concepts(&["y", "z"]);
    let score = pairwise_jaccard(&model1, &model2);
    assert!((score - 1.0 / 3.0).abs() < 1e-12);
    assert_eq!(score, pairwise_jaccard(&model2, &model1));
}

#[test]
fn empty_sets_score_differently_per_call_site() {
    let empty = ConceptSet::new();
    assert_eq!(pairwise_jaccard(&empty, &empty), 0.0);
    assert_eq!(reference_jaccard(&empty, &empty), 1.0);
    assert_eq!(reference_jaccard(&empty, &concepts(&["a"])), 0.0);

    let nonempty = concepts(&["a", "b"]);
    assert_eq!(pairwise_jaccard(&nonempty, &nonempty), 1.0);
    assert_eq!(reference_jaccard(&nonempty, &nonempty), 1.0);
}

#[test]
fn pairwise_triple_f1_is_zero_when_either_side_is_empty() {
    let some = BTreeSet::from([triple("a", "b", "c")]);
    let none = TripleSet::new();
    assert_eq!(pairwise_triple_f1(&some, &none), 0.0);
    assert_eq!(pairwise_triple_f1(&none, &none), 0.0);
    assert_eq!(pairwise_triple_f1(&some, &some), 1.0);
}

#[test]
fn pairwise_triple_f1_uses_harmonic_mean_of_overlap_ratios() {
    let left = BTreeSet::from([triple("a", "r", "b"), triple("c", "r", "d")]);
    let right = BTreeSet::from([
        triple("a", "r", "b"),
        triple("e", "r", "f"),
        triple("g", "r", "h"),
        triple("i", "r", "j"),
    ]);

    // precision 1/2, recall 1/4
    let expected = 2.0 * 0.5 * 0.25 / 0.75;
    assert!((pairwise_triple_f1(&left, &right) - expected).abs() < 1e-12);
}

#[test]
fn reference_prf_both_empty_is_perfect() {
    let none = TripleSet::new();
    let scores = reference_precision_recall(&none, &none);
    assert_eq!((scores.precision, scores.recall, scores.f1), (1.0, 1.0, 1.0));
}

#[test]
fn reference_prf_empty_reference_has_vacuous_recall() {
    let reference = TripleSet::new();
    let candidate = BTreeSet::from([triple("a", "b", "c")]);
    let scores = reference_precision_recall(&reference, &candidate);
    assert_eq!(scores.precision, 0.0);
    assert_eq!(scores.recall, 1.0);
    assert_eq!(scores.f1, 0.0);
}

#[test]
fn reference_prf_empty_candidate_has_vacuous_precision() {
    let reference = BTreeSet::from([triple("a", "b", "c")]);
    let candidate = TripleSet::new();
    let scores = reference_precision_recall(&reference, &candidate);
    assert_eq!(scores.precision, 1.0);
    assert_eq!(scores.recall, 0.0);
    assert_eq!(scores.f1, 0.0);
}

#[test]
fn reference_prf_is_asymmetric() {
    let reference = BTreeSet::from([triple("a", "r", "b")]);
    let candidate = BTreeSet::from([triple("a", "r", "b"), triple("x", "r", "y")]);
    let scores = reference_precision_recall(&reference, &candidate);
    assert_eq!(scores.precision, 0.5);
    assert_eq!(scores.recall, 1.0);
    assert!((scores.f1 - 2.0 / 3.0).abs() < 1e-12);
}

#[test]
fn content_gate_forces_zero_below_thresholds() {
    let thresholds = ContentThresholds::default();
    let single = Annotation {
        concepts: concepts(&["x"]),
        triples: TripleSet::new(),
    };
    let scores = gated_pair_scores(&single, &single, thresholds);
    assert_eq!(scores.concept_jaccard, 0.0);
    assert_eq!(scores.triple_f1, 0.0);

    let relaxed = ContentThresholds {
        min_concepts: 1,
        min_triples: 0,
    };
    let scores = gated_pair_scores(&single, &single, relaxed);
    assert_eq!(scores.concept_jaccard, 1.0);
    assert_eq!(scores.triple_f1, 0.0);
}

#[test]
fn evaluate_combines_reference_metrics() {
    let reference = Annotation {
        concepts: concepts(&["a", "b"]),
        triples: BTreeSet::from([triple("a", "r", "b")]),
    };
    let candidate = Annotation {
        concepts: concepts(&["a"]),
        triples: BTreeSet::from([triple("a", "r", "b")]),
    };

    let scores = evaluate(&candidate, &reference);
    assert_eq!(scores.concept_jaccard, 0.5);
    assert_eq!(scores.triples.f1, 1.0);
}

#[test]
fn fuse_keeps_items_with_quorum_support() {
    let per_model_concepts = BTreeMap::from([
        ("m1".to_string(), concepts(&["A", "B"])),
        ("m2".to_string(), concepts(&["B", "C"])),
        ("m3".to_string(), concepts(&["B", "D"])),
    ]);
    let fused = fuse(&per_model_concepts, &BTreeMap::new(), DEFAULT_QUORUM);
    assert_eq!(fused.concepts, vec!["B".to_string()]);
    assert!(fused.triples.is_empty());
}

#[test]
fn quorum_boundary_includes_exactly_two_votes() {
    let sets = [concepts(&["a", "b"]), concepts(&["a", "c"]), concepts(&[])];
    assert_eq!(quorum_vote(sets.iter(), 2), vec!["a".to_string()]);
    assert_eq!(
        quorum_vote(sets.iter(), 1),
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
    assert!(quorum_vote(sets.iter(), 3).is_empty());
}

#[test]
fn fuse_with_single_contributing_model_is_empty() {
    let per_model_triples = BTreeMap::from([
        ("m1".to_string(), BTreeSet::from([triple("a", "b", "c")])),
        ("m2".to_string(), TripleSet::new()),
    ]);
    let fused = fuse(&BTreeMap::new(), &per_model_triples, 2);
    assert!(fused.triples.is_empty());
}

#[test]
fn fused_output_is_sorted() {
    let per_model_concepts = BTreeMap::from([
        ("m1".to_string(), concepts(&["zeta", "alpha", "mu"])),
        ("m2".to_string(), concepts(&["mu", "zeta", "alpha"])),
    ]);
    let fused = fuse(&per_model_concepts, &BTreeMap::new(), 2);
    assert_eq!(fused.concepts, vec!["alpha", "mu", "zeta"]);
}

#[test]
fn trailing_index_reads_last_number() {
    assert_eq!(trailing_index("Lecture 12"), Some(12));
    assert_eq!(trailing_index("Slide_07.json"), Some(7));
    assert_eq!(trailing_index("v2 Slide44"), Some(44));
    assert_eq!(trailing_index("Intro"), None);
}

#[test]
fn indexed_names_sort_numerically_with_unnumbered_last() {
    let mut names = vec![
        "Lecture 10".to_string(),
        "Appendix".to_string(),
        "Lecture 2".to_string(),
        "Lecture 1".to_string(),
    ];
    sort_indexed_names(&mut names);
    assert_eq!(names, vec!["Lecture 1", "Lecture 2", "Lecture 10", "Appendix"]);
}

#[test]
fn mean_accumulator_guards_empty_groups() {
    let empty = MeanAccumulator::default();
    assert_eq!(empty.mean(), 0.0);
    assert_eq!(empty.count(), 0);

    let mut filled = MeanAccumulator::default();
    filled.add(0.5);
    filled.add(1.0);
    assert_eq!(filled.mean(), 0.75);
}

#[test]
fn tally_by_weights_every_row_equally() {
    let rows = vec![("l1", 1.0), ("l1", 0.0), ("l1", 0.5), ("l2", 1.0)];
    let per_lecture = tally_by(&rows, |row| row.0, |row| (row.1, row.1));
    assert_eq!(per_lecture["l1"].concept.mean(), 0.5);
    assert_eq!(per_lecture["l2"].slides(), 1);

    let global = tally_by(&rows, |_| (), |row| (row.1, row.1));
    assert_eq!(global[&()].concept.mean(), 0.625);
}
