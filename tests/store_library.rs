//! Integration tests for the pattern store against the fixture library

use analogue::prelude::*;
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

const LIBRARY: &str = include_str!("fixtures/library.json");

fn library() -> PatternStore {
    let store = PatternStore::new();
    let report = store.load_str(LIBRARY).unwrap();
    assert!(report.is_clean(), "fixture rejected: {:?}", report.rejected);
    store
}

fn pagerank() -> Problem {
    let structure = Structure::new(
        vec![
            Entity::new("scores", "element"),
            Entity::new("update_rule", "operation").with_property("contractive", true),
        ],
        vec![Relation::new("update_rule", "scores", "maps_to")],
    )
    .unwrap();
    Problem::new("pagerank", "PageRank", structure)
        .with_goal(Goal::new(GoalType::Find, "scores", "update_rule(scores) = scores"))
        .with_tags(["iterative"])
}

fn closest_pair() -> Problem {
    let structure = Structure::new(
        vec![
            Entity::new("points", "collection"),
            Entity::new("p1", "element"),
            Entity::new("p2", "element"),
        ],
        vec![
            Relation::new("points", "p1", "contains"),
            Relation::new("points", "p2", "contains"),
        ],
    )
    .unwrap();
    Problem::new("closest-pair", "Closest pair of points", structure)
        .with_goal(Goal::new(GoalType::Find, "pair", "minimal distance"))
        .with_tags(["recursive", "geometric"])
}

fn ids(matches: &[Match]) -> Vec<&str> {
    matches.iter().map(|m| m.pattern.id.as_str()).collect()
}

#[test]
fn fixture_loads_completely() {
    let store = library();
    assert_eq!(store.ids(), vec!["pat-divide-conquer", "pat-reduction", "pat-fixedpoint"]);
    assert_eq!(store.get_solution("sol-fixedpoint").unwrap().name, "Iterate to convergence");
    assert_eq!(store.get("pat-divide-conquer").unwrap().instantiations.len(), 4);
}

#[test]
fn pagerank_finds_fixed_point_iteration() {
    let matches = library().find_matches(&pagerank());
    assert_eq!(ids(&matches), vec!["pat-fixedpoint", "pat-reduction", "pat-divide-conquer"]);

    let best = &matches[0];
    assert!((best.score - 0.825).abs() < 1e-9, "score was {}", best.score);
    assert_eq!(best.breakdown.tag, 0.5);
    assert_eq!(best.unmet_preconditions, vec!["constraint:precondition".to_string()]);
    let solutions: Vec<&str> = best
        .instantiations()
        .iter()
        .map(|i| i.concrete_solution.as_str())
        .collect();
    assert!(solutions.contains(&"Newton's method"));
}

#[test]
fn closest_pair_finds_divide_and_conquer() {
    let matches = library().find_matches(&closest_pair());
    assert_eq!(matches[0].pattern.id, "pat-divide-conquer");
    assert!((matches[0].score - 0.57).abs() < 1e-9, "score was {}", matches[0].score);
    assert!(matches[0].unmet_preconditions.is_empty());
}

#[test]
fn threshold_and_limit_from_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("matcher.toml");
    std::fs::write(&path, "threshold = 0.15\nlimit = 1\n").unwrap();
    let cfg = MatchConfig::load_from(&path).unwrap();

    let matches = library().match_problem(&pagerank(), &cfg).unwrap();
    assert_eq!(ids(&matches), vec!["pat-fixedpoint"]);

    let strict = MatchConfig::new().with_threshold(0.9);
    assert!(library().match_problem(&pagerank(), &strict).unwrap().is_empty());
}

#[test]
fn save_load_round_trip_is_exact() {
    let store = library();
    let saved: serde_json::Value = serde_json::from_str(&store.save_string().unwrap()).unwrap();
    let original: serde_json::Value = serde_json::from_str(LIBRARY).unwrap();
    assert_eq!(saved, original);
}

#[test]
fn round_trip_keeps_document_order_of_sets() {
    let document = r#"{
        "patterns": [
            {
                "id": "pat-unsorted",
                "name": "Unsorted",
                "description": "",
                "abstract_problem": {
                    "structure_type": "find:fixed_point",
                    "key_features": ["operation", "element"]
                },
                "instantiations": [],
                "related_patterns": [],
                "tags": ["numeric", "iterative"],
                "problem": {
                    "id": "unsorted-reference",
                    "name": "Unsorted reference",
                    "structure": {
                        "entities": [
                            {"id": "x", "type": "element", "properties": {}},
                            {"id": "f", "type": "operation", "properties": {}}
                        ],
                        "relations": []
                    },
                    "constraints": [
                        {"predicate": "f maps x into itself", "over": ["x", "f"], "type": "invariant"}
                    ],
                    "goal": null,
                    "tags": ["iterative", "geometric"]
                }
            }
        ],
        "solutions": [
            {
                "id": "sol-unsorted",
                "name": "Unsorted solution",
                "preconditions": {
                    "structural": [],
                    "constraint_types": ["precondition", "invariant"]
                },
                "transformation": {
                    "steps": [],
                    "composition_type": "sequential"
                },
                "postconditions": [],
                "metadata": {
                    "discovered_in": ["mathematics", "economics"],
                    "complexity": "",
                    "composable_with": ["pat-unsorted", "pat-reduction"]
                }
            }
        ]
    }"#;
    let store = PatternStore::new();
    let report = store.load_str(document).unwrap();
    assert!(report.is_clean(), "rejected: {:?}", report.rejected);

    let saved: serde_json::Value = serde_json::from_str(&store.save_string().unwrap()).unwrap();
    let original: serde_json::Value = serde_json::from_str(document).unwrap();
    assert_eq!(saved, original);
}

#[test]
fn cbor_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("library.cbor");
    let store = library();
    store.save_path(&path).unwrap();

    let reloaded = PatternStore::new();
    let report = reloaded.load_path(&path, LoadOptions::strict()).unwrap();
    assert_eq!(report.patterns_loaded, 3);
    assert_eq!(report.solutions_loaded, 2);
    assert_eq!(reloaded.fingerprint(), store.fingerprint());
    assert_eq!(reloaded.ids(), store.ids());
}

#[test]
fn json_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("library.json");
    library().save_path(&path).unwrap();
    let reloaded = PatternStore::new();
    reloaded.load_path(&path, LoadOptions::default()).unwrap();
    assert_eq!(reloaded.save_string().unwrap(), library().save_string().unwrap());
}

#[test]
fn best_effort_load_keeps_good_documents() {
    let store = PatternStore::new();
    let report = store
        .load_str(
            r#"[
                {"id": "pat-a", "name": "A"},
                {"name": "no id"},
                {"id": "pat-b", "name": "B", "instantiations": [{"domain": "x"}]},
                {"id": "pat-c", "name": "C", "related_patterns": ["pat-a"]}
            ]"#,
        )
        .unwrap();
    assert_eq!(report.patterns_loaded, 2);
    let positions: Vec<Option<usize>> = report.rejected.iter().map(|e| e.position()).collect();
    assert_eq!(positions, vec![Some(1), Some(2)]);
    assert_eq!(report.rejected[1].identifier(), Some("pat-b"));
    assert_eq!(store.ids(), vec!["pat-a", "pat-c"]);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = PatternStore::new()
        .load_path(std::path::Path::new("/nonexistent/library.json"), LoadOptions::default())
        .unwrap_err();
    assert!(matches!(err, StoreError::Io(_)));
}

#[test]
fn remove_of_unknown_id_changes_nothing() {
    let store = library();
    let before = store.fingerprint();
    assert!(!store.remove("pat-nonexistent"));
    assert_eq!(store.fingerprint(), before);
    assert_eq!(store.len(), 3);
}

#[test]
fn concurrent_matching_during_mutation() {
    let store = Arc::new(library());
    thread::scope(|s| {
        for _ in 0..4 {
            let store = Arc::clone(&store);
            s.spawn(move || {
                for _ in 0..50 {
                    let matches = store.find_matches(&pagerank());
                    assert!(!matches.is_empty());
                    assert!(matches.windows(2).all(|w| w[0].score >= w[1].score));
                    assert_eq!(matches[0].pattern.id, "pat-fixedpoint");
                }
            });
        }
        let writer = Arc::clone(&store);
        s.spawn(move || {
            for i in 0..50 {
                writer.add(Pattern::new(format!("pat-extra-{}", i), "Extra").with_tags(["numeric"]));
                if i % 2 == 0 {
                    writer.remove(&format!("pat-extra-{}", i));
                }
            }
        });
    });
    assert_eq!(store.len(), 3 + 25);
}
