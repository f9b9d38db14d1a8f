//! Proptest generators for analogue data structures
//!
//! Vocabularies are kept small on purpose so that generated problems and
//! patterns overlap often enough for the scores to be interesting.

#![allow(dead_code)]

use analogue::prelude::*;
use proptest::collection::{btree_set, vec};
use proptest::prelude::*;
use proptest::sample::select;

// ============================================================================
// Vocabularies
// ============================================================================

const ENTITY_TYPES: [&str; 6] = ["collection", "element", "operation", "graph", "node", "problem"];
const RELATION_TYPES: [&str; 5] = ["contains", "maps_to", "depends_on", "ordered_before", "adjacent"];
const TAGS: [&str; 8] = [
    "iterative",
    "recursive",
    "convergent",
    "numeric",
    "decomposition",
    "reduction",
    "geometric",
    "has_contractive_map",
];
const FLAGS: [&str; 3] = ["contractive", "monotone", "mutable"];
const STRUCTURE_TYPES: [&str; 6] = [
    "",
    "find:fixed_point",
    "transform:recursive_decomposition",
    "reduction",
    "optimize",
    "prove/induction",
];

pub fn arb_entity_type() -> impl Strategy<Value = &'static str> {
    select(ENTITY_TYPES.to_vec())
}

pub fn arb_relation_type() -> impl Strategy<Value = &'static str> {
    select(RELATION_TYPES.to_vec())
}

pub fn arb_tag() -> impl Strategy<Value = &'static str> {
    select(TAGS.to_vec())
}

pub fn arb_goal_type() -> impl Strategy<Value = GoalType> {
    select(GoalType::ALL.to_vec())
}

// ============================================================================
// Structure Generation
// ============================================================================

/// Parameters for structure generation
#[derive(Debug, Clone)]
pub struct StructureParams {
    pub min_entities: usize,
    pub max_entities: usize,
    pub min_relations: usize,
    pub max_relations: usize,
}

impl Default for StructureParams {
    fn default() -> Self {
        Self {
            min_entities: 0,
            max_entities: 6,
            min_relations: 0,
            max_relations: 8,
        }
    }
}

/// Generate a valid structure: entity ids are `e0..en`, relation endpoints
/// always resolve.
pub fn arb_structure_with(params: StructureParams) -> impl Strategy<Value = Structure> {
    let entity = (arb_entity_type(), prop::option::of(select(FLAGS.to_vec())));
    vec(entity, params.min_entities..=params.max_entities)
        .prop_flat_map(move |entities| {
            let n = entities.len();
            let idx = n.max(1);
            let (lo, hi) = if n == 0 {
                (0, 0)
            } else {
                (params.min_relations, params.max_relations.max(params.min_relations))
            };
            (Just(entities), vec((0..idx, 0..idx, arb_relation_type()), lo..=hi))
        })
        .prop_map(|(entities, relations)| {
            let entities = entities
                .into_iter()
                .enumerate()
                .map(|(i, (ty, flag))| {
                    let entity = Entity::new(format!("e{}", i), ty);
                    match flag {
                        Some(flag) => entity.with_property(flag, true),
                        None => entity,
                    }
                })
                .collect();
            let relations = relations
                .into_iter()
                .map(|(s, t, ty)| Relation::new(format!("e{}", s), format!("e{}", t), ty))
                .collect();
            Structure::new(entities, relations).expect("generated endpoints resolve")
        })
}

pub fn arb_structure() -> impl Strategy<Value = Structure> {
    arb_structure_with(StructureParams::default())
}

// ============================================================================
// Problem / Pattern Generation
// ============================================================================

pub fn arb_problem() -> impl Strategy<Value = Problem> {
    (
        arb_structure(),
        prop::option::of(arb_goal_type()),
        btree_set(arb_tag(), 0..4),
    )
        .prop_map(|(structure, goal, tags)| {
            let problem = Problem::new("query", "Query", structure).with_tags(tags);
            match goal {
                Some(g) => problem.with_goal(Goal::new(g, "e0", "")),
                None => problem,
            }
        })
}

/// A problem with at least one entity, relation and tag, so that every
/// similarity signal has something to compare.
pub fn arb_rich_problem() -> impl Strategy<Value = Problem> {
    let params = StructureParams {
        min_entities: 1,
        max_entities: 5,
        min_relations: 1,
        max_relations: 6,
    };
    (
        arb_structure_with(params),
        prop::option::of(arb_goal_type()),
        btree_set(arb_tag(), 1..4),
    )
        .prop_map(|(structure, goal, tags)| {
            let problem = Problem::new("rich", "Rich", structure).with_tags(tags);
            match goal {
                Some(g) => problem.with_goal(Goal::new(g, "e0", "")),
                None => problem,
            }
        })
}

fn arb_key_feature() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_entity_type().prop_map(String::from),
        arb_relation_type().prop_map(|r| format!("relation:{}", r)),
    ]
}

pub fn arb_pattern() -> impl Strategy<Value = Pattern> {
    (
        "[a-z]{1,8}",
        select(STRUCTURE_TYPES.to_vec()),
        vec(arb_key_feature(), 0..5),
        vec(arb_tag(), 0..5),
        prop::option::of(arb_problem()),
    )
        .prop_map(|(suffix, structure_type, features, tags, problem)| {
            let pattern = Pattern::new(format!("pat-{}", suffix), suffix)
                .with_abstract_problem(AbstractProblem::new(structure_type, features))
                .with_tags(tags);
            match problem {
                Some(p) => pattern.with_problem(p),
                None => pattern,
            }
        })
}

/// Generate a library of patterns with distinct ids.
pub fn arb_library(max: usize) -> impl Strategy<Value = Vec<Pattern>> {
    vec(arb_pattern(), 0..=max).prop_map(|patterns| {
        let mut seen = std::collections::HashSet::new();
        patterns
            .into_iter()
            .filter(|p| seen.insert(p.id.clone()))
            .collect()
    })
}

/// A single weight: usually small, sometimes huge but summable four times.
fn arb_weight() -> impl Strategy<Value = f64> {
    prop_oneof![4 => 0.0..1.0f64, 1 => 1e300..1e307f64]
}

/// Weights that pass validation, including very large magnitudes.
pub fn arb_weights() -> impl Strategy<Value = ScoringWeights> {
    (arb_weight(), arb_weight(), arb_weight(), arb_weight())
        .prop_map(|(t, e, r, g)| ScoringWeights::new(t, e, r, g))
        .prop_filter("positive total weight", |w| w.total() > 1e-6)
}

fn arb_extreme_weight() -> impl Strategy<Value = f64> {
    prop_oneof![0.0..1.0f64, 1e300..f64::MAX, Just(f64::MAX)]
}

/// Finite, non-negative weights up to `f64::MAX`, whose sum may overflow.
pub fn arb_extreme_weights() -> impl Strategy<Value = ScoringWeights> {
    (arb_extreme_weight(), arb_extreme_weight(), arb_extreme_weight(), arb_extreme_weight())
        .prop_map(|(t, e, r, g)| ScoringWeights::new(t, e, r, g))
}
