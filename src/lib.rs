//! Analogue: a cross-domain library of abstract problem/solution patterns.
//!
//! This crate stores patterns that pair an abstract problem class with an abstract
//! solution and the concrete places the pair has been seen, and ranks those
//! patterns against a newly stated abstract problem:
//! - A structural model of problems: typed entities, typed relations, constraints and a goal.
//! - A feature extractor that summarizes problems and patterns into comparable feature sets.
//! - A weighted Jaccard matcher producing ranked, explainable matches.
//! - A thread-safe pattern store with JSON/CBOR persistence of the library.
//!
//! # Name Origin: "Analogue"
//!
//! Solving a problem by analogy means recognizing that it has the shape of one
//! already solved somewhere else. Merge sort, the FFT and Karatsuba multiplication
//! are analogues of one another; so are Newton's method and PageRank. The store
//! holds these analogues and the matcher finds them.
//!
//! # References
//!
//! - Pólya, G. "How to Solve It" (1945) – solving by analogy and auxiliary problems
//! - Gentner, D. "Structure-mapping: A theoretical framework for analogy" (1983)
//! - Alexander, C. et al. "A Pattern Language" (1977)
//!
//! # Example
//!
//! ```
//! use analogue::prelude::*;
//!
//! let store = PatternStore::new();
//! store.add(
//!     Pattern::new("pat-fixedpoint", "Fixed Point Iteration")
//!         .with_abstract_problem(AbstractProblem::new("find:fixed_point", ["element", "operation"]))
//!         .with_tags(["iterative", "has_contractive_map"]),
//! );
//!
//! let structure = Structure::new(
//!     vec![
//!         Entity::new("scores", "element"),
//!         Entity::new("update", "operation").with_property("contractive", true),
//!     ],
//!     vec![Relation::new("update", "scores", "maps_to")],
//! )
//! .unwrap();
//! let problem = Problem::new("pagerank", "PageRank", structure)
//!     .with_goal(Goal::new(GoalType::Find, "scores", "update(scores) = scores"))
//!     .with_tags(["iterative"]);
//!
//! let matches = store.find_matches(&problem);
//! assert_eq!(matches[0].pattern.id, "pat-fixedpoint");
//! ```

pub mod config;
pub mod core;
pub mod document;
pub mod features;
pub mod fingerprint;
pub mod matcher;
pub mod pattern;
pub mod solution;
pub mod store;

pub use crate::config::{ConfigError, MatchConfig, ScoringWeights};
pub use crate::core::{
    Constraint, ConstraintType, Entity, Goal, GoalType, Label, Problem, PropertyValue, Relation,
    Structure, StructureError,
};
pub use crate::document::{DocumentError, LibraryFormat, LoadOptions, LoadReport};
pub use crate::features::{extract, FeatureSet, FeatureSource};
pub use crate::fingerprint::HashValue;
pub use crate::matcher::{find_matches, Match, Matcher, ScoreBreakdown};
pub use crate::pattern::{AbstractProblem, Instantiation, Pattern, SolutionRef};
pub use crate::solution::{Operation, Solution, Step, StructuralPrecondition};
pub use crate::store::{PatternStore, StoreError};

/// Prelude for convenient usage.
pub mod prelude {
    pub use crate::config::{ConfigError, MatchConfig, ScoringWeights};
    pub use crate::core::{
        Constraint, ConstraintType, Entity, Goal, GoalType, Label, Problem, PropertyValue,
        Relation, Structure, StructureError,
    };
    pub use crate::document::{DocumentError, LibraryFormat, LoadOptions, LoadReport};
    pub use crate::features::{extract, FeatureSet, FeatureSource};
    pub use crate::fingerprint::{library_fingerprint, pattern_fingerprint, HashValue};
    pub use crate::matcher::{find_matches, goal_compatibility, jaccard, Match, Matcher, ScoreBreakdown};
    pub use crate::pattern::{AbstractProblem, Instantiation, Pattern, SolutionRef};
    pub use crate::solution::{
        CompositionType, Operation, Postcondition, Preconditions, Solution, Step,
        StructuralPrecondition, Transformation,
    };
    pub use crate::store::{PatternStore, StoreError};
}
