//! Patterns: the unit of knowledge held by a [`crate::store::PatternStore`].
//!
//! A pattern pairs a light structural fingerprint of an abstract problem class
//! (`structure_type` plus `key_features`) with a reference to an abstract solution
//! and the concrete instantiations where the pair has been seen. Field names match
//! the persisted library document bit for bit.
//!
//! # Citations
//! - Alexander et al., "A Pattern Language" (1977) – problem / context / solution triples
//! - Gamma et al., "Design Patterns" (1994) – known uses as part of a pattern

use crate::core::{GoalType, Label, Problem};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Prefix marking a key feature as a pseudo relation type rather than an entity type.
pub const RELATION_FEATURE_PREFIX: &str = "relation:";

/// Lightweight structural description of the problem class a pattern solves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractProblem {
    /// Classification label, e.g. `recursive_decomposition` or `find:fixed_point`.
    #[serde(default)]
    pub structure_type: Label,
    /// Declared structural features, order preserved.
    #[serde(default)]
    pub key_features: IndexSet<Label>,
    /// Explicit goal class; inferred from other fields when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_class: Option<GoalType>,
}

impl AbstractProblem {
    /// Creates an abstract problem from a classification label and key features.
    pub fn new<I, S>(structure_type: impl Into<Label>, key_features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Label>,
    {
        Self {
            structure_type: structure_type.into(),
            key_features: key_features.into_iter().map(Into::into).collect(),
            goal_class: None,
        }
    }

    /// Returns the abstract problem with an explicit goal class.
    pub fn with_goal_class(mut self, goal: GoalType) -> Self {
        self.goal_class = Some(goal);
        self
    }
}

/// Reference to a [`crate::solution::Solution`] by id, resolved lazily by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SolutionRef {
    /// Id of the referenced solution.
    pub solution_id: String,
}

/// One concrete, domain-specific realization of a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instantiation {
    /// Domain name, e.g. `algorithms`.
    pub domain: String,
    /// The concrete problem, in domain terms.
    pub concrete_problem: String,
    /// The concrete solution, in domain terms.
    pub concrete_solution: String,
    /// How abstract roles map onto domain objects.
    #[serde(default)]
    pub mapping_notes: String,
}

impl Instantiation {
    /// Creates an instantiation.
    pub fn new(
        domain: impl Into<String>,
        concrete_problem: impl Into<String>,
        concrete_solution: impl Into<String>,
        mapping_notes: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            concrete_problem: concrete_problem.into(),
            concrete_solution: concrete_solution.into(),
            mapping_notes: mapping_notes.into(),
        }
    }
}

/// A reusable abstract pattern.
///
/// Patterns are values: the store replaces them wholesale and never edits one in
/// place. The builder methods below consume and return `self`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Identifier, unique within a store.
    pub id: String,
    /// Display name.
    pub name: String,
    /// What the pattern is about.
    #[serde(default)]
    pub description: String,
    /// Structural fingerprint used for matching.
    #[serde(default)]
    pub abstract_problem: AbstractProblem,
    /// Solution reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_solution: Option<SolutionRef>,
    /// Known instantiations, in discovery order.
    #[serde(default)]
    pub instantiations: Vec<Instantiation>,
    /// Ids of related patterns.
    #[serde(default)]
    pub related_patterns: IndexSet<String>,
    /// Tags.
    #[serde(default)]
    pub tags: IndexSet<Label>,
    /// Full reference problem, when the author supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem: Option<Problem>,
}

impl Pattern {
    /// Creates a pattern with only an id and a name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            abstract_problem: AbstractProblem::default(),
            abstract_solution: None,
            instantiations: Vec::new(),
            related_patterns: IndexSet::new(),
            tags: IndexSet::new(),
            problem: None,
        }
    }

    /// Returns the pattern with a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Returns the pattern with an abstract problem.
    pub fn with_abstract_problem(mut self, abstract_problem: AbstractProblem) -> Self {
        self.abstract_problem = abstract_problem;
        self
    }

    /// Returns the pattern referring to solution `solution_id`.
    pub fn with_solution(mut self, solution_id: impl Into<String>) -> Self {
        self.abstract_solution = Some(SolutionRef {
            solution_id: solution_id.into(),
        });
        self
    }

    /// Returns the pattern with one more instantiation appended.
    pub fn with_instantiation(mut self, instantiation: Instantiation) -> Self {
        self.instantiations.push(instantiation);
        self
    }

    /// Returns the pattern with additional related pattern ids.
    pub fn with_related<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related_patterns.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Returns the pattern with additional tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Label>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Returns the pattern with a full reference problem.
    pub fn with_problem(mut self, problem: Problem) -> Self {
        self.problem = Some(problem);
        self
    }

    /// Id of the referenced solution, if any.
    pub fn solution_id(&self) -> Option<&str> {
        self.abstract_solution
            .as_ref()
            .map(|s| s.solution_id.as_str())
    }

    /// Domains with at least one known instantiation.
    pub fn domains_covered(&self) -> BTreeSet<&str> {
        self.instantiations
            .iter()
            .map(|i| i.domain.as_str())
            .collect()
    }

    /// Goal class the pattern is meant for.
    ///
    /// Taken from, in order: the explicit `goal_class`, the goal of the reference
    /// problem, and the `structure_type` label (see [`infer_goal_class`]).
    pub fn goal_class(&self) -> Option<GoalType> {
        self.abstract_problem
            .goal_class
            .or_else(|| self.problem.as_ref().and_then(Problem::goal_type))
            .or_else(|| infer_goal_class(self.abstract_problem.structure_type.as_str()))
    }
}

/// Reads a goal class off a structure-type label.
///
/// The whole label, or its leading segment before `:` or `/`, must spell a goal
/// type: `find` and `find:fixed_point` both yield [`GoalType::Find`];
/// `recursive_decomposition` yields nothing.
pub fn infer_goal_class(structure_type: &str) -> Option<GoalType> {
    let head = structure_type.split([':', '/']).next().unwrap_or_default();
    GoalType::parse(head.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Goal, Structure};

    #[test]
    fn goal_class_from_structure_type() {
        assert_eq!(infer_goal_class("find"), Some(GoalType::Find));
        assert_eq!(infer_goal_class("transform/reduction"), Some(GoalType::Transform));
        assert_eq!(infer_goal_class("optimize:greedy"), Some(GoalType::Optimize));
        assert_eq!(infer_goal_class("recursive_decomposition"), None);
        assert_eq!(infer_goal_class(""), None);
    }

    #[test]
    fn explicit_goal_class_wins() {
        let problem = Problem::new("p", "P", Structure::empty())
            .with_goal(Goal::new(GoalType::Prove, "x", "x holds"));
        let p = Pattern::new("pat", "Pat")
            .with_abstract_problem(AbstractProblem::new("find", ["a"]).with_goal_class(GoalType::Construct))
            .with_problem(problem.clone());
        assert_eq!(p.goal_class(), Some(GoalType::Construct));

        let p = Pattern::new("pat", "Pat")
            .with_abstract_problem(AbstractProblem::new("find", ["a"]))
            .with_problem(problem);
        assert_eq!(p.goal_class(), Some(GoalType::Prove));
    }

    #[test]
    fn minimal_document_uses_defaults() {
        let p: Pattern = serde_json::from_str(r#"{"id":"pat-x","name":"X"}"#).unwrap();
        assert!(p.instantiations.is_empty());
        assert!(p.tags.is_empty());
        assert!(p.related_patterns.is_empty());
        assert_eq!(p.solution_id(), None);
        assert_eq!(p.goal_class(), None);
    }

    #[test]
    fn instantiation_order_is_preserved() {
        let p = Pattern::new("pat-dac", "Divide and Conquer")
            .with_instantiation(Instantiation::new("algorithms", "sort", "merge sort", ""))
            .with_instantiation(Instantiation::new("mathematics", "DFT", "FFT", ""))
            .with_instantiation(Instantiation::new("algorithms", "multiply", "Karatsuba", ""));
        let domains: Vec<_> = p.instantiations.iter().map(|i| i.domain.as_str()).collect();
        assert_eq!(domains, vec!["algorithms", "mathematics", "algorithms"]);
        assert_eq!(p.domains_covered().len(), 2);
    }
}
