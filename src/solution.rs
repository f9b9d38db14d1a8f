//! Abstract solutions: `(Preconditions, Transformation, Postconditions)`.
//!
//! A solution says *what* to do at the abstract level. Patterns refer to solutions
//! by id so that one solution can back several patterns without being copied.
//! Postconditions are asserted by the author of the solution; nothing here proves
//! that they imply any problem's goal.

use crate::core::{ConstraintType, Label, Problem, Properties};
use crate::features::property_tag;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A named structural shape the problem must exhibit, with optional parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralPrecondition {
    /// Structural feature or tag name, e.g. `recursive_decomposability`.
    pub name: Label,
    /// Free-form parameters of the shape.
    #[serde(default)]
    pub params: Properties,
}

impl StructuralPrecondition {
    /// Creates a precondition without parameters.
    pub fn named(name: impl Into<Label>) -> Self {
        Self {
            name: name.into(),
            params: Properties::new(),
        }
    }
}

/// What a problem must offer before the solution applies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preconditions {
    /// Required structural features or tags.
    #[serde(default)]
    pub structural: Vec<StructuralPrecondition>,
    /// Constraint types the problem must declare at least once.
    #[serde(default)]
    pub constraint_types: IndexSet<ConstraintType>,
}

/// Catalog of abstract operations (morphisms) a step may apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Split into parts.
    Decompose,
    /// Combine parts.
    Compose,
    /// Map to another form.
    Transform,
    /// Shrink to a simpler instance.
    Reduce,
    /// Look for an element.
    Search,
    /// Iterate to a fixed point.
    Fix,
    /// Move to the dual formulation.
    Dualize,
    /// Move to a more general setting.
    Lift,
    /// Move to a more specific setting.
    Project,
    /// Partition into classes.
    Classify,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Decompose => "decompose",
            Operation::Compose => "compose",
            Operation::Transform => "transform",
            Operation::Reduce => "reduce",
            Operation::Search => "search",
            Operation::Fix => "fix",
            Operation::Dualize => "dualize",
            Operation::Lift => "lift",
            Operation::Project => "project",
            Operation::Classify => "classify",
        };
        f.write_str(name)
    }
}

/// One step of an abstract transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Operation applied.
    pub operation: Operation,
    /// Operation arguments.
    #[serde(default)]
    pub args: Properties,
    /// Name bound to the step's result, if any.
    #[serde(default)]
    pub binds: Option<String>,
    /// Why the step is there.
    #[serde(default)]
    pub rationale: String,
}

impl Step {
    /// Creates a step with no arguments.
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            args: Properties::new(),
            binds: None,
            rationale: String::new(),
        }
    }

    /// Returns the step binding its result to `name`.
    pub fn binds(mut self, name: impl Into<String>) -> Self {
        self.binds = Some(name.into());
        self
    }

    /// Returns the step with a rationale.
    pub fn because(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }
}

/// How the steps of a transformation are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositionType {
    /// One after another.
    #[default]
    Sequential,
    /// Independently.
    Parallel,
    /// Depending on a condition.
    Conditional,
    /// Repeated until a condition holds.
    Iterative,
}

/// Ordered steps plus their composition mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    /// Steps in execution order.
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Composition mode.
    #[serde(default)]
    pub composition_type: CompositionType,
}

/// What the solution guarantees afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Postcondition {
    /// Predicate that holds afterwards, opaque text.
    pub predicate: String,
    /// Under which assumptions it holds.
    #[serde(default)]
    pub guarantee: String,
}

/// Provenance and composition hints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionMetadata {
    /// Domains the solution was first found in.
    #[serde(default)]
    pub discovered_in: IndexSet<String>,
    /// Complexity note, e.g. `O(n log n)`.
    #[serde(default)]
    pub complexity: String,
    /// Pattern ids this solution composes with.
    #[serde(default)]
    pub composable_with: IndexSet<String>,
}

/// An abstract solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Identifier referenced by patterns.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Applicability conditions.
    #[serde(default)]
    pub preconditions: Preconditions,
    /// Abstract steps.
    #[serde(default)]
    pub transformation: Transformation,
    /// Guarantees.
    #[serde(default)]
    pub postconditions: Vec<Postcondition>,
    /// Provenance.
    #[serde(default)]
    pub metadata: SolutionMetadata,
}

impl Solution {
    /// Creates a solution with empty preconditions, steps and metadata.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            preconditions: Preconditions::default(),
            transformation: Transformation::default(),
            postconditions: Vec::new(),
            metadata: SolutionMetadata::default(),
        }
    }

    /// Lists the preconditions `problem` does not satisfy.
    ///
    /// A structural precondition is met when its name is one of the problem's
    /// structural features, explicit tags, or property-derived tags. A required
    /// constraint type is met when the problem declares a constraint of that type;
    /// unmet ones are reported as `constraint:<type>`.
    pub fn unmet_preconditions(&self, problem: &Problem) -> Vec<String> {
        let mut offered: BTreeSet<String> = problem
            .structural_features()
            .into_iter()
            .map(str::to_string)
            .collect();
        offered.extend(problem.tags.iter().map(|t| t.to_string()));
        for entity in problem.structure.entities() {
            for (key, value) in &entity.properties {
                if value.is_true() {
                    offered.insert(property_tag(key).to_string());
                }
            }
        }

        let mut unmet: Vec<String> = self
            .preconditions
            .structural
            .iter()
            .filter(|p| !offered.contains(p.name.as_str()))
            .map(|p| p.name.to_string())
            .collect();

        let declared: BTreeSet<ConstraintType> = problem
            .constraints
            .iter()
            .map(|c| c.constraint_type)
            .collect();
        unmet.extend(
            self.preconditions
                .constraint_types
                .iter()
                .filter(|t| !declared.contains(t))
                .map(|t| format!("constraint:{}", t)),
        );
        unmet
    }

    /// Returns `true` when every precondition is met by `problem`.
    pub fn matches(&self, problem: &Problem) -> bool {
        self.unmet_preconditions(problem).is_empty()
    }
}
