//! Core data structures for abstract problems.
//!
//! An abstract problem is a triple `(Structure, Constraints, Goal)`: a graph of typed
//! entities and directed relations, opaque constraint descriptions scoped over some of
//! those entities, and an optional goal. Nothing here knows about any concrete domain;
//! the abstraction layer that produces these values lives outside this crate.
//!
//! # Citations
//! - Pólya, "How to Solve It" (1945) – unknown / data / condition decomposition of a problem
//! - Gentner, "Structure-mapping: A theoretical framework for analogy", Cognitive Science (1983)

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use indexmap::IndexSet;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Opaque, cheaply clonable name from an open taxonomy.
///
/// Used for entity types, relation types, tags, structure types and key features.
/// The taxonomy is deliberately open: new types need no recompilation, so these are
/// never modelled as enum variants. Ordering and hashing follow the string content.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(Arc<str>);

impl Label {
    /// Creates a label from any string-like value.
    #[inline]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Returns the label text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Label {
    fn default() -> Self {
        Label::new("")
    }
}

impl Borrow<str> for Label {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Label {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Label {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Label {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&String> for Label {
    fn from(name: &String) -> Self {
        Self::new(name)
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Label::from)
    }
}

/// Primitive value attached to an entity or relation property.
///
/// Boolean `true` properties double as matchable feature flags
/// (see [`crate::features::property_tag`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean flag, e.g. `contractive: true`.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Free text, e.g. `size: "n/2"`.
    Text(String),
}

impl PropertyValue {
    /// Returns `true` only for `Bool(true)`.
    #[inline]
    pub fn is_true(&self) -> bool {
        matches!(self, PropertyValue::Bool(true))
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

/// Property map with deterministic key order.
pub type Properties = BTreeMap<String, PropertyValue>;

/// A node in a problem's structural graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Identifier, unique within the owning [`Structure`].
    pub id: String,
    /// Abstract role: "collection", "element", "operation", ...
    #[serde(rename = "type")]
    pub entity_type: Label,
    /// Matchable feature flags and annotations.
    #[serde(default)]
    pub properties: Properties,
}

impl Entity {
    /// Creates an entity without properties.
    pub fn new(id: impl Into<String>, entity_type: impl Into<Label>) -> Self {
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
            properties: Properties::new(),
        }
    }

    /// Returns the entity with one more property set.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A directed, labelled edge between two entities of the same structure.
///
/// Self-loops are permitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Source entity id.
    pub source: String,
    /// Target entity id.
    pub target: String,
    /// Relation type: "contains", "depends_on", "maps_to", ...
    #[serde(rename = "type")]
    pub relation_type: Label,
    /// Annotations.
    #[serde(default)]
    pub properties: Properties,
}

impl Relation {
    /// Creates a relation without properties.
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relation_type: impl Into<Label>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation_type: relation_type.into(),
            properties: Properties::new(),
        }
    }

    /// Returns the relation with one more property set.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Error raised when a structure violates its construction invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    /// Two entities share the same id.
    DuplicateEntity {
        /// The repeated id.
        id: String,
    },
    /// A relation endpoint names no entity of the structure.
    DanglingEndpoint {
        /// Position of the offending relation.
        relation: usize,
        /// The unresolved entity id.
        endpoint: String,
    },
}

impl fmt::Display for StructureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureError::DuplicateEntity { id } => {
                write!(f, "malformed structure: duplicate entity id `{}`", id)
            }
            StructureError::DanglingEndpoint { relation, endpoint } => write!(
                f,
                "malformed structure: relation #{} references unknown entity `{}`",
                relation, endpoint
            ),
        }
    }
}

impl std::error::Error for StructureError {}

/// Name of the structural feature "some entity type occurs more than once".
pub const FEATURE_RECURSIVE_DECOMPOSABILITY: &str = "recursive_decomposability";
/// Name of the structural feature "entities form one `ordered_before` chain".
pub const FEATURE_LINEAR_CHAIN: &str = "linear_chain";
/// Name of the structural feature "entities form one `contains` tree".
pub const FEATURE_TREE: &str = "tree";
/// Name of the structural feature "the relation graph has a directed cycle".
pub const FEATURE_CYCLE: &str = "cycle";
/// Name of the structural feature "exactly two entity types".
pub const FEATURE_BIPARTITE: &str = "bipartite";

/// All structural features that [`Structure::has_feature`] can detect, in report order.
pub const STRUCTURAL_FEATURES: [&str; 5] = [
    FEATURE_RECURSIVE_DECOMPOSABILITY,
    FEATURE_LINEAR_CHAIN,
    FEATURE_TREE,
    FEATURE_CYCLE,
    FEATURE_BIPARTITE,
];

/// The structural graph of a problem: what is involved, not what must happen.
///
/// # Invariants
/// - Entity ids are unique.
/// - Every relation endpoint resolves to an entity of this structure.
///
/// Both are checked by [`Structure::new`] and on deserialization; there is no
/// other way to build a non-empty structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStructure")]
pub struct Structure {
    entities: Vec<Entity>,
    relations: Vec<Relation>,
}

#[derive(Deserialize)]
struct RawStructure {
    #[serde(default)]
    entities: Vec<Entity>,
    #[serde(default)]
    relations: Vec<Relation>,
}

impl TryFrom<RawStructure> for Structure {
    type Error = StructureError;

    fn try_from(raw: RawStructure) -> Result<Self, Self::Error> {
        Structure::new(raw.entities, raw.relations)
    }
}

impl Structure {
    /// Builds a structure, validating id uniqueness and endpoint resolution.
    pub fn new(entities: Vec<Entity>, relations: Vec<Relation>) -> Result<Self, StructureError> {
        let mut ids: HashSet<&str> = HashSet::with_capacity(entities.len());
        for entity in &entities {
            if !ids.insert(entity.id.as_str()) {
                return Err(StructureError::DuplicateEntity {
                    id: entity.id.clone(),
                });
            }
        }
        for (index, relation) in relations.iter().enumerate() {
            for endpoint in [&relation.source, &relation.target] {
                if !ids.contains(endpoint.as_str()) {
                    return Err(StructureError::DanglingEndpoint {
                        relation: index,
                        endpoint: endpoint.clone(),
                    });
                }
            }
        }
        Ok(Self {
            entities,
            relations,
        })
    }

    /// Creates a structure with no entities and no relations.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the entities in insertion order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Returns the relations in insertion order.
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Returns `true` when the structure has no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Looks up an entity by id.
    pub fn entity(&self, entity_id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == entity_id)
    }

    /// Returns ids of entities connected to `entity_id` in either direction,
    /// optionally restricted to one relation type.
    pub fn neighbors(&self, entity_id: &str, relation_type: Option<&str>) -> Vec<&str> {
        let mut out = Vec::new();
        for r in &self.relations {
            if relation_type.is_some_and(|t| r.relation_type.as_str() != t) {
                continue;
            }
            if r.source == entity_id {
                out.push(r.target.as_str());
            }
            if r.target == entity_id {
                out.push(r.source.as_str());
            }
        }
        out
    }

    /// Distinct entity types.
    pub fn entity_types(&self) -> BTreeSet<Label> {
        self.entities.iter().map(|e| e.entity_type.clone()).collect()
    }

    /// Distinct relation types.
    pub fn relation_types(&self) -> BTreeSet<Label> {
        self.relations
            .iter()
            .map(|r| r.relation_type.clone())
            .collect()
    }

    /// Checks whether the structure exhibits a named structural feature.
    ///
    /// Unknown feature names are reported as absent.
    pub fn has_feature(&self, feature: &str) -> bool {
        match feature {
            FEATURE_RECURSIVE_DECOMPOSABILITY => self.entity_types().len() < self.entities.len(),
            FEATURE_LINEAR_CHAIN => self.spans_entities_with("ordered_before"),
            FEATURE_TREE => self.spans_entities_with("contains"),
            FEATURE_CYCLE => self.has_cycle(),
            FEATURE_BIPARTITE => self.entity_types().len() == 2,
            _ => false,
        }
    }

    /// Returns every structural feature the structure exhibits, in report order.
    pub fn structural_features(&self) -> Vec<&'static str> {
        STRUCTURAL_FEATURES
            .iter()
            .copied()
            .filter(|f| self.has_feature(f))
            .collect()
    }

    fn spans_entities_with(&self, relation_type: &str) -> bool {
        if self.entities.is_empty() {
            return false;
        }
        let count = self
            .relations
            .iter()
            .filter(|r| r.relation_type.as_str() == relation_type)
            .count();
        count == self.entities.len() - 1
    }

    /// Kahn's algorithm over the relation graph; self-loops count as cycles.
    ///
    /// # Citations
    /// - Kahn, "Topological sorting of large networks" (1962)
    fn has_cycle(&self) -> bool {
        if self.relations.is_empty() {
            return false;
        }
        let mut indegree: HashMap<&str, usize> =
            self.entities.iter().map(|e| (e.id.as_str(), 0)).collect();
        let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
        for r in &self.relations {
            successors
                .entry(r.source.as_str())
                .or_default()
                .push(r.target.as_str());
            *indegree.entry(r.target.as_str()).or_insert(0) += 1;
        }

        let mut queue: VecDeque<&str> = self
            .entities
            .iter()
            .map(|e| e.id.as_str())
            .filter(|id| indegree.get(id).copied() == Some(0))
            .collect();
        let mut visited = 0;
        while let Some(v) = queue.pop_front() {
            visited += 1;
            if let Some(succs) = successors.get(v) {
                for &u in succs {
                    if let Some(deg) = indegree.get_mut(u) {
                        *deg -= 1;
                        if *deg == 0 {
                            queue.push_back(u);
                        }
                    }
                }
            }
        }
        visited != self.entities.len()
    }
}

/// Role of a constraint in the problem statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintType {
    /// Must hold throughout the transformation.
    Invariant,
    /// Must hold at the start.
    Precondition,
    /// Limits the problem space.
    Boundary,
}

impl ConstraintType {
    /// Document spelling of this constraint type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConstraintType::Invariant => "invariant",
            ConstraintType::Precondition => "precondition",
            ConstraintType::Boundary => "boundary",
        }
    }
}

impl Default for ConstraintType {
    fn default() -> Self {
        ConstraintType::Invariant
    }
}

impl fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A predicate description scoped over some entities.
///
/// The predicate is opaque text; it is never evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// Human-readable or formal predicate text.
    pub predicate: String,
    /// Entity ids the constraint talks about.
    #[serde(default)]
    pub over: IndexSet<String>,
    /// Role of the constraint.
    #[serde(rename = "type", default)]
    pub constraint_type: ConstraintType,
}

impl Constraint {
    /// Creates a constraint.
    pub fn new<I, S>(predicate: impl Into<String>, over: I, constraint_type: ConstraintType) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            predicate: predicate.into(),
            over: over.into_iter().map(Into::into).collect(),
            constraint_type,
        }
    }
}

/// What kind of answer a problem asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    /// Find an element satisfying a condition.
    Find,
    /// Change the structure from one state to another.
    Transform,
    /// Show that a property holds.
    Prove,
    /// Find the best element by some metric.
    Optimize,
    /// Build a new structure satisfying constraints.
    Construct,
}

impl GoalType {
    /// All goal types, in declaration order.
    pub const ALL: [GoalType; 5] = [
        GoalType::Find,
        GoalType::Transform,
        GoalType::Prove,
        GoalType::Optimize,
        GoalType::Construct,
    ];

    /// Document spelling of this goal type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            GoalType::Find => "find",
            GoalType::Transform => "transform",
            GoalType::Prove => "prove",
            GoalType::Optimize => "optimize",
            GoalType::Construct => "construct",
        }
    }

    /// Parses the document spelling; `None` for anything else.
    pub fn parse(name: &str) -> Option<Self> {
        GoalType::ALL.into_iter().find(|g| g.as_str() == name)
    }
}

impl fmt::Display for GoalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the problem asks to achieve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    /// Kind of answer.
    #[serde(rename = "type")]
    pub goal_type: GoalType,
    /// Entity id or free text naming what is wanted.
    #[serde(default)]
    pub target: String,
    /// Success condition, opaque text.
    #[serde(default)]
    pub predicate: String,
}

impl Goal {
    /// Creates a goal.
    pub fn new(goal_type: GoalType, target: impl Into<String>, predicate: impl Into<String>) -> Self {
        Self {
            goal_type,
            target: target.into(),
            predicate: predicate.into(),
        }
    }
}

/// An abstract problem: structure, constraints and goal.
///
/// Domain-independent. Sorting a list, a fast Fourier transform and splitting a
/// project into work packages can all be the same `Problem`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    /// Identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Entities and relations.
    #[serde(default)]
    pub structure: Structure,
    /// Opaque constraints.
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    /// Goal; `None` means the problem does not constrain its goal type.
    #[serde(default)]
    pub goal: Option<Goal>,
    /// Explicit tags.
    #[serde(default)]
    pub tags: IndexSet<Label>,
}

impl Problem {
    /// Creates a problem with the given structure and nothing else.
    pub fn new(id: impl Into<String>, name: impl Into<String>, structure: Structure) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            structure,
            constraints: Vec::new(),
            goal: None,
            tags: IndexSet::new(),
        }
    }

    /// Returns the problem with a goal.
    pub fn with_goal(mut self, goal: Goal) -> Self {
        self.goal = Some(goal);
        self
    }

    /// Returns the problem with one more constraint.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Returns the problem with additional tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Label>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Goal type, if the problem has a goal.
    pub fn goal_type(&self) -> Option<GoalType> {
        self.goal.as_ref().map(|g| g.goal_type)
    }

    /// Structural features exhibited by the problem's structure.
    pub fn structural_features(&self) -> Vec<&'static str> {
        self.structure.structural_features()
    }
}
