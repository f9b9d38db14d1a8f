//! Feature extraction: the normalized summary the matcher compares.
//!
//! Extraction walks a problem's structure once and produces type multisets, a tag
//! set, the goal type and the declared structural features. Patterns go through
//! the same extractor; the store caches their feature sets so that matching never
//! re-walks a stored structure.
//!
//! Extraction is total: missing optional data yields empty containers, never an
//! error.

use crate::core::{GoalType, Label, Problem};
use crate::pattern::{Pattern, RELATION_FEATURE_PREFIX};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Comparable summary of a problem or pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Entity type multiset.
    pub entity_types: BTreeMap<Label, usize>,
    /// Relation type multiset.
    pub relation_types: BTreeMap<Label, usize>,
    /// Goal type, or the goal class a pattern is meant for.
    pub goal_type: Option<GoalType>,
    /// Explicit tags plus tags derived from boolean-`true` entity properties.
    pub tags: BTreeSet<Label>,
    /// Classification label (patterns only).
    pub structure_type: Option<Label>,
    /// Detected or declared structural features.
    pub structural_features: BTreeSet<Label>,
}

impl FeatureSet {
    /// Returns `true` when no signal at all is present.
    pub fn is_empty(&self) -> bool {
        self.entity_types.is_empty()
            && self.relation_types.is_empty()
            && self.goal_type.is_none()
            && self.tags.is_empty()
    }

    /// Distinct entity types.
    pub fn entity_type_keys(&self) -> BTreeSet<&Label> {
        self.entity_types.keys().collect()
    }

    /// Distinct relation types.
    pub fn relation_type_keys(&self) -> BTreeSet<&Label> {
        self.relation_types.keys().collect()
    }

    fn absorb_problem(&mut self, problem: &Problem) {
        for entity in problem.structure.entities() {
            *self
                .entity_types
                .entry(entity.entity_type.clone())
                .or_insert(0) += 1;
            for (key, value) in &entity.properties {
                if value.is_true() {
                    self.tags.insert(property_tag(key));
                }
            }
        }
        for relation in problem.structure.relations() {
            *self
                .relation_types
                .entry(relation.relation_type.clone())
                .or_insert(0) += 1;
        }
        self.tags.extend(problem.tags.iter().cloned());
        self.structural_features
            .extend(problem.structural_features().into_iter().map(Label::from));
    }
}

/// Tag derived from a boolean-`true` property: `contractive` becomes
/// `has_contractive_map`, whatever the type of the entity carrying it.
pub fn property_tag(key: &str) -> Label {
    Label::from(format!("has_{}_map", key))
}

/// Anything the matcher can summarize.
pub trait FeatureSource {
    /// Computes the feature set. Must be pure.
    fn features(&self) -> FeatureSet;
}

impl FeatureSource for Problem {
    fn features(&self) -> FeatureSet {
        let mut fs = FeatureSet {
            goal_type: self.goal_type(),
            ..FeatureSet::default()
        };
        fs.absorb_problem(self);
        fs
    }
}

impl FeatureSource for Pattern {
    /// With a reference problem the pattern is summarized from that problem's
    /// structure. Without one, key features stand in for entity types, and key
    /// features written `relation:<type>` stand in for relation types.
    fn features(&self) -> FeatureSet {
        let mut fs = FeatureSet {
            goal_type: self.goal_class(),
            ..FeatureSet::default()
        };
        match &self.problem {
            Some(problem) => fs.absorb_problem(problem),
            None => {
                for feature in &self.abstract_problem.key_features {
                    match feature.as_str().strip_prefix(RELATION_FEATURE_PREFIX) {
                        Some(relation) => {
                            *fs.relation_types.entry(Label::new(relation)).or_insert(0) += 1
                        }
                        None => *fs.entity_types.entry(feature.clone()).or_insert(0) += 1,
                    }
                }
            }
        }
        fs.tags.extend(self.tags.iter().cloned());
        fs.structural_features
            .extend(self.abstract_problem.key_features.iter().cloned());
        let structure_type = &self.abstract_problem.structure_type;
        if !structure_type.as_str().is_empty() {
            fs.structure_type = Some(structure_type.clone());
        }
        fs
    }
}

/// Extracts the feature set of a problem or pattern.
pub fn extract<S: FeatureSource + ?Sized>(source: &S) -> FeatureSet {
    source.features()
}
