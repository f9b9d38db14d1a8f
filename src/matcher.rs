//! Similarity scoring and ranking of patterns against a query problem.
//!
//! Matching is a bounded heuristic, not subgraph isomorphism: four independent
//! signals, each in `[0, 1]`, are combined with configurable weights.
//!
//! | Signal   | Definition                                                    |
//! |----------|---------------------------------------------------------------|
//! | tag      | Jaccard index of tag sets                                     |
//! | entity   | Jaccard index of entity *type* sets (counts ignored)          |
//! | relation | Jaccard index of relation *type* sets                         |
//! | goal     | 1 on equal goal classes or both absent, 0.5 if one side is absent, else 0 |
//!
//! Jaccard of two empty sets is 0, not 1: absence of information is not agreement.
//!
//! # Citations
//! - Jaccard, "Étude comparative de la distribution florale dans une portion des Alpes et du Jura" (1901)
//! - Tversky, "Features of similarity", Psychological Review (1977)

use crate::config::{ConfigError, MatchConfig, ScoringWeights};
use crate::core::{GoalType, Label, Problem};
use crate::features::{extract, FeatureSet};
use crate::pattern::{Instantiation, Pattern};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Per-signal similarities behind a score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Tag Jaccard index.
    pub tag: f64,
    /// Entity-type Jaccard index.
    pub entity: f64,
    /// Relation-type Jaccard index.
    pub relation: f64,
    /// Goal compatibility.
    pub goal: f64,
}

impl ScoreBreakdown {
    /// Weighted mean of the signals, clamped to `[0, 1]`.
    ///
    /// The weighted sum is divided by the weight total, so with the default
    /// weights (total 1.0) this is the plain linear combination. Weights that
    /// fail [`ScoringWeights::validate`] yield 0.
    pub fn combine(&self, weights: &ScoringWeights) -> f64 {
        let raw = weights.tag * self.tag
            + weights.entity * self.entity
            + weights.relation * self.relation
            + weights.goal * self.goal;
        let score = raw / weights.total();
        if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 1.0)
        }
    }
}

/// Jaccard index `|A ∩ B| / |A ∪ B|`, defined as 0 when both sets are empty.
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let intersection = a.intersection(b).count();
    ratio(intersection, a.len() + b.len() - intersection)
}

/// Jaccard index over the key sets of two multisets.
pub fn key_jaccard<K: Ord, V>(a: &BTreeMap<K, V>, b: &BTreeMap<K, V>) -> f64 {
    let intersection = a.keys().filter(|k| b.contains_key(*k)).count();
    ratio(intersection, a.len() + b.len() - intersection)
}

fn ratio(intersection: usize, union: usize) -> f64 {
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Goal compatibility between a query goal type and a pattern goal class.
pub fn goal_compatibility(query: Option<GoalType>, candidate: Option<GoalType>) -> f64 {
    match (query, candidate) {
        (None, None) => 1.0,
        (Some(q), Some(c)) if q == c => 1.0,
        (Some(_), Some(_)) => 0.0,
        _ => 0.5,
    }
}

/// A ranked pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// The matched pattern, shared with the store snapshot it came from.
    pub pattern: Arc<Pattern>,
    /// Combined score in `[0, 1]`.
    pub score: f64,
    /// Per-signal similarities.
    pub breakdown: ScoreBreakdown,
    /// Tags shared by query and pattern, sorted.
    pub matched_tags: Vec<Label>,
    /// Solution preconditions the query does not meet. Filled in by the store
    /// when the pattern's solution resolves; empty otherwise.
    pub unmet_preconditions: Vec<String>,
}

impl Match {
    /// Known concrete instantiations of the matched pattern.
    pub fn instantiations(&self) -> &[Instantiation] {
        &self.pattern.instantiations
    }

    /// Returns `true` for a perfect score.
    pub fn is_exact(&self) -> bool {
        self.score >= 1.0
    }
}

/// Scores feature sets and ranks patterns under one validated configuration.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    config: MatchConfig,
}

impl Matcher {
    /// Creates a matcher after validating `config`.
    pub fn new(config: MatchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration in use.
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Computes the four signals for a query/candidate pair.
    pub fn breakdown(&self, query: &FeatureSet, candidate: &FeatureSet) -> ScoreBreakdown {
        ScoreBreakdown {
            tag: jaccard(&query.tags, &candidate.tags),
            entity: key_jaccard(&query.entity_types, &candidate.entity_types),
            relation: key_jaccard(&query.relation_types, &candidate.relation_types),
            goal: goal_compatibility(query.goal_type, candidate.goal_type),
        }
    }

    /// Combined score of a query/candidate pair, in `[0, 1]`.
    pub fn score(&self, query: &FeatureSet, candidate: &FeatureSet) -> f64 {
        self.breakdown(query, candidate)
            .combine(&self.config.weights)
    }

    /// Ranks pre-extracted candidates against a query.
    ///
    /// Candidates scoring strictly below the threshold are dropped; the rest are
    /// sorted by score descending, then by pattern id ascending, then truncated
    /// to the limit.
    pub fn rank<'a, I>(&self, query: &FeatureSet, candidates: I) -> Vec<Match>
    where
        I: IntoIterator<Item = (Arc<Pattern>, &'a FeatureSet)>,
    {
        let mut considered = 0usize;
        let mut matches: Vec<Match> = candidates
            .into_iter()
            .filter_map(|(pattern, features)| {
                considered += 1;
                let breakdown = self.breakdown(query, features);
                let score = breakdown.combine(&self.config.weights);
                if score.is_nan() || score < self.config.threshold {
                    return None;
                }
                Some(Match {
                    pattern,
                    score,
                    breakdown,
                    matched_tags: query.tags.intersection(&features.tags).cloned().collect(),
                    unmet_preconditions: Vec::new(),
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.pattern.id.cmp(&b.pattern.id))
        });
        if let Some(limit) = self.config.limit {
            matches.truncate(limit);
        }
        tracing::debug!(
            considered,
            returned = matches.len(),
            threshold = self.config.threshold,
            "ranked patterns"
        );
        matches
    }

    /// Extracts features from `problem` and every pattern, then ranks.
    pub fn find_matches<I>(&self, problem: &Problem, patterns: I) -> Vec<Match>
    where
        I: IntoIterator<Item = Arc<Pattern>>,
    {
        let query = extract(problem);
        let extracted: Vec<(Arc<Pattern>, FeatureSet)> = patterns
            .into_iter()
            .map(|p| {
                let features = extract(p.as_ref());
                (p, features)
            })
            .collect();
        self.rank(&query, extracted.iter().map(|(p, fs)| (Arc::clone(p), fs)))
    }
}

/// Ranks `patterns` against `problem` under `config`.
///
/// An empty pattern collection yields an empty result. Fails only when the
/// configuration is invalid.
pub fn find_matches<I>(
    problem: &Problem,
    patterns: I,
    config: &MatchConfig,
) -> Result<Vec<Match>, ConfigError>
where
    I: IntoIterator<Item = Arc<Pattern>>,
{
    let matcher = Matcher::new(config.clone())?;
    Ok(matcher.find_matches(problem, patterns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Entity, Goal, Relation, Structure};
    use crate::pattern::AbstractProblem;

    fn labels(items: &[&str]) -> BTreeSet<Label> {
        items.iter().map(|s| Label::new(s)).collect()
    }

    fn tagged_pattern(id: &str, tags: &[&str], structure_type: &str) -> Arc<Pattern> {
        Arc::new(
            Pattern::new(id, id)
                .with_abstract_problem(AbstractProblem::new(structure_type, Vec::<&str>::new()))
                .with_tags(tags.iter().copied()),
        )
    }

    fn contractive_query() -> Problem {
        Problem::new("q", "query", Structure::empty())
            .with_goal(Goal::new(GoalType::Find, "x", "f(x) = x"))
            .with_tags(["iterative", "has_contractive_map"])
    }

    #[test]
    fn jaccard_edge_cases() {
        let empty: BTreeSet<Label> = BTreeSet::new();
        assert_eq!(jaccard(&empty, &empty), 0.0);
        assert_eq!(jaccard(&labels(&["a"]), &empty), 0.0);
        assert_eq!(jaccard(&labels(&["a", "b"]), &labels(&["a", "b"])), 1.0);
        assert_eq!(jaccard(&labels(&["a", "b"]), &labels(&["b", "c"])), 1.0 / 3.0);
    }

    #[test]
    fn key_jaccard_ignores_counts() {
        let a: BTreeMap<Label, usize> = [(Label::new("collection"), 3)].into_iter().collect();
        let b: BTreeMap<Label, usize> = [(Label::new("collection"), 1)].into_iter().collect();
        assert_eq!(key_jaccard(&a, &b), 1.0);
    }

    #[test]
    fn goal_compatibility_table() {
        assert_eq!(goal_compatibility(None, None), 1.0);
        assert_eq!(goal_compatibility(Some(GoalType::Find), Some(GoalType::Find)), 1.0);
        assert_eq!(goal_compatibility(Some(GoalType::Find), Some(GoalType::Transform)), 0.0);
        assert_eq!(goal_compatibility(Some(GoalType::Find), None), 0.5);
        assert_eq!(goal_compatibility(None, Some(GoalType::Prove)), 0.5);
    }

    #[test]
    fn contractive_map_scenario() {
        let pattern = tagged_pattern(
            "pat-fixedpoint",
            &["iterative", "has_contractive_map", "numeric"],
            "find",
        );
        let matches = find_matches(&contractive_query(), [pattern], &MatchConfig::default()).unwrap();
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert!((m.breakdown.tag - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(m.breakdown.entity, 0.0);
        assert_eq!(m.breakdown.relation, 0.0);
        assert_eq!(m.breakdown.goal, 1.0);
        assert!((m.score - 0.3833).abs() < 1e-3, "score was {}", m.score);
        assert_eq!(m.matched_tags, vec![Label::new("has_contractive_map"), Label::new("iterative")]);
    }

    #[test]
    fn self_match_scores_one() {
        let structure = Structure::new(
            vec![Entity::new("x", "element"), Entity::new("f", "operation")],
            vec![Relation::new("f", "x", "maps_to")],
        )
        .unwrap();
        let problem = Problem::new("p", "P", structure)
            .with_goal(Goal::new(GoalType::Find, "x", "f(x) = x"))
            .with_tags(["iterative"]);
        let pattern = Arc::new(
            Pattern::new("pat", "Pat")
                .with_tags(["iterative"])
                .with_problem(problem.clone()),
        );
        let matcher = Matcher::default();
        let m = matcher.find_matches(&problem, [pattern]);
        assert_eq!(m[0].score, 1.0);
        assert!(m[0].is_exact());
    }

    #[test]
    fn empty_query_scores_below_half() {
        let query = Problem::new("q", "", Structure::empty());
        let pattern = tagged_pattern("pat", &["iterative"], "find");
        let m = Matcher::default().find_matches(&query, [pattern]);
        assert!(m[0].score < 0.5);
        assert_eq!(m[0].breakdown.goal, 0.5);
    }

    #[test]
    fn ordering_threshold_and_limit() {
        let patterns = vec![
            tagged_pattern("b", &["iterative"], "find"),
            tagged_pattern("a", &["iterative"], "find"),
            tagged_pattern("c", &["iterative", "has_contractive_map"], "find"),
            tagged_pattern("d", &["unrelated"], "transform"),
        ];
        let matcher = Matcher::new(MatchConfig::new().with_threshold(0.2)).unwrap();
        let ids: Vec<String> = matcher
            .find_matches(&contractive_query(), patterns.clone())
            .into_iter()
            .map(|m| m.pattern.id.clone())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);

        let limited = Matcher::new(MatchConfig::new().with_threshold(0.2).with_limit(2)).unwrap();
        let ids: Vec<String> = limited
            .find_matches(&contractive_query(), patterns)
            .into_iter()
            .map(|m| m.pattern.id.clone())
            .collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[test]
    fn empty_collection_is_not_an_error() {
        let m = find_matches(&contractive_query(), Vec::new(), &MatchConfig::default()).unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = MatchConfig::new().with_weights(ScoringWeights::new(-1.0, 0.0, 0.0, 0.0));
        assert!(find_matches(&contractive_query(), Vec::new(), &cfg).is_err());

        let huge = ScoringWeights::new(f64::MAX, f64::MAX, f64::MAX, f64::MAX);
        let cfg = MatchConfig::new().with_weights(huge).with_threshold(0.5);
        let pattern = tagged_pattern("pat", &["iterative", "has_contractive_map"], "find");
        assert_eq!(
            find_matches(&contractive_query(), [pattern], &cfg),
            Err(ConfigError::NonFiniteTotalWeight)
        );
    }

    #[test]
    fn overflowing_weights_never_score_nan() {
        let huge = ScoringWeights::new(f64::MAX, f64::MAX, f64::MAX, f64::MAX);
        let identical = ScoreBreakdown {
            tag: 1.0,
            entity: 1.0,
            relation: 1.0,
            goal: 1.0,
        };
        assert_eq!(identical.combine(&huge), 0.0);

        let large = ScoringWeights::new(1e307, 1e307, 1e307, 1e307);
        assert_eq!(identical.combine(&large), 1.0);
    }
}
