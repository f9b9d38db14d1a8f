//! Pattern store: the shared, lock-protected pattern library.
//!
//! The store owns patterns keyed by id (last write wins, insertion order kept)
//! together with a precomputed [`FeatureSet`] per pattern, so a match costs one
//! extraction for the query plus cheap set operations per stored pattern.
//!
//! # Concurrency
//!
//! All methods take `&self`. Matching and lookups hold a shared read lock for
//! their whole duration; `add`, `remove` and `load` take the write lock. Loads
//! validate and extract features before locking, then apply everything under a
//! single write lock, so a concurrent match sees either none or all of a load.

use crate::config::{ConfigError, MatchConfig};
use crate::core::Problem;
use crate::document::{self, DocumentError, LibraryFormat, LoadOptions, LoadReport};
use crate::features::{extract, FeatureSet};
use crate::fingerprint::{library_fingerprint, pattern_fingerprint, HashValue};
use crate::matcher::{Match, Matcher};
use crate::pattern::Pattern;
use crate::solution::Solution;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Errors returned by [`PatternStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// No pattern or solution with this id.
    NotFound(String),
    /// The library document could not be read or written.
    Document(DocumentError),
    /// File-system failure.
    Io(String),
    /// The match configuration is invalid.
    Config(ConfigError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "not found: {}", id),
            StoreError::Document(e) => write!(f, "{}", e),
            StoreError::Io(msg) => write!(f, "I/O error: {}", msg),
            StoreError::Config(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<DocumentError> for StoreError {
    fn from(e: DocumentError) -> Self {
        StoreError::Document(e)
    }
}

impl From<ConfigError> for StoreError {
    fn from(e: ConfigError) -> Self {
        StoreError::Config(e)
    }
}

/// A stored pattern with its cached fingerprint and features.
#[derive(Debug, Clone)]
struct Entry {
    pattern: Arc<Pattern>,
    fingerprint: HashValue,
    features: FeatureSet,
}

impl Entry {
    fn build(pattern: Pattern) -> Self {
        let fingerprint = pattern_fingerprint(&pattern);
        let features = extract(&pattern);
        Self {
            pattern: Arc::new(pattern),
            fingerprint,
            features,
        }
    }
}

#[derive(Debug, Default)]
struct Library {
    patterns: IndexMap<String, Entry>,
    solutions: IndexMap<String, Solution>,
}

/// Thread-safe pattern library.
#[derive(Debug, Default)]
pub struct PatternStore {
    inner: RwLock<Library>,
}

impl PatternStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a pattern, replacing any pattern with the same id in place.
    ///
    /// Returns the replaced pattern. Re-adding an unchanged pattern keeps its
    /// cached features.
    pub fn add(&self, pattern: Pattern) -> Option<Arc<Pattern>> {
        let fingerprint = pattern_fingerprint(&pattern);
        let mut lib = self.inner.write();
        if let Some(existing) = lib.patterns.get_mut(&pattern.id) {
            let previous = Arc::clone(&existing.pattern);
            if existing.fingerprint == fingerprint {
                debug!(id = %pattern.id, "pattern unchanged, keeping cached features");
                existing.pattern = Arc::new(pattern);
            } else {
                debug!(id = %pattern.id, "replacing pattern");
                existing.features = extract(&pattern);
                existing.fingerprint = fingerprint;
                existing.pattern = Arc::new(pattern);
            }
            return Some(previous);
        }
        debug!(id = %pattern.id, "adding pattern");
        let features = extract(&pattern);
        lib.patterns.insert(
            pattern.id.clone(),
            Entry {
                pattern: Arc::new(pattern),
                fingerprint,
                features,
            },
        );
        None
    }

    /// Removes a pattern and its cached features. Removing an unknown id is a no-op.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.inner.write().patterns.shift_remove(id).is_some();
        if removed {
            debug!(id, "removed pattern");
        }
        removed
    }

    /// Looks up a pattern.
    pub fn get(&self, id: &str) -> Result<Arc<Pattern>, StoreError> {
        self.inner
            .read()
            .patterns
            .get(id)
            .map(|e| Arc::clone(&e.pattern))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Returns `true` if a pattern with this id is stored.
    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().patterns.contains_key(id)
    }

    /// Number of stored patterns.
    pub fn len(&self) -> usize {
        self.inner.read().patterns.len()
    }

    /// Returns `true` if no pattern is stored.
    pub fn is_empty(&self) -> bool {
        self.inner.read().patterns.is_empty()
    }

    /// Pattern ids in insertion order.
    pub fn ids(&self) -> Vec<String> {
        self.inner.read().patterns.keys().cloned().collect()
    }

    /// Snapshot of all patterns in insertion order.
    pub fn patterns(&self) -> Vec<Arc<Pattern>> {
        self.inner
            .read()
            .patterns
            .values()
            .map(|e| Arc::clone(&e.pattern))
            .collect()
    }

    /// Cached feature set of a stored pattern.
    pub fn features(&self, id: &str) -> Result<FeatureSet, StoreError> {
        self.inner
            .read()
            .patterns
            .get(id)
            .map(|e| e.features.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Ranks stored patterns against `problem` with the default configuration.
    pub fn find_matches(&self, problem: &Problem) -> Vec<Match> {
        self.rank(&Matcher::default(), problem)
    }

    /// Ranks stored patterns against `problem` under `config`.
    ///
    /// Each match carries the preconditions of its pattern's solution that the
    /// problem does not meet; a missing or dangling solution reference leaves
    /// that list empty.
    pub fn match_problem(&self, problem: &Problem, config: &MatchConfig) -> Result<Vec<Match>, StoreError> {
        let matcher = Matcher::new(config.clone())?;
        Ok(self.rank(&matcher, problem))
    }

    fn rank(&self, matcher: &Matcher, problem: &Problem) -> Vec<Match> {
        let lib = self.inner.read();
        let query = extract(problem);
        let mut matches = matcher.rank(
            &query,
            lib.patterns
                .values()
                .map(|e| (Arc::clone(&e.pattern), &e.features)),
        );
        for m in &mut matches {
            if let Some(solution) = m.pattern.solution_id().and_then(|id| lib.solutions.get(id)) {
                m.unmet_preconditions = solution.unmet_preconditions(problem);
            }
        }
        debug!(
            problem = %problem.id,
            patterns = lib.patterns.len(),
            matches = matches.len(),
            "matched problem"
        );
        matches
    }

    /// Inserts a solution, returning the replaced one.
    pub fn add_solution(&self, solution: Solution) -> Option<Solution> {
        debug!(id = %solution.id, "adding solution");
        self.inner
            .write()
            .solutions
            .insert(solution.id.clone(), solution)
    }

    /// Looks up a solution.
    pub fn get_solution(&self, id: &str) -> Result<Solution, StoreError> {
        self.inner
            .read()
            .solutions
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Resolves the solution a pattern refers to.
    ///
    /// Fails if the pattern is unknown; yields `None` if it has no solution
    /// reference or the reference dangles.
    pub fn solution_for(&self, pattern_id: &str) -> Result<Option<Solution>, StoreError> {
        let lib = self.inner.read();
        let entry = lib
            .patterns
            .get(pattern_id)
            .ok_or_else(|| StoreError::NotFound(pattern_id.to_string()))?;
        Ok(entry
            .pattern
            .solution_id()
            .and_then(|id| lib.solutions.get(id))
            .cloned())
    }

    /// Patterns carrying every one of `tags`.
    pub fn search_by_tag<I, S>(&self, tags: I) -> Vec<Arc<Pattern>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted: Vec<S> = tags.into_iter().collect();
        self.filter(|p| wanted.iter().all(|t| p.tags.contains(t.as_ref())))
    }

    /// Patterns with at least one instantiation in `domain`.
    pub fn search_by_domain(&self, domain: &str) -> Vec<Arc<Pattern>> {
        self.filter(|p| p.instantiations.iter().any(|i| i.domain == domain))
    }

    /// Stored patterns listed as related to `id`; dangling ids are skipped.
    pub fn related(&self, id: &str) -> Result<Vec<Arc<Pattern>>, StoreError> {
        let lib = self.inner.read();
        let entry = lib
            .patterns
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(entry
            .pattern
            .related_patterns
            .iter()
            .filter_map(|r| lib.patterns.get(r))
            .map(|e| Arc::clone(&e.pattern))
            .collect())
    }

    fn filter(&self, keep: impl Fn(&Pattern) -> bool) -> Vec<Arc<Pattern>> {
        self.inner
            .read()
            .patterns
            .values()
            .filter(|e| keep(&e.pattern))
            .map(|e| Arc::clone(&e.pattern))
            .collect()
    }

    /// Fingerprint of the whole library, independent of insertion order.
    pub fn fingerprint(&self) -> HashValue {
        let lib = self.inner.read();
        library_fingerprint(
            lib.patterns
                .iter()
                .map(|(id, e)| (id.as_str(), e.fingerprint)),
        )
    }

    /// Merges an encoded library into the store.
    ///
    /// Loading is additive: patterns and solutions replace stored ones with the
    /// same id, everything else is kept. In best-effort mode malformed documents
    /// are skipped and listed in the report; in strict mode the first one fails
    /// the whole load and the store is left untouched.
    pub fn load(&self, bytes: &[u8], format: LibraryFormat, options: LoadOptions) -> Result<LoadReport, StoreError> {
        let doc = document::read_library(bytes, format, options)?;
        for rejected in &doc.rejected {
            warn!(error = %rejected, "rejected library document");
        }

        let entries: Vec<Entry> = doc.patterns.into_iter().map(Entry::build).collect();
        let report = LoadReport {
            patterns_loaded: entries.len(),
            solutions_loaded: doc.solutions.len(),
            rejected: doc.rejected,
        };

        {
            let mut lib = self.inner.write();
            for entry in entries {
                lib.patterns.insert(entry.pattern.id.clone(), entry);
            }
            for solution in doc.solutions {
                lib.solutions.insert(solution.id.clone(), solution);
            }
        }
        info!(
            patterns = report.patterns_loaded,
            solutions = report.solutions_loaded,
            rejected = report.rejected.len(),
            "loaded pattern library"
        );
        Ok(report)
    }

    /// Merges a JSON library, best-effort.
    pub fn load_str(&self, json: &str) -> Result<LoadReport, StoreError> {
        self.load(json.as_bytes(), LibraryFormat::Json, LoadOptions::default())
    }

    /// Merges a library file; the format follows the file extension.
    pub fn load_path(&self, path: &Path, options: LoadOptions) -> Result<LoadReport, StoreError> {
        let bytes = std::fs::read(path)
            .map_err(|e| StoreError::Io(format!("reading {}: {}", path.display(), e)))?;
        self.load(&bytes, LibraryFormat::from_path(path), options)
    }

    /// Encodes the library.
    ///
    /// Without solutions the output is a bare sequence of pattern documents,
    /// otherwise a `{patterns, solutions}` mapping. Order is insertion order.
    pub fn save(&self, format: LibraryFormat) -> Result<Vec<u8>, StoreError> {
        let lib = self.inner.read();
        let patterns: Vec<&Pattern> = lib.patterns.values().map(|e| e.pattern.as_ref()).collect();
        let solutions: Vec<&Solution> = lib.solutions.values().collect();
        Ok(document::encode(&patterns, &solutions, format)?)
    }

    /// Encodes the library as pretty-printed JSON.
    pub fn save_string(&self) -> Result<String, StoreError> {
        let bytes = self.save(LibraryFormat::Json)?;
        String::from_utf8(bytes).map_err(|e| StoreError::Document(DocumentError::Encode(e.to_string())))
    }

    /// Writes the library to a file; the format follows the file extension.
    pub fn save_path(&self, path: &Path) -> Result<(), StoreError> {
        let format = LibraryFormat::from_path(path);
        let bytes = self.save(format)?;
        std::fs::write(path, &bytes)
            .map_err(|e| StoreError::Io(format!("writing {}: {}", path.display(), e)))?;
        info!(path = %path.display(), bytes = bytes.len(), "saved pattern library");
        Ok(())
    }
}
