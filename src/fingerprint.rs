//! Deterministic fingerprints for patterns and pattern libraries.
//!
//! Fingerprints are domain-separated, length-prefixed SHA-256 digests over a
//! canonical byte encoding. The store uses them to skip re-extracting features
//! when a pattern is re-added unchanged, and callers use the library fingerprint
//! to detect whether a save/load cycle changed anything.
//!
//! # Citations
//! - SHA-256: NIST FIPS 180-4 (2015)
//! - Domain separation & length prefixing: Bernstein et al., "How to hash into elliptic curves" (2009)

use crate::core::{Label, Problem, Properties, PropertyValue};
use crate::pattern::Pattern;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Domain for single pattern fingerprints (v0).
pub const DOMAIN_PATTERN_V0: &[u8] = b"PATTERN_V0";

/// Domain for embedded reference problems (v0).
pub const DOMAIN_PROBLEM_V0: &[u8] = b"PROBLEM_V0";

/// Domain for whole-library fingerprints (v0).
pub const DOMAIN_LIBRARY_V0: &[u8] = b"LIBRARY_V0";

/// A 256‑bit hash value.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashValue(pub [u8; 32]);

impl HashValue {
    /// Creates a zero hash (all zeros).
    #[inline]
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Creates a hash from a raw byte array.
    #[inline]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw byte array.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Computes SHA‑256 of the given data with domain separation.
    ///
    /// Input is `b"ANL:<domain>:v1" || len(data) as u64 LE || data`.
    pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"ANL:");
        hasher.update(domain);
        hasher.update(b":v1");
        hasher.update((data.len() as u64).to_le_bytes());
        hasher.update(data);
        Self(hasher.finalize().into())
    }
}

impl std::fmt::Display for HashValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First 4 bytes are enough to tell libraries apart in logs.
        write!(
            f,
            "HashValue({:02x}{:02x}{:02x}{:02x}…)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

/// Types with a deterministic byte encoding suitable for hashing.
pub trait Canonicalizable {
    /// Returns the canonical bytes.
    fn to_canonical_bytes(&self) -> Vec<u8>;
}

fn put_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u64).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn put_sorted<'a, I>(out: &mut Vec<u8>, items: I)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut items: Vec<&str> = items.into_iter().collect();
    items.sort_unstable();
    items.dedup();
    out.extend_from_slice(&(items.len() as u64).to_le_bytes());
    for item in items {
        put_str(out, item);
    }
}

fn put_properties(out: &mut Vec<u8>, properties: &Properties) {
    out.extend_from_slice(&(properties.len() as u64).to_le_bytes());
    for (key, value) in properties {
        put_str(out, key);
        match value {
            PropertyValue::Bool(b) => out.extend_from_slice(&[0, u8::from(*b)]),
            PropertyValue::Int(i) => {
                out.push(1);
                out.extend_from_slice(&i.to_le_bytes());
            }
            PropertyValue::Float(x) => {
                out.push(2);
                out.extend_from_slice(&x.to_bits().to_le_bytes());
            }
            PropertyValue::Text(t) => {
                out.push(3);
                put_str(out, t);
            }
        }
    }
}

impl Canonicalizable for Problem {
    /// Entities, relations and constraints keep their order; tags and constraint
    /// scopes are sorted.
    fn to_canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(256);
        put_str(&mut out, &self.id);
        put_str(&mut out, &self.name);

        let entities = self.structure.entities();
        out.extend_from_slice(&(entities.len() as u64).to_le_bytes());
        for entity in entities {
            put_str(&mut out, &entity.id);
            put_str(&mut out, entity.entity_type.as_str());
            put_properties(&mut out, &entity.properties);
        }

        let relations = self.structure.relations();
        out.extend_from_slice(&(relations.len() as u64).to_le_bytes());
        for relation in relations {
            put_str(&mut out, &relation.source);
            put_str(&mut out, &relation.target);
            put_str(&mut out, relation.relation_type.as_str());
            put_properties(&mut out, &relation.properties);
        }

        out.extend_from_slice(&(self.constraints.len() as u64).to_le_bytes());
        for constraint in &self.constraints {
            put_str(&mut out, &constraint.predicate);
            put_sorted(&mut out, constraint.over.iter().map(String::as_str));
            put_str(&mut out, constraint.constraint_type.as_str());
        }

        match &self.goal {
            Some(goal) => {
                out.push(1);
                put_str(&mut out, goal.goal_type.as_str());
                put_str(&mut out, &goal.target);
                put_str(&mut out, &goal.predicate);
            }
            None => out.push(0),
        }

        put_sorted(&mut out, self.tags.iter().map(Label::as_str));
        out
    }
}

impl Canonicalizable for Pattern {
    /// Set-valued fields are sorted before encoding, so two patterns that compare
    /// equal encode identically. Instantiations keep their order.
    fn to_canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(512);
        put_str(&mut out, &self.id);
        put_str(&mut out, &self.name);
        put_str(&mut out, &self.description);

        let ap = &self.abstract_problem;
        put_str(&mut out, ap.structure_type.as_str());
        put_sorted(&mut out, ap.key_features.iter().map(Label::as_str));
        put_str(&mut out, ap.goal_class.map(|g| g.as_str()).unwrap_or(""));

        put_str(&mut out, self.solution_id().unwrap_or(""));

        out.extend_from_slice(&(self.instantiations.len() as u64).to_le_bytes());
        for inst in &self.instantiations {
            put_str(&mut out, &inst.domain);
            put_str(&mut out, &inst.concrete_problem);
            put_str(&mut out, &inst.concrete_solution);
            put_str(&mut out, &inst.mapping_notes);
        }

        put_sorted(&mut out, self.related_patterns.iter().map(String::as_str));
        put_sorted(&mut out, self.tags.iter().map(Label::as_str));

        let problem_hash = match &self.problem {
            Some(problem) => {
                HashValue::hash_with_domain(DOMAIN_PROBLEM_V0, &problem.to_canonical_bytes())
            }
            None => HashValue::zero(),
        };
        out.extend_from_slice(problem_hash.as_bytes());
        out
    }
}

/// Computes the fingerprint of a single pattern.
pub fn pattern_fingerprint(pattern: &Pattern) -> HashValue {
    HashValue::hash_with_domain(DOMAIN_PATTERN_V0, &pattern.to_canonical_bytes())
}

/// Computes the fingerprint of a whole library from `(id, pattern fingerprint)` pairs.
///
/// Entries are sorted by id first, so insertion order does not matter.
pub fn library_fingerprint<'a, I>(entries: I) -> HashValue
where
    I: IntoIterator<Item = (&'a str, HashValue)>,
{
    let mut entries: Vec<(&str, HashValue)> = entries.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    let mut data = Vec::with_capacity(entries.len() * 48);
    data.extend_from_slice(&(entries.len() as u64).to_le_bytes());
    for (id, hash) in entries {
        put_str(&mut data, id);
        data.extend_from_slice(hash.as_bytes());
    }
    HashValue::hash_with_domain(DOMAIN_LIBRARY_V0, &data)
}
