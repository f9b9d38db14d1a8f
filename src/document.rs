//! Persisted library documents: shape detection, per-document validation and
//! JSON/CBOR encoding.
//!
//! A library file is either a sequence of pattern documents or a mapping with
//! `patterns` and (optionally) `solutions` sequences. Decoding goes through a
//! generic document tree first so that one malformed pattern can be rejected,
//! with its position and identifier, without losing the others.

use crate::pattern::Pattern;
use crate::solution::Solution;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

/// Fields every pattern and solution document must carry.
const REQUIRED_FIELDS: [&str; 2] = ["id", "name"];

/// On-disk encoding of a library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LibraryFormat {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// CBOR, same document tree as JSON.
    Cbor,
}

impl LibraryFormat {
    /// `.cbor` files are CBOR, everything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("cbor") => LibraryFormat::Cbor,
            _ => LibraryFormat::Json,
        }
    }
}

/// Which kind of document an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// An entry of the pattern sequence.
    Pattern,
    /// An entry of the `solutions` sequence.
    Solution,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Pattern => write!(f, "pattern"),
            DocumentKind::Solution => write!(f, "solution"),
        }
    }
}

/// Errors raised while decoding or encoding a library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The bytes are not a JSON/CBOR document at all.
    Parse(String),
    /// The top level is neither a sequence nor a `{patterns, solutions}` mapping.
    Shape(String),
    /// A required field is absent or null.
    MissingField {
        /// Kind of the offending document.
        kind: DocumentKind,
        /// Zero-based position in its sequence.
        position: usize,
        /// The document's `id`, when it has one.
        identifier: Option<String>,
        /// Name of the missing field.
        field: &'static str,
    },
    /// A field is present but has the wrong shape.
    Invalid {
        /// Kind of the offending document.
        kind: DocumentKind,
        /// Zero-based position in its sequence.
        position: usize,
        /// The document's `id`, when it has one.
        identifier: Option<String>,
        /// What went wrong.
        message: String,
    },
    /// The library could not be encoded.
    Encode(String),
}

impl DocumentError {
    /// Position of the offending document, for per-document errors.
    pub fn position(&self) -> Option<usize> {
        match self {
            DocumentError::MissingField { position, .. } | DocumentError::Invalid { position, .. } => {
                Some(*position)
            }
            _ => None,
        }
    }

    /// Identifier of the offending document, when known.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            DocumentError::MissingField { identifier, .. } | DocumentError::Invalid { identifier, .. } => {
                identifier.as_deref()
            }
            _ => None,
        }
    }
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentError::Parse(msg) => write!(f, "library parse error: {}", msg),
            DocumentError::Shape(msg) => write!(f, "unexpected library shape: {}", msg),
            DocumentError::MissingField {
                kind,
                position,
                identifier,
                field,
            } => write!(
                f,
                "{} #{} ({}) is missing required field `{}`",
                kind,
                position,
                identifier.as_deref().unwrap_or("no id"),
                field
            ),
            DocumentError::Invalid {
                kind,
                position,
                identifier,
                message,
            } => write!(
                f,
                "{} #{} ({}) is malformed: {}",
                kind,
                position,
                identifier.as_deref().unwrap_or("no id"),
                message
            ),
            DocumentError::Encode(msg) => write!(f, "library encode error: {}", msg),
        }
    }
}

impl std::error::Error for DocumentError {}

/// How tolerant a load is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadOptions {
    /// Abort on the first malformed document, applying nothing.
    pub strict: bool,
}

impl LoadOptions {
    /// Rejects bad documents individually and keeps the rest (the default).
    pub fn best_effort() -> Self {
        Self { strict: false }
    }

    /// Rejects the whole library on the first bad document.
    pub fn strict() -> Self {
        Self { strict: true }
    }
}

/// Outcome of a load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Patterns added or replaced.
    pub patterns_loaded: usize,
    /// Solutions added or replaced.
    pub solutions_loaded: usize,
    /// Documents skipped in best-effort mode.
    pub rejected: Vec<DocumentError>,
}

impl LoadReport {
    /// Returns `true` when nothing was rejected.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Validated content of a library file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryDocument {
    /// Accepted patterns, in document order.
    pub patterns: Vec<Pattern>,
    /// Accepted solutions, in document order.
    pub solutions: Vec<Solution>,
    /// Rejected documents (always empty under strict loading).
    pub rejected: Vec<DocumentError>,
}

/// Parses raw bytes into a generic document tree.
pub fn decode(bytes: &[u8], format: LibraryFormat) -> Result<Value, DocumentError> {
    match format {
        LibraryFormat::Json => {
            serde_json::from_slice(bytes).map_err(|e| DocumentError::Parse(e.to_string()))
        }
        LibraryFormat::Cbor => {
            serde_cbor::from_slice(bytes).map_err(|e| DocumentError::Parse(e.to_string()))
        }
    }
}

/// Splits a document tree into pattern and solution documents and validates each.
pub fn parse_library(value: Value, options: LoadOptions) -> Result<LibraryDocument, DocumentError> {
    let (pattern_docs, solution_docs) = split_shape(value)?;
    let mut doc = LibraryDocument::default();

    for (position, item) in pattern_docs.into_iter().enumerate() {
        match read_document::<Pattern>(DocumentKind::Pattern, position, item) {
            Ok(pattern) => doc.patterns.push(pattern),
            Err(e) if options.strict => return Err(e),
            Err(e) => doc.rejected.push(e),
        }
    }
    for (position, item) in solution_docs.into_iter().enumerate() {
        match read_document::<Solution>(DocumentKind::Solution, position, item) {
            Ok(solution) => doc.solutions.push(solution),
            Err(e) if options.strict => return Err(e),
            Err(e) => doc.rejected.push(e),
        }
    }
    Ok(doc)
}

/// Decodes and validates a library in one go.
pub fn read_library(
    bytes: &[u8],
    format: LibraryFormat,
    options: LoadOptions,
) -> Result<LibraryDocument, DocumentError> {
    parse_library(decode(bytes, format)?, options)
}

fn split_shape(value: Value) -> Result<(Vec<Value>, Vec<Value>), DocumentError> {
    match value {
        Value::Array(patterns) => Ok((patterns, Vec::new())),
        Value::Object(mut map) => {
            if !map.contains_key("patterns") && !map.contains_key("solutions") {
                return Err(DocumentError::Shape(
                    "mapping has neither `patterns` nor `solutions`".to_string(),
                ));
            }
            let patterns = take_sequence(&mut map, "patterns")?;
            let solutions = take_sequence(&mut map, "solutions")?;
            Ok((patterns, solutions))
        }
        other => Err(DocumentError::Shape(format!(
            "expected a sequence or a mapping, found {}",
            value_kind(&other)
        ))),
    }
}

fn take_sequence(map: &mut Map<String, Value>, key: &str) -> Result<Vec<Value>, DocumentError> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(DocumentError::Shape(format!(
            "`{}` must be a sequence, found {}",
            key,
            value_kind(&other)
        ))),
    }
}

fn read_document<T: DeserializeOwned>(
    kind: DocumentKind,
    position: usize,
    value: Value,
) -> Result<T, DocumentError> {
    let identifier = value
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string);
    let invalid = |message: String| DocumentError::Invalid {
        kind,
        position,
        identifier: identifier.clone(),
        message,
    };

    let fields = value
        .as_object()
        .ok_or_else(|| invalid(format!("expected a mapping, found {}", value_kind(&value))))?;
    for field in REQUIRED_FIELDS {
        match fields.get(field) {
            None | Some(Value::Null) => {
                return Err(DocumentError::MissingField {
                    kind,
                    position,
                    identifier: identifier.clone(),
                    field,
                })
            }
            Some(Value::String(_)) => {}
            Some(other) => {
                return Err(invalid(format!(
                    "`{}` must be a string, found {}",
                    field,
                    value_kind(other)
                )))
            }
        }
    }
    serde_json::from_value(value).map_err(|e| invalid(e.to_string()))
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

#[derive(Serialize)]
struct LibraryMapping<'a> {
    patterns: &'a [&'a Pattern],
    solutions: &'a [&'a Solution],
}

/// Encodes a library, as a bare sequence when there are no solutions.
pub fn encode(
    patterns: &[&Pattern],
    solutions: &[&Solution],
    format: LibraryFormat,
) -> Result<Vec<u8>, DocumentError> {
    let encoded = if solutions.is_empty() {
        encode_value(&patterns, format)
    } else {
        encode_value(
            &LibraryMapping {
                patterns,
                solutions,
            },
            format,
        )
    };
    encoded.map_err(DocumentError::Encode)
}

fn encode_value<T: Serialize>(value: &T, format: LibraryFormat) -> Result<Vec<u8>, String> {
    match format {
        LibraryFormat::Json => serde_json::to_vec_pretty(value).map_err(|e| e.to_string()),
        LibraryFormat::Cbor => serde_cbor::to_vec(value).map_err(|e| e.to_string()),
    }
}
