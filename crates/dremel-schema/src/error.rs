//! Errors raised while building fields, schemas and transition tables.

use crate::FieldPath;

/// A malformed schema or transition table.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// A field path with zero segments.
    EmptyPath,
    /// The number of modes does not match the number of path segments.
    ModeCountMismatch { path: FieldPath, modes: usize },
    /// More nesting than a repetition level can express.
    TooDeep { path: FieldPath },
    /// A schema or group without any leaf beneath it.
    NoFields,
    /// A group node with no children.
    EmptyGroup { path: FieldPath },
    /// A node name that is empty or contains a `.`.
    InvalidName(String),
    /// Two siblings share a name.
    DuplicateName { path: FieldPath },
    /// A mode string other than required, optional or repeated.
    UnknownMode(String),
    /// A schema document of the wrong shape.
    InvalidDocument(String),
    /// The table has a different number of rows than there are fields.
    RowCount { expected: usize, found: usize },
    /// A reachable repetition level has no transition.
    MissingTransition { field: FieldPath, level: u8 },
    /// A transition points past the end of the field list.
    UnknownTarget { field: FieldPath, target: usize },
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaError::EmptyPath => write!(f, "field path has no segments"),
            SchemaError::ModeCountMismatch { path, modes } => write!(
                f,
                "field {} has {} segments but {} modes",
                path,
                path.depth(),
                modes
            ),
            SchemaError::TooDeep { path } => write!(f, "field {} is nested too deeply", path),
            SchemaError::NoFields => write!(f, "schema has no leaf fields"),
            SchemaError::EmptyGroup { path } => write!(f, "group {} has no children", path),
            SchemaError::InvalidName(name) => write!(f, "invalid field name {:?}", name),
            SchemaError::DuplicateName { path } => write!(f, "duplicate field {}", path),
            SchemaError::UnknownMode(mode) => write!(f, "unknown mode {:?}", mode),
            SchemaError::InvalidDocument(msg) => write!(f, "invalid schema document: {}", msg),
            SchemaError::RowCount { expected, found } => write!(
                f,
                "transition table has {} rows for {} fields",
                found, expected
            ),
            SchemaError::MissingTransition { field, level } => write!(
                f,
                "no transition for field {} at repetition level {}",
                field, level
            ),
            SchemaError::UnknownTarget { field, target } => write!(
                f,
                "field {} transitions to unknown field #{}",
                field, target
            ),
        }
    }
}

impl std::error::Error for SchemaError {}
