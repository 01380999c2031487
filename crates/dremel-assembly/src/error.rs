//! Assembly errors.
//!
//! Looking past the end of a column is not an error: an exhausted reader
//! reports repetition level 0, which closes the record. Everything here is
//! either a configuration problem detected before the first cell is read, or
//! a structural inconsistency in the cells that would corrupt the tree if
//! ignored.

use dremel_schema::{FieldPath, SchemaError};

/// Why the tree could not be navigated or written.
#[derive(Debug, Clone, PartialEq)]
pub enum Inconsistency {
    /// The computed common ancestor is not a prefix of the path it must
    /// ascend from or descend to.
    NotAnAncestor {
        ancestor: FieldPath,
        path: FieldPath,
    },
    /// Ascending would leave the tree.
    AboveRoot,
    /// A required or optional leaf received a second value.
    ScalarOverwrite { name: String },
    /// The automaton asked for a cell on a column that has none left.
    ColumnExhausted,
    /// A record starts on a cell whose repetition level is not 0.
    RecordBoundary { level: u8 },
    /// A cell repeats at a level deeper than its field has repeated segments.
    RepetitionLevel { level: u8, max: u8 },
    /// Cells remain after the last record.
    TrailingCells { remaining: usize },
}

impl std::fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Inconsistency::NotAnAncestor { ancestor, path } => {
                write!(f, "{} is not an ancestor of {}", ancestor, path)
            }
            Inconsistency::AboveRoot => write!(f, "ascended past the root"),
            Inconsistency::ScalarOverwrite { name } => {
                write!(f, "value of {} written twice", name)
            }
            Inconsistency::ColumnExhausted => write!(f, "column is exhausted"),
            Inconsistency::RecordBoundary { level } => write!(
                f,
                "record starts at repetition level {} instead of 0",
                level
            ),
            Inconsistency::RepetitionLevel { level, max } => write!(
                f,
                "repetition level {} exceeds the field's maximum of {}",
                level, max
            ),
            Inconsistency::TrailingCells { remaining } => {
                write!(f, "{} cells left after the last record", remaining)
            }
        }
    }
}

/// Error during record assembly.
#[derive(Debug, Clone, PartialEq)]
pub enum AssemblyError {
    /// The transition table does not fit the field list.
    Schema(SchemaError),
    /// No leaf fields were given.
    NoFields,
    /// A schema field has no column in the store.
    MissingColumn { field: FieldPath },
    /// The store holds a column for a path that is not a schema field.
    UnknownColumn { path: FieldPath },
    /// A reader found no transition for the level of its next cell.
    MissingTransition {
        field: FieldPath,
        level: u8,
        position: usize,
    },
    /// The cells do not describe a well-formed record.
    Inconsistent {
        field: FieldPath,
        position: usize,
        kind: Inconsistency,
    },
}

impl AssemblyError {
    /// Whether this error comes from setup rather than from the cells.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, AssemblyError::Inconsistent { .. })
    }
}

impl std::fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssemblyError::Schema(e) => write!(f, "invalid transition table: {}", e),
            AssemblyError::NoFields => write!(f, "no fields to assemble"),
            AssemblyError::MissingColumn { field } => write!(f, "no column for field {}", field),
            AssemblyError::UnknownColumn { path } => {
                write!(f, "column {} does not belong to any field", path)
            }
            AssemblyError::MissingTransition {
                field,
                level,
                position,
            } => write!(
                f,
                "no transition for field {} at repetition level {} (cell {})",
                field, level, position
            ),
            AssemblyError::Inconsistent {
                field,
                position,
                kind,
            } => write!(f, "field {} at cell {}: {}", field, position, kind),
        }
    }
}

impl std::error::Error for AssemblyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssemblyError::Schema(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SchemaError> for AssemblyError {
    fn from(e: SchemaError) -> Self {
        AssemblyError::Schema(e)
    }
}
