use dremel_schema::FieldPath;

/// Error while striping a record. The record's cells are discarded; columns
/// keep only the records shredded before it.
#[derive(Debug, Clone, PartialEq)]
pub enum ShredError {
    /// A required field is missing or `null`.
    MissingRequired { path: FieldPath },
    /// A group field holds something other than an object.
    ExpectedObject { path: FieldPath },
    /// A repeated field holds something other than an array.
    ExpectedArray { path: FieldPath },
    /// A leaf holds an object or an array.
    ExpectedScalar { path: FieldPath },
    /// An element of a repeated field is `null`.
    NullElement { path: FieldPath, index: usize },
}

impl std::fmt::Display for ShredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShredError::MissingRequired { path } => {
                write!(f, "required field {} is missing", path)
            }
            ShredError::ExpectedObject { path } => write!(f, "expected an object at {}", path),
            ShredError::ExpectedArray { path } => write!(f, "expected an array at {}", path),
            ShredError::ExpectedScalar { path } => write!(f, "expected a scalar at {}", path),
            ShredError::NullElement { path, index } => {
                write!(f, "element {} of {} is null", index, path)
            }
        }
    }
}

impl std::error::Error for ShredError {}
