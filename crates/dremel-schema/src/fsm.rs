//! Repetition-level transition tables.
//!
//! For every leaf field the table maps the repetition level of the *next*
//! cell in that field's column to the field that must be read next. Reading
//! records back then becomes a walk over this automaton: a jump back to an
//! earlier field opens a new instance of a repeated group, a jump forward
//! continues the current instance, and [`Target::End`] closes the record.

use std::fmt;

use tracing::trace;

use crate::{Field, SchemaError};

/// Where the automaton goes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "facet", derive(facet::Facet))]
#[repr(u8)]
pub enum Target {
    /// Read the field at this index of the flattened field list.
    Field(usize),
    /// The current record is complete.
    End,
}

impl Target {
    pub fn field(self) -> Option<usize> {
        match self {
            Target::Field(index) => Some(index),
            Target::End => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Field(index) => write!(f, "#{}", index),
            Target::End => f.write_str("END"),
        }
    }
}

/// One row of transitions per field, indexed by repetition level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    rows: Vec<Vec<Target>>,
}

impl TransitionTable {
    /// Build the table for fields given in canonical (pre-order) order.
    pub fn build(fields: &[Field]) -> Result<Self, SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::NoFields);
        }

        let rows = fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let (barrier, barrier_level) = match fields.get(index + 1) {
                    Some(next) => (Target::Field(index + 1), field.common_repetition_level(next)),
                    None => (Target::End, 0),
                };

                let row: Vec<Target> = (0..=field.max_repetition_level())
                    .map(|level| {
                        if level <= barrier_level {
                            return barrier;
                        }
                        // Back edge: the first field under the repeated
                        // ancestor that this level restarts. `field` itself
                        // always qualifies.
                        let first = fields[..=index]
                            .iter()
                            .position(|pre| field.common_repetition_level(pre) >= level)
                            .unwrap_or(index);
                        Target::Field(first)
                    })
                    .collect();
                trace!(field = %field.path(), ?row, "transitions");
                row
            })
            .collect();

        Ok(TransitionTable { rows })
    }

    /// Wrap rows produced elsewhere. Nothing is checked until [`validate`].
    ///
    /// [`validate`]: TransitionTable::validate
    pub fn from_rows(rows: Vec<Vec<Target>>) -> Self {
        TransitionTable { rows }
    }

    /// Check the table is total and in range for `fields`.
    pub fn validate(&self, fields: &[Field]) -> Result<(), SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::NoFields);
        }
        if self.rows.len() != fields.len() {
            return Err(SchemaError::RowCount {
                expected: fields.len(),
                found: self.rows.len(),
            });
        }
        for (field, row) in fields.iter().zip(&self.rows) {
            for level in 0..=field.max_repetition_level() {
                match row.get(usize::from(level)) {
                    None => {
                        return Err(SchemaError::MissingTransition {
                            field: field.path().clone(),
                            level,
                        });
                    }
                    Some(Target::Field(target)) if *target >= fields.len() => {
                        return Err(SchemaError::UnknownTarget {
                            field: field.path().clone(),
                            target: *target,
                        });
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    /// Transitions of the field at `index`.
    pub fn row(&self, index: usize) -> Option<&[Target]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn get(&self, index: usize, level: u8) -> Option<Target> {
        self.row(index)?.get(usize::from(level)).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render the table with field paths, one `path` header per field and one
    /// `  level -> target` line per transition.
    pub fn describe(&self, fields: &[Field]) -> String {
        let mut out = String::new();
        for (index, row) in self.rows.iter().enumerate() {
            let name = fields
                .get(index)
                .map_or_else(|| format!("#{}", index), |field| field.path().to_string());
            out.push_str(&name);
            out.push('\n');
            for (level, target) in row.iter().enumerate() {
                let target = match target {
                    Target::Field(i) => fields
                        .get(*i)
                        .map_or_else(|| target.to_string(), |field| field.path().to_string()),
                    Target::End => target.to_string(),
                };
                out.push_str(&format!("  {} -> {}\n", level, target));
            }
        }
        out
    }
}
