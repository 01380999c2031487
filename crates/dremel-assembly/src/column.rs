//! Cells, column storage and forward-only column readers.

use std::collections::BTreeMap;

use dremel_schema::{Field, FieldPath, Target};

use crate::AssemblyError;

/// One stored unit of a column.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell<V> {
    /// `None` marks a null: some optional or repeated ancestor (or the leaf
    /// itself) is missing at this point of the record.
    pub value: Option<V>,
    /// Depth of the repeated ancestor that starts a new instance here; 0
    /// starts a new record.
    pub repetition_level: u8,
    /// Number of optional or repeated path segments that are present.
    /// Cells built with [`Cell::value`] carry [`Cell::FULLY_DEFINED`]
    /// instead of the field's maximum.
    pub definition_level: u8,
}

impl<V> Cell<V> {
    /// Definition level of a present value whose field is not known.
    /// Assembly never reads the definition level of a present value, so any
    /// level at or above the field's maximum means the same thing.
    pub const FULLY_DEFINED: u8 = u8::MAX;

    pub fn new(value: Option<V>, repetition_level: u8, definition_level: u8) -> Self {
        Cell {
            value,
            repetition_level,
            definition_level,
        }
    }

    /// A present value at [`Cell::FULLY_DEFINED`]. Use [`Cell::new`] to
    /// record the field's real maximum definition level.
    pub fn value(value: V, repetition_level: u8) -> Self {
        Cell::new(Some(value), repetition_level, Cell::<V>::FULLY_DEFINED)
    }

    pub fn null(repetition_level: u8, definition_level: u8) -> Self {
        Cell::new(None, repetition_level, definition_level)
    }

    /// What a reader hands out once its column is exhausted.
    pub fn end() -> Self {
        Cell::new(None, 0, 0)
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }
}

/// Cells of every column, keyed by field path.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStore<V> {
    columns: BTreeMap<FieldPath, Vec<Cell<V>>>,
}

impl<V> ColumnStore<V> {
    pub fn new() -> Self {
        ColumnStore {
            columns: BTreeMap::new(),
        }
    }

    /// Replace the column for `path`.
    pub fn insert(&mut self, path: FieldPath, cells: Vec<Cell<V>>) {
        self.columns.insert(path, cells);
    }

    /// Append one cell to the column for `path`, creating it if needed.
    pub fn push(&mut self, path: &FieldPath, cell: Cell<V>) {
        match self.columns.get_mut(path) {
            Some(cells) => cells.push(cell),
            None => {
                self.columns.insert(path.clone(), vec![cell]);
            }
        }
    }

    pub fn column(&self, path: &FieldPath) -> Option<&[Cell<V>]> {
        self.columns.get(path).map(Vec::as_slice)
    }

    pub fn paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.columns.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldPath, &[Cell<V>])> {
        self.columns
            .iter()
            .map(|(path, cells)| (path, cells.as_slice()))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Total number of cells across all columns.
    pub fn cell_count(&self) -> usize {
        self.columns.values().map(Vec::len).sum()
    }
}

impl<V> Default for ColumnStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> FromIterator<(FieldPath, Vec<Cell<V>>)> for ColumnStore<V> {
    fn from_iter<I: IntoIterator<Item = (FieldPath, Vec<Cell<V>>)>>(iter: I) -> Self {
        ColumnStore {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Forward-only cursor over one column and that column's transitions.
#[derive(Debug, Clone)]
pub struct Reader<'a, V> {
    field: Option<&'a Field>,
    cells: &'a [Cell<V>],
    transitions: &'a [Target],
    position: usize,
}

impl<'a, V: Clone> Reader<'a, V> {
    pub fn new(field: &'a Field, cells: &'a [Cell<V>], transitions: &'a [Target]) -> Self {
        Reader {
            field: Some(field),
            cells,
            transitions,
            position: 0,
        }
    }

    /// The reader for "no field": never has data, always transitions to
    /// [`Target::End`].
    pub fn sentinel() -> Self {
        Reader {
            field: None,
            cells: &[],
            transitions: &[],
            position: 0,
        }
    }

    pub fn field(&self) -> Option<&'a Field> {
        self.field
    }

    /// Index of the next cell to be returned by [`advance`](Reader::advance).
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.cells.len() - self.position
    }

    pub fn has_data(&self) -> bool {
        self.field.is_some() && self.position < self.cells.len()
    }

    /// Return the current cell and move past it. Past the end this returns
    /// [`Cell::end`] and the position stays put.
    pub fn advance(&mut self) -> Cell<V> {
        match self.cells.get(self.position) {
            Some(cell) => {
                self.position += 1;
                cell.clone()
            }
            None => Cell::end(),
        }
    }

    /// Repetition level of the cell after the last one returned, or 0 when
    /// the column is exhausted.
    pub fn peek_next_level(&self) -> u8 {
        self.cells
            .get(self.position)
            .map_or(0, |cell| cell.repetition_level)
    }

    /// Look up the field to visit after the current cell.
    pub fn next_field(&self) -> Result<Target, AssemblyError> {
        let Some(field) = self.field else {
            return Ok(Target::End);
        };
        let level = self.peek_next_level();
        self.transitions
            .get(usize::from(level))
            .copied()
            .ok_or_else(|| AssemblyError::MissingTransition {
                field: field.path().clone(),
                level,
                position: self.position,
            })
    }
}
