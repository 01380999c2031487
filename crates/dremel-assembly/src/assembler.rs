//! The assembly engine.
//!
//! One record is assembled by walking the transition automaton: read a cell
//! from the active column, move the tree cursor from its current position to
//! the cell's field through their lowest common ancestor, store the value,
//! then ask the column where to go next based on the repetition level of its
//! following cell.

use dremel_schema::{Field, FieldPath, Target, TransitionTable};
use tracing::{debug, trace};

use crate::column::{ColumnStore, Reader};
use crate::record::{NodeId, RecordTree};
use crate::{AssemblyError, Inconsistency};

/// How much of the tree a null cell is allowed to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbsentPolicy {
    /// Open every group on the field's path, but not the leaf.
    #[default]
    Parents,
    /// Open the whole path, leaf included; the leaf stays empty.
    Path,
    /// Open only the groups the cell's definition level marks as present.
    DefinitionLevel,
}

impl AbsentPolicy {
    /// Number of path segments a null cell of `field` opens.
    pub fn depth(self, field: &Field, definition_level: u8) -> usize {
        match self {
            AbsentPolicy::Parents => field.depth() - 1,
            AbsentPolicy::Path => field.depth(),
            AbsentPolicy::DefinitionLevel => field.present_depth(definition_level),
        }
    }
}

/// Options for record assembly.
#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    /// Treatment of null cells (default: [`AbsentPolicy::Parents`]).
    pub absent: AbsentPolicy,
    /// Name of every record's root node (default: `root`).
    pub root_name: String,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            absent: AbsentPolicy::default(),
            root_name: "root".to_string(),
        }
    }
}

impl AssemblyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the null-cell policy.
    pub fn absent(mut self, policy: AbsentPolicy) -> Self {
        self.absent = policy;
        self
    }

    /// Set the name of the root node.
    pub fn root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = name.into();
        self
    }
}

/// State of one record being assembled. Lives for the whole record and is
/// only ever mutated through `&mut`.
struct Assembly<V> {
    tree: RecordTree<V>,
    /// Node the tree cursor sits on.
    cursor: NodeId,
    /// Path of `cursor`.
    position: FieldPath,
    active: Target,
    /// Index of the last field a cell was read from.
    last: usize,
    steps: usize,
}

impl<V> Assembly<V> {
    fn new(root_name: &str) -> Self {
        let tree = RecordTree::new(root_name);
        Assembly {
            cursor: tree.root(),
            tree,
            position: FieldPath::root(),
            active: Target::Field(0),
            last: 0,
            steps: 0,
        }
    }
}

/// Reassembles records from a column store, one top-level record at a time.
pub struct Assembler<'a, V> {
    fields: &'a [Field],
    readers: Vec<Reader<'a, V>>,
    options: AssemblyOptions,
    records: usize,
}

impl<'a, V: Clone> Assembler<'a, V> {
    /// Set up one reader per field.
    ///
    /// Fails if the field list is empty, the table is not total over the
    /// fields, a field has no column, or a column belongs to no field.
    pub fn new(
        fields: &'a [Field],
        table: &'a TransitionTable,
        columns: &'a ColumnStore<V>,
    ) -> Result<Self, AssemblyError> {
        if fields.is_empty() {
            return Err(AssemblyError::NoFields);
        }
        table.validate(fields)?;
        if let Some(path) = columns
            .paths()
            .find(|path| !fields.iter().any(|field| field.path() == *path))
        {
            return Err(AssemblyError::UnknownColumn { path: path.clone() });
        }

        let readers = fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let cells =
                    columns
                        .column(field.path())
                        .ok_or_else(|| AssemblyError::MissingColumn {
                            field: field.path().clone(),
                        })?;
                Ok(Reader::new(field, cells, table.row(index).unwrap_or(&[])))
            })
            .collect::<Result<Vec<_>, AssemblyError>>()?;

        Ok(Assembler {
            fields,
            readers,
            options: AssemblyOptions::default(),
            records: 0,
        })
    }

    pub fn with_options(mut self, options: AssemblyOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &AssemblyOptions {
        &self.options
    }

    /// Whether another record can be assembled.
    pub fn has_data(&self) -> bool {
        self.readers[0].has_data()
    }

    /// The readers, in field order.
    pub fn readers(&self) -> &[Reader<'a, V>] {
        &self.readers
    }

    /// Number of records assembled so far.
    pub fn assembled(&self) -> usize {
        self.records
    }

    /// Assemble the next top-level record, or `None` once the first field's
    /// column is exhausted.
    pub fn assemble_record(&mut self) -> Result<Option<RecordTree<V>>, AssemblyError> {
        let first = &self.readers[0];
        if !first.has_data() {
            return Ok(None);
        }
        let level = first.peek_next_level();
        if level != 0 {
            return Err(inconsistent(
                &self.fields[0],
                first.position(),
                Inconsistency::RecordBoundary { level },
            ));
        }

        let mut state = Assembly::new(&self.options.root_name);
        while let Some(index) = state.active.field() {
            self.step(&mut state, index)?;
        }

        // Close whatever is still open.
        state
            .tree
            .ascend_to(state.cursor, &state.position, &FieldPath::root())
            .map_err(|kind| {
                let field = &self.fields[state.last];
                inconsistent(field, self.readers[state.last].position(), kind)
            })?;

        self.records += 1;
        debug!(
            record = self.records,
            steps = state.steps,
            nodes = state.tree.len(),
            "assembled record"
        );
        Ok(Some(state.tree))
    }

    /// Iterate over the remaining records. Iteration stops after the first
    /// error.
    pub fn records(&mut self) -> Records<'_, 'a, V> {
        Records {
            assembler: self,
            failed: false,
        }
    }

    /// Check every column was consumed and return the number of records.
    pub fn finish(self) -> Result<usize, AssemblyError> {
        for (field, reader) in self.fields.iter().zip(&self.readers) {
            if reader.has_data() {
                return Err(inconsistent(
                    field,
                    reader.position(),
                    Inconsistency::TrailingCells {
                        remaining: reader.remaining(),
                    },
                ));
            }
        }
        Ok(self.records)
    }

    fn step(&mut self, state: &mut Assembly<V>, index: usize) -> Result<(), AssemblyError> {
        let fields = self.fields;
        let field = &fields[index];
        let reader = &mut self.readers[index];
        let position = reader.position();
        if !reader.has_data() {
            return Err(inconsistent(field, position, Inconsistency::ColumnExhausted));
        }

        let cell = reader.advance();
        let depth = match cell.value {
            Some(_) => field.depth(),
            None => self.options.absent.depth(field, cell.definition_level),
        };
        let target = field.path().prefix(depth);
        let lca = target.lowest_common_ancestor(&state.position);
        state.cursor = state
            .tree
            .descend_to(state.cursor, field, depth, &state.position, &lca)
            .map_err(|kind| inconsistent(field, position, kind))?;
        if let Some(value) = cell.value {
            state
                .tree
                .append(state.cursor, value)
                .map_err(|kind| inconsistent(field, position, kind))?;
        }
        state.position = target;
        state.last = index;
        state.steps += 1;

        let level = reader.peek_next_level();
        if level > field.max_repetition_level() {
            return Err(inconsistent(
                field,
                reader.position(),
                Inconsistency::RepetitionLevel {
                    level,
                    max: field.max_repetition_level(),
                },
            ));
        }
        let next = reader.next_field()?;
        trace!(field = %field.path(), cell = position, level, %next, "step");

        if let Target::Field(next_index) = next {
            let next_field = fields.get(next_index).ok_or_else(|| {
                AssemblyError::Schema(dremel_schema::SchemaError::UnknownTarget {
                    field: field.path().clone(),
                    target: next_index,
                })
            })?;
            let mut lca = next_field.path().lowest_common_ancestor(&state.position);
            // A jump back repeats the ancestor owning `level`: close it so the
            // next descent opens a fresh instance.
            if next_index <= index
                && let Some(owner) = field.repetition_depth(level)
            {
                lca = lca.prefix(owner - 1);
            }
            state.cursor = state
                .tree
                .ascend_to(state.cursor, &state.position, &lca)
                .map_err(|kind| inconsistent(field, position, kind))?;
            state.position = lca;
        }
        state.active = next;
        Ok(())
    }
}

/// Iterator over assembled records; see [`Assembler::records`].
pub struct Records<'s, 'a, V> {
    assembler: &'s mut Assembler<'a, V>,
    failed: bool,
}

impl<V: Clone> Iterator for Records<'_, '_, V> {
    type Item = Result<RecordTree<V>, AssemblyError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.assembler.assemble_record() {
            Ok(Some(tree)) => Some(Ok(tree)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Assemble every record of `columns` and check nothing is left over.
pub fn assemble_all<V: Clone>(
    fields: &[Field],
    table: &TransitionTable,
    columns: &ColumnStore<V>,
    options: AssemblyOptions,
) -> Result<Vec<RecordTree<V>>, AssemblyError> {
    let mut assembler = Assembler::new(fields, table, columns)?.with_options(options);
    let records = assembler.records().collect::<Result<Vec<_>, _>>()?;
    assembler.finish()?;
    Ok(records)
}

fn inconsistent(field: &Field, position: usize, kind: Inconsistency) -> AssemblyError {
    AssemblyError::Inconsistent {
        field: field.path().clone(),
        position,
        kind,
    }
}

#[cfg(test)]
mod tests;
