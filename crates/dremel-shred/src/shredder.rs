use std::ops::Range;

use dremel_assembly::{Cell, ColumnStore};
use dremel_schema::{FieldPath, Mode, Schema, SchemaNode};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::ShredError;

type Columns = [Vec<Cell<Value>>];

/// A schema node with everything the walk needs precomputed.
enum Plan {
    Leaf {
        name: String,
        mode: Mode,
        path: FieldPath,
        /// Repetition level of this node's own repeats.
        level: u8,
        column: usize,
    },
    Group {
        name: String,
        mode: Mode,
        path: FieldPath,
        level: u8,
        /// Columns of every leaf beneath this group.
        columns: Range<usize>,
        children: Vec<Plan>,
    },
}

impl Plan {
    fn build(node: &SchemaNode, parent: &FieldPath, parent_level: u8, next: &mut usize) -> Plan {
        let path = parent.child(node.name());
        let level = parent_level + u8::from(node.mode() == Mode::Repeated);
        if node.is_leaf() {
            let column = *next;
            *next += 1;
            return Plan::Leaf {
                name: node.name().to_string(),
                mode: node.mode(),
                path,
                level,
                column,
            };
        }

        let start = *next;
        let children = node
            .children()
            .iter()
            .map(|child| Plan::build(child, &path, level, next))
            .collect();
        Plan::Group {
            name: node.name().to_string(),
            mode: node.mode(),
            path,
            level,
            columns: start..*next,
            children,
        }
    }

    fn name(&self) -> &str {
        match self {
            Plan::Leaf { name, .. } | Plan::Group { name, .. } => name,
        }
    }

    fn mode(&self) -> Mode {
        match self {
            Plan::Leaf { mode, .. } | Plan::Group { mode, .. } => *mode,
        }
    }

    fn path(&self) -> &FieldPath {
        match self {
            Plan::Leaf { path, .. } | Plan::Group { path, .. } => path,
        }
    }

    fn level(&self) -> u8 {
        match self {
            Plan::Leaf { level, .. } | Plan::Group { level, .. } => *level,
        }
    }

    fn columns(&self) -> Range<usize> {
        match self {
            Plan::Leaf { column, .. } => *column..*column + 1,
            Plan::Group { columns, .. } => columns.clone(),
        }
    }
}

/// Stripes records into one column per leaf field of a schema.
///
/// Each call to [`shred`](Shredder::shred) either appends all cells of the
/// record or, on error, none of them.
pub struct Shredder {
    plan: Vec<Plan>,
    paths: Vec<FieldPath>,
    columns: ColumnStore<Value>,
    /// Cells of the record being shredded, by column index.
    scratch: Vec<Vec<Cell<Value>>>,
    records: usize,
}

impl Shredder {
    pub fn new(schema: &Schema) -> Self {
        let mut next = 0;
        let root = FieldPath::root();
        let plan = schema
            .children()
            .iter()
            .map(|node| Plan::build(node, &root, 0, &mut next))
            .collect();
        let paths: Vec<FieldPath> = schema
            .fields()
            .iter()
            .map(|field| field.path().clone())
            .collect();
        let columns = paths.iter().map(|path| (path.clone(), Vec::new())).collect();

        Shredder {
            plan,
            scratch: vec![Vec::new(); paths.len()],
            paths,
            columns,
            records: 0,
        }
    }

    /// Append the cells of one record to every column.
    pub fn shred(&mut self, record: &Value) -> Result<(), ShredError> {
        for cells in &mut self.scratch {
            cells.clear();
        }
        let object = record.as_object().ok_or(ShredError::ExpectedObject {
            path: FieldPath::root(),
        })?;
        for child in &self.plan {
            shred_child(child, object, 0, 0, &mut self.scratch)?;
        }

        let mut cells = 0;
        for (path, pending) in self.paths.iter().zip(&mut self.scratch) {
            cells += pending.len();
            for cell in pending.drain(..) {
                self.columns.push(path, cell);
            }
        }
        self.records += 1;
        debug!(record = self.records, cells, "shredded record");
        Ok(())
    }

    /// Number of records shredded so far.
    pub fn records(&self) -> usize {
        self.records
    }

    pub fn columns(&self) -> &ColumnStore<Value> {
        &self.columns
    }

    /// Hand over the columns. Every schema field has one, possibly empty.
    pub fn finish(self) -> ColumnStore<Value> {
        self.columns
    }
}

/// Shred every record of `records` against `schema`.
pub fn shred_all<'v>(
    schema: &Schema,
    records: impl IntoIterator<Item = &'v Value>,
) -> Result<ColumnStore<Value>, ShredError> {
    let mut shredder = Shredder::new(schema);
    for record in records {
        shredder.shred(record)?;
    }
    Ok(shredder.finish())
}

/// Shred the member of `parent` described by `plan`. `r` is the repetition
/// level of the first cell written; `d` counts the nullable segments already
/// present above `plan`.
fn shred_child(
    plan: &Plan,
    parent: &Map<String, Value>,
    r: u8,
    d: u8,
    out: &mut Columns,
) -> Result<(), ShredError> {
    let value = parent.get(plan.name()).filter(|value| !value.is_null());
    match plan.mode() {
        Mode::Required => {
            let value = value.ok_or_else(|| ShredError::MissingRequired {
                path: plan.path().clone(),
            })?;
            shred_value(plan, value, r, d, out)
        }
        Mode::Optional => match value {
            Some(value) => shred_value(plan, value, r, d + 1, out),
            None => {
                absent(plan, r, d, out);
                Ok(())
            }
        },
        Mode::Repeated => {
            let items = match value {
                None => &[][..],
                Some(Value::Array(items)) => items.as_slice(),
                Some(_) => {
                    return Err(ShredError::ExpectedArray {
                        path: plan.path().clone(),
                    });
                }
            };
            if items.is_empty() {
                absent(plan, r, d, out);
                return Ok(());
            }
            for (index, item) in items.iter().enumerate() {
                if item.is_null() {
                    return Err(ShredError::NullElement {
                        path: plan.path().clone(),
                        index,
                    });
                }
                let level = if index == 0 { r } else { plan.level() };
                shred_value(plan, item, level, d + 1, out)?;
            }
            Ok(())
        }
    }
}

fn shred_value(plan: &Plan, value: &Value, r: u8, d: u8, out: &mut Columns) -> Result<(), ShredError> {
    match plan {
        Plan::Leaf { path, column, .. } => {
            if value.is_object() || value.is_array() {
                return Err(ShredError::ExpectedScalar { path: path.clone() });
            }
            trace!(field = %path, r, d, "cell");
            out[*column].push(Cell::new(Some(value.clone()), r, d));
            Ok(())
        }
        Plan::Group { path, children, .. } => {
            let object = value
                .as_object()
                .ok_or_else(|| ShredError::ExpectedObject { path: path.clone() })?;
            for child in children {
                shred_child(child, object, r, d, out)?;
            }
            Ok(())
        }
    }
}

/// One null cell for every leaf under `plan`.
fn absent(plan: &Plan, r: u8, d: u8, out: &mut Columns) {
    trace!(field = %plan.path(), r, d, "absent");
    for column in plan.columns() {
        out[column].push(Cell::null(r, d));
    }
}
