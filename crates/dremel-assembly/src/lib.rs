//! Record assembly for column-striped nested data.
//!
//! Every leaf field of a nested schema is stored as its own column of
//! [`Cell`]s. The [`Assembler`] reads those columns back in the interleaving
//! dictated by a [`TransitionTable`] and rebuilds each record as a
//! [`RecordTree`].
//!
//! ```
//! use dremel_assembly::{AssemblyOptions, Cell, ColumnStore, assemble_all};
//! use dremel_schema::{FieldPath, Schema, SchemaNode, TransitionTable};
//!
//! let schema = Schema::new("r", vec![SchemaNode::repeated("tags")]).unwrap();
//! let table = TransitionTable::build(schema.fields()).unwrap();
//! let mut columns = ColumnStore::new();
//! columns.insert(
//!     FieldPath::parse("tags"),
//!     vec![Cell::value("a", 0), Cell::value("b", 1)],
//! );
//!
//! let records = assemble_all(schema.fields(), &table, &columns, AssemblyOptions::default()).unwrap();
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].get("tags").and_then(|n| n.values()), Some(&["a", "b"][..]));
//! ```

mod assembler;
mod column;
mod error;
mod record;

pub use assembler::{AbsentPolicy, Assembler, AssemblyOptions, Records, assemble_all};
pub use column::{Cell, ColumnStore, Reader};
pub use dremel_schema::{Field, FieldPath, Mode, Target, TransitionTable};
pub use error::{AssemblyError, Inconsistency};
pub use record::{Node, NodeId, RecordTree};
