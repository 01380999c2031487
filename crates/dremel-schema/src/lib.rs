//! Schema side of column striping.
//!
//! This crate flattens a nested schema into its ordered leaf [`Field`]s,
//! answers path questions about them (depth, lowest common ancestor,
//! repetition and definition levels) and builds the [`TransitionTable`] that
//! drives record assembly.

mod error;
mod field;
mod fsm;
mod schema;

pub use error::SchemaError;
pub use field::{Field, FieldPath, Mode};
pub use fsm::{Target, TransitionTable};
pub use schema::{Schema, SchemaNode};
