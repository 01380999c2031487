//! Column striping of JSON records.
//!
//! The [`Shredder`] walks each record along a schema and appends one
//! [`Cell`](dremel_assembly::Cell) per leaf occurrence, tagged with the
//! repetition and definition levels that [`dremel_assembly`] needs to put the
//! record back together.
//!
//! ```
//! use dremel_schema::{Schema, SchemaNode};
//! use dremel_shred::Shredder;
//! use serde_json::json;
//!
//! let schema = Schema::new("r", vec![SchemaNode::repeated("tags")]).unwrap();
//! let mut shredder = Shredder::new(&schema);
//! shredder.shred(&json!({"tags": ["a", "b"]})).unwrap();
//! let columns = shredder.finish();
//! assert_eq!(columns.cell_count(), 2);
//! ```

mod error;
mod shredder;

pub use error::ShredError;
pub use shredder::{Shredder, shred_all};
