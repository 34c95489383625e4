//! # Quern - Document-to-Tabular Projection
//!
//! A library for grinding arbitrarily-nested document trees into flat,
//! schema-shaped rows. Fields are addressed with `$`-rooted paths; a single
//! `[*]` array expansion per plan replicates the output row across the
//! elements of the referenced array, and a sampling walker proposes field
//! descriptors from example documents.
//!
//! ## Modules
//!
//! - **project**: Resolve field paths and emit rectangular rows
//! - **discover**: Sample documents and infer a descriptor list
//! - **path**: The field-path grammar and its string machinery
//!
//! ## Quick Start
//!
//! ### Projection
//!
//! ```rust
//! use quern::{ColumnType, Field, Node, OutputSchema, Projector};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), quern::QuernError> {
//! let mut projector = Projector::new();
//! projector.set_fields(&[
//!     Field::new("name", "$.name", ColumnType::String),
//!     Field::new("score", "$.scores[*]", ColumnType::Integer),
//! ]);
//! let schema = OutputSchema::for_fields(projector.fields());
//! projector.init(schema)?;
//!
//! let doc = Node::from_json(&json!({"name": "Alice", "scores": [10, 20]}));
//! let rows = projector.project(&doc)?;
//!
//! // One row per element of `scores`, with `name` copied onto each.
//! assert_eq!(rows.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ### Field discovery
//!
//! ```rust
//! use quern::{Node, Projector};
//! use serde_json::json;
//!
//! let docs = vec![
//!     json!({"xs": [{"v": 1}]}),
//!     json!({"xs": [{"v": 1}, {"v": 2}]}),
//! ];
//! let mut source = docs
//!     .iter()
//!     .map(Node::from_json)
//!     .map(Ok::<_, anyhow::Error>);
//!
//! let fields = Projector::new().infer_fields(&mut source, 0).unwrap();
//! assert_eq!(fields[0].name, "xs[0:1].v");
//! assert_eq!(fields[0].path, "$.xs[0].v");
//! ```

use anyhow::{Context, Result};
use serde_json::Value;
use std::io::{BufRead, Write};

pub mod discover;
pub mod error;
pub mod node;
pub mod path;
pub mod project;

// Re-export commonly used types for convenience
pub use discover::{
    discover_fields_async, DiscoverFieldsCallback, Dispatcher, DocumentSource, FieldDiscovery,
    InlineDispatcher, TreeWalkDiscovery, DEFAULT_SAMPLE_SIZE,
};
pub use error::QuernError;
pub use node::Node;
pub use path::cleanse_path;
pub use project::{row_to_json, Cell, Column, ColumnType, Field, OutputSchema, Projector, Row};

/// Convenience entry point: project a stream of newline-delimited JSON
/// documents through an initialized projector, writing one JSON row array
/// per output row.
pub fn project_ndjson<R: BufRead, W: Write>(
    reader: R,
    projector: &Projector,
    writer: &mut W,
) -> Result<()> {
    for line in reader.lines() {
        let line = line.context("Failed to read line")?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line).context("Failed to parse JSON")?;
        let doc = Node::from_json(&value);
        for row in projector.project(&doc)? {
            writeln!(writer, "{}", row_to_json(&row))?;
        }
    }

    Ok(())
}
