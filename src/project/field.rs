//! Field descriptors and single-path resolution against a document.

use crate::error::QuernError;
use crate::node::Node;
use crate::path::{cleanse_path, parse_path, PathSegment};
use crate::project::types::{string_form, Cell, ColumnType};
use serde::{Deserialize, Serialize};

/// A user-declared scalar field: where to find it in the document and what
/// column it populates.
///
/// `name` is the output column name and may carry bracketed index hints in
/// discovery display form (`[i]`, `[min:max]`, `[-]`); `path` is a concrete
/// resolution path per the grammar in [`crate::path`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub output_type: ColumnType,
    /// Optional value domain; when present the cell is the zero-based index
    /// of the leaf's string form within this list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_values: Option<Vec<String>>,

    // Compiled by init().
    #[serde(skip)]
    output_index: usize,
    #[serde(skip)]
    segments: Vec<PathSegment>,
}

impl Field {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        output_type: ColumnType,
    ) -> Self {
        Field {
            name: name.into(),
            path: path.into(),
            output_type,
            indexed_values: None,
            output_index: 0,
            segments: Vec::new(),
        }
    }

    pub fn with_indexed_values(mut self, values: Vec<String>) -> Self {
        self.indexed_values = Some(values);
        self
    }

    /// Position of this field in the output row, valid after `init`.
    pub fn output_index(&self) -> usize {
        self.output_index
    }

    /// Bind the field to its output column and compile the path.
    pub(crate) fn init(&mut self, output_index: usize) -> Result<(), QuernError> {
        self.output_index = output_index;
        self.reset()
    }

    /// Recompile the (cleansed) path into segments.
    pub(crate) fn reset(&mut self) -> Result<(), QuernError> {
        self.segments = parse_path(&cleanse_path(&self.path))?;
        Ok(())
    }

    /// Resolve this field's path against the document root and coerce the
    /// leaf. Missing data at any depth yields `None`.
    pub(crate) fn convert(&self, doc: &Node) -> Option<Cell> {
        let leaf = resolve(doc, &self.segments)?;
        coerce_leaf(self.output_type, self.indexed_values.as_deref(), leaf)
    }
}

/// Walk segments left-to-right from `doc`; any shape mismatch, missing
/// member, or out-of-bounds index yields `None`.
pub(crate) fn resolve<'a>(doc: &'a Node, segments: &[PathSegment]) -> Option<&'a Node> {
    let mut current = doc;
    for segment in segments {
        current = match (segment, current) {
            (PathSegment::Child(name), Node::Record(members)) => members.get(name)?,
            (PathSegment::Index(i), Node::Array(items)) => items.get(*i)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Apply coercion, routing through the indexed-value domain when present.
pub(crate) fn coerce_leaf(
    output_type: ColumnType,
    indexed_values: Option<&[String]>,
    leaf: &Node,
) -> Option<Cell> {
    match indexed_values {
        Some(domain) => {
            let form = string_form(leaf)?;
            let index = domain.iter().position(|v| *v == form)?;
            Some(Cell::Integer(index as i64))
        }
        None => output_type.coerce(leaf),
    }
}

/// Render an indexed-value domain in comma-separated form.
pub fn indexed_vals_list(values: &[String]) -> String {
    values.join(",")
}

/// Parse a comma-separated domain list, trimming whitespace.
pub fn parse_indexed_vals_list(list: &str) -> Vec<String> {
    list.split(',').map(|part| part.trim().to_string()).collect()
}
