//! Array expansion: the `[*]` unwind that turns one document into N rows.
//!
//! A plan admits any number of fields sharing one expansion prefix, e.g.
//! `$.person[*].first` together with `$.person[*].last`, but not two
//! distinct prefixes such as `$.person[*].first` with `$.address[*].street`.

use crate::error::QuernError;
use crate::node::Node;
use crate::path::{cleanse_path, parse_path, PathSegment};
use crate::project::field::{coerce_leaf, resolve, Field};
use crate::project::types::{ColumnType, OutputSchema, Row};

const EXPAND_TOKEN: &str = "[*]";

/// Where a sub-field's value lives relative to an expansion element.
#[derive(Debug, Clone)]
enum SubPath {
    /// The element itself is the value (`$.xs[*]` ends at the star).
    Current,
    /// Resolve this suffix against the element.
    Segments(Vec<PathSegment>),
}

/// One expansion-group member, re-rooted at the array element.
#[derive(Debug, Clone)]
struct SubField {
    name: String,
    output_type: ColumnType,
    indexed_values: Option<Vec<String>>,
    sub_path: SubPath,
    output_index: usize,
}

/// Compiled handler for the single expansion group of a plan.
#[derive(Debug, Clone)]
pub(crate) struct ArrayExpansion {
    /// The common prefix up to and including `[*]`, for diagnostics.
    expansion_path: String,
    /// Compiled prefix segments, `[*]` excluded.
    prefix: Vec<PathSegment>,
    sub_fields: Vec<SubField>,
}

/// Split descriptors into the normal set and the (at most one) expansion
/// group. Rejects paths with more than one `[*]` and groups whose prefixes
/// disagree.
pub(crate) fn partition_fields(
    fields: Vec<Field>,
) -> Result<(Vec<Field>, Option<ArrayExpansion>), QuernError> {
    let mut normal = Vec::new();
    let mut expanding = Vec::new();
    let mut expansion_path: Option<String> = None;

    for field in fields {
        let path = cleanse_path(&field.path);
        let Some(first) = path.find(EXPAND_TOKEN) else {
            normal.push(field);
            continue;
        };

        if path.rfind(EXPAND_TOKEN) != Some(first) {
            return Err(QuernError::MultipleExpansions(path));
        }

        let prefix = path[..first + EXPAND_TOKEN.len()].to_string();
        match &expansion_path {
            None => expansion_path = Some(prefix),
            Some(existing) if *existing != prefix => {
                return Err(QuernError::DifferentExpansions {
                    first: existing.clone(),
                    second: prefix,
                });
            }
            Some(_) => {}
        }
        expanding.push((field, path));
    }

    let Some(expansion_path) = expansion_path else {
        return Ok((normal, None));
    };

    let mut prefix = parse_path(&expansion_path)?;
    prefix.pop(); // drop the trailing Expand marker

    let sub_fields = expanding
        .into_iter()
        .map(|(field, path)| {
            let suffix = &path[expansion_path.len()..];
            let sub_path = if suffix.is_empty() {
                SubPath::Current
            } else {
                SubPath::Segments(parse_path(&format!("${}", suffix))?)
            };
            Ok(SubField {
                name: field.name,
                output_type: field.output_type,
                indexed_values: field.indexed_values,
                sub_path,
                output_index: 0,
            })
        })
        .collect::<Result<Vec<_>, QuernError>>()?;

    Ok((
        normal,
        Some(ArrayExpansion {
            expansion_path,
            prefix,
            sub_fields,
        }),
    ))
}

impl ArrayExpansion {
    pub(crate) fn expansion_path(&self) -> &str {
        &self.expansion_path
    }

    /// Bind every sub-field to its output column.
    pub(crate) fn init(&mut self, schema: &OutputSchema) -> Result<(), QuernError> {
        for sub in &mut self.sub_fields {
            sub.output_index = schema
                .index_of(&sub.name)
                .ok_or_else(|| QuernError::UnknownColumn(sub.name.clone()))?;
        }
        Ok(())
    }

    /// Produce one row per element of the array at the expansion prefix.
    ///
    /// A missing or non-array prefix yields a single row for the normal set
    /// to populate. An empty array yields no rows, unless a normal set
    /// exists, in which case one normal-only row survives.
    pub(crate) fn expand(&self, doc: &Node, row_len: usize, has_normal_fields: bool) -> Vec<Row> {
        match resolve(doc, &self.prefix) {
            Some(Node::Array(items)) => {
                if items.is_empty() {
                    return if has_normal_fields {
                        vec![vec![None; row_len]]
                    } else {
                        Vec::new()
                    };
                }
                items
                    .iter()
                    .map(|element| {
                        let mut row: Row = vec![None; row_len];
                        for sub in &self.sub_fields {
                            let leaf = match &sub.sub_path {
                                SubPath::Current => Some(element),
                                SubPath::Segments(segments) => resolve(element, segments),
                            };
                            row[sub.output_index] = leaf.and_then(|l| {
                                coerce_leaf(sub.output_type, sub.indexed_values.as_deref(), l)
                            });
                        }
                        row
                    })
                    .collect()
            }
            _ => vec![vec![None; row_len]],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::project::types::{Cell, Column};
    use serde_json::json;

    fn schema(names: &[(&str, ColumnType)]) -> OutputSchema {
        OutputSchema::new(
            names
                .iter()
                .map(|(n, t)| Column {
                    name: n.to_string(),
                    column_type: *t,
                })
                .collect(),
        )
    }

    #[test]
    fn test_partition_without_expansion() {
        let fields = vec![Field::new("a", "$.a", ColumnType::Integer)];
        let (normal, expansion) = partition_fields(fields).unwrap();
        assert_eq!(normal.len(), 1);
        assert!(expansion.is_none());
    }

    #[test]
    fn test_multiple_expansions_in_one_path() {
        let fields = vec![Field::new("x", "$.a[*].b[*].c", ColumnType::String)];
        let err = partition_fields(fields).unwrap_err();
        assert!(matches!(err, QuernError::MultipleExpansions(_)));
    }

    #[test]
    fn test_different_expansion_prefixes() {
        let fields = vec![
            Field::new("x", "$.a[*].x", ColumnType::String),
            Field::new("y", "$.b[*].y", ColumnType::String),
        ];
        let err = partition_fields(fields).unwrap_err();
        assert!(matches!(err, QuernError::DifferentExpansions { .. }));
    }

    #[test]
    fn test_shared_prefix_is_admitted() {
        let fields = vec![
            Field::new("first", "$.person[*].first", ColumnType::String),
            Field::new("last", "$.person[*].last", ColumnType::String),
        ];
        let (normal, expansion) = partition_fields(fields).unwrap();
        assert!(normal.is_empty());
        assert_eq!(expansion.unwrap().expansion_path(), "$.person[*]");
    }

    #[test]
    fn test_expand_object_elements() {
        let fields = vec![Field::new("v", "$.xs[*].v", ColumnType::Integer)];
        let (_, expansion) = partition_fields(fields).unwrap();
        let mut exp = expansion.unwrap();
        exp.init(&schema(&[("v", ColumnType::Integer)])).unwrap();

        let doc = Node::from_json(&json!({"xs": [{"v": 10}, {"v": 20}, {"v": 30}]}));
        let rows = exp.expand(&doc, 1, false);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], Some(Cell::Integer(10)));
        assert_eq!(rows[2][0], Some(Cell::Integer(30)));
    }

    #[test]
    fn test_expand_primitive_elements() {
        let fields = vec![Field::new("x", "$.xs[*]", ColumnType::Integer)];
        let (_, expansion) = partition_fields(fields).unwrap();
        let mut exp = expansion.unwrap();
        exp.init(&schema(&[("x", ColumnType::Integer)])).unwrap();

        let doc = Node::from_json(&json!({"xs": [7, 8, 9]}));
        let rows = exp.expand(&doc, 1, false);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][0], Some(Cell::Integer(8)));
    }

    #[test]
    fn test_missing_prefix_yields_single_row() {
        let fields = vec![Field::new("v", "$.xs[*].v", ColumnType::Integer)];
        let (_, expansion) = partition_fields(fields).unwrap();
        let mut exp = expansion.unwrap();
        exp.init(&schema(&[("v", ColumnType::Integer)])).unwrap();

        let doc = Node::from_json(&json!({"other": 1}));
        let rows = exp.expand(&doc, 1, false);
        assert_eq!(rows, vec![vec![None]]);
    }

    #[test]
    fn test_empty_array_yields_no_rows_without_normal_set() {
        let fields = vec![Field::new("v", "$.xs[*].v", ColumnType::Integer)];
        let (_, expansion) = partition_fields(fields).unwrap();
        let mut exp = expansion.unwrap();
        exp.init(&schema(&[("v", ColumnType::Integer)])).unwrap();

        let doc = Node::from_json(&json!({"xs": []}));
        assert!(exp.expand(&doc, 1, false).is_empty());
        assert_eq!(exp.expand(&doc, 1, true).len(), 1);
    }

    #[test]
    fn test_unknown_column_at_init() {
        let fields = vec![Field::new("v", "$.xs[*].v", ColumnType::Integer)];
        let (_, expansion) = partition_fields(fields).unwrap();
        let mut exp = expansion.unwrap();
        let err = exp.init(&schema(&[("w", ColumnType::Integer)])).unwrap_err();
        assert!(matches!(err, QuernError::UnknownColumn(_)));
    }
}
