//! Column types, output cells, rows, and the leaf-to-cell coercion rules.

use crate::node::{object_id_hex, Node};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared type of an output column. Drives coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Integer,
    /// Double-precision number.
    Number,
    Boolean,
    Date,
    Binary,
}

/// One populated output cell. A missing cell is `None` in the row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    Binary(Vec<u8>),
}

/// Dense output row indexed by the output schema.
pub type Row = Vec<Option<Cell>>;

/// One typed column slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

/// Ordered sequence of typed column slots with by-name lookup.
#[derive(Debug, Clone, Default)]
pub struct OutputSchema {
    columns: Vec<Column>,
}

impl OutputSchema {
    pub fn new(columns: Vec<Column>) -> Self {
        OutputSchema { columns }
    }

    /// One column per field, named after the field and typed by its
    /// declared type. Indexed fields output integer indices.
    pub fn for_fields(fields: &[super::field::Field]) -> Self {
        OutputSchema {
            columns: fields
                .iter()
                .map(|f| Column {
                    name: f.name.clone(),
                    column_type: if f.indexed_values.is_some() {
                        ColumnType::Integer
                    } else {
                        f.output_type
                    },
                })
                .collect(),
        }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Cell {
    /// JSON rendering for row transport: dates as ISO-8601 strings, binary
    /// as base64.
    pub fn to_json(&self) -> Value {
        match self {
            Cell::String(s) => Value::String(s.clone()),
            Cell::Integer(i) => Value::from(*i),
            Cell::Number(n) => Value::from(*n),
            Cell::Boolean(b) => Value::Bool(*b),
            Cell::Date(d) => Value::String(d.to_rfc3339_opts(SecondsFormat::Secs, true)),
            Cell::Binary(b) => Value::String(STANDARD.encode(b)),
        }
    }
}

/// Render a whole row as a JSON array; null cells become JSON null.
pub fn row_to_json(row: &Row) -> Value {
    Value::Array(
        row.iter()
            .map(|cell| cell.as_ref().map_or(Value::Null, Cell::to_json))
            .collect(),
    )
}

impl ColumnType {
    /// Coerce a source leaf into a cell of this column type.
    ///
    /// Returns `None` (a null cell) on any mismatch or parse failure;
    /// coercion never errors. Records and arrays are not leaves and always
    /// yield `None`.
    pub fn coerce(&self, leaf: &Node) -> Option<Cell> {
        match self {
            ColumnType::String => string_form(leaf).map(Cell::String),
            ColumnType::Integer => to_integer(leaf).map(Cell::Integer),
            ColumnType::Number => to_number(leaf).map(Cell::Number),
            ColumnType::Boolean => to_boolean(leaf).map(Cell::Boolean),
            ColumnType::Date => to_date(leaf).map(Cell::Date),
            ColumnType::Binary => to_binary(leaf).map(Cell::Binary),
        }
    }
}

/// The string form of a leaf, shared by string coercion and indexed-value
/// lookup.
pub(crate) fn string_form(leaf: &Node) -> Option<String> {
    match leaf {
        Node::String(s) | Node::Symbol(s) | Node::Code(s) => Some(s.clone()),
        Node::ObjectId(bytes) => Some(object_id_hex(bytes)),
        Node::MinKey => Some("MinKey".to_string()),
        Node::MaxKey => Some("MaxKey".to_string()),
        Node::Integer(i) => Some(i.to_string()),
        // Rust's Display for f64 is the shortest round-trip form.
        Node::Double(d) => Some(d.to_string()),
        Node::Boolean(b) => Some(if *b { "true" } else { "false" }.to_string()),
        Node::Timestamp { epoch, .. } => Node::timestamp_datetime(*epoch)
            .map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true)),
        Node::Binary(bytes) => Some(STANDARD.encode(bytes)),
        Node::Null | Node::Record(_) | Node::Array(_) => None,
    }
}

fn to_integer(leaf: &Node) -> Option<i64> {
    match leaf {
        Node::String(s) | Node::Symbol(s) | Node::Code(s) => s.parse().ok(),
        Node::ObjectId(bytes) => object_id_hex(bytes).parse().ok(),
        Node::Integer(i) => Some(*i),
        Node::Double(d) if d.fract() == 0.0 => Some(*d as i64),
        Node::Boolean(b) => Some(i64::from(*b)),
        Node::Timestamp { epoch, .. } => Some(*epoch),
        _ => None,
    }
}

fn to_number(leaf: &Node) -> Option<f64> {
    match leaf {
        Node::String(s) | Node::Symbol(s) | Node::Code(s) => s.parse().ok(),
        Node::Integer(i) => Some(*i as f64),
        Node::Double(d) => Some(*d),
        Node::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        Node::Timestamp { epoch, .. } => Some(*epoch as f64),
        _ => None,
    }
}

fn to_boolean(leaf: &Node) -> Option<bool> {
    match leaf {
        Node::String(s) | Node::Symbol(s) | Node::Code(s) => Some(s == "true" || s == "1"),
        Node::Integer(i) => Some(*i != 0),
        Node::Double(d) => Some(*d != 0.0),
        Node::Boolean(b) => Some(*b),
        _ => None,
    }
}

fn to_date(leaf: &Node) -> Option<DateTime<Utc>> {
    match leaf {
        Node::String(s) | Node::Symbol(s) | Node::Code(s) => parse_iso8601(s),
        Node::Integer(epoch) => Node::timestamp_datetime(*epoch),
        Node::Double(d) => Node::timestamp_datetime(d.trunc() as i64),
        Node::Timestamp { epoch, .. } => Node::timestamp_datetime(*epoch),
        _ => None,
    }
}

fn to_binary(leaf: &Node) -> Option<Vec<u8>> {
    match leaf {
        Node::String(s) | Node::Symbol(s) | Node::Code(s) => Some(s.as_bytes().to_vec()),
        Node::ObjectId(bytes) => Some(object_id_hex(bytes).into_bytes()),
        Node::MinKey => Some(b"MinKey".to_vec()),
        Node::MaxKey => Some(b"MaxKey".to_vec()),
        Node::Integer(i) => Some(i.to_be_bytes().to_vec()),
        Node::Binary(bytes) => Some(bytes.clone()),
        _ => None,
    }
}

fn parse_iso8601(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
        return Some(parsed.into());
    }
    // Bare dates are accepted as midnight UTC.
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_coerces_to_null_everywhere() {
        for ty in [
            ColumnType::String,
            ColumnType::Integer,
            ColumnType::Number,
            ColumnType::Boolean,
            ColumnType::Date,
            ColumnType::Binary,
        ] {
            assert_eq!(ty.coerce(&Node::Null), None);
        }
    }

    #[test]
    fn test_integer_coercions() {
        let n = Node::Integer(42);
        assert_eq!(
            ColumnType::String.coerce(&n),
            Some(Cell::String("42".to_string()))
        );
        assert_eq!(ColumnType::Number.coerce(&n), Some(Cell::Number(42.0)));
        assert_eq!(ColumnType::Boolean.coerce(&n), Some(Cell::Boolean(true)));
        assert_eq!(
            ColumnType::Binary.coerce(&n),
            Some(Cell::Binary(42i64.to_be_bytes().to_vec()))
        );
    }

    #[test]
    fn test_double_truncates_only_when_integral() {
        assert_eq!(
            ColumnType::Integer.coerce(&Node::Double(3.0)),
            Some(Cell::Integer(3))
        );
        assert_eq!(ColumnType::Integer.coerce(&Node::Double(3.5)), None);
    }

    #[test]
    fn test_string_parse_failures_are_null() {
        let s = Node::String("not-a-number".to_string());
        assert_eq!(ColumnType::Integer.coerce(&s), None);
        assert_eq!(ColumnType::Number.coerce(&s), None);
        assert_eq!(ColumnType::Date.coerce(&s), None);
    }

    #[test]
    fn test_boolean_string_forms() {
        for (input, expected) in [("true", true), ("1", true), ("yes", false), ("0", false)] {
            assert_eq!(
                ColumnType::Boolean.coerce(&Node::String(input.to_string())),
                Some(Cell::Boolean(expected))
            );
        }
    }

    #[test]
    fn test_date_from_iso_and_epoch() {
        let from_string = ColumnType::Date
            .coerce(&Node::String("2021-06-01T12:00:00Z".to_string()))
            .unwrap();
        let Cell::Date(d) = from_string else {
            panic!("expected date cell");
        };
        assert_eq!(d.timestamp(), 1622548800);

        assert_eq!(
            ColumnType::Date.coerce(&Node::Integer(1622548800)),
            Some(Cell::Date(Node::timestamp_datetime(1622548800).unwrap()))
        );
        // Bare ISO date parses as midnight.
        assert!(ColumnType::Date
            .coerce(&Node::String("2021-06-01".to_string()))
            .is_some());
    }

    #[test]
    fn test_binary_to_string_is_base64() {
        assert_eq!(
            ColumnType::String.coerce(&Node::Binary(b"hello".to_vec())),
            Some(Cell::String("aGVsbG8=".to_string()))
        );
        assert_eq!(ColumnType::Integer.coerce(&Node::Binary(vec![1])), None);
    }

    #[test]
    fn test_timestamp_coercions() {
        let ts = Node::Timestamp {
            epoch: 1500000000,
            ordinal: 3,
        };
        assert_eq!(
            ColumnType::Integer.coerce(&ts),
            Some(Cell::Integer(1500000000))
        );
        assert_eq!(ColumnType::Boolean.coerce(&ts), None);
    }

    #[test]
    fn test_containers_never_coerce() {
        let record = Node::record(vec![("a".to_string(), Node::Integer(1))]);
        assert_eq!(ColumnType::String.coerce(&record), None);
        assert_eq!(ColumnType::String.coerce(&Node::Array(vec![])), None);
    }

    #[test]
    fn test_row_to_json() {
        let row: Row = vec![Some(Cell::Integer(1)), None, Some(Cell::Boolean(true))];
        assert_eq!(row_to_json(&row), serde_json::json!([1, null, true]));
    }
}
