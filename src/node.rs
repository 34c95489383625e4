//! The document tree: one tagged variant for records, arrays, and every
//! primitive leaf kind, plus a bridge from JSON.
//!
//! Record member order is irrelevant (names are unique), so records use a
//! `BTreeMap`. Nothing in the crate mutates a document after construction.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

/// A node in a document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Mapping from member name to child node.
    Record(BTreeMap<String, Node>),
    /// Ordered sequence of child nodes.
    Array(Vec<Node>),
    String(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    /// Seconds since the Unix epoch plus an intra-second ordinal.
    Timestamp { epoch: i64, ordinal: u32 },
    Binary(Vec<u8>),
    /// Opaque 12-byte identifier.
    ObjectId([u8; 12]),
    /// Code snippet; projects like a string.
    Code(String),
    Symbol(String),
    MinKey,
    MaxKey,
    Null,
}

impl Node {
    /// Build a record node from `(name, child)` pairs.
    pub fn record<I>(members: I) -> Node
    where
        I: IntoIterator<Item = (String, Node)>,
    {
        Node::Record(members.into_iter().collect())
    }

    pub fn is_leaf(&self) -> bool {
        !matches!(self, Node::Record(_) | Node::Array(_))
    }

    /// Convert a JSON value into a document tree.
    ///
    /// Plain JSON maps structurally (integers to `Integer`, other numbers to
    /// `Double`). Single-key objects in MongoDB extended-JSON notation map to
    /// the corresponding leaf kind so that every kind is reachable from JSON
    /// input: `$oid`, `$date`, `$binary`, `$timestamp`, `$code`, `$symbol`,
    /// `$numberLong`, `$minKey`, `$maxKey`. Anything unrecognized falls back
    /// to a plain record.
    pub fn from_json(value: &Value) -> Node {
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Boolean(*b),
            Value::String(s) => Node::String(s.clone()),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Node::Integer(i)
                } else {
                    Node::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::Array(items) => Node::Array(items.iter().map(Node::from_json).collect()),
            Value::Object(map) => {
                if map.len() == 1 {
                    let (key, inner) = map.iter().next().unwrap();
                    if let Some(node) = Self::from_extended_json(key, inner) {
                        return node;
                    }
                }
                Node::Record(
                    map.iter()
                        .map(|(k, v)| (k.clone(), Node::from_json(v)))
                        .collect(),
                )
            }
        }
    }

    fn from_extended_json(key: &str, inner: &Value) -> Option<Node> {
        match key {
            "$oid" => {
                let hex = inner.as_str()?;
                decode_object_id(hex).map(Node::ObjectId)
            }
            "$date" => match inner {
                // Epoch milliseconds, the canonical wire form.
                Value::Number(n) => {
                    let millis = n.as_i64()?;
                    Some(Node::Timestamp {
                        epoch: millis.div_euclid(1000),
                        ordinal: 0,
                    })
                }
                Value::String(s) => {
                    let parsed: DateTime<Utc> = DateTime::parse_from_rfc3339(s).ok()?.into();
                    Some(Node::Timestamp {
                        epoch: parsed.timestamp(),
                        ordinal: 0,
                    })
                }
                _ => None,
            },
            "$timestamp" => {
                let t = inner.get("t")?.as_i64()?;
                let i = inner.get("i")?.as_u64()? as u32;
                Some(Node::Timestamp {
                    epoch: t,
                    ordinal: i,
                })
            }
            "$binary" => {
                use base64::{engine::general_purpose::STANDARD, Engine as _};
                let encoded = match inner {
                    Value::String(s) => s.as_str(),
                    Value::Object(sub) => sub.get("base64")?.as_str()?,
                    _ => return None,
                };
                STANDARD.decode(encoded).ok().map(Node::Binary)
            }
            "$code" => inner.as_str().map(|s| Node::Code(s.to_string())),
            "$symbol" => inner.as_str().map(|s| Node::Symbol(s.to_string())),
            "$numberLong" => inner.as_str()?.parse::<i64>().ok().map(Node::Integer),
            "$minKey" => Some(Node::MinKey),
            "$maxKey" => Some(Node::MaxKey),
            _ => None,
        }
    }

    /// The timestamp as a chrono instant, when representable.
    pub fn timestamp_datetime(epoch: i64) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(epoch, 0).single()
    }
}

/// Render a 12-byte identifier as 24 lowercase hex digits.
pub fn object_id_hex(bytes: &[u8; 12]) -> String {
    let mut out = String::with_capacity(24);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

fn decode_object_id(hex: &str) -> Option<[u8; 12]> {
    if hex.len() != 24 {
        return None;
    }
    let mut bytes = [0u8; 12];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let pair = std::str::from_utf8(chunk).ok()?;
        bytes[i] = u8::from_str_radix(pair, 16).ok()?;
    }
    Some(bytes)
}
