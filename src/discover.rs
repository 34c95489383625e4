//! Field discovery: sample documents, merge observed leaf paths into a
//! canonical descriptor list, and report it synchronously or through a
//! driver-supplied dispatcher.
//!
//! Canonical paths abstract array positions into `[min:max]` ranges in the
//! display name while the resolution path keeps a `[-]` placeholder per array
//! step; emission collapses each placeholder to the minimum observed index.

use crate::error::QuernError;
use crate::node::Node;
use crate::path::{set_min_array_indexes, update_max_array_indexes};
use crate::project::field::Field;
use crate::project::types::ColumnType;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Documents sampled per discovery run when the caller asks for zero.
pub const DEFAULT_SAMPLE_SIZE: usize = 100;

/// Default port of the canonical document database. Informational; this
/// crate opens no sockets.
pub const MONGO_DEFAULT_PORT: u16 = 27017;

/// A finite lazy sequence of document trees.
pub trait DocumentSource {
    fn next_document(&mut self) -> Option<anyhow::Result<Node>>;
}

impl<I> DocumentSource for I
where
    I: Iterator<Item = anyhow::Result<Node>>,
{
    fn next_document(&mut self) -> Option<anyhow::Result<Node>> {
        self.next()
    }
}

/// The discovery capability injected into the projection facade.
pub trait FieldDiscovery {
    /// Sample up to `sample_size` documents (0 means the default of 100)
    /// and propose a descriptor list.
    fn discover_fields(
        &self,
        source: &mut dyn DocumentSource,
        sample_size: usize,
    ) -> Result<Vec<Field>, QuernError>;
}

/// Dispatches completion callbacks onto the driver's context (UI thread,
/// executor, or inline for tests).
pub trait Dispatcher {
    fn post(&self, task: Box<dyn FnOnce() + Send>);
}

/// Runs tasks on the calling thread.
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn post(&self, task: Box<dyn FnOnce() + Send>) {
        task();
    }
}

/// Completion surface for asynchronous discovery. Each method is invoked at
/// most once per run.
pub trait DiscoverFieldsCallback {
    fn notify_fields(&self, fields: Vec<Field>);
    fn notify_exception(&self, error: QuernError);
}

/// Run discovery and deliver the outcome through `dispatcher`.
///
/// Empty field lists are not dispatched; failures go to `notify_exception`.
pub fn discover_fields_async(
    discovery: &dyn FieldDiscovery,
    source: &mut dyn DocumentSource,
    sample_size: usize,
    dispatcher: &dyn Dispatcher,
    callback: Arc<dyn DiscoverFieldsCallback + Send + Sync>,
) {
    match discovery.discover_fields(source, sample_size) {
        Ok(fields) => {
            if fields.is_empty() {
                return;
            }
            dispatcher.post(Box::new(move || callback.notify_fields(fields)));
        }
        Err(error) => {
            dispatcher.post(Box::new(move || callback.notify_exception(error)));
        }
    }
}

/// The built-in discovery backend: a depth-first walk over sampled
/// documents.
pub struct TreeWalkDiscovery;

/// Aggregated observation of one canonical leaf path.
struct Discovered {
    /// Display name with `[min:max]` ranges.
    name: String,
    /// Resolution path with `[-]` placeholders at array steps.
    path: String,
    output_type: ColumnType,
}

impl FieldDiscovery for TreeWalkDiscovery {
    fn discover_fields(
        &self,
        source: &mut dyn DocumentSource,
        sample_size: usize,
    ) -> Result<Vec<Field>, QuernError> {
        let limit = if sample_size == 0 {
            DEFAULT_SAMPLE_SIZE
        } else {
            sample_size
        };

        let mut observed: BTreeMap<String, Discovered> = BTreeMap::new();
        let mut sampled = 0;
        while sampled < limit {
            match source.next_document() {
                None => break,
                Some(Err(error)) => return Err(wrap_source_error(error)),
                Some(Ok(doc)) => {
                    walk_node(&doc, "", "$", "", &mut observed)?;
                    sampled += 1;
                }
            }
        }

        Ok(observed
            .into_values()
            .map(|d| {
                let path = set_min_array_indexes(&d.name, &d.path);
                Field::new(d.name, path, d.output_type)
            })
            .collect())
    }
}

fn wrap_source_error(error: anyhow::Error) -> QuernError {
    match error.downcast::<QuernError>() {
        Ok(own) => own,
        Err(other) => QuernError::SourceFailure(other),
    }
}

fn walk_node(
    node: &Node,
    name: &str,
    path: &str,
    shape: &str,
    observed: &mut BTreeMap<String, Discovered>,
) -> Result<(), QuernError> {
    match node {
        Node::Record(members) => {
            for (key, child) in members {
                let child_name = if name.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", name, key)
                };
                walk_node(
                    child,
                    &child_name,
                    &format!("{}.{}", path, key),
                    &format!("{}.{}", shape, key),
                    observed,
                )?;
            }
        }
        Node::Array(items) => {
            for (index, element) in items.iter().enumerate() {
                walk_node(
                    element,
                    &format!("{}[{}:{}]", name, index, index),
                    &format!("{}[-]", path),
                    &format!("{}[]", shape),
                    observed,
                )?;
            }
        }
        leaf => {
            let observed_type = leaf_column_type(leaf);
            match observed.entry(shape.to_string()) {
                Entry::Vacant(slot) => {
                    slot.insert(Discovered {
                        name: name.to_string(),
                        path: path.to_string(),
                        output_type: observed_type,
                    });
                }
                Entry::Occupied(mut slot) => {
                    let entry = slot.get_mut();
                    entry.name = update_max_array_indexes(&entry.name, name)?;
                    entry.output_type = widen(entry.output_type, observed_type);
                }
            }
        }
    }
    Ok(())
}

/// Declared type proposed for a single observed leaf.
///
/// Doubles with a zero fractional part count as integers; conflicting
/// observations widen later in [`widen`].
fn leaf_column_type(leaf: &Node) -> ColumnType {
    match leaf {
        Node::Integer(_) => ColumnType::Integer,
        Node::Double(d) if d.fract() == 0.0 => ColumnType::Integer,
        Node::Double(_) => ColumnType::Number,
        Node::Boolean(_) => ColumnType::Boolean,
        Node::Timestamp { .. } => ColumnType::Date,
        Node::Binary(_) => ColumnType::Binary,
        _ => ColumnType::String,
    }
}

/// Widening lattice for conflicting observations: integers and numbers meet
/// at number, everything else meets at string.
fn widen(a: ColumnType, b: ColumnType) -> ColumnType {
    use ColumnType::{Integer, Number, String};
    match (a, b) {
        _ if a == b => a,
        (Integer, Number) | (Number, Integer) => Number,
        _ => String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::bracket_count;
    use serde_json::json;
    use std::sync::Mutex;

    fn source_of(docs: Vec<serde_json::Value>) -> impl DocumentSource {
        docs.into_iter().map(|v| Ok(Node::from_json(&v)))
    }

    fn discover(docs: Vec<serde_json::Value>, sample_size: usize) -> Vec<Field> {
        TreeWalkDiscovery
            .discover_fields(&mut source_of(docs), sample_size)
            .unwrap()
    }

    #[test]
    fn test_flat_document() {
        let fields = discover(vec![json!({"a": 1, "b": "x"})], 0);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "a");
        assert_eq!(fields[0].path, "$.a");
        assert_eq!(fields[0].output_type, ColumnType::Integer);
        assert_eq!(fields[1].output_type, ColumnType::String);
    }

    #[test]
    fn test_array_range_merge() {
        let fields = discover(
            vec![
                json!({"xs": [{"v": 1}]}),
                json!({"xs": [{"v": 1}, {"v": 2}, {"v": 3}]}),
            ],
            0,
        );
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "xs[0:2].v");
        assert_eq!(fields[0].path, "$.xs[0].v");
        assert_eq!(fields[0].output_type, ColumnType::Integer);
    }

    #[test]
    fn test_type_widening() {
        let fields = discover(vec![json!({"n": 1}), json!({"n": 2.5})], 0);
        assert_eq!(fields[0].output_type, ColumnType::Number);

        let fields = discover(vec![json!({"n": 1}), json!({"n": "x"})], 0);
        assert_eq!(fields[0].output_type, ColumnType::String);
    }

    #[test]
    fn test_integral_double_counts_as_integer() {
        let fields = discover(vec![json!({"n": 2.0})], 0);
        assert_eq!(fields[0].output_type, ColumnType::Integer);
    }

    #[test]
    fn test_bracket_counts_match_between_name_and_path() {
        let fields = discover(
            vec![json!({"m": [{"n": [1, 2]}, {"n": [3]}], "s": "x"})],
            0,
        );
        for field in &fields {
            assert_eq!(bracket_count(&field.name), bracket_count(&field.path));
        }
    }

    #[test]
    fn test_sample_limit_defaults_to_100() {
        let mut docs: Vec<serde_json::Value> = (0..100).map(|i| json!({"a": i})).collect();
        docs.push(json!({"late": true}));
        let fields = discover(docs, 0);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "a");
    }

    #[test]
    fn test_source_failure_is_wrapped() {
        let mut source =
            std::iter::once::<anyhow::Result<Node>>(Err(anyhow::anyhow!("connection reset")));
        let err = TreeWalkDiscovery
            .discover_fields(&mut source, 0)
            .unwrap_err();
        assert!(matches!(err, QuernError::SourceFailure(_)));
        assert_eq!(err.to_string(), "Unable to discover fields");
    }

    #[test]
    fn test_own_error_kind_passes_through() {
        let mut source = std::iter::once::<anyhow::Result<Node>>(Err(anyhow::Error::new(
            QuernError::InvalidPath("$bad".to_string()),
        )));
        let err = TreeWalkDiscovery
            .discover_fields(&mut source, 0)
            .unwrap_err();
        assert!(matches!(err, QuernError::InvalidPath(_)));
    }

    #[derive(Default)]
    struct RecordingCallback {
        fields: Mutex<Option<Vec<Field>>>,
        errors: Mutex<usize>,
    }

    impl DiscoverFieldsCallback for RecordingCallback {
        fn notify_fields(&self, fields: Vec<Field>) {
            *self.fields.lock().unwrap() = Some(fields);
        }

        fn notify_exception(&self, _error: QuernError) {
            *self.errors.lock().unwrap() += 1;
        }
    }

    #[test]
    fn test_async_dispatches_fields() {
        let callback = Arc::new(RecordingCallback::default());
        discover_fields_async(
            &TreeWalkDiscovery,
            &mut source_of(vec![json!({"a": 1})]),
            0,
            &InlineDispatcher,
            callback.clone(),
        );
        let delivered = callback.fields.lock().unwrap().take().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(*callback.errors.lock().unwrap(), 0);
    }

    #[test]
    fn test_async_skips_empty_field_lists() {
        let callback = Arc::new(RecordingCallback::default());
        discover_fields_async(
            &TreeWalkDiscovery,
            &mut source_of(vec![]),
            0,
            &InlineDispatcher,
            callback.clone(),
        );
        assert!(callback.fields.lock().unwrap().is_none());
        assert_eq!(*callback.errors.lock().unwrap(), 0);
    }

    #[test]
    fn test_async_reports_failures() {
        let callback = Arc::new(RecordingCallback::default());
        let mut source =
            std::iter::once::<anyhow::Result<Node>>(Err(anyhow::anyhow!("boom")));
        discover_fields_async(
            &TreeWalkDiscovery,
            &mut source,
            0,
            &InlineDispatcher,
            callback.clone(),
        );
        assert_eq!(*callback.errors.lock().unwrap(), 1);
    }
}
