//! The projection facade: descriptor intake, plan compilation, and
//! per-document row production.

use crate::discover::{DocumentSource, FieldDiscovery, TreeWalkDiscovery};
use crate::error::QuernError;
use crate::node::Node;
use crate::project::expansion::{partition_fields, ArrayExpansion};
use crate::project::field::Field;
use crate::project::types::{OutputSchema, Row};

/// Compiled projection state: the normal set, the optional expansion group,
/// and the bound output schema.
#[derive(Debug)]
struct Plan {
    normal: Vec<Field>,
    expansion: Option<ArrayExpansion>,
    schema: OutputSchema,
}

/// Drives projection of documents into output rows.
///
/// A `Projector` is single-threaded: compile a plan once with
/// [`Projector::init`], then call [`Projector::project`] per document. Rows
/// within one document are emitted in increasing expansion-array order.
///
/// Field discovery is an injected capability; the default is the built-in
/// sampling tree walk.
pub struct Projector {
    fields: Vec<Field>,
    plan: Option<Plan>,
    discovery: Box<dyn FieldDiscovery>,
}

impl Projector {
    pub fn new() -> Self {
        Self::with_discovery(Box::new(TreeWalkDiscovery))
    }

    /// Construct with an explicit discovery backend.
    pub fn with_discovery(discovery: Box<dyn FieldDiscovery>) -> Self {
        Projector {
            fields: Vec::new(),
            plan: None,
            discovery,
        }
    }

    /// Replace the descriptor list (deep copy). Invalidates any compiled
    /// plan until the next `init`.
    pub fn set_fields(&mut self, fields: &[Field]) {
        self.fields = fields.to_vec();
        self.plan = None;
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Compile the projection plan against an output schema.
    ///
    /// Partitions descriptors into the normal set and at most one expansion
    /// group, then binds every descriptor name to its output column.
    pub fn init(&mut self, schema: OutputSchema) -> Result<(), QuernError> {
        let (mut normal, mut expansion) = partition_fields(self.fields.clone())?;

        for field in &mut normal {
            let index = schema
                .index_of(&field.name)
                .ok_or_else(|| QuernError::UnknownColumn(field.name.clone()))?;
            field.init(index)?;
        }
        if let Some(exp) = &mut expansion {
            exp.init(&schema)?;
        }

        self.plan = Some(Plan {
            normal,
            expansion,
            schema,
        });
        Ok(())
    }

    /// Project one document into 1..N output rows.
    ///
    /// Without an expansion group every document yields exactly one row.
    /// With one, the document yields a row per element of the array at the
    /// expansion prefix; normal-set cells are copied onto every row.
    pub fn project(&self, doc: &Node) -> Result<Vec<Row>, QuernError> {
        let plan = self.plan.as_ref().ok_or(QuernError::Uninitialized)?;
        let row_len = plan.schema.len();

        let mut rows = match &plan.expansion {
            Some(exp) => exp.expand(doc, row_len, !plan.normal.is_empty()),
            None => vec![vec![None; row_len]],
        };

        for field in &plan.normal {
            let cell = field.convert(doc);
            for row in &mut rows {
                row[field.output_index()] = cell.clone();
            }
        }

        Ok(rows)
    }

    /// Sample documents from `source` and propose a descriptor list.
    /// `sample_size == 0` uses the default of 100.
    pub fn infer_fields(
        &self,
        source: &mut dyn DocumentSource,
        sample_size: usize,
    ) -> Result<Vec<Field>, QuernError> {
        self.discovery.discover_fields(source, sample_size)
    }
}

impl Default for Projector {
    fn default() -> Self {
        Self::new()
    }
}
