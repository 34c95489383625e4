//! Typed errors for plan construction and field discovery.

use thiserror::Error;

/// Errors raised while compiling a projection plan or discovering fields.
///
/// Missing data during projection is never an error: absent children,
/// out-of-range indices, and failed coercions all yield null cells.
#[derive(Debug, Error)]
pub enum QuernError {
    /// A path string that does not conform to the `$.name[idx]` grammar.
    #[error("invalid field path '{0}'")]
    InvalidPath(String),

    /// A single path contains more than one `[*]` expansion.
    #[error("field path '{0}' contains multiple array expansions")]
    MultipleExpansions(String),

    /// Two paths disagree on the array-expansion prefix.
    #[error("field paths contain different array expansions: '{first}' vs '{second}'")]
    DifferentExpansions { first: String, second: String },

    /// A descriptor name has no matching column in the output schema.
    #[error("field '{0}' is not present in the output schema")]
    UnknownColumn(String),

    /// An inference merge was attempted between paths with unequal
    /// numbers of array parts.
    #[error(
        "field name '{name}' and update path '{update}' do not contain \
         the same number of array parts"
    )]
    ArrayShapeMismatch { name: String, update: String },

    /// `project` was called before `init` compiled a plan.
    #[error("projection plan has not been initialized")]
    Uninitialized,

    /// A document source failed during field discovery.
    #[error("Unable to discover fields")]
    SourceFailure(#[source] anyhow::Error),
}
