use std::result::Result as StdResult;

use thiserror::Error;

use crate::{NodeId, dom::ElementId, state::State};

/// Result type for arbor operations.
pub type Result<T> = StdResult<T, Error>;

/// Core error type.
///
/// Invalid arguments and illegal lifecycle transitions are distinct variants.
/// Structural lookups that simply miss (removing something that is not a
/// child) are not errors and resolve to `None` or `false` instead.
#[derive(PartialEq, Eq, Error, Debug, Clone)]
pub enum Error {
    #[error("node not found: {0:?}")]
    /// A node ID that is not in the arena.
    NodeNotFound(NodeId),
    #[error("element not found: {0:?}")]
    /// An element ID that is not in the document.
    ElementNotFound(ElementId),
    #[error("not a list: {0:?}")]
    /// A list operation was applied to a plain component.
    NotAList(NodeId),
    #[error("index {index} out of range for length {len}")]
    /// An index-addressed operation was given an index past the end.
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of items at the time of the call.
        len: usize,
    },
    #[error("invalid: {0}")]
    /// Invalid input error.
    Invalid(String),
    #[error("element cannot be decorated: {0:?}")]
    /// The renderer refused to decorate an element.
    CannotDecorate(ElementId),

    #[error("component is in the document: {0:?}")]
    /// The operation is forbidden while the component is in the document.
    InDocument(NodeId),
    #[error("component already rendered: {0:?}")]
    /// The component already owns an element.
    AlreadyRendered(NodeId),
    #[error("state {state:?} is not supported by {node:?}")]
    /// A state was set on a component that does not support it.
    UnsupportedState {
        /// Target component.
        node: NodeId,
        /// Rejected state.
        state: State,
    },
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Invalid(e.to_string())
    }
}
