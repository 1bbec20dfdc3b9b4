use jackdaw_commands::{PropertyAccessError, TransactionError};

use crate::node::NodeId;

/// A fault that stops a node from rendering.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EditorFault {
    #[error("expected `{expected}`, found `{found}`")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },
    #[error("cannot read property: {0}")]
    Unreadable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    #[error("cannot resize to negative length {0}")]
    NegativeSize(i64),
    #[error("selected targets hold different lists; resizing needs a uniform selection")]
    DivergentSelection,
    #[error("`{0}` has a fixed length")]
    FixedLength(&'static str),
    #[error("'{0}' is not a list")]
    NotAList(String),
    #[error("no default value is registered for `{0}`")]
    MissingDefault(&'static str),
    #[error("a resize is already in progress")]
    Busy,
}

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),
    #[error("'{0}' is not active")]
    NotActive(String),
    #[error("'{0}' is read-only")]
    ReadOnly(String),
    #[error(transparent)]
    Access(#[from] PropertyAccessError),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error(transparent)]
    Collection(#[from] CollectionError),
}
