use crate::node::{MarkType, NodeKind};
use thiserror::Error;

pub type SchemaResult<T> = Result<T, SchemaError>;

/// A structural rule of the schema that a document breaks
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Document root must be a doc node, found {0}")]
    InvalidRoot(NodeKind),

    #[error("{parent} cannot contain {child} (at {path:?})")]
    InvalidChild {
        parent: NodeKind,
        child: NodeKind,
        path: Vec<usize>,
    },

    #[error("{kind} must not be empty (at {path:?})")]
    EmptyContainer { kind: NodeKind, path: Vec<usize> },

    #[error("Missing required attribute `{attr}` on {kind} (at {path:?})")]
    MissingAttr {
        kind: NodeKind,
        attr: String,
        path: Vec<usize>,
    },

    #[error("Unknown attribute `{attr}` on {kind}")]
    UnknownAttr { kind: NodeKind, attr: String },

    #[error("Invalid value `{value}` for attribute `{attr}` on {kind}")]
    InvalidAttr {
        kind: NodeKind,
        attr: String,
        value: String,
    },

    #[error("Table rows have differing cell counts (at {path:?})")]
    RaggedTable { path: Vec<usize> },

    #[error("Empty text node (at {path:?})")]
    EmptyText { path: Vec<usize> },

    #[error("Adjacent text nodes share the same marks (at {path:?})")]
    UnmergedText { path: Vec<usize> },

    #[error("Marks are only allowed on text nodes ({kind} at {path:?})")]
    MarksOnNonText { kind: NodeKind, path: Vec<usize> },

    #[error("Invalid {mark} mark: {reason}")]
    InvalidMark { mark: MarkType, reason: String },
}

impl SchemaError {
    pub fn invalid_child(parent: NodeKind, child: NodeKind, path: &[usize]) -> Self {
        Self::InvalidChild {
            parent,
            child,
            path: path.to_vec(),
        }
    }

    pub fn invalid_attr(kind: NodeKind, attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidAttr {
            kind,
            attr: attr.into(),
            value: value.into(),
        }
    }
}
