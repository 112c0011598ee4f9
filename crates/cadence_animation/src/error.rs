//! Error types for the animator tree

use thiserror::Error;

use crate::tree::NodeId;

/// Errors from addressing nodes in an [`AnimatorTree`](crate::tree::AnimatorTree)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The node does not exist or was removed
    #[error("unknown animator node {0:?}")]
    UnknownNode(NodeId),

    /// The requested parent does not exist or was removed
    #[error("unknown parent node {0:?}")]
    UnknownParent(NodeId),
}
