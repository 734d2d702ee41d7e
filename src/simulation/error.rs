use thiserror::Error;

use super::types::{MessageId, NodeId};

/// Failures of the simulation core. Every variant is raised before any node
/// or registry state is touched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("node {0} does not exist")]
    InvalidNode(NodeId),

    #[error("node {0} cannot send a unicast message to itself")]
    SelfTarget(NodeId),

    #[error("node {0} already exists")]
    DuplicateNode(NodeId),

    #[error("message {0} is not in the history")]
    UnknownMessage(MessageId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type SimResult<T> = Result<T, SimError>;
