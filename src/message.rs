use serde::{Serialize, Deserialize};
use crate::op::Operation;
use crate::lamport::Timestamp;
use crate::NodeId;

/// Replication message sent from one replica to its peer. `timestamp` carries the sender's clock
/// value at the moment of sending.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub from: NodeId,
    pub timestamp: Timestamp,
    pub operation: Operation,
}

impl Message {
    pub fn new(from: NodeId, timestamp: Timestamp, operation: Operation) -> Self {
        Message { from, timestamp, operation }
    }
}
