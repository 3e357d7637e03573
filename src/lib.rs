pub mod op;
pub mod lamport;
pub mod replica_log;
pub mod message;
pub mod finalize;
pub mod transport;
pub mod replica;
pub mod naive;
pub mod config;
pub mod cluster;

pub type Result<T> = anyhow::Result<T>;

/// Node (or replica) identifier.
pub type NodeId = u32;

pub use op::Operation;
pub use lamport::LamportClock;
pub use replica_log::{LogEntry, ReplicaLog};
pub use message::Message;
pub use finalize::{finalize, Finalized};
pub use replica::{Replica, ReplicaNode, ReplicaHandle, ReplicaError, Phase};
pub use cluster::{Cluster, Scenario, Step};
pub use config::Config;
