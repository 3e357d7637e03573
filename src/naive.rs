//! Clock-less baseline: every node applies commands immediately, in whatever order they arrive.
//! Without logical time two nodes receiving the same commands in a different order end up in
//! different states. Kept as a contrast case to `crate::replica`.

use std::time::Duration;
use rand::Rng;
use tokio::sync::{mpsc, oneshot};
use crate::op::Operation;
use crate::replica::ReplicaError;
use crate::NodeId;

/// A node that applies every received command to its state right away.
pub struct NaiveNode {
    id: NodeId,
    state: i64,
    commands: mpsc::Receiver<Operation>,
    output: oneshot::Sender<i64>,
}

impl NaiveNode {
    pub fn spawn(id: NodeId, initial: i64, capacity: usize) -> NaiveHandle {
        let (tx, commands) = mpsc::channel(capacity);
        let (output, result) = oneshot::channel();
        let node = NaiveNode { id, state: initial, commands, output };
        tokio::spawn(node.run());
        NaiveHandle { id, commands: tx, result }
    }

    async fn run(mut self) {
        while let Some(op) = self.commands.recv().await {
            if op.is_terminate() {
                break;
            }
            self.state = op.apply(self.state);
            log::info!("node {} applied {}, updated state to {}", self.id, op, self.state);
        }
        self.commands.close();
        if self.output.send(self.state).is_err() {
            log::debug!("node {}: final state has no reader", self.id);
        }
    }
}

#[derive(Debug, Clone)]
pub struct NaiveSender {
    id: NodeId,
    commands: mpsc::Sender<Operation>,
}

impl NaiveSender {
    pub async fn send(&self, op: Operation) -> Result<(), ReplicaError> {
        self.commands.send(op).await.map_err(|_| ReplicaError::Stopped(self.id))
    }
}

#[derive(Debug)]
pub struct NaiveHandle {
    id: NodeId,
    commands: mpsc::Sender<Operation>,
    result: oneshot::Receiver<i64>,
}

impl NaiveHandle {
    /// Returns a cloneable sender, which can be used by clients to submit commands.
    pub fn sender(&self) -> NaiveSender {
        NaiveSender { id: self.id, commands: self.commands.clone() }
    }

    pub async fn terminate(&self) -> Result<(), ReplicaError> {
        self.sender().send(Operation::Terminate).await
    }

    pub async fn state(self) -> Result<i64, ReplicaError> {
        self.result.await.map_err(|_| ReplicaError::Stopped(self.id))
    }
}

/// Sends a given command to every node in turn, sleeping for a random delay in `[0, max_delay)`
/// before each send to simulate network latency.
pub async fn broadcast(op: Operation, nodes: &[NaiveSender], max_delay: Duration) -> Result<(), ReplicaError> {
    log::info!("client sent {} to {} nodes", op, nodes.len());
    for node in nodes {
        tokio::time::sleep(random_delay(max_delay)).await;
        node.send(op).await?;
    }
    Ok(())
}

fn random_delay(max: Duration) -> Duration {
    let max = max.as_millis() as u64;
    if max == 0 {
        Duration::from_millis(0)
    } else {
        Duration::from_millis(rand::thread_rng().gen_range(0..max))
    }
}
