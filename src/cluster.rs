use std::sync::Arc;
use anyhow::Context;
use crate::config::Config;
use crate::finalize::Finalized;
use crate::naive::{self, NaiveNode};
use crate::op::Operation;
use crate::replica::{ReplicaNode, ReplicaHandle};
use crate::transport::Topology;
use crate::NodeId;

pub const A: NodeId = 1;
pub const B: NodeId = 2;

/// A single operation submitted directly to a given node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub node: NodeId,
    pub op: Operation,
}

impl Step {
    pub fn new(node: NodeId, op: Operation) -> Self {
        Step { node, op }
    }
}

/// Scripted sequence of submissions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scenario(Vec<Step>);

impl Scenario {
    pub fn new(steps: Vec<Step>) -> Self { Scenario(steps) }

    /// Node A gets `add 5` then `multiply 3`, node B gets `multiply 3` then `add 5`.
    pub fn textbook() -> Self {
        Scenario(vec![
            Step::new(A, Operation::Add(5)),
            Step::new(A, Operation::Multiply(3)),
            Step::new(B, Operation::Multiply(3)),
            Step::new(B, Operation::Add(5)),
        ])
    }

    pub fn steps(&self) -> &[Step] { &self.0 }

    /// Distinct operations of current scenario in order of their first appearance.
    pub fn commands(&self) -> Vec<Operation> {
        let mut ops = Vec::new();
        for step in self.0.iter() {
            if !ops.contains(&step.op) {
                ops.push(step.op);
            }
        }
        ops
    }
}

/// Final outputs of both nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub a: Finalized,
    pub b: Finalized,
}

impl Outcome {
    pub fn converged(&self) -> bool { self.a.state == self.b.state }
}

/// Two replica nodes wired with a pair of bounded replication links.
pub struct Cluster {
    config: Config,
    a: ReplicaHandle,
    b: ReplicaHandle,
}

impl Cluster {

    /// Builds the replication topology and spawns both nodes on the current tokio runtime.
    pub fn start(config: Config) -> crate::Result<Self> {
        config.validate()?;
        let mut topology = Topology::default();
        let (inbox_a, inbox_b) = topology.connect(A, B, config.channel_capacity);
        let route_a = Arc::new(topology.route(A)?);
        let route_b = Arc::new(topology.route(B)?);
        // nodes own the only senders, so an inbox closes once its peer stops
        drop(topology);

        let a = ReplicaNode::spawn(A, config.initial_state, config.channel_capacity, route_a, inbox_a);
        let b = ReplicaNode::spawn(B, config.initial_state, config.channel_capacity, route_b, inbox_b);
        log::debug!("cluster started: {:?}", config);
        Ok(Cluster { config, a, b })
    }

    fn node(&self, id: NodeId) -> crate::Result<&ReplicaHandle> {
        [&self.a, &self.b].into_iter()
            .find(|node| node.id() == id)
            .ok_or_else(|| anyhow::anyhow!("unknown node {}", id))
    }

    pub async fn submit(&self, node: NodeId, op: Operation) -> crate::Result<()> {
        self.node(node)?.submit(op).await?;
        Ok(())
    }

    /// Submits every step of a given `scenario`, pausing for the configured step delay after each.
    pub async fn run(&self, scenario: &Scenario) -> crate::Result<()> {
        for step in scenario.steps() {
            self.submit(step.node, step.op).await
                .with_context(|| format!("failed to submit {} to node {}", step.op, step.node))?;
            tokio::time::sleep(self.config.step_delay).await;
        }
        Ok(())
    }

    /// Terminates both nodes and waits for their finalized outputs.
    pub async fn shutdown(self) -> crate::Result<Outcome> {
        self.a.terminate().await?;
        self.b.terminate().await?;
        let (a, b) = futures::future::try_join(self.a.finalized(), self.b.finalized()).await?;
        Ok(Outcome { a, b })
    }
}

/// Runs a given `scenario` on a fresh cluster and returns both nodes' final outputs.
pub async fn run_lamport(config: Config, scenario: &Scenario) -> crate::Result<Outcome> {
    let cluster = Cluster::start(config)?;
    cluster.run(scenario).await?;
    cluster.shutdown().await
}

/// Runs the distinct commands of a given `scenario` against two naive nodes: each command is sent
/// to both nodes by its own concurrent client with random delays. Returns final states of A and B.
pub async fn run_naive(config: Config, scenario: &Scenario) -> crate::Result<(i64, i64)> {
    config.validate()?;
    let a = NaiveNode::spawn(A, config.initial_state, config.channel_capacity);
    let b = NaiveNode::spawn(B, config.initial_state, config.channel_capacity);
    let nodes = vec![a.sender(), b.sender()];

    let clients = scenario.commands().into_iter().map(|op| {
        let nodes = nodes.clone();
        let max_delay = config.naive_max_delay;
        async move { naive::broadcast(op, &nodes, max_delay).await }
    });
    futures::future::try_join_all(clients).await?;

    a.terminate().await?;
    b.terminate().await?;
    let (a, b) = futures::future::try_join(a.state(), b.state()).await?;
    Ok((a, b))
}
