use std::collections::HashMap;
use tokio::sync::mpsc;
use crate::message::Message;
use crate::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("node {0} has no outbound peer")]
    NoRoute(NodeId),
    #[error("peer of node {0} is no longer receiving")]
    Disconnected(NodeId),
}

/// Outbound side of replication. Implementations route a message sent by node `from` to the
/// inbound endpoint of its peer, preserving the order of messages sent by the same node.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, from: NodeId, msg: Message) -> Result<(), TransportError>;
}

/// Explicit replication topology: a mapping from node identifier to the inbound endpoint of its
/// outbound peer. Built once by the orchestrator, which hands every node only its own `Route`.
///
/// Each link is a bounded channel, so a sender is suspended when its peer's inbox is full.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    routes: HashMap<NodeId, mpsc::Sender<Message>>,
}

impl Topology {

    /// Creates a new bounded link delivering messages sent by `from` to the returned receiver.
    /// Replaces any route previously registered for `from`.
    pub fn link(&mut self, from: NodeId, capacity: usize) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::channel(capacity);
        self.routes.insert(from, tx);
        rx
    }

    /// Creates a pair of links between `a` and `b`, returning inboxes of `a` and `b` respectively.
    pub fn connect(&mut self, a: NodeId, b: NodeId, capacity: usize) -> (mpsc::Receiver<Message>, mpsc::Receiver<Message>) {
        let inbox_b = self.link(a, capacity);
        let inbox_a = self.link(b, capacity);
        (inbox_a, inbox_b)
    }

    /// Returns the outbound route of a given node.
    pub fn route(&self, from: NodeId) -> Result<Route, TransportError> {
        let peer = self.routes.get(&from).ok_or(TransportError::NoRoute(from))?;
        Ok(Route { from, peer: peer.clone() })
    }
}

/// Outbound link of a single node. Once every route to a peer is dropped, that peer's inbox is
/// closed.
#[derive(Debug, Clone)]
pub struct Route {
    from: NodeId,
    peer: mpsc::Sender<Message>,
}

#[async_trait::async_trait]
impl Transport for Route {
    async fn send(&self, from: NodeId, msg: Message) -> Result<(), TransportError> {
        if from != self.from {
            return Err(TransportError::NoRoute(from));
        }
        self.peer.send(msg).await.map_err(|_| TransportError::Disconnected(from))
    }
}

#[async_trait::async_trait]
impl Transport for Topology {
    async fn send(&self, from: NodeId, msg: Message) -> Result<(), TransportError> {
        let route = self.routes.get(&from).ok_or(TransportError::NoRoute(from))?;
        route.send(msg).await.map_err(|_| TransportError::Disconnected(from))
    }
}

#[cfg(test)]
mod test {
    use crate::transport::{Topology, Transport, TransportError};
    use crate::message::Message;
    use crate::op::Operation;
    use crate::NodeId;

    const A: NodeId = 1;
    const B: NodeId = 2;
    const C: NodeId = 3;

    #[tokio::test]
    async fn topology_routes_to_peer_in_order() {
        let mut topology = Topology::default();
        let (mut inbox_a, mut inbox_b) = topology.connect(A, B, 4);

        topology.send(A, Message::new(A, 2, Operation::Add(5))).await.unwrap();
        topology.send(A, Message::new(A, 4, Operation::Multiply(3))).await.unwrap();
        topology.send(B, Message::new(B, 2, Operation::Add(1))).await.unwrap();

        assert_eq!(inbox_b.recv().await.unwrap().timestamp, 2);
        assert_eq!(inbox_b.recv().await.unwrap().timestamp, 4);
        assert_eq!(inbox_a.recv().await.unwrap().operation, Operation::Add(1));
        assert!(inbox_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn topology_unknown_route() {
        let mut topology = Topology::default();
        let _inboxes = topology.connect(A, B, 1);

        let err = topology.send(C, Message::new(C, 1, Operation::Add(1))).await.unwrap_err();
        assert_eq!(err, TransportError::NoRoute(C));
    }

    #[tokio::test]
    async fn route_sends_only_for_its_owner() {
        let mut topology = Topology::default();
        let (_inbox_a, mut inbox_b) = topology.connect(A, B, 2);
        let route = topology.route(A).unwrap();
        assert_eq!(topology.route(C).unwrap_err(), TransportError::NoRoute(C));
        drop(topology);

        route.send(A, Message::new(A, 2, Operation::Add(5))).await.unwrap();
        let err = route.send(B, Message::new(B, 2, Operation::Add(5))).await.unwrap_err();
        assert_eq!(err, TransportError::NoRoute(B));

        assert_eq!(inbox_b.recv().await.unwrap().timestamp, 2);
    }

    #[tokio::test]
    async fn dropping_last_route_closes_peer_inbox() {
        let mut topology = Topology::default();
        let (_inbox_a, mut inbox_b) = topology.connect(A, B, 2);
        let route = topology.route(A).unwrap();
        drop(topology);

        route.send(A, Message::new(A, 2, Operation::Add(5))).await.unwrap();
        drop(route);

        assert!(inbox_b.recv().await.is_some());
        assert!(inbox_b.recv().await.is_none());
    }

    #[tokio::test]
    async fn topology_disconnected_peer() {
        let mut topology = Topology::default();
        let (_inbox_a, inbox_b) = topology.connect(A, B, 1);
        drop(inbox_b);

        let err = topology.send(A, Message::new(A, 1, Operation::Add(1))).await.unwrap_err();
        assert_eq!(err, TransportError::Disconnected(A));
    }
}
