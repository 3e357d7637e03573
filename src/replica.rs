use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use crate::lamport::{LamportClock, Timestamp};
use crate::replica_log::ReplicaLog;
use crate::message::Message;
use crate::op::Operation;
use crate::finalize::{finalize, Finalized};
use crate::transport::Transport;
use crate::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Active,
    Finalizing,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplicaError {
    #[error("replica {id} no longer accepts events (phase: {phase:?})")]
    NotActive { id: NodeId, phase: Phase },
    #[error("replica {0} has stopped")]
    Stopped(NodeId),
}

/// Event-ordering state of a single replica: its Lamport clock, the log of operations collected
/// so far and the accumulator value it started with.
///
/// `Replica` doesn't do any I/O. Outbound messages are returned to the caller, which makes it
/// possible to drive it deterministically. See `ReplicaNode` for the actor running it.
#[derive(Debug, Clone)]
pub struct Replica {
    id: NodeId,
    clock: LamportClock,
    log: ReplicaLog,
    initial: i64,
    phase: Phase,
    finalized: Option<Finalized>,
}

impl Replica {
    pub fn new(id: NodeId, initial: i64) -> Self {
        Replica {
            id,
            clock: LamportClock::default(),
            log: ReplicaLog::default(),
            initial,
            phase: Phase::Active,
            finalized: None,
        }
    }

    pub fn id(&self) -> NodeId { self.id }

    pub fn phase(&self) -> Phase { self.phase }

    pub fn clock(&self) -> &LamportClock { &self.clock }

    /// Returns the log collected so far or, once the replica is `Phase::Done`, its sorted
    /// finalized log.
    pub fn log(&self) -> &ReplicaLog {
        match &self.finalized {
            Some(f) => &f.log,
            None => &self.log,
        }
    }

    /// Returns the result of finalization, once the replica reached `Phase::Done`.
    pub fn finalized(&self) -> Option<&Finalized> { self.finalized.as_ref() }

    fn ensure_active(&self) -> Result<(), ReplicaError> {
        if self.phase == Phase::Active {
            Ok(())
        } else {
            Err(ReplicaError::NotActive { id: self.id, phase: self.phase })
        }
    }

    /// Handles an operation submitted directly to current replica. The operation is logged under
    /// a fresh timestamp, then a second tick stamps the message replicating it to the peer.
    ///
    /// `Terminate` is neither logged nor replicated: it moves the replica to `Phase::Finalizing`
    /// and returns `None`.
    pub fn on_local(&mut self, op: Operation) -> Result<Option<Message>, ReplicaError> {
        self.ensure_active()?;
        if op.is_terminate() {
            log::debug!("node {} terminating at clock {}", self.id, self.clock.current());
            self.phase = Phase::Finalizing;
            return Ok(None);
        }

        let ts = self.clock.tick();
        self.log.append(op, ts);
        log::info!("node {} received command {}, own clock to {}", self.id, op, ts);

        let ts = self.clock.tick();
        log::info!("node {} sent message {}, own clock to {}", self.id, op, ts);
        Ok(Some(Message::new(self.id, ts, op)))
    }

    /// Handles an operation replicated from the peer. The clock is reconciled with the message
    /// timestamp and the operation is logged under the resulting value, which is returned.
    /// Replicated operations are never forwarded further.
    pub fn on_remote(&mut self, msg: Message) -> Result<Timestamp, ReplicaError> {
        self.ensure_active()?;
        let ts = self.clock.observe(msg.timestamp);
        self.log.append(msg.operation, ts);
        log::info!("node {} received message {} from node {} with clock {}, own clock to {}",
                   self.id, msg.operation, msg.from, msg.timestamp, ts);
        Ok(ts)
    }

    /// Runs finalization over the collected log exactly once and moves the replica to
    /// `Phase::Done`. Calling it again returns the already computed result. An `Active` replica
    /// is finalized as if it received `Terminate`.
    pub fn finalize(&mut self) -> &Finalized {
        let Replica { id, log: entries, initial, phase, finalized, .. } = self;
        finalized.get_or_insert_with(|| {
            *phase = Phase::Finalizing;
            let result = finalize(std::mem::take(entries), *initial);
            log::info!("node {} state to {}", id, result.state);
            *phase = Phase::Done;
            result
        })
    }
}

/// Actor driving a single `Replica`. It owns replica's state exclusively and handles one event at
/// a time - either a local submission or a message replicated from the peer - until it receives
/// `Terminate`. Then it finalizes the replica and publishes the result through a one-shot channel.
pub struct ReplicaNode {
    replica: Replica,
    transport: Arc<dyn Transport>,
    submissions: mpsc::Receiver<Operation>,
    inbox: mpsc::Receiver<Message>,
    output: oneshot::Sender<Finalized>,
}

impl ReplicaNode {

    /// Spawns a new replica actor on the current tokio runtime. `inbox` is the receiving end of
    /// the link through which the peer replicates its operations, while `transport` is used to
    /// replicate local submissions. Submission channel is bounded by a given `capacity`.
    pub fn spawn(id: NodeId, initial: i64, capacity: usize, transport: Arc<dyn Transport>, inbox: mpsc::Receiver<Message>) -> ReplicaHandle {
        let (tx, submissions) = mpsc::channel(capacity);
        let (output, result) = oneshot::channel();
        let node = ReplicaNode {
            replica: Replica::new(id, initial),
            transport,
            submissions,
            inbox,
            output,
        };
        tokio::spawn(node.run());
        ReplicaHandle { id, submissions: tx, result }
    }

    async fn run(mut self) {
        let id = self.replica.id();
        let mut inbox_open = true;
        while self.replica.phase() == Phase::Active {
            tokio::select! {
                op = self.submissions.recv() => {
                    match op {
                        Some(op) => self.handle_local(op).await,
                        None => {
                            log::warn!("node {}: all submitters are gone, terminating", id);
                            self.handle_local(Operation::Terminate).await;
                        }
                    }
                }
                msg = self.inbox.recv(), if inbox_open => {
                    match msg {
                        Some(msg) => {
                            if let Err(e) = self.replica.on_remote(msg) {
                                log::error!("node {}: {}", id, e);
                            }
                        }
                        None => inbox_open = false,
                    }
                }
            }
        }

        // anything submitted from now on must fail instead of being silently dropped
        self.submissions.close();
        self.inbox.close();

        let result = self.replica.finalize().clone();
        if self.output.send(result).is_err() {
            log::debug!("node {}: finalized result has no reader", id);
        }
    }

    async fn handle_local(&mut self, op: Operation) {
        let id = self.replica.id();
        match self.replica.on_local(op) {
            Ok(Some(msg)) => {
                if let Err(e) = self.transport.send(id, msg).await {
                    log::warn!("node {}: failed to replicate {}: {}", id, op, e);
                }
            },
            Ok(None) => {},
            Err(e) => log::error!("node {}: {}", id, e),
        }
    }
}

/// Orchestrator-facing endpoint of a spawned `ReplicaNode`.
#[derive(Debug)]
pub struct ReplicaHandle {
    id: NodeId,
    submissions: mpsc::Sender<Operation>,
    result: oneshot::Receiver<Finalized>,
}

impl ReplicaHandle {
    pub fn id(&self) -> NodeId { self.id }

    /// Submits an operation directly to the replica. Fails if the replica has already stopped.
    pub async fn submit(&self, op: Operation) -> Result<(), ReplicaError> {
        self.submissions.send(op).await.map_err(|_| ReplicaError::Stopped(self.id))
    }

    #[inline]
    pub async fn terminate(&self) -> Result<(), ReplicaError> {
        self.submit(Operation::Terminate).await
    }

    /// Waits until the replica reaches `Phase::Done` and returns its finalized log and state.
    pub async fn finalized(self) -> Result<Finalized, ReplicaError> {
        self.result.await.map_err(|_| ReplicaError::Stopped(self.id))
    }
}
