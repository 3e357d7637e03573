use serde::{Serialize, Deserialize};

/// Logical timestamp produced by a `LamportClock`.
pub type Timestamp = u64;

/// Lamport logical clock. It's a monotonically increasing counter owned by a single replica,
/// which value always exceeds every timestamp observed by that replica - whether generated locally
/// or received from a peer. This way a send event and its matching receive event always get
/// strictly increasing timestamps.
///
/// Clock is not synchronized: it's expected to be read and mutated only by its owning replica.
#[derive(Debug, Default, Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LamportClock(Timestamp);

impl LamportClock {

    /// Returns current clock value without advancing it.
    #[inline]
    pub fn current(&self) -> Timestamp { self.0 }

    /// Advances the clock for a purely local event, returning the new value.
    pub fn tick(&mut self) -> Timestamp {
        self.0 = self.0.saturating_add(1);
        self.0
    }

    /// Reconciles current clock with a `received` timestamp carried by a remote message. If remote
    /// timestamp is ahead, clock jumps right past it, otherwise it just ticks. Returns the new value.
    ///
    /// Clock saturates at `u64::MAX`: it never wraps around, but from there on it stops increasing.
    pub fn observe(&mut self, received: Timestamp) -> Timestamp {
        self.0 = self.0.max(received).saturating_add(1);
        self.0
    }
}
