use serde::{Serialize, Deserialize};
use std::fmt::{Display, Formatter};
use crate::op::Operation;
use crate::lamport::Timestamp;

/// An operation recorded by a replica together with the logical time at which it was recorded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LogEntry {
    pub operation: Operation,
    pub timestamp: Timestamp,
}

impl LogEntry {
    pub fn new(operation: Operation, timestamp: Timestamp) -> Self {
        LogEntry { operation, timestamp }
    }
}

impl Display for LogEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{} @{}}}", self.operation, self.timestamp)
    }
}

/// Append-only sequence of entries collected by a single replica while it's active. Entries keep
/// their insertion order until `sort` is called during finalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplicaLog(Vec<LogEntry>);

impl ReplicaLog {

    pub fn append(&mut self, operation: Operation, timestamp: Timestamp) {
        self.0.push(LogEntry::new(operation, timestamp))
    }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> std::slice::Iter<'_, LogEntry> { self.0.iter() }

    pub fn entries(&self) -> &[LogEntry] { &self.0 }

    /// Sorts entries by timestamp in ascending order. Sort is stable: entries with equal
    /// timestamps keep their insertion order.
    pub fn sort(&mut self) {
        self.0.sort_by_key(|e| e.timestamp)
    }
}

impl From<Vec<LogEntry>> for ReplicaLog {
    fn from(entries: Vec<LogEntry>) -> Self {
        ReplicaLog(entries)
    }
}

impl std::iter::FromIterator<LogEntry> for ReplicaLog {
    fn from_iter<T: IntoIterator<Item=LogEntry>>(iter: T) -> Self {
        ReplicaLog(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ReplicaLog {
    type Item = &'a LogEntry;
    type IntoIter = std::slice::Iter<'a, LogEntry>;

    fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

impl Display for ReplicaLog {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", e)?;
        }
        write!(f, "]")
    }
}
