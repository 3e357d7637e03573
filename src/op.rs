use serde::{Serialize, Deserialize};
use std::fmt::{Display, Formatter};

/// A single unit of work submitted to a replica. Two operations are equal only when both their
/// kind and payload match, which makes them usable as keys when counting deliveries.
///
/// Serialized in its submission form `{kind, value}`, decoded with the same rules as `parse`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "RawOperation", into = "RawOperation")]
pub enum Operation {
    Add(i64),
    Multiply(i64),
    /// Stops the replica's event loop. Never logged or replicated.
    Terminate,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    #[error("unknown operation kind: '{0}'")]
    UnknownKind(String),
}

/// Submission form of an `Operation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawOperation {
    kind: String,
    #[serde(default)]
    value: i64,
}

impl TryFrom<RawOperation> for Operation {
    type Error = OperationError;

    fn try_from(raw: RawOperation) -> Result<Self, Self::Error> {
        Operation::parse(&raw.kind, raw.value)
    }
}

impl From<Operation> for RawOperation {
    fn from(op: Operation) -> Self {
        let (kind, value) = match op {
            Operation::Add(v) => ("add", v),
            Operation::Multiply(v) => ("multiply", v),
            Operation::Terminate => ("terminate", 0),
        };
        RawOperation { kind: kind.to_string(), value }
    }
}

impl Operation {

    /// Builds an operation from its submission form `{kind, value}`. `value` is ignored for
    /// `terminate`. Unknown kinds are rejected rather than silently dropped.
    pub fn parse(kind: &str, value: i64) -> Result<Self, OperationError> {
        match kind.to_ascii_lowercase().as_str() {
            "add" => Ok(Operation::Add(value)),
            "multiply" => Ok(Operation::Multiply(value)),
            "terminate" => Ok(Operation::Terminate),
            _ => Err(OperationError::UnknownKind(kind.to_string())),
        }
    }

    #[inline]
    pub fn is_terminate(&self) -> bool {
        matches!(self, Operation::Terminate)
    }

    /// Applies the effect of current operation to a given accumulator `state`.
    pub fn apply(&self, state: i64) -> i64 {
        match *self {
            Operation::Add(v) => state.wrapping_add(v),
            Operation::Multiply(v) => state.wrapping_mul(v),
            Operation::Terminate => state,
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Add(v) => write!(f, "add {}", v),
            Operation::Multiply(v) => write!(f, "multiply {}", v),
            Operation::Terminate => write!(f, "terminate"),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::op::{Operation, OperationError};
    use std::collections::HashMap;

    #[test]
    fn operation_parse() {
        assert_eq!(Operation::parse("add", 5), Ok(Operation::Add(5)));
        assert_eq!(Operation::parse("Multiply", 3), Ok(Operation::Multiply(3)));
        assert_eq!(Operation::parse("terminate", 42), Ok(Operation::Terminate));
        assert_eq!(Operation::parse("divide", 2), Err(OperationError::UnknownKind("divide".into())));
    }

    #[test]
    fn operation_apply() {
        assert_eq!(Operation::Add(5).apply(10), 15);
        assert_eq!(Operation::Multiply(3).apply(10), 30);
        assert_eq!(Operation::Terminate.apply(10), 10);
        assert_eq!(Operation::Add(1).apply(i64::MAX), i64::MIN);
    }

    #[test]
    fn operation_equality_by_kind_and_value() {
        let mut counts = HashMap::new();
        for op in vec![Operation::Add(5), Operation::Add(5), Operation::Multiply(5), Operation::Add(3)] {
            *counts.entry(op).or_insert(0) += 1;
        }
        assert_eq!(counts[&Operation::Add(5)], 2);
        assert_eq!(counts[&Operation::Multiply(5)], 1);
        assert_eq!(counts[&Operation::Add(3)], 1);
    }

    #[derive(serde::Serialize)]
    struct Submission<'a> {
        kind: &'a str,
        value: i64,
    }

    fn decode(kind: &str, value: i64) -> Result<Operation, serde_cbor::Error> {
        let bytes = serde_cbor::to_vec(&Submission { kind, value }).unwrap();
        serde_cbor::from_slice(&bytes)
    }

    #[test]
    fn operation_decode_submission_form() {
        assert_eq!(decode("add", 5).unwrap(), Operation::Add(5));
        assert_eq!(decode("MULTIPLY", 3).unwrap(), Operation::Multiply(3));
        // value is ignored for terminate
        assert_eq!(decode("terminate", 0).unwrap(), Operation::Terminate);
        assert_eq!(decode("terminate", 7).unwrap(), Operation::Terminate);

        let err = decode("divide", 2).unwrap_err();
        assert!(err.to_string().contains("unknown operation kind: 'divide'"), "{}", err);
    }

    #[test]
    fn operation_decode_without_value() {
        #[derive(serde::Serialize)]
        struct KindOnly { kind: &'static str }

        let bytes = serde_cbor::to_vec(&KindOnly { kind: "terminate" }).unwrap();
        let op: Operation = serde_cbor::from_slice(&bytes).unwrap();
        assert_eq!(op, Operation::Terminate);
    }

    #[test]
    fn operation_serde_roundtrip() {
        for op in vec![Operation::Add(-4), Operation::Multiply(3), Operation::Terminate] {
            let bytes = serde_cbor::to_vec(&op).unwrap();
            assert_eq!(serde_cbor::from_slice::<Operation>(&bytes).unwrap(), op);
        }
    }

    #[test]
    fn operation_display() {
        assert_eq!(Operation::Add(5).to_string(), "add 5");
        assert_eq!(Operation::Multiply(-2).to_string(), "multiply -2");
        assert_eq!(Operation::Terminate.to_string(), "terminate");
    }
}
