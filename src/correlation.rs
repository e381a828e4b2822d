use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Correlation identifier linking a request frame to its response frame.
///
/// Carried in-band as the numeric `id` header field. Ids are allocated per
/// broker instance from a monotonic counter starting at 1 and are never
/// reused for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(u64);

impl CorrelationId {
    /// Numeric value as carried on the wire.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for CorrelationId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic id source owned by one broker instance.
#[derive(Debug)]
pub(crate) struct IdGenerator {
    last: AtomicU64,
}

impl IdGenerator {
    pub(crate) fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Allocate the next id (first call returns 1).
    pub(crate) fn next_id(&self) -> CorrelationId {
        CorrelationId(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }
}
