use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Logical session time in milliseconds since the session started.
/// The kernel never reads the wall clock; the driver maps `Instant` onto this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tick {
    pub ms: u64,
}

impl Tick {
    pub const ZERO: Tick = Tick { ms: 0 };

    pub fn from_millis(ms: u64) -> Self {
        Tick { ms }
    }

    pub fn after(&self, delay: Duration) -> Self {
        Tick { ms: self.ms.saturating_add(delay.as_millis() as u64) }
    }
}
