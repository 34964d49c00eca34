//! Clock port: where services read the current local time from.

use std::sync::Arc;

use lightcontrol_domain::time::{self, LocalTimestamp};

/// Source of local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> LocalTimestamp;
}

/// The host's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> LocalTimestamp {
        time::now()
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> LocalTimestamp {
        (**self).now()
    }
}
