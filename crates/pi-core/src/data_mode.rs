//! Live/demo data switch.
//!
//! The mode is a plain value that callers pass into every query key and
//! fetch function. [`DataModeContext`] only holds the session's current
//! choice and lets observers react when it flips; nothing reads it
//! implicitly.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    #[default]
    Live,
    Demo,
}

impl DataMode {
    pub fn is_live(&self) -> bool {
        matches!(self, DataMode::Live)
    }

    pub fn is_demo(&self) -> bool {
        matches!(self, DataMode::Demo)
    }

    pub fn toggled(self) -> Self {
        match self {
            DataMode::Live => DataMode::Demo,
            DataMode::Demo => DataMode::Live,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataMode::Live => "live",
            DataMode::Demo => "demo",
        }
    }
}

impl fmt::Display for DataMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session-scoped holder of the current [`DataMode`].
///
/// Cloning shares the same underlying value. Not persisted anywhere.
#[derive(Clone)]
pub struct DataModeContext {
    tx: Arc<watch::Sender<DataMode>>,
}

impl DataModeContext {
    pub fn new(initial: DataMode) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> DataMode {
        *self.tx.borrow()
    }

    /// Set the mode, returning the previous one.
    pub fn set(&self, mode: DataMode) -> DataMode {
        let previous = self.tx.send_replace(mode);
        if previous != mode {
            tracing::info!(from = %previous, to = %mode, "data mode changed");
        }
        previous
    }

    /// Flip between live and demo, returning the new mode.
    pub fn toggle(&self) -> DataMode {
        let next = self.current().toggled();
        self.set(next);
        next
    }

    /// Receiver that wakes whenever the mode changes.
    pub fn subscribe(&self) -> watch::Receiver<DataMode> {
        self.tx.subscribe()
    }
}

impl Default for DataModeContext {
    fn default() -> Self {
        Self::new(DataMode::default())
    }
}
