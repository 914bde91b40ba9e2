//! Decides when to ask the data feed for more tracklets, based on where the clock is relative to
//! the last window that arrived.

use serde::{Deserialize, Serialize};

/// Asks for tracklets with `timestamp <= time < timestamp + range`, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchQuery {
    pub timestamp: f64,
    pub range: f64,
}

/// All in milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// How much time one query covers
    pub range_ms: f64,
    /// How close the clock may get to either edge of the current window before re-fetching
    pub margin_ms: f64,
    /// After jumping backwards, start the new window this far before the clock
    pub rewind_ms: f64,
    /// Give up on a query that hasn't been answered in this much tick time
    pub pending_timeout_ms: f64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            range_ms: 60_000.0,
            margin_ms: 15_000.0,
            rewind_ms: 30_000.0,
            pending_timeout_ms: 4_000.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FetchPlanner {
    settings: FetchSettings,
    /// Where the most recently received window starts
    last: f64,
    pending: Option<Pending>,
}

#[derive(Clone, Copy, Debug)]
struct Pending {
    query: BatchQuery,
    waited_ms: f64,
}

impl FetchPlanner {
    pub fn new(settings: FetchSettings) -> Self {
        Self {
            settings,
            last: 0.0,
            pending: None,
        }
    }

    /// Called every tick. Returns a query to send, if one's needed now.
    pub fn poll(&mut self, clock_ms: f64, elapsed_ms: f64) -> Option<BatchQuery> {
        if let Some(pending) = self.pending.as_mut() {
            pending.waited_ms += elapsed_ms.max(0.0);
            if pending.waited_ms < self.settings.pending_timeout_ms {
                return None;
            }
            warn!(
                "No answer to the query at {} after {}ms, giving up on it",
                pending.query.timestamp, pending.waited_ms
            );
            self.pending = None;
        }

        let timestamp = if clock_ms < self.last + self.settings.margin_ms {
            clock_ms - self.settings.rewind_ms
        } else if clock_ms > self.last + self.settings.range_ms - self.settings.margin_ms {
            clock_ms
        } else {
            return None;
        };
        let query = BatchQuery {
            timestamp,
            range: self.settings.range_ms,
        };
        debug!("Requesting {query:?}");
        self.pending = Some(Pending {
            query,
            waited_ms: 0.0,
        });
        Some(query)
    }

    /// An answer to `query` arrived. Returns false if that's not the query still pending, like
    /// a late answer to one that already timed out; those don't move the window.
    pub fn on_batch(&mut self, query: &BatchQuery) -> bool {
        match self.pending {
            Some(pending) if pending.query == *query => {
                self.last = query.timestamp;
                self.pending = None;
                true
            }
            _ => {
                debug!("Ignoring an answer to {query:?}, which isn't pending");
                false
            }
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.pending.is_some()
    }

    /// Where the most recently received window starts.
    pub fn last(&self) -> f64 {
        self.last
    }
}
