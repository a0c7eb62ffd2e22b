//! Visual sync cursor
//!
//! Tracks which schedule steps have been delivered to the UI. The frame loop
//! passes the elapsed time on the audio clock and receives every step whose
//! start time has been reached since the previous frame, so a dropped frame
//! delivers its steps late but never skips or repeats one.

use std::ops::Range;

#[derive(Debug, Clone, Default)]
pub struct SyncCursor {
    starts: Vec<f64>,
    next: usize,
}

impl SyncCursor {
    /// `starts` must be non-decreasing
    pub fn new(starts: Vec<f64>) -> Self {
        Self { starts, next: 0 }
    }

    /// Steps that became due by `elapsed_ms`, in order
    pub fn advance(&mut self, elapsed_ms: f64) -> Range<usize> {
        let due = self.starts.partition_point(|&s| s <= elapsed_ms);
        let from = self.next;
        self.next = self.next.max(due);
        from..self.next
    }

    /// Number of steps delivered so far
    pub fn processed(&self) -> usize {
        self.next
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.starts.len()
    }
}
