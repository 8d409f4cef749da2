//! Periodic report timer.
//!
//! The timer never runs anything itself.  The main loop polls it with the
//! current uptime and, when it reports due, runs the publish on its own
//! stack.  Work therefore never executes in timer context and never
//! overlaps the loop body.
//!
//! ```text
//!   arm(t0)          due            due            due
//!     │───period───▶│───period───▶│───period───▶│
//!                     ▲ poll(now) returns true once per crossing
//! ```
//!
//! If the loop is blocked past several deadlines (a long WiFi rejoin, say)
//! the missed fires collapse into one, and the next deadline snaps back to
//! the period grid instead of drifting.

use log::debug;

pub struct ReportTimer {
    period_ms: u64,
    next_due_ms: Option<u64>,
}

impl ReportTimer {
    /// Disarmed timer.  A zero period is treated as 1 ms.
    pub fn new(period_ms: u32) -> Self {
        Self {
            period_ms: u64::from(period_ms.max(1)),
            next_due_ms: None,
        }
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Start counting from `now_ms`.  The first fire is one period later.
    pub fn arm(&mut self, now_ms: u64) {
        self.next_due_ms = Some(now_ms.saturating_add(self.period_ms));
    }

    pub fn is_armed(&self) -> bool {
        self.next_due_ms.is_some()
    }

    /// Deadline of the next fire, if armed.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.next_due_ms
    }

    /// `true` at most once per elapsed deadline.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        let Some(due) = self.next_due_ms else {
            return false;
        };
        if now_ms < due {
            return false;
        }
        let missed = (now_ms - due) / self.period_ms;
        if missed > 0 {
            debug!("Report: {} missed timer fires coalesced", missed);
        }
        self.next_due_ms = Some(due.saturating_add((missed + 1) * self.period_ms));
        true
    }
}
