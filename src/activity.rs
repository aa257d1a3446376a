// src/activity.rs
//! Receive/emit/error timestamps behind the liveness check.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

const MAX_ERRORS: usize = 100;

/// An error counts as recent if it happened later than this long before the
/// last emitted event.
pub const ERROR_GRACE_SECS: i64 = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    pub last_receive_at: Option<DateTime<Utc>>,
    pub last_event_at: Option<DateTime<Utc>>,
    errors: VecDeque<ErrorEntry>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_receive(&mut self, at: DateTime<Utc>) {
        self.last_receive_at = Some(at);
    }

    pub fn record_event(&mut self, at: DateTime<Utc>) {
        self.last_event_at = Some(at);
    }

    pub fn record_error(&mut self, at: DateTime<Utc>, message: impl Into<String>) {
        self.errors.push_back(ErrorEntry {
            at,
            message: message.into(),
        });
        while self.errors.len() > MAX_ERRORS {
            self.errors.pop_front();
        }
    }

    pub fn last_error(&self) -> Option<&ErrorEntry> {
        self.errors.back()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ErrorEntry> {
        self.errors.iter()
    }

    /// Errors newer than the grace window before the last emitted event.
    ///
    /// Without any emitted event every logged error is recent. This is
    /// stricter than requiring both timestamps: a worker that has only ever
    /// failed never reports itself as working.
    pub fn recent_error_logs(&self) -> bool {
        match (self.last_error(), self.last_event_at) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(err), Some(ev)) => err.at > ev - Duration::seconds(ERROR_GRACE_SECS),
        }
    }

    /// Liveness at `now`: a receive within `period_days` and no recent errors.
    pub fn working_at(&self, now: DateTime<Utc>, period_days: u32) -> bool {
        // a window reaching past the earliest representable time covers everything
        let received_recently = match now.checked_sub_signed(Duration::days(i64::from(period_days))) {
            Some(since) => self.last_receive_at.is_some_and(|t| t > since),
            None => self.last_receive_at.is_some(),
        };
        received_recently && !self.recent_error_logs()
    }
}
