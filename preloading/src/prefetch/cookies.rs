//! Isolated cookie copy and cookie change listening.
//!
//! A prefetch fetched in an isolated network context has its cookies copied
//! into the default jar before the response is served:
//!
//! ```text
//! NotStarted --start--> InProgress --read complete / write start--> InProgress
//!            --complete--> Completed
//! ```
//!
//! While the copy runs, the container's own listener for the prefetched URL
//! is paused: the copy writes to the jar and must not be mistaken for an
//! external change.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use url::Url;

use crate::error::{report_violation, ContractViolation};

/// Progress of the isolated cookie copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CookieCopyState {
    /// No copy requested.
    NotStarted,
    /// Reading from the isolated jar or writing to the default jar.
    InProgress,
    /// Cookies are in the default jar.
    Completed,
}

/// Durations of the three copy phases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CookieCopyTimings {
    /// Copy start until reads finished and writes started.
    pub read: Option<Duration>,
    /// Write start until copy completion.
    pub write: Option<Duration>,
    pub total: Option<Duration>,
}

type CopyCompleteCallback = Box<dyn FnOnce() + Send>;

/// Sub-state machine for copying isolated cookies.
#[derive(Default)]
pub struct IsolatedCookieCopy {
    state: Option<CookieCopyState>,
    started_at: Option<Instant>,
    write_started_at: Option<Instant>,
    completed_at: Option<Instant>,
    on_complete: Option<CopyCompleteCallback>,
}

impl IsolatedCookieCopy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CookieCopyState {
        self.state.unwrap_or(CookieCopyState::NotStarted)
    }

    pub fn is_in_progress(&self) -> bool {
        self.state() == CookieCopyState::InProgress
    }

    fn require(
        &self,
        operation: &'static str,
        expected: CookieCopyState,
    ) -> Result<(), ContractViolation> {
        let state = self.state();
        if state == expected {
            Ok(())
        } else {
            Err(report_violation(ContractViolation::CookieCopyOutOfOrder {
                operation,
                state,
            }))
        }
    }

    pub fn start(&mut self) -> Result<(), ContractViolation> {
        self.require("start", CookieCopyState::NotStarted)?;
        self.state = Some(CookieCopyState::InProgress);
        self.started_at = Some(Instant::now());
        Ok(())
    }

    pub fn read_complete_and_write_start(&mut self) -> Result<(), ContractViolation> {
        self.require("read_complete_and_write_start", CookieCopyState::InProgress)?;
        self.write_started_at = Some(Instant::now());
        Ok(())
    }

    /// Finish the copy and run the queued completion callback, if any.
    pub fn complete(&mut self) -> Result<(), ContractViolation> {
        self.require("complete", CookieCopyState::InProgress)?;
        self.state = Some(CookieCopyState::Completed);
        self.completed_at = Some(Instant::now());
        if let Some(callback) = self.on_complete.take() {
            callback();
        }
        Ok(())
    }

    /// Run `callback` once the copy completes, or now if it already has.
    ///
    /// A later registration replaces an earlier one that has not run yet.
    pub fn set_on_complete(&mut self, callback: impl FnOnce() + Send + 'static) {
        if self.state() == CookieCopyState::Completed {
            callback();
        } else {
            self.on_complete = Some(Box::new(callback));
        }
    }

    pub fn timings(&self) -> CookieCopyTimings {
        let between = |from: Option<Instant>, to: Option<Instant>| match (from, to) {
            (Some(from), Some(to)) => Some(to.saturating_duration_since(from)),
            _ => None,
        };
        CookieCopyTimings {
            read: between(self.started_at, self.write_started_at),
            write: between(self.write_started_at, self.completed_at),
            total: between(self.started_at, self.completed_at),
        }
    }
}

impl fmt::Debug for IsolatedCookieCopy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IsolatedCookieCopy")
            .field("state", &self.state())
            .field("callback_pending", &self.on_complete.is_some())
            .finish()
    }
}

/// Watches the default cookie jar for changes affecting a prefetched URL.
#[derive(Debug, Clone)]
pub struct CookieListener {
    url: Url,
    paused: bool,
    changed: bool,
}

impl CookieListener {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            paused: false,
            changed: false,
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Note a cookie change for `url`; ignored while paused.
    pub fn on_cookie_change(&mut self, url: &Url) {
        if self.paused {
            return;
        }
        if url.host_str() == self.url.host_str() {
            self.changed = true;
        }
    }

    pub fn have_cookies_changed(&self) -> bool {
        self.changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_copy_progresses_in_order() {
        let mut copy = IsolatedCookieCopy::new();
        assert_eq!(copy.state(), CookieCopyState::NotStarted);

        copy.start().unwrap();
        assert_eq!(copy.state(), CookieCopyState::InProgress);
        copy.read_complete_and_write_start().unwrap();
        copy.complete().unwrap();
        assert_eq!(copy.state(), CookieCopyState::Completed);

        let timings = copy.timings();
        assert!(timings.read.is_some());
        assert!(timings.write.is_some());
        assert!(timings.total.unwrap() >= timings.read.unwrap());
    }

    #[test]
    fn test_queued_callback_runs_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut copy = IsolatedCookieCopy::new();
        copy.start().unwrap();

        let counter = runs.clone();
        copy.set_on_complete(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        copy.read_complete_and_write_start().unwrap();
        copy.complete().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_after_completion_runs_immediately() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut copy = IsolatedCookieCopy::new();
        copy.start().unwrap();
        copy.complete().unwrap();

        let counter = runs.clone();
        copy.set_on_complete(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "contract violation"))]
    fn test_start_twice_rejected() {
        let mut copy = IsolatedCookieCopy::new();
        copy.start().unwrap();
        assert!(copy.start().is_err());
        assert_eq!(copy.state(), CookieCopyState::InProgress);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "contract violation"))]
    fn test_complete_without_start_rejected() {
        let mut copy = IsolatedCookieCopy::new();
        assert!(copy.complete().is_err());
        assert_eq!(copy.state(), CookieCopyState::NotStarted);
    }

    #[test]
    fn test_listener_ignores_changes_while_paused() {
        let url = Url::parse("https://example.com/page").unwrap();
        let mut listener = CookieListener::new(url.clone());

        listener.pause();
        listener.on_cookie_change(&url);
        assert!(!listener.have_cookies_changed());

        listener.resume();
        listener.on_cookie_change(&Url::parse("https://other.com/").unwrap());
        assert!(!listener.have_cookies_changed());

        listener.on_cookie_change(&url);
        assert!(listener.have_cookies_changed());
    }
}
