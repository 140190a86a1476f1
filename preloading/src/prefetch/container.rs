//! Lifecycle of a single prefetch.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use url::Url;

use super::cookies::{CookieCopyState, CookieListener, IsolatedCookieCopy};
use super::deletion::DeletionSender;
use super::loader::{CompletionStatus, LoaderEvent, ResponseHead, StreamingLoader};
use super::prefetch_type::PrefetchType;
use super::status::{AttemptTransition, PrefetchIneligibility, PrefetchStatus};
use crate::attempt::{PreloadingEligibility, PreloadingTriggeringOutcome};
use crate::error::ContractViolation;
use crate::ledger::AttemptHandle;
use crate::settings::PrefetchSettings;
use crate::telemetry::{duration_ms, PrefetchRecord, TelemetryRecord, TelemetryRecorder};

/// MIME types a prefetched navigation response may carry.
const SUPPORTED_MIME_TYPES: &[&str] = &[
    "text/html",
    "application/xhtml+xml",
    "application/xml",
    "text/xml",
    "text/plain",
    "multipart/related",
];

/// Result of the availability probe run before serving a prefetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// No probe was required.
    NoProbe,
    /// The origin was reachable.
    Success,
    /// The origin was unreachable; do not serve.
    Failed,
}

/// Whether a prefetch can be handed to a navigation right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServableState {
    /// Nothing usable to hand over.
    NotServable,
    /// The request is in flight without a head yet; the navigation may wait.
    ShouldBlockUntilHeadReceived,
    /// A fresh 2xx head is available from the loader.
    Servable,
}

/// One prefetch of one URL, and its attempt.
///
/// Status changes are mirrored onto the attempt through an
/// [`AttemptHandle`]; the attempt itself stays owned by the ledger. A
/// [`PrefetchRecord`] is emitted when the container is dropped.
pub struct PrefetchContainer {
    url: Url,
    referrer: Option<Url>,
    prefetch_type: PrefetchType,
    status: PrefetchStatus,
    attempt: AttemptHandle,
    redirects_enabled: bool,
    cacheable_duration: Duration,
    redirect_chain: Vec<Url>,

    loader: Option<StreamingLoader>,
    dispatching: bool,
    deletion: DeletionSender,

    head: Option<ResponseHead>,
    head_received_at: Option<Instant>,
    completion: Option<CompletionStatus>,
    fetch_started_at: Option<Instant>,
    fetch_completed_at: Option<Instant>,
    link_clicked: bool,

    cookie_copy: IsolatedCookieCopy,
    cookie_listener: Option<CookieListener>,

    recorder: Arc<dyn TelemetryRecorder>,
}

impl PrefetchContainer {
    pub fn new(
        url: Url,
        referrer: Option<Url>,
        prefetch_type: PrefetchType,
        recorder: Arc<dyn TelemetryRecorder>,
        deletion: DeletionSender,
    ) -> Self {
        Self {
            url,
            referrer,
            prefetch_type,
            status: PrefetchStatus::NotStarted,
            attempt: AttemptHandle::detached(),
            redirects_enabled: false,
            cacheable_duration: PrefetchSettings::default().cacheable_duration,
            redirect_chain: Vec::new(),
            loader: None,
            dispatching: false,
            deletion,
            head: None,
            head_received_at: None,
            completion: None,
            fetch_started_at: None,
            fetch_completed_at: None,
            link_clicked: false,
            cookie_copy: IsolatedCookieCopy::new(),
            cookie_listener: None,
            recorder,
        }
    }

    /// Attach the attempt this prefetch reports to.
    pub fn with_attempt(mut self, attempt: AttemptHandle) -> Self {
        self.attempt = attempt;
        self
    }

    /// Follow redirects instead of failing on them.
    pub fn with_redirects_enabled(mut self, enabled: bool) -> Self {
        self.redirects_enabled = enabled;
        self
    }

    /// Apply redirect handling and response lifetime from runtime settings.
    pub fn with_settings(mut self, settings: &PrefetchSettings) -> Self {
        self.redirects_enabled = settings.redirects_enabled;
        self.cacheable_duration = settings.cacheable_duration;
        self
    }

    /// How long a received response stays servable.
    pub fn cacheable_duration(&self) -> Duration {
        self.cacheable_duration
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn referrer(&self) -> Option<&Url> {
        self.referrer.as_ref()
    }

    pub fn prefetch_type(&self) -> PrefetchType {
        self.prefetch_type
    }

    pub fn status(&self) -> PrefetchStatus {
        self.status
    }

    pub fn attempt(&self) -> &AttemptHandle {
        &self.attempt
    }

    pub fn redirect_chain(&self) -> &[Url] {
        &self.redirect_chain
    }

    pub fn head(&self) -> Option<&ResponseHead> {
        self.head.as_ref()
    }

    pub fn has_streaming_loader(&self) -> bool {
        self.loader.is_some()
    }

    /// Update the status and mirror it onto the attempt.
    pub fn set_prefetch_status(&mut self, status: PrefetchStatus) {
        let previous = std::mem::replace(&mut self.status, status);
        tracing::debug!(url = %self.url, from = ?previous, to = ?status, "Prefetch status");

        let result = match status.attempt_transition() {
            AttemptTransition::None => Ok(()),
            AttemptTransition::Ineligible(eligibility) => self.attempt.set_eligibility(eligibility),
            AttemptTransition::Outcome(outcome) => self.attempt.set_triggering_outcome(outcome),
            AttemptTransition::Served => self.mark_attempt_served(previous),
            AttemptTransition::Failure(reason) => self.attempt.set_failure_reason(reason),
        };
        if let Err(violation) = result {
            tracing::debug!(url = %self.url, %violation, "Attempt rejected prefetch status");
        }
    }

    fn mark_attempt_served(&self, previous: PrefetchStatus) -> Result<(), ContractViolation> {
        // A response can be served before its completion was observed.
        if previous != PrefetchStatus::Successful {
            self.attempt
                .set_triggering_outcome(PreloadingTriggeringOutcome::Ready)?;
        }
        self.attempt
            .set_triggering_outcome(PreloadingTriggeringOutcome::Success)
    }

    /// Apply the eligibility check result and resolve holdback.
    ///
    /// Returns `true` if the prefetch may start.
    pub fn on_eligibility_determined(
        &mut self,
        eligibility: Result<(), PrefetchIneligibility>,
    ) -> bool {
        if self.status != PrefetchStatus::NotStarted {
            tracing::warn!(url = %self.url, status = ?self.status, "Eligibility already determined");
            return false;
        }

        if let Err(reason) = eligibility {
            self.set_prefetch_status(PrefetchStatus::NotEligible(reason));
            return false;
        }

        if let Err(violation) = self.attempt.set_eligibility(PreloadingEligibility::Eligible) {
            tracing::debug!(url = %self.url, %violation, "Attempt rejected eligibility");
        }
        let held_back = match self.attempt.should_holdback() {
            Some(Ok(held_back)) => held_back,
            Some(Err(violation)) => {
                tracing::debug!(url = %self.url, %violation, "Holdback unresolved");
                false
            }
            None => false,
        };

        if held_back {
            self.set_prefetch_status(PrefetchStatus::Heldback);
            return false;
        }

        self.set_prefetch_status(PrefetchStatus::Allowed);
        if self.prefetch_type.is_isolated_network_context_required {
            self.register_cookie_listener();
        }
        true
    }

    /// Begin fetching with `loader`.
    pub fn start(&mut self, loader: StreamingLoader) {
        if self.status != PrefetchStatus::Allowed {
            tracing::warn!(url = %self.url, status = ?self.status, "Prefetch start ignored");
            return;
        }
        self.loader = Some(loader);
        self.fetch_started_at = Some(Instant::now());
        self.set_prefetch_status(PrefetchStatus::NotFinishedInTime);
    }

    /// Feed a network event for the in-flight request.
    pub fn on_loader_event(&mut self, event: LoaderEvent) {
        if self.status.is_terminal() {
            tracing::trace!(url = %self.url, status = ?self.status, "Loader event after terminal status");
            return;
        }
        if self.status != PrefetchStatus::NotFinishedInTime {
            tracing::warn!(url = %self.url, status = ?self.status, "Loader event outside of fetch");
            return;
        }

        self.dispatching = true;
        self.dispatch(event);
        self.dispatching = false;
    }

    fn dispatch(&mut self, event: LoaderEvent) {
        match event {
            LoaderEvent::Redirect { location } => {
                if !self.redirects_enabled {
                    self.fail(PrefetchStatus::FailedRedirectsDisabled);
                    return;
                }
                tracing::debug!(url = %self.url, %location, "Prefetch redirected");
                if let Some(loader) = self.loader.as_mut() {
                    loader.on_redirect(location.clone());
                }
                self.redirect_chain.push(location);
            }
            LoaderEvent::ReceivedHead(head) => {
                if !head.is_success() {
                    self.fail(PrefetchStatus::FailedNon2xx);
                    return;
                }
                if !is_supported_mime_type(&head.mime_type) {
                    self.fail(PrefetchStatus::FailedMimeNotSupported);
                    return;
                }
                if let Some(loader) = self.loader.as_mut() {
                    loader.on_head(head.clone());
                }
                self.head = Some(head);
                self.head_received_at = Some(Instant::now());
            }
            LoaderEvent::BodyChunk(chunk) => {
                if let Some(loader) = self.loader.as_mut() {
                    loader.on_body_chunk(&chunk);
                }
            }
            LoaderEvent::Complete(status) => {
                if let Some(loader) = self.loader.as_mut() {
                    loader.on_complete(status);
                }
                self.completion = Some(status);
                self.fetch_completed_at = Some(Instant::now());
                if status.net_error.is_some() || self.head.is_none() {
                    self.fail(PrefetchStatus::FailedNetError);
                    return;
                }
                self.set_prefetch_status(PrefetchStatus::Successful);
            }
        }
    }

    fn fail(&mut self, status: PrefetchStatus) {
        if let Some(loader) = self.loader.as_mut() {
            loader.fail();
        }
        self.set_prefetch_status(status);
        self.release_streaming_loader();
    }

    /// Hand the loader to a caller that will serve from it.
    pub fn take_streaming_loader(&mut self) -> Option<StreamingLoader> {
        self.loader.take()
    }

    /// Drop the loader, deferring the drop if one of its events is being
    /// dispatched.
    pub fn release_streaming_loader(&mut self) {
        let Some(loader) = self.loader.take() else {
            return;
        };
        if self.dispatching {
            tracing::trace!(url = %self.url, "Deferring loader deletion");
            self.deletion.delete_soon(loader);
        } else {
            drop(loader);
        }
    }

    /// Serve the prefetch to a navigation, or refuse it.
    pub fn on_used(&mut self, probe: ProbeResult) {
        if !matches!(
            self.status,
            PrefetchStatus::Successful | PrefetchStatus::NotFinishedInTime
        ) {
            tracing::warn!(url = %self.url, status = ?self.status, "Prefetch used in unusable state");
            return;
        }

        self.link_clicked = true;
        let status = if self.have_default_context_cookies_changed() {
            PrefetchStatus::NotUsedCookiesChanged
        } else {
            match probe {
                ProbeResult::NoProbe => PrefetchStatus::UsedNoProbe,
                ProbeResult::Success => PrefetchStatus::ResponseUsed,
                ProbeResult::Failed => PrefetchStatus::NotUsedProbeFailed,
            }
        };
        self.set_prefetch_status(status);
    }

    /// Turn an allowed prefetch into a privacy decoy. A decoy is never
    /// started or served; its attempt fails with `PrivacyDecoy`.
    pub fn mark_as_decoy(&mut self) {
        if self.status != PrefetchStatus::Allowed {
            tracing::warn!(url = %self.url, status = ?self.status, "Decoy marking ignored");
            return;
        }
        self.set_prefetch_status(PrefetchStatus::IsPrivacyDecoy);
    }

    /// Abandon the prefetch.
    pub fn cancel(&mut self) {
        match self.status {
            PrefetchStatus::Allowed
            | PrefetchStatus::NotFinishedInTime
            | PrefetchStatus::Successful => {
                self.set_prefetch_status(PrefetchStatus::Cancelled);
            }
            // Nothing reached the attempt's outcome yet.
            PrefetchStatus::NotStarted => self.status = PrefetchStatus::Cancelled,
            _ => return,
        }
        self.release_streaming_loader();
    }

    pub fn register_cookie_listener(&mut self) {
        if self.cookie_listener.is_none() {
            self.cookie_listener = Some(CookieListener::new(self.url.clone()));
        }
    }

    pub fn on_cookie_change(&mut self, url: &Url) {
        if let Some(listener) = self.cookie_listener.as_mut() {
            listener.on_cookie_change(url);
        }
    }

    /// Whether the default cookie jar changed for this URL while listening.
    pub fn have_default_context_cookies_changed(&self) -> bool {
        self.cookie_listener
            .as_ref()
            .is_some_and(CookieListener::have_cookies_changed)
    }

    pub fn cookie_copy_state(&self) -> CookieCopyState {
        self.cookie_copy.state()
    }

    pub fn is_isolated_cookie_copy_in_progress(&self) -> bool {
        self.cookie_copy.is_in_progress()
    }

    pub fn on_isolated_cookie_copy_start(&mut self) -> Result<(), ContractViolation> {
        self.cookie_copy.start()?;
        if let Some(listener) = self.cookie_listener.as_mut() {
            listener.pause();
        }
        Ok(())
    }

    pub fn on_isolated_cookies_read_complete_and_write_start(
        &mut self,
    ) -> Result<(), ContractViolation> {
        self.cookie_copy.read_complete_and_write_start()
    }

    pub fn on_isolated_cookie_copy_complete(&mut self) -> Result<(), ContractViolation> {
        self.cookie_copy.complete()?;
        if let Some(listener) = self.cookie_listener.as_mut() {
            listener.resume();
        }
        Ok(())
    }

    /// Run `callback` once the cookie copy completes, immediately if it
    /// already has.
    pub fn set_on_cookie_copy_complete_callback(
        &mut self,
        callback: impl FnOnce() + Send + 'static,
    ) {
        self.cookie_copy.set_on_complete(callback);
    }

    /// Whether a navigation should wait for this prefetch's response head.
    pub fn should_block_until_head_received(&self) -> bool {
        self.servable_state(Duration::MAX) == ServableState::ShouldBlockUntilHeadReceived
    }

    pub fn is_prefetch_servable(&self, max_age: Duration) -> bool {
        self.servable_state(max_age) == ServableState::Servable
    }

    /// Servability against the configured cacheable duration.
    pub fn is_servable_now(&self) -> bool {
        self.is_prefetch_servable(self.cacheable_duration)
    }

    /// Decide servability from the fetch progress and the response age.
    pub fn servable_state(&self, max_age: Duration) -> ServableState {
        if self.have_default_context_cookies_changed() {
            return ServableState::NotServable;
        }
        match self.status {
            PrefetchStatus::NotFinishedInTime => match self.head_received_at {
                _ if self.loader.is_none() => ServableState::NotServable,
                None => ServableState::ShouldBlockUntilHeadReceived,
                Some(at) => fresh(at, max_age),
            },
            // A taken or released loader has nothing left to serve.
            PrefetchStatus::Successful => match self.head_received_at {
                Some(at) if self.loader.is_some() => fresh(at, max_age),
                _ => ServableState::NotServable,
            },
            _ => ServableState::NotServable,
        }
    }

    fn to_record(&self) -> PrefetchRecord {
        let fetch_duration = match (self.fetch_started_at, self.fetch_completed_at) {
            (Some(start), Some(end)) => Some(end.saturating_duration_since(start)),
            _ => None,
        };
        let cookie_timings = self.cookie_copy.timings();
        PrefetchRecord {
            prefetch_type: self.prefetch_type,
            status: (self.status != PrefetchStatus::NotStarted).then_some(self.status),
            link_clicked: self.link_clicked,
            data_length: self
                .completion
                .filter(|c| c.net_error.is_none())
                .map(|c| c.sizes.encoded_data_length),
            fetch_duration_ms: fetch_duration.map(duration_ms),
            cookie_read_ms: cookie_timings.read.map(duration_ms),
            cookie_write_ms: cookie_timings.write.map(duration_ms),
            cookie_copy_total_ms: cookie_timings.total.map(duration_ms),
        }
    }
}

fn fresh(received_at: Instant, max_age: Duration) -> ServableState {
    if received_at.elapsed() < max_age {
        ServableState::Servable
    } else {
        ServableState::NotServable
    }
}

fn is_supported_mime_type(mime_type: &str) -> bool {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    SUPPORTED_MIME_TYPES.contains(&essence.as_str())
}

impl Drop for PrefetchContainer {
    fn drop(&mut self) {
        self.recorder
            .record(TelemetryRecord::Prefetch(self.to_record()));
    }
}

impl fmt::Debug for PrefetchContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefetchContainer")
            .field("url", &self.url)
            .field("prefetch_type", &self.prefetch_type)
            .field("status", &self.status)
            .field("has_loader", &self.loader.is_some())
            .field("cookie_copy", &self.cookie_copy)
            .finish()
    }
}
