//! Streaming response loader for a prefetch.
//!
//! The loader accumulates one response as the network layer delivers it:
//!
//! ```text
//! AwaitingHead --head--> ReceivingBody --complete--> Completed
//!      ^   |                  |
//!      +---+ redirect         +--net error--> Failed
//! ```

use bytes::{Bytes, BytesMut};
use url::Url;

/// Status line and content type of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status_code: u16,
    pub mime_type: String,
}

impl ResponseHead {
    pub fn new(status_code: u16, mime_type: impl Into<String>) -> Self {
        Self {
            status_code,
            mime_type: mime_type.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Byte counts reported when a response completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseSizes {
    pub encoded_data_length: u64,
    pub encoded_body_length: u64,
    pub decoded_body_length: u64,
}

/// How a response ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionStatus {
    /// Network error code, `None` on success.
    pub net_error: Option<i32>,
    pub sizes: ResponseSizes,
}

impl CompletionStatus {
    pub fn ok(sizes: ResponseSizes) -> Self {
        Self {
            net_error: None,
            sizes,
        }
    }

    pub fn failed(net_error: i32) -> Self {
        Self {
            net_error: Some(net_error),
            sizes: ResponseSizes::default(),
        }
    }
}

/// Events delivered by the network layer for one prefetch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderEvent {
    /// Response status line and headers arrived.
    ReceivedHead(ResponseHead),
    /// The server redirected to `location`.
    Redirect { location: Url },
    /// A chunk of the response body.
    BodyChunk(Bytes),
    /// The request finished, successfully or not.
    Complete(CompletionStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    /// Request sent, no head yet.
    AwaitingHead,
    /// Head received; body chunks accumulate.
    ReceivingBody,
    /// Body complete.
    Completed,
    /// Aborted or failed; no further data.
    Failed,
}

/// Owns the in-flight response for one prefetch.
#[derive(Debug)]
pub struct StreamingLoader {
    url: Url,
    state: LoaderState,
    redirects: Vec<Url>,
    head: Option<ResponseHead>,
    body: BytesMut,
    completion: Option<CompletionStatus>,
}

impl StreamingLoader {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            state: LoaderState::AwaitingHead,
            redirects: Vec::new(),
            head: None,
            body: BytesMut::new(),
            completion: None,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    pub fn redirects(&self) -> &[Url] {
        &self.redirects
    }

    pub fn head(&self) -> Option<&ResponseHead> {
        self.head.as_ref()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn completion(&self) -> Option<CompletionStatus> {
        self.completion
    }

    pub(crate) fn on_redirect(&mut self, location: Url) {
        if self.state == LoaderState::AwaitingHead {
            self.redirects.push(location);
        }
    }

    pub(crate) fn on_head(&mut self, head: ResponseHead) {
        if self.state == LoaderState::AwaitingHead {
            self.head = Some(head);
            self.state = LoaderState::ReceivingBody;
        }
    }

    pub(crate) fn on_body_chunk(&mut self, chunk: &Bytes) {
        if self.state == LoaderState::ReceivingBody {
            self.body.extend_from_slice(chunk);
        } else {
            tracing::warn!(url = %self.url, state = ?self.state, "Body chunk outside of body phase dropped");
        }
    }

    pub(crate) fn on_complete(&mut self, status: CompletionStatus) {
        if matches!(self.state, LoaderState::Completed | LoaderState::Failed) {
            return;
        }
        self.completion = Some(status);
        self.state = if status.net_error.is_some() {
            LoaderState::Failed
        } else {
            LoaderState::Completed
        };
    }

    pub(crate) fn fail(&mut self) {
        self.state = LoaderState::Failed;
    }

    /// Consume the loader, returning the buffered body.
    pub fn into_body(self) -> Bytes {
        self.body.freeze()
    }
}
