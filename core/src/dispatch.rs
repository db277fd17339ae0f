//! Response dispatch and request completion tracking.
//!
//! # Design
//! A request is `Pending` until its transport exchange has returned and the
//! response has been dispatched, then `Complete` for good. Dispatch decodes
//! a 200 body and hands the value to the caller's callback exactly once.
//! Any other status, or a body that is not valid JSON, drops the callback
//! without calling it and reports the reason as an `ApiError`, so a caller
//! holding the `RequestHandle` can tell "still pending" from "failed".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::http::HttpResponse;

/// Lifecycle of one request. `Complete` is terminal whether or not the
/// callback ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    Complete,
}

/// Map non-success status codes to the appropriate `ApiError` variant.
pub(crate) fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    if response.status == expected {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}

/// Decode a 200 response body.
pub fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    check_status(response, 200)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Deliver a completed response to `callback`.
///
/// The callback runs once with the decoded body when the status is 200 and
/// the body parses. Otherwise it is dropped uninvoked and the error is
/// returned.
pub fn dispatch<F>(response: &HttpResponse, callback: F) -> Result<(), ApiError>
where
    F: FnOnce(serde_json::Value),
{
    match decode::<serde_json::Value>(response) {
        Ok(value) => {
            debug!(status = response.status, "delivering response to callback");
            callback(value);
            Ok(())
        }
        Err(err) => {
            warn!(status = response.status, error = %err, "response not delivered");
            Err(err)
        }
    }
}

/// Handle to an issued request.
///
/// Blocking requests produce a handle that is already complete; background
/// requests complete when their worker thread finishes.
#[derive(Debug)]
pub struct RequestHandle {
    inner: Inner,
}

#[derive(Debug)]
enum Inner {
    Done(Result<(), ApiError>),
    Running {
        complete: Arc<AtomicBool>,
        worker: JoinHandle<Result<(), ApiError>>,
    },
}

/// Marks the request complete when the worker exits, including by panic.
struct CompleteOnDrop(Arc<AtomicBool>);

impl Drop for CompleteOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

impl RequestHandle {
    pub(crate) fn completed(outcome: Result<(), ApiError>) -> Self {
        Self {
            inner: Inner::Done(outcome),
        }
    }

    pub(crate) fn spawn<F>(job: F) -> Self
    where
        F: FnOnce() -> Result<(), ApiError> + Send + 'static,
    {
        let complete = Arc::new(AtomicBool::new(false));
        let guard = CompleteOnDrop(Arc::clone(&complete));
        let worker = thread::spawn(move || {
            let _guard = guard;
            job()
        });
        Self {
            inner: Inner::Running { complete, worker },
        }
    }

    pub fn state(&self) -> RequestState {
        match &self.inner {
            Inner::Done(_) => RequestState::Complete,
            Inner::Running { complete, .. } if complete.load(Ordering::Acquire) => {
                RequestState::Complete
            }
            Inner::Running { .. } => RequestState::Pending,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state() == RequestState::Complete
    }

    /// Block until the request completes and return its outcome.
    pub fn wait(self) -> Result<(), ApiError> {
        match self.inner {
            Inner::Done(outcome) => outcome,
            Inner::Running { worker, .. } => worker.join().unwrap_or(Err(ApiError::Disconnected)),
        }
    }
}
