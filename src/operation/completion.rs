use super::error::DispatchError;
use crate::ids::RequestId;
use crate::server::OperationResponse;
use may::sync::mpsc;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where the single response for a request is delivered.
///
/// Wraps the transport's reply channel and stamps the request id header on
/// whatever is sent.
pub struct ResponseSink {
    reply_tx: mpsc::Sender<OperationResponse>,
    request_id: RequestId,
    request_id_header: Arc<str>,
}

impl ResponseSink {
    #[must_use]
    pub fn new(
        reply_tx: mpsc::Sender<OperationResponse>,
        request_id: RequestId,
        request_id_header: Arc<str>,
    ) -> Self {
        Self {
            reply_tx,
            request_id,
            request_id_header,
        }
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Send the response, consuming the sink.
    pub fn send(self, mut response: OperationResponse) {
        response.set_header(&self.request_id_header, self.request_id.to_string());
        let status = response.status;
        if let Err(e) = self.reply_tx.send(response) {
            warn!(
                request_id = %self.request_id,
                status,
                error = %e,
                "Response receiver dropped before the response was sent"
            );
        }
    }
}

impl std::fmt::Debug for ResponseSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseSink")
            .field("request_id", &self.request_id)
            .field("request_id_header", &self.request_id_header)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// The operation function has not returned yet.
    Running,
    /// The operation returned `Ok(())` and still owes a completion.
    Returned,
    /// The completion was dropped unused while the operation was running.
    Abandoned,
    /// The response has been sent.
    Responded,
}

/// Per-request state shared by the invoking thread and the [`Completion`].
///
/// Guarantees at most one response per request.
pub(crate) struct ResponseSlot {
    state: Mutex<SlotState>,
    operation: Arc<str>,
    request_id: RequestId,
    started: Instant,
}

struct SlotState {
    phase: Phase,
    sink: Option<ResponseSink>,
}

impl ResponseSlot {
    pub(crate) fn new(operation: Arc<str>, sink: ResponseSink) -> Self {
        Self {
            request_id: sink.request_id(),
            state: Mutex::new(SlotState {
                phase: Phase::Running,
                sink: Some(sink),
            }),
            operation,
            started: Instant::now(),
        }
    }

    /// Send `response` unless one was already sent. Returns whether it was sent.
    pub(crate) fn respond(&self, response: OperationResponse) -> bool {
        let sink = {
            let mut state = self.state.lock();
            if state.phase == Phase::Responded {
                return false;
            }
            state.phase = Phase::Responded;
            state.sink.take()
        };
        let Some(sink) = sink else {
            return false;
        };

        info!(
            request_id = %self.request_id,
            operation = %self.operation,
            status = response.status,
            latency_us = self.started.elapsed().as_micros(),
            "Operation response sent"
        );
        sink.send(response);
        true
    }

    /// The operation function returned `Ok(())`.
    pub(crate) fn returned_ok(&self) {
        let abandoned = {
            let mut state = self.state.lock();
            match state.phase {
                Phase::Running => {
                    state.phase = Phase::Returned;
                    false
                }
                Phase::Abandoned => true,
                Phase::Returned | Phase::Responded => false,
            }
        };
        if abandoned {
            self.respond_abandoned();
        } else {
            debug!(
                request_id = %self.request_id,
                operation = %self.operation,
                "Operation returned"
            );
        }
    }

    /// The completion was dropped without a result.
    fn abandon(&self) {
        let returned = {
            let mut state = self.state.lock();
            match state.phase {
                Phase::Running => {
                    state.phase = Phase::Abandoned;
                    false
                }
                Phase::Returned => true,
                Phase::Abandoned | Phase::Responded => false,
            }
        };
        if returned {
            self.respond_abandoned();
        }
    }

    fn respond_abandoned(&self) {
        warn!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Operation dropped its completion without a result"
        );
        self.respond(
            DispatchError::Internal {
                detail: format!("operation '{}' never completed", self.operation),
            }
            .into_response(),
        );
    }

    pub(crate) fn operation(&self) -> &str {
        &self.operation
    }

    pub(crate) fn request_id(&self) -> RequestId {
        self.request_id
    }
}

pub(crate) type FinishFn<O, E> = dyn Fn(Result<O, E>) -> OperationResponse + Send + Sync;

/// Single-use token an operation consumes to report its result.
///
/// Call [`Completion::complete`] exactly once, from any thread, either before
/// the operation function returns or later. Dropping the token without
/// completing it produces an `InternalError` response. If the operation
/// function itself returns an error first, that error is the response and a
/// later completion is ignored.
///
/// The token is `Send`, so it can be moved to a worker thread or coroutine:
///
/// ```rust,ignore
/// dispatcher.register("/slow", HttpMethod::Post, |input: Job, ctx: &Ctx, done: Completion<Done, JobError>| {
///     let pool = ctx.pool.clone();
///     std::thread::spawn(move || done.complete(pool.run(input)));
///     Ok(())
/// }, OperationConfig::new())?;
/// ```
pub struct Completion<O, E> {
    slot: Arc<ResponseSlot>,
    finish: Arc<FinishFn<O, E>>,
    completed: bool,
}

impl<O, E> Completion<O, E> {
    pub(crate) fn new(slot: Arc<ResponseSlot>, finish: Arc<FinishFn<O, E>>) -> Self {
        Self {
            slot,
            finish,
            completed: false,
        }
    }

    /// Report the result and send the response.
    ///
    /// If rendering the result panics, the token still counts as dropped and
    /// the request gets an `InternalError`.
    pub fn complete(mut self, result: Result<O, E>) {
        let response = (self.finish)(result);
        self.completed = true;
        if !self.slot.respond(response) {
            warn!(
                request_id = %self.slot.request_id(),
                operation = %self.slot.operation(),
                "Completion arrived after a response was already sent; ignoring"
            );
        }
    }

    pub fn succeed(self, output: O) {
        self.complete(Ok(output));
    }

    pub fn fail(self, error: E) {
        self.complete(Err(error));
    }

    /// Id of the request this completion answers.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.slot.request_id()
    }
}

impl<O, E> Drop for Completion<O, E> {
    fn drop(&mut self) {
        if !self.completed {
            self.slot.abandon();
        }
    }
}

impl<O, E> std::fmt::Debug for Completion<O, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("request_id", &self.slot.request_id())
            .field("operation", &self.slot.operation())
            .field("completed", &self.completed)
            .finish()
    }
}
