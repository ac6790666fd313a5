// # Request Context
//
// Cancellation scope of a single request.
//
// A context is cancelled either explicitly (the host drops the request or
// shuts down) or implicitly when its deadline passes. Stages that suspend
// must race their wait against `done()` and return its error verbatim.
//
// ## Usage
//
// ```rust,ignore
// let ctx = RequestContext::new().with_timeout(Duration::from_secs(5));
//
// tokio::select! {
//     _ = work() => {}
//     err = ctx.done() => return Err(err),
// }
// ```

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::Error;

/// Cancellation signal and optional deadline of one request
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Create a context with no deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context driven by an existing cancellation token
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Set an absolute deadline
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set a deadline relative to now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context cancelled together with this one
    ///
    /// Cancelling the child does not cancel the parent.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancel the context and every child derived from it
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The underlying cancellation token
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The deadline, if one is set
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The context error if the context is already done
    pub fn err(&self) -> Option<Error> {
        if self.token.is_cancelled() {
            return Some(Error::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Error::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolve once the context is cancelled or its deadline passes
    ///
    /// Returns [`Error::Cancelled`] or [`Error::DeadlineExceeded`].
    pub async fn done(&self) -> Error {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => Error::Cancelled,
                    _ = tokio::time::sleep_until(deadline) => Error::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                Error::Cancelled
            }
        }
    }
}
