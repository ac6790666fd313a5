//! Delay gate
//!
//! Holds a request for a fixed duration before forwarding it, unless the
//! request context is cancelled first.
//!
//! ```text
//!             timer fires            ┌───────────┐
//!          ┌────────────────────────▶│ Forwarded │── next()
//! ┌─────────┐                        └───────────┘
//! │ Waiting │
//! └─────────┘  ctx cancelled/expired ┌───────────┐
//!          └────────────────────────▶│ Cancelled │── Err(ctx error)
//!                                    └───────────┘
//! ```
//!
//! Exactly one transition fires. The timer is owned by the wait future and
//! is dropped on both paths.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::error::Result;
use crate::traits::RequestContext;

/// Cancellable forwarding delay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DelayGate {
    delay: Duration,
}

impl DelayGate {
    /// Create a gate holding requests for `delay`
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// The configured delay
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait for the delay or the context, whichever comes first
    ///
    /// Returns `Ok(())` when the delay elapsed, or the context error.
    /// A zero delay returns immediately without consulting the context.
    pub async fn wait(&self, ctx: &RequestContext) -> Result<()> {
        if self.delay.is_zero() {
            return Ok(());
        }

        let timer = tokio::time::sleep(self.delay);
        tokio::pin!(timer);

        tokio::select! {
            _ = &mut timer => Ok(()),
            err = ctx.done() => {
                debug!("Delay of {:?} interrupted: {}", self.delay, err);
                Err(err)
            }
        }
    }

    /// Wait, then run `next` and return its result
    ///
    /// `next` is never called when the context ends first.
    pub async fn run<F, Fut, T>(&self, ctx: &RequestContext, next: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.wait(ctx).await?;
        next().await
    }
}
