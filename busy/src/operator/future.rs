use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::accessor::BusyAccessor;
use crate::operator::push_busy::Tracker;
use crate::scope::BusyScope;

/// Tracks a plain future the way [`push_busy`](crate::SourceExt::push_busy)
/// tracks a pipeline: the busy scope is snapshotted here, synchronously with
/// the caller, and tracking starts on first poll. Useful for request code
/// that never goes through the [`Source`](crate::Source) plumbing.
pub fn track_busy<F>(future: F) -> TrackedBusy<F>
where F: Future {
    TrackedBusy { future: Box::pin(future), accessors: Some(BusyScope::snapshot()), tracker: None }
}

/// Future adapter returned by [`track_busy`]. Shows the in-scope controllers
/// on first poll and hides them when the future resolves or is dropped,
/// whichever comes first.
pub struct TrackedBusy<F>
where F: Future {
    future: Pin<Box<F>>,
    accessors: Option<Vec<BusyAccessor>>,
    tracker: Option<Arc<Tracker>>,
}

impl<F> Future for TrackedBusy<F>
where F: Future
{
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        if let Some(accessors) = this.accessors.take() {
            if !accessors.is_empty() {
                this.tracker = Some(Tracker::start(accessors));
            }
        }
        match this.future.as_mut().poll(cx) {
            Poll::Ready(output) => {
                if let Some(tracker) = this.tracker.take() {
                    tracker.finish();
                }
                Poll::Ready(output)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<F> Drop for TrackedBusy<F>
where F: Future
{
    fn drop(&mut self) {
        // cancellation path; a no-op after a completed poll already finished it
        if let Some(tracker) = self.tracker.take() {
            tracker.finish();
        }
    }
}
