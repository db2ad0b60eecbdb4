use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tracing::{debug, trace};

use crate::accessor::BusyAccessor;
use crate::controller::BusyController;
use crate::scope::BusyScope;
use crate::source::{Sink, Source, Subscription};

/// How often an unresolved accessor is re-polled while its view mounts.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Discovery operator: see [`SourceExt::push_busy`](crate::SourceExt::push_busy).
pub struct PushBusy<S> {
    source: S,
}

impl<S> PushBusy<S> {
    pub(crate) fn new(source: S) -> Self { Self { source } }
}

impl<S, T, E> Source<T, E> for PushBusy<S>
where
    S: Source<T, E>,
    T: 'static,
    E: 'static,
{
    fn subscribe(&self, sink: Sink<T, E>) -> Subscription {
        let accessors = BusyScope::snapshot();
        if accessors.is_empty() {
            // nothing tagged upstream: pure pass-through
            return self.source.subscribe(sink);
        }

        let tracker = Tracker::start(accessors);
        let sink = Arc::new(sink);
        let wrapped = Sink::next({
            let sink = sink.clone();
            move |value| sink.push(value)
        })
        .on_complete({
            let sink = sink.clone();
            let tracker = tracker.clone();
            move || {
                tracker.finish();
                sink.finish();
            }
        })
        .on_error({
            let sink = sink.clone();
            let tracker = tracker.clone();
            move |err| {
                tracker.finish();
                sink.fail(err);
            }
        });

        let inner = self.source.subscribe(wrapped);
        Subscription::new(move || {
            tracker.finish();
            drop(inner);
        })
    }
}

/// Show/hide bookkeeping for one tracked operation: which controllers were
/// shown and which accessors are still being polled.
pub(crate) struct Tracker {
    state: Mutex<TrackState>,
}

struct TrackState {
    shown: Vec<BusyController>,
    watches: Vec<tokio::task::AbortHandle>,
    finished: bool,
}

impl Tracker {
    /// Resolves every accessor once, synchronously - an already-mounted view
    /// gets its `show()` before this returns. Each accessor still unresolved
    /// gets one polling watch.
    pub(crate) fn start(accessors: Vec<BusyAccessor>) -> Arc<Self> {
        let tracker =
            Arc::new(Self { state: Mutex::new(TrackState { shown: Vec::new(), watches: Vec::new(), finished: false }) });
        debug!(accessors = accessors.len(), "busy tracking started");
        for accessor in accessors {
            match accessor.resolve() {
                Some(controller) => {
                    controller.show();
                    tracker.state.lock().unwrap().shown.push(controller);
                }
                None => {
                    let handle = spawn_watch(Arc::downgrade(&tracker), accessor);
                    tracker.state.lock().unwrap().watches.push(handle);
                }
            }
        }
        tracker
    }

    /// Hides every controller that was shown and aborts outstanding watches.
    /// Terminal and unsubscribe paths may both get here; only the first call
    /// has effect, so no controller is ever double-decremented.
    pub(crate) fn finish(&self) {
        let (shown, watches) = {
            let mut state = self.state.lock().unwrap();
            if state.finished {
                return;
            }
            state.finished = true;
            (std::mem::take(&mut state.shown), std::mem::take(&mut state.watches))
        };
        debug!(shown = shown.len(), watches = watches.len(), "busy tracking finished");
        for watch in watches {
            watch.abort();
        }
        for controller in shown {
            controller.hide();
        }
    }
}

/// Polls the accessor until it resolves, then shows the controller and stops.
/// The tracker lock is held across the show so cleanup cannot slip between a
/// watch resolving and its `show()`.
fn spawn_watch(tracker: Weak<Tracker>, accessor: BusyAccessor) -> tokio::task::AbortHandle {
    let task = tokio::spawn(async move {
        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            let Some(tracker) = tracker.upgrade() else { return };
            if let Some(controller) = accessor.resolve() {
                let mut state = tracker.state.lock().unwrap();
                if !state.finished {
                    trace!("busy accessor resolved");
                    controller.show();
                    state.shown.push(controller);
                }
                return;
            }
        }
    });
    task.abort_handle()
}
