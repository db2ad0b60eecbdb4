use std::sync::Arc;

use crate::accessor::BusyAccessor;
use crate::scope::BusyScope;
use crate::source::{Sink, Source, Subscription};

/// Tagging operator: see [`SourceExt::with_busy`](crate::SourceExt::with_busy).
///
/// Values, completion and errors pass through untouched. The accessor is on
/// the busy scope for the duration of the subscribe call and of every
/// delivery to the downstream sink, which is exactly when inner pipelines get
/// subscribed.
pub struct WithBusy<S> {
    source: S,
    accessor: BusyAccessor,
}

impl<S> WithBusy<S> {
    pub(crate) fn new(source: S, accessor: BusyAccessor) -> Self { Self { source, accessor } }
}

impl<S, T, E> Source<T, E> for WithBusy<S>
where
    S: Source<T, E>,
    T: 'static,
    E: 'static,
{
    fn subscribe(&self, sink: Sink<T, E>) -> Subscription {
        let sink = Arc::new(sink);
        let wrapped = Sink::next({
            let sink = sink.clone();
            let accessor = self.accessor.clone();
            move |value| {
                let _scope = BusyScope::enter(accessor.clone());
                sink.push(value);
            }
        })
        .on_complete({
            let sink = sink.clone();
            let accessor = self.accessor.clone();
            move || {
                let _scope = BusyScope::enter(accessor.clone());
                sink.finish();
            }
        })
        .on_error({
            let sink = sink.clone();
            let accessor = self.accessor.clone();
            move |err| {
                let _scope = BusyScope::enter(accessor.clone());
                sink.fail(err);
            }
        });

        // subscribe-time side effects (eager inner subscriptions) see the tag too
        let _scope = BusyScope::enter(self.accessor.clone());
        self.source.subscribe(wrapped)
    }
}
