use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tracing::trace;

/// The downstream end of a pipeline stage: a `next` callback plus optional
/// terminal callbacks. This is all the operators require of a consumer.
pub struct Sink<T, E = ()> {
    next: Box<dyn Fn(T) + Send + Sync>,
    complete: Option<Box<dyn Fn() + Send + Sync>>,
    error: Option<Box<dyn Fn(E) + Send + Sync>>,
}

impl<T: 'static, E: 'static> Sink<T, E> {
    pub fn next<F>(next: F) -> Self
    where F: Fn(T) + Send + Sync + 'static {
        Self { next: Box::new(next), complete: None, error: None }
    }

    pub fn on_complete<F>(mut self, complete: F) -> Self
    where F: Fn() + Send + Sync + 'static {
        self.complete = Some(Box::new(complete));
        self
    }

    pub fn on_error<F>(mut self, error: F) -> Self
    where F: Fn(E) + Send + Sync + 'static {
        self.error = Some(Box::new(error));
        self
    }

    /// Delivers one value.
    pub fn push(&self, value: T) { (self.next)(value) }

    /// Delivers successful completion.
    pub fn finish(&self) {
        if let Some(complete) = &self.complete {
            complete()
        }
    }

    /// Delivers a terminal error.
    pub fn fail(&self, err: E) {
        if let Some(error) = &self.error {
            error(err)
        }
    }
}

/// Anything that can be subscribed with a [`Sink`] and unsubscribed by
/// dropping the returned [`Subscription`].
pub trait Source<T: 'static, E: 'static = ()> {
    fn subscribe(&self, sink: Sink<T, E>) -> Subscription;
}

/// RAII unsubscription: dropping the handle detaches the sink from its source
/// and runs any operator cleanup exactly once.
pub struct Subscription(Option<Box<dyn FnOnce() + Send>>);

impl Subscription {
    pub fn new<F>(on_unsubscribe: F) -> Self
    where F: FnOnce() + Send + 'static {
        Self(Some(Box::new(on_unsubscribe)))
    }

    /// A handle with nothing to release.
    pub fn detached() -> Self { Self(None) }

    /// Explicit form of dropping the handle.
    pub fn unsubscribe(self) { drop(self) }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cleanup) = self.0.take() {
            cleanup()
        }
    }
}

/// A hot multicast source with terminal semantics - the pipeline building
/// block the operators are exercised against.
///
/// `next` fans a value out to every subscribed sink; `complete`/`error` drain
/// the sink set and deliver the terminal signal. Emissions after a terminal
/// event are ignored, and a sink subscribed after one receives nothing.
pub struct Relay<T, E = ()>(Arc<RelayInner<T, E>>);

impl<T, E> Clone for Relay<T, E> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

struct RelayInner<T, E> {
    state: Mutex<RelayState<T, E>>,
}

struct RelayState<T, E> {
    sinks: HashMap<usize, Arc<Sink<T, E>>>,
    next_id: usize,
    terminated: bool,
}

impl<T, E> std::fmt::Debug for Relay<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.0.state.lock().unwrap();
        f.debug_struct("Relay").field("sinks", &state.sinks.len()).field("terminated", &state.terminated).finish()
    }
}

impl<T: 'static, E: 'static> Default for Relay<T, E> {
    fn default() -> Self { Self::new() }
}

impl<T: 'static, E: 'static> Relay<T, E> {
    pub fn new() -> Self {
        Self(Arc::new(RelayInner { state: Mutex::new(RelayState { sinks: HashMap::new(), next_id: 0, terminated: false }) }))
    }

    /// Emits a value to every live sink. Ignored after a terminal event.
    pub fn next(&self, value: T)
    where T: Clone {
        let sinks = {
            let state = self.0.state.lock().unwrap();
            if state.terminated {
                return;
            }
            state.sinks.values().cloned().collect::<Vec<_>>()
        };
        // clone the value for each sink except the last one
        if let Some((last, rest)) = sinks.split_last() {
            for sink in rest {
                sink.push(value.clone());
            }
            last.push(value);
        }
    }

    /// Completes the relay, delivering `complete` to every sink and draining
    /// the sink set. Idempotent.
    pub fn complete(&self) {
        let Some(sinks) = self.terminate() else { return };
        trace!(sinks = sinks.len(), "relay complete");
        for sink in sinks {
            sink.finish();
        }
    }

    /// Fails the relay, delivering the error to every sink and draining the
    /// sink set. Idempotent; later calls drop the error.
    pub fn error(&self, err: E)
    where E: Clone {
        let Some(sinks) = self.terminate() else { return };
        trace!(sinks = sinks.len(), "relay error");
        if let Some((last, rest)) = sinks.split_last() {
            for sink in rest {
                sink.fail(err.clone());
            }
            last.fail(err);
        }
    }

    fn terminate(&self) -> Option<Vec<Arc<Sink<T, E>>>> {
        let mut state = self.0.state.lock().unwrap();
        if state.terminated {
            return None;
        }
        state.terminated = true;
        Some(state.sinks.drain().map(|(_, sink)| sink).collect())
    }
}

impl<T: 'static, E: 'static> Source<T, E> for Relay<T, E> {
    fn subscribe(&self, sink: Sink<T, E>) -> Subscription {
        let mut state = self.0.state.lock().unwrap();
        if state.terminated {
            return Subscription::detached();
        }
        let id = state.next_id;
        state.next_id += 1;
        state.sinks.insert(id, Arc::new(sink));
        let weak = Arc::downgrade(&self.0);
        Subscription::new(move || detach(weak, id))
    }
}

fn detach<T, E>(weak: Weak<RelayInner<T, E>>, id: usize) {
    if let Some(inner) = weak.upgrade() {
        inner.state.lock().unwrap().sinks.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn collector() -> (Arc<Mutex<Vec<String>>>, Sink<u32, String>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let next = events.clone();
            let complete = events.clone();
            let error = events.clone();
            Sink::next(move |n: u32| next.lock().unwrap().push(format!("next {n}")))
                .on_complete(move || complete.lock().unwrap().push("complete".into()))
                .on_error(move |e: String| error.lock().unwrap().push(format!("error {e}")))
        };
        (events, sink)
    }

    #[test]
    fn multicast_and_complete() {
        let relay: Relay<u32, String> = Relay::new();
        let (first, sink) = collector();
        let _a = relay.subscribe(sink);
        let (second, sink) = collector();
        let _b = relay.subscribe(sink);

        relay.next(1);
        relay.complete();
        relay.next(2); // ignored after terminal

        assert_eq!(*first.lock().unwrap(), ["next 1", "complete"]);
        assert_eq!(*second.lock().unwrap(), ["next 1", "complete"]);
    }

    #[test]
    fn error_reaches_every_sink_once() {
        let relay: Relay<u32, String> = Relay::new();
        let (events, sink) = collector();
        let _sub = relay.subscribe(sink);

        relay.error("boom".into());
        relay.error("again".into()); // dropped

        assert_eq!(*events.lock().unwrap(), ["error boom"]);
    }

    #[test]
    fn dropping_the_subscription_detaches() {
        let relay: Relay<u32, String> = Relay::new();
        let (events, sink) = collector();
        let sub = relay.subscribe(sink);

        relay.next(1);
        drop(sub);
        relay.next(2);
        relay.complete();

        assert_eq!(*events.lock().unwrap(), ["next 1"]);
    }

    #[test]
    fn subscribing_after_terminal_receives_nothing() {
        let relay: Relay<u32, String> = Relay::new();
        relay.complete();

        let (events, sink) = collector();
        let _sub = relay.subscribe(sink);
        relay.next(3);

        assert!(events.lock().unwrap().is_empty());
    }
}
