use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use tracing::{debug, trace};

/// How long the indicator stays visible after the last tracked operation
/// finishes. A `show()` arriving inside this window cancels the pending
/// transition, so rapid back-to-back operations render as one visible period.
pub const HIDE_DEBOUNCE: Duration = Duration::from_millis(100);

/// Reference-counted show/hide state for one logical busy region.
///
/// Cheaply clonable handle - any number of concurrent pipelines may share one
/// controller. `count` tracks outstanding operations; visibility rises
/// synchronously on the first `show()` and falls only after [`HIDE_DEBOUNCE`]
/// elapses with the count still at zero.
///
/// The debounce is a tokio task, so `hide()` must be called from within a
/// tokio runtime.
pub struct BusyController(Arc<Inner>);

impl Clone for BusyController {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

struct Inner {
    state: Mutex<State>,
    listeners: RwLock<HashMap<usize, Arc<dyn Fn(bool) + Send + Sync>>>,
    next_listener: AtomicUsize,
}

struct State {
    count: usize,
    loading: bool,
    closed: bool,
    // Each scheduled debounce gets a fresh generation. A debounce task that
    // lost the abort race still takes the state lock before acting, and a
    // stale generation means it was cancelled - it must not apply anything.
    hide_gen: u64,
    pending_hide: Option<(u64, tokio::task::AbortHandle)>,
}

impl std::fmt::Debug for BusyController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.0.state.lock().unwrap();
        f.debug_struct("BusyController").field("count", &state.count).field("loading", &state.loading).finish()
    }
}

impl Default for BusyController {
    fn default() -> Self { Self::new() }
}

impl BusyController {
    pub fn new() -> Self {
        Self(Arc::new(Inner {
            state: Mutex::new(State { count: 0, loading: false, closed: false, hide_gen: 0, pending_hide: None }),
            listeners: RwLock::new(HashMap::new()),
            next_listener: AtomicUsize::new(0),
        }))
    }

    /// Whether the indicator is currently visible.
    pub fn is_loading(&self) -> bool { self.0.state.lock().unwrap().loading }

    /// Number of outstanding tracked operations.
    pub fn count(&self) -> usize { self.0.state.lock().unwrap().count }

    /// Registers one more outstanding operation. Cancels any pending debounced
    /// hide; on the 0 -> 1 transition the indicator becomes visible and
    /// listeners are notified synchronously.
    pub fn show(&self) {
        let became_visible = {
            let mut state = self.0.state.lock().unwrap();
            if state.closed {
                return;
            }
            if let Some((_, handle)) = state.pending_hide.take() {
                handle.abort();
            }
            state.count += 1;
            trace!(count = state.count, "busy show");
            if state.count == 1 && !state.loading {
                state.loading = true;
                true
            } else {
                false
            }
        };
        if became_visible {
            debug!("busy indicator visible");
            self.0.notify(true);
        }
    }

    /// Releases one outstanding operation. No-op when the indicator is not
    /// loading, which guards against unmatched calls. When the count reaches
    /// zero the visibility transition is deferred by [`HIDE_DEBOUNCE`].
    pub fn hide(&self) {
        let mut state = self.0.state.lock().unwrap();
        if state.closed || !state.loading {
            return;
        }
        if state.count > 0 {
            state.count -= 1;
        }
        trace!(count = state.count, "busy hide");
        if state.count == 0 && state.pending_hide.is_none() {
            state.hide_gen += 1;
            let hide_gen = state.hide_gen;
            let weak = Arc::downgrade(&self.0);
            let task = tokio::spawn(async move {
                tokio::time::sleep(HIDE_DEBOUNCE).await;
                let Some(inner) = weak.upgrade() else { return };
                let applied = {
                    let mut state = inner.state.lock().unwrap();
                    if state.pending_hide.as_ref().map(|(pending, _)| *pending) == Some(hide_gen) {
                        state.pending_hide = None;
                        state.loading = false;
                        true
                    } else {
                        false
                    }
                };
                if applied {
                    debug!("busy indicator hidden");
                    inner.notify(false);
                }
            });
            state.pending_hide = Some((hide_gen, task.abort_handle()));
        }
    }

    /// Teardown when the indicator view is destroyed: cancels any pending
    /// debounced hide and turns all further `show()`/`hide()` calls into
    /// no-ops. Never panics.
    pub fn close(&self) {
        let mut state = self.0.state.lock().unwrap();
        if state.closed {
            return;
        }
        state.closed = true;
        if let Some((_, handle)) = state.pending_hide.take() {
            handle.abort();
        }
        debug!("busy controller closed");
    }

    /// Subscribes to visibility transitions. The listener receives `true` when
    /// the indicator becomes visible and `false` once a debounced hide
    /// completes. Dropping the guard unsubscribes.
    pub fn listen<F>(&self, listener: F) -> ListenerGuard
    where F: Fn(bool) + Send + Sync + 'static {
        let id = self.0.next_listener.fetch_add(1, Ordering::Relaxed);
        self.0.listeners.write().unwrap().insert(id, Arc::new(listener));
        ListenerGuard { inner: Arc::downgrade(&self.0), id }
    }
}

impl Inner {
    fn notify(&self, loading: bool) {
        // Clone the listeners out so no lock is held during the callbacks
        let listeners = self.listeners.read().unwrap().values().cloned().collect::<Vec<_>>();
        for listener in listeners {
            listener(loading);
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Ok(state) = self.state.get_mut() {
            if let Some((_, handle)) = state.pending_hide.take() {
                handle.abort();
            }
        }
    }
}

/// A subscription handle for visibility listeners. Unsubscribes on drop.
pub struct ListenerGuard {
    inner: Weak<Inner>,
    id: usize,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.listeners.write().unwrap().remove(&self.id);
        }
    }
}
