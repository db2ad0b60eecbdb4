use std::cell::RefCell;
use std::marker::PhantomData;

use crate::accessor::{AccessorId, BusyAccessor};

// Thread-local stack of accessors, one frame per enclosing tagged pipeline
// stage. Inner subscriptions read it instead of reflecting over the
// subscriber graph the way the RxJS original did.
thread_local! {
    static SCOPE_STACK: RefCell<Vec<BusyAccessor>> = const { RefCell::new(Vec::new()) };
}

/// The busy scope active on the current thread.
///
/// [`SourceExt::with_busy`](crate::SourceExt::with_busy) pushes its accessor
/// here while subscribing and while delivering each event, so any inner
/// pipeline subscribed from within that code can discover it. Consumer code
/// can also enter a scope directly around an operation it wants tracked.
pub struct BusyScope {}

impl BusyScope {
    /// Pushes an accessor onto the stack. Popped when the guard drops.
    pub fn enter(accessor: BusyAccessor) -> ScopeGuard {
        let id = accessor.id();
        SCOPE_STACK.with(|stack| stack.borrow_mut().push(accessor));
        ScopeGuard { id, _not_send: PhantomData }
    }

    /// The distinct accessors currently in scope, outermost first. Infallible:
    /// an empty stack yields an empty vector, and busy tracking degrades to a
    /// no-op rather than failing the pipeline that asked.
    pub fn snapshot() -> Vec<BusyAccessor> {
        SCOPE_STACK.with(|stack| {
            let stack = stack.borrow();
            let mut accessors: Vec<BusyAccessor> = Vec::with_capacity(stack.len());
            for accessor in stack.iter() {
                if !accessors.iter().any(|seen| seen.id() == accessor.id()) {
                    accessors.push(accessor.clone());
                }
            }
            accessors
        })
    }

    /// Current stack depth (frames, not distinct accessors).
    pub fn depth() -> usize { SCOPE_STACK.with(|stack| stack.borrow().len()) }
}

/// Removes its accessor frame from the scope stack on drop.
pub struct ScopeGuard {
    id: AccessorId,
    // scope frames belong to the thread they were pushed on
    _not_send: PhantomData<*const ()>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        SCOPE_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            // usually the top frame, but tolerate out-of-order guard drops
            if let Some(position) = stack.iter().rposition(|a| a.id() == self.id) {
                stack.remove(position);
            }
        });
    }
}
