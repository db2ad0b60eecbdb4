use std::sync::Arc;

use crate::controller::BusyController;

/// A unique identifier for an accessor, used to deduplicate accessors found
/// more than once on the same scope chain. Derived from the `Arc` address, so
/// clones of one accessor compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessorId(usize);

/// Deferred lookup of a [`BusyController`].
///
/// The indicator view may not exist yet when a pipeline is constructed, so the
/// pipeline carries this lookup instead of the controller itself. Pure and
/// stateless; may return different results over time (not mounted -> mounted).
#[derive(Clone)]
pub struct BusyAccessor(Arc<dyn Fn() -> Option<BusyController> + Send + Sync>);

impl std::fmt::Debug for BusyAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BusyAccessor").field(&self.id()).finish()
    }
}

impl BusyAccessor {
    pub fn new<F>(lookup: F) -> Self
    where F: Fn() -> Option<BusyController> + Send + Sync + 'static {
        Self(Arc::new(lookup))
    }

    /// An accessor that always resolves to the given controller.
    pub fn fixed(controller: BusyController) -> Self { Self::new(move || Some(controller.clone())) }

    /// Runs the lookup. `None` means the indicator is not available yet.
    pub fn resolve(&self) -> Option<BusyController> { (self.0)() }

    pub fn id(&self) -> AccessorId { AccessorId(Arc::as_ptr(&self.0) as *const () as usize) }
}
