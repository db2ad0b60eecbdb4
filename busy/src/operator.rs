pub mod future;
pub mod push_busy;
pub mod with_busy;

pub use future::*;
pub use push_busy::*;
pub use with_busy::*;

use crate::accessor::BusyAccessor;
use crate::source::Source;

/// Busy-tracking combinators for any [`Source`].
pub trait SourceExt<T: 'static, E: 'static>: Source<T, E> + Sized {
    /// Tags this pipeline with an accessor. Referentially transparent over
    /// values and terminal signals; its only effect is that inner pipelines
    /// subscribed from within this one can discover the accessor through the
    /// busy scope. Nested applications stack and are all discoverable.
    fn with_busy(self, accessor: BusyAccessor) -> WithBusy<Self> { WithBusy::new(self, accessor) }

    /// Marks this pipeline as a tracked operation: subscribing resolves every
    /// accessor in scope (polling for views that mount late) and holds their
    /// controllers shown until the pipeline completes, errors, or is
    /// unsubscribed. With no accessor in scope this is a pure pass-through.
    fn push_busy(self) -> PushBusy<Self> { PushBusy::new(self) }
}

impl<S, T: 'static, E: 'static> SourceExt<T, E> for S where S: Source<T, E> {}
