/*!
Busy indicator tracking for reactive pipelines.

A [`BusyController`] reference-counts overlapping asynchronous operations for one
visual busy region: `show()` makes it visible synchronously, `hide()` releases one
reference and drops visibility only after a short debounce, so back-to-back
operations coalesce into a single visible period instead of flickering.

Pipelines opt in with the operator pair:
- [`SourceExt::with_busy`] tags a pipeline with a [`BusyAccessor`] - a deferred
  lookup that may resolve to nothing while the indicator view is not mounted yet.
  The tag changes nothing about the values flowing through.
- [`SourceExt::push_busy`] wraps an inner pipeline (an HTTP request, typically).
  On subscribe it snapshots the accessors on the current [`BusyScope`], resolves
  each one (polling until the view mounts), and toggles the controllers for the
  lifetime of the subscription. Tracking is best-effort: with no tag in scope the
  operator is a pure pass-through.

Plain `async` calls can participate without the pipeline plumbing via
[`track_busy`].

# Usage

```rust
use reactive_busy::*;
use std::time::Duration;

tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
    let indicator = BusyController::new();
    let accessor = BusyAccessor::fixed(indicator.clone());

    let requests: Relay<u32> = Relay::new();
    let tracked = requests.clone().push_busy();

    // anything subscribed inside this scope is tracked by the indicator
    let _scope = BusyScope::enter(accessor);
    let _sub = tracked.subscribe(Sink::next(|n| println!("got {n}")));
    assert!(indicator.is_loading());

    requests.next(1);
    requests.complete();

    // visibility falls once the hide debounce elapses
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!indicator.is_loading());
});
```
*/

mod accessor;
mod controller;
mod operator;
mod scope;
mod source;

pub use accessor::*;
pub use controller::*;
pub use operator::*;
pub use scope::*;
pub use source::*;
