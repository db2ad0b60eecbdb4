mod common;
use common::change_watcher;
use reactive_busy::*;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn refcount_rises_synchronously_and_falls_after_debounce() {
    let busy = BusyController::new();
    assert!(!busy.is_loading());

    busy.show();
    assert!(busy.is_loading());
    assert_eq!(busy.count(), 1);

    busy.show();
    assert_eq!(busy.count(), 2);

    busy.hide();
    assert_eq!(busy.count(), 1);
    assert!(busy.is_loading());

    busy.hide();
    assert_eq!(busy.count(), 0);
    // still visible until the debounce elapses
    assert!(busy.is_loading());

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!busy.is_loading());
    assert_eq!(busy.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn rapid_show_hide_coalesces_into_a_single_flash() {
    let busy = BusyController::new();
    let (watcher, check) = change_watcher();
    let _guard = busy.listen(move |loading| watcher(loading));

    busy.show();
    busy.show();
    busy.hide();
    busy.hide();

    tokio::time::sleep(Duration::from_millis(300)).await;
    // exactly one visible period: one rise, one fall
    assert_eq!(check(), [true, false]);
}

#[tokio::test(start_paused = true)]
async fn show_inside_the_debounce_window_keeps_the_indicator_up() {
    let busy = BusyController::new();
    let (watcher, check) = change_watcher();
    let _guard = busy.listen(move |loading| watcher(loading));

    busy.show();
    busy.hide();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // a second operation starts before the pending hide fires
    busy.show();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(busy.is_loading());
    assert_eq!(check(), [true]); // no flicker

    busy.hide();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!busy.is_loading());
    assert_eq!(check(), [false]);
}

#[tokio::test(start_paused = true)]
async fn unmatched_hides_are_no_ops_and_count_never_underflows() {
    let busy = BusyController::new();
    busy.hide();
    busy.hide();
    assert_eq!(busy.count(), 0);
    assert!(!busy.is_loading());

    busy.show();
    busy.hide();
    // extra hide while the debounce is pending: count is already 0
    busy.hide();
    assert_eq!(busy.count(), 0);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!busy.is_loading());

    // the controller still works after the cycle
    busy.show();
    assert!(busy.is_loading());
    assert_eq!(busy.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn close_cancels_the_pending_hide_and_rejects_further_calls() {
    let busy = BusyController::new();
    let (watcher, check) = change_watcher();
    let _guard = busy.listen(move |loading| watcher(loading));

    busy.show();
    busy.hide();
    busy.close();

    tokio::time::sleep(Duration::from_millis(300)).await;
    // the cancelled debounce never fired
    assert_eq!(check(), [true]);

    busy.show();
    busy.hide();
    busy.close();
    assert_eq!(busy.count(), 0);
    assert_eq!(check(), [] as [bool; 0]);
}

#[tokio::test(start_paused = true)]
async fn dropped_listeners_stop_receiving_transitions() {
    let busy = BusyController::new();
    let (watcher, check) = change_watcher();
    let guard = busy.listen(move |loading| watcher(loading));

    busy.show();
    assert_eq!(check(), [true]);

    drop(guard);
    busy.hide();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!busy.is_loading());
    assert_eq!(check(), [] as [bool; 0]);
}
