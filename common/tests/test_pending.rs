// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::pending::{Outcome, PendingRequest};
use std::sync::{Arc, Mutex};

fn recording_listener(
    request: &PendingRequest<u32>,
) -> Arc<Mutex<Vec<Outcome<u32>>>> {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorder = calls.clone();
    request.add_listener(move |outcome| recorder.lock().unwrap().push(outcome.clone()));
    calls
}

#[test_log::test]
fn complete_notifies_listeners_once() {
    let request = PendingRequest::<u32>::new();
    let first = recording_listener(&request);
    let second = recording_listener(&request);

    assert!(request.complete(7));
    assert!(!request.complete(8));

    assert_eq!(*first.lock().unwrap(), vec![Outcome::Completed(7)]);
    assert_eq!(*second.lock().unwrap(), vec![Outcome::Completed(7)]);
    assert!(request.is_done());
    assert!(!request.is_canceled());
    assert_eq!(request.outcome(), Some(Outcome::Completed(7)));
}

#[test_log::test]
fn result_after_cancel_is_discarded() {
    let request = PendingRequest::<u32>::new();
    let calls = recording_listener(&request);

    assert!(request.cancel());
    assert!(!request.cancel());
    assert!(!request.complete(3));

    assert_eq!(*calls.lock().unwrap(), vec![Outcome::Canceled]);
    assert!(request.is_canceled());
    assert_eq!(request.outcome(), Some(Outcome::Canceled));
}

#[test_log::test]
fn listener_added_after_completion_runs_immediately() {
    let request = PendingRequest::<u32>::new();
    request.complete(42);
    let calls = recording_listener(&request);
    assert_eq!(*calls.lock().unwrap(), vec![Outcome::Completed(42)]);

    request.complete(43);
    assert_eq!(calls.lock().unwrap().len(), 1);
}

#[test_log::test]
fn cancel_hooks_run_before_listeners() {
    let request = PendingRequest::<u32>::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    let hook_order = order.clone();
    request.on_cancel(move || hook_order.lock().unwrap().push("hook"));
    let listener_order = order.clone();
    request.add_listener(move |_| listener_order.lock().unwrap().push("listener"));

    request.cancel();
    assert_eq!(*order.lock().unwrap(), vec!["hook", "listener"]);
}

#[test_log::test]
fn cancel_hooks_are_dropped_on_completion() {
    let request = PendingRequest::<u32>::new();
    let ran = Arc::new(Mutex::new(false));
    let flag = ran.clone();
    request.on_cancel(move || *flag.lock().unwrap() = true);

    request.complete(1);
    request.cancel();
    assert!(!*ran.lock().unwrap());

    let canceled = PendingRequest::<u32>::new();
    canceled.cancel();
    let flag = ran.clone();
    canceled.on_cancel(move || *flag.lock().unwrap() = true);
    assert!(*ran.lock().unwrap());
}

#[test_log::test]
fn listener_may_query_its_request() {
    let request = PendingRequest::<u32>::new();
    let observed = Arc::new(Mutex::new(None));
    let clone = request.clone();
    let sink = observed.clone();
    request.add_listener(move |_| *sink.lock().unwrap() = Some(clone.is_canceled()));

    request.cancel();
    assert_eq!(*observed.lock().unwrap(), Some(true));
}
