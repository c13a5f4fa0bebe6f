// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Helpers for driving modules in tests.

use crate::{Event, EventBus, EventKind, EventKindType};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::timeout;
use tracing::debug;

/// Sends a quit signal to a running module and waits for it to stop gracefully.
///
/// Publishes a [`QuitEvent`](EventKind::QuitEvent) through the given [`EventBus`]
/// and waits up to 100 ms for the module's task to finish.
///
/// # Panics
/// This function panics if:
/// - The module does not stop within the timeout.
/// - The task panicked or returned `Err(())`.
pub async fn stop_module(
    event_bus: &EventBus,
    handle: &mut tokio::task::JoinHandle<Result<(), ()>>,
) {
    event_bus.publish(&Event {
        kind: EventKind::QuitEvent,
    });
    let result = timeout(std::time::Duration::from_millis(100), handle)
        .await
        .expect("Module doesn't handle quit event in timeout")
        .expect("Module task panicked");
    assert_eq!(result, Ok(()), "Module stopped with an error");
    debug!("Module stopped");
}

/// Waits for an [`Event`] of type `exp_event` on `rx` for at most `duration`.
///
/// Events of other types, and lag notifications of the broadcast channel,
/// are skipped.
///
/// # Panics
///
/// Panics if no matching event is received within `duration` or the bus
/// is closed.
pub async fn wait_for_event(
    rx: &mut tokio::sync::broadcast::Receiver<Event>,
    duration: std::time::Duration,
    exp_event: EventKindType,
) -> Event {
    let wait = async {
        loop {
            match rx.recv().await {
                Ok(event) if event.event_type() == exp_event => return event,
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("Event bus closed"),
            }
        }
    };
    timeout(duration, wait)
        .await
        .unwrap_or_else(|_| panic!("Failed to receive event of type {:?}", exp_event))
}
