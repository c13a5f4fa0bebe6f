// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Event bus and module runtime shared by every module of the location service.

use common::record::LocationRecord;
use strum_macros::EnumDiscriminants;

/// Message carried by the [`EventBus`].
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub kind: EventKind,
}

impl Event {
    /// Returns the discriminant of the carried [`EventKind`].
    pub fn event_type(&self) -> EventKindType {
        EventKindType::from(&self.kind)
    }
}

/// A thread-safe, reference-counted pointer to a [`LocationRecord`].
///
/// Records are shared between every receiver of the bus without copying
/// the contained fix.
pub type LocationRecordPtr = std::sync::Arc<LocationRecord>;

#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(EventKindType))]
pub enum EventKind {
    /// Indicates that a module shall terminate.
    QuitEvent,

    /// A fix was accepted by the location service and handed to analytics.
    LocationRecordedEvent(LocationRecordPtr),
}

/// Returns a reference to the payload of `kind` if it is the given variant.
///
/// ```rust
/// use module_core::{EventKind, payload_ref};
///
/// let kind = EventKind::QuitEvent;
/// assert!(payload_ref!(kind, EventKind::LocationRecordedEvent).is_none());
/// ```
#[macro_export]
macro_rules! payload_ref {
    ($kind:expr, $variant:path) => {
        match &$kind {
            $variant(payload) => Some(payload),
            _ => None,
        }
    };
}

/// Broadcast bus connecting the modules of one process.
///
/// Every subscriber sees every event published after it subscribed. Events
/// published while nobody listens are lost.
pub struct EventBus {
    sender: tokio::sync::broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates a bus buffering up to 100 events; slow receivers lag and lose
    /// the oldest ones.
    pub fn new() -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(100);
        EventBus { sender }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: &Event) {
        let _ = self.sender.send(event.clone());
    }

    /// Creates a [`ModuleCtx`] bound to this [`EventBus`].
    pub fn context(&self) -> ModuleCtx {
        ModuleCtx::new(self)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A long-running part of the process, driven by its own task.
#[async_trait::async_trait]
pub trait Module {
    /// Runs the module asynchronously until a [`EventKind::QuitEvent`] arrives.
    async fn run(&mut self) -> Result<(), ()>;
}

/// Handle a module uses to talk to the [`EventBus`].
pub struct ModuleCtx {
    pub sender: tokio::sync::broadcast::Sender<Event>,

    pub receiver: tokio::sync::broadcast::Receiver<Event>,
}

impl ModuleCtx {
    /// Constructs a new [`ModuleCtx`] from the given [`EventBus`].
    pub fn new(event_bus: &EventBus) -> Self {
        ModuleCtx {
            sender: event_bus.sender.clone(),
            receiver: event_bus.subscribe(),
        }
    }

    /// Publishes an event of the given kind.
    ///
    /// Fails only if no receiver is subscribed to the bus.
    pub fn publish_event(
        &self,
        kind: EventKind,
    ) -> Result<usize, tokio::sync::broadcast::error::SendError<Event>> {
        self.sender.send(Event { kind })
    }
}

impl Clone for ModuleCtx {
    /// Clones the sender and creates a fresh receiver that only sees events
    /// published after the clone.
    fn clone(&self) -> Self {
        ModuleCtx {
            sender: self.sender.clone(),
            receiver: self.sender.subscribe(),
        }
    }
}

pub mod test_helper;
