// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Fakes for testing code that drives a [`CoordinationService`].

use crate::adapter::{AdapterEvent, DestinationId, PendingFix, SourceAdapter};
use crate::analytics::AnalyticsSink;
use crate::command::CommandSender;
use crate::messenger::ServiceMessage;
use crate::policy::{MemoryPolicyStore, PolicySettings, SharedForeground};
use crate::service::{Collaborators, CoordinationService};
use common::options::RequestOptions;
use common::position::Fix;
use common::record::{LocationRecord, UpdateType};
use gnss::{HostEvent, HostEventKind, HostEventSender};
use module_core::EventBus;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedReceiver;

/// A [`SourceAdapter`] recording every call.
///
/// Single-shot requests stay pending until the test resolves them, unless
/// `single_result` is set, in which case they complete with it right away.
pub struct FakeAdapter {
    pub available: bool,
    pub single_result: Option<Option<Fix>>,
    pub connect_calls: usize,
    pub disconnect_calls: usize,
    pub requested_updates: Vec<(RequestOptions, DestinationId)>,
    pub canceled_updates: Vec<DestinationId>,
    pub single_requests: Vec<(RequestOptions, PendingFix)>,
}

impl Default for FakeAdapter {
    fn default() -> Self {
        FakeAdapter {
            available: true,
            single_result: None,
            connect_calls: 0,
            disconnect_calls: 0,
            requested_updates: Vec::new(),
            canceled_updates: Vec::new(),
            single_requests: Vec::new(),
        }
    }
}

impl FakeAdapter {
    /// The request handed out by the latest `request_single_fix` call.
    pub fn last_single_request(&self) -> Option<&PendingFix> {
        self.single_requests.last().map(|(_, request)| request)
    }
}

impl SourceAdapter for FakeAdapter {
    fn connect(&mut self) -> bool {
        self.connect_calls += 1;
        self.available
    }

    fn disconnect(&mut self) {
        self.disconnect_calls += 1;
    }

    fn request_updates(&mut self, options: &RequestOptions, destination: DestinationId) {
        self.requested_updates.push((options.clone(), destination));
    }

    fn cancel_updates(&mut self, destination: DestinationId) {
        self.canceled_updates.push(destination);
    }

    fn request_single_fix(&mut self, options: &RequestOptions) -> PendingFix {
        let request = PendingFix::new();
        if let Some(result) = self.single_result.clone() {
            request.complete(result);
        }
        self.single_requests.push((options.clone(), request.clone()));
        request
    }

    fn handle_host_event(&mut self, event: HostEvent) -> Option<AdapterEvent> {
        let destination = DestinationId::UPDATES;
        Some(match event.kind {
            HostEventKind::Fix(fix) => AdapterEvent::Fix { destination, fix },
            HostEventKind::ProviderEnabled(provider) => AdapterEvent::ProviderAvailabilityChanged {
                destination,
                provider,
                enabled: true,
            },
            HostEventKind::ProviderDisabled(provider) => {
                AdapterEvent::ProviderAvailabilityChanged {
                    destination,
                    provider,
                    enabled: false,
                }
            }
        })
    }
}

/// An [`AnalyticsSink`] keeping every recorded fix.
#[derive(Default)]
pub struct RecordingAnalytics {
    records: Mutex<Vec<LocationRecord>>,
}

impl RecordingAnalytics {
    pub fn records(&self) -> Vec<LocationRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn record_fix(&self, fix: &Fix, options: Option<&RequestOptions>, update_type: UpdateType) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(LocationRecord::new(fix.clone(), options.cloned(), update_type));
    }
}

/// A service under test together with the handles to its collaborators.
pub struct TestService<A: SourceAdapter> {
    pub service: CoordinationService<A>,
    pub commands: CommandSender,
    pub host_events: HostEventSender,
    pub policy: Arc<MemoryPolicyStore>,
    pub foreground: SharedForeground,
    pub analytics: Arc<RecordingAnalytics>,
    pub event_bus: EventBus,
}

/// Creates a service in the foreground with the default policy.
pub fn create_service<A: SourceAdapter>(adapter: A) -> TestService<A> {
    let (host_events, receiver) = tokio::sync::mpsc::unbounded_channel();
    create_service_with_host(adapter, host_events, receiver)
}

/// Same as [`create_service`] but with the host event channel of a real host.
pub fn create_service_with_host<A: SourceAdapter>(
    adapter: A,
    host_events: HostEventSender,
    receiver: gnss::HostEventReceiver,
) -> TestService<A> {
    let event_bus = EventBus::default();
    let policy = Arc::new(MemoryPolicyStore::new(PolicySettings::default()));
    let foreground = SharedForeground::new(true);
    let analytics = Arc::new(RecordingAnalytics::default());
    let collaborators = Collaborators {
        policy: policy.clone(),
        app_state: Arc::new(foreground.clone()),
        analytics: analytics.clone(),
    };
    let (service, commands) =
        CoordinationService::new(event_bus.context(), adapter, receiver, collaborators);
    TestService {
        service,
        commands,
        host_events,
        policy,
        foreground,
        analytics,
        event_bus,
    }
}

/// Returns every message received so far.
pub fn drain_messages(receiver: &mut UnboundedReceiver<ServiceMessage>) -> Vec<ServiceMessage> {
    let mut messages = Vec::new();
    while let Ok(message) = receiver.try_recv() {
        messages.push(message);
    }
    messages
}
