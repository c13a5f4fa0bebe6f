// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Source adapters driving a positioning backend.

use algorithm::selection::{Criteria, PASSIVE_PROVIDER, select_provider};
use common::options::{Priority, RequestOptions};
use common::pending::PendingRequest;
use common::position::Fix;
use gnss::{HostEvent, HostEventKind, ListenerId, ProviderHost, Subscription};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Result of a single-shot request; `None` means the request failed.
pub type PendingFix = PendingRequest<Option<Fix>>;

/// Receiver of continuous updates inside the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DestinationId(pub u32);

impl DestinationId {
    /// The destination the service requests its own continuous updates for.
    pub const UPDATES: DestinationId = DestinationId(0);
}

/// Backend events that concern a continuous destination.
#[derive(Clone, Debug, PartialEq)]
pub enum AdapterEvent {
    Fix {
        destination: DestinationId,
        fix: Fix,
    },
    ProviderAvailabilityChanged {
        destination: DestinationId,
        provider: String,
        enabled: bool,
    },
}

/// Capability over one positioning backend family.
///
/// Backend notifications reach the adapter only through
/// [`handle_host_event`](SourceAdapter::handle_host_event), which the
/// service calls from its worker. Single-shot requests are resolved there;
/// everything concerning continuous destinations is handed back as an
/// [`AdapterEvent`].
pub trait SourceAdapter: Send {
    /// Returns false only if no positioning backend exists on this host.
    fn connect(&mut self) -> bool;

    fn disconnect(&mut self);

    /// Starts continuous delivery for `destination`, replacing an earlier
    /// registration of the same destination.
    fn request_updates(&mut self, options: &RequestOptions, destination: DestinationId);

    fn cancel_updates(&mut self, destination: DestinationId);

    /// Starts a request for exactly one fix.
    ///
    /// The returned request completes with `None` right away if no provider
    /// can serve it. Canceling it tears down every backend registration.
    fn request_single_fix(&mut self, options: &RequestOptions) -> PendingFix;

    fn handle_host_event(&mut self, event: HostEvent) -> Option<AdapterEvent>;
}

struct SingleShot {
    request: PendingFix,
    priority: Priority,
    provider: Option<String>,
}

/// Registers `listener` for enable/disable changes of every provider.
///
/// The host relaxes the criteria down to any provider when ranking, so any
/// of them may become the selection.
fn listen_for_availability<H: ProviderHost + ?Sized>(host: &H, listener: ListenerId) {
    for provider in host.providers(&Criteria::ANY, false) {
        trace!("Listener {:?} watches provider {}", listener, provider);
        host.request_updates(&provider, Subscription::Availability, listener);
    }
}

/// Moves a single-shot registration to `provider`.
///
/// All registrations of the listener are dropped first, so the previous
/// provider can never deliver a second fix.
fn arm<H: ProviderHost + ?Sized>(
    host: &H,
    listener: ListenerId,
    shot: &mut SingleShot,
    provider: Option<String>,
) {
    host.remove_updates(listener);
    if shot.priority != Priority::NoPower {
        listen_for_availability(host, listener);
    }
    match provider {
        Some(ref name) => {
            debug!("Single fix request uses provider {}", name);
            host.request_updates(name, Subscription::ALL_FIXES, listener);
        }
        None => debug!("No provider for single fix request, waiting for one"),
    }
    shot.provider = provider;
}

/// Adapter for a [`ProviderHost`] that picks the best provider itself and
/// re-evaluates the choice when providers are enabled or disabled.
pub struct StandardAdapter<H: ProviderHost> {
    host: Arc<H>,
    connected: bool,
    continuous: HashMap<DestinationId, ListenerId>,
    single: HashMap<ListenerId, SingleShot>,
}

impl<H: ProviderHost + 'static> StandardAdapter<H> {
    pub fn new(host: Arc<H>) -> Self {
        StandardAdapter {
            host,
            connected: false,
            continuous: HashMap::new(),
            single: HashMap::new(),
        }
    }

    /// Number of single-shot requests the adapter still tracks.
    ///
    /// Canceled requests are forgotten with the next backend event or the
    /// next single-shot request.
    pub fn active_single_requests(&self) -> usize {
        self.single.len()
    }

    fn forget_finished_requests(&mut self) {
        self.single.retain(|_, shot| !shot.request.is_done());
    }

    fn continuous_destination(&self, listener: ListenerId) -> Option<DestinationId> {
        self.continuous
            .iter()
            .find(|(_, registered)| **registered == listener)
            .map(|(destination, _)| *destination)
    }
}

impl<H: ProviderHost + 'static> SourceAdapter for StandardAdapter<H> {
    fn connect(&mut self) -> bool {
        if !self.connected {
            self.connected = self.host.is_available();
            debug!("Positioning backend connected: {}", self.connected);
        }
        self.connected
    }

    fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        for (_, listener) in self.continuous.drain() {
            self.host.remove_updates(listener);
        }
        for (_, shot) in self.single.drain() {
            shot.request.cancel();
        }
        self.connected = false;
        debug!("Positioning backend disconnected");
    }

    fn request_updates(&mut self, options: &RequestOptions, destination: DestinationId) {
        self.cancel_updates(destination);
        let listener = self.host.create_listener();
        listen_for_availability(self.host.as_ref(), listener);
        match select_provider(self.host.as_ref(), options.priority()) {
            Some(provider) => {
                debug!(
                    "Requesting updates for {:?} from provider {}",
                    destination, provider
                );
                self.host.request_updates(
                    &provider,
                    Subscription::Fixes {
                        min_time: options.min_time(),
                        min_distance: options.min_distance(),
                    },
                    listener,
                );
            }
            None => debug!(
                "No provider for {:?}, waiting for one to become available",
                options.priority()
            ),
        }
        self.continuous.insert(destination, listener);
    }

    fn cancel_updates(&mut self, destination: DestinationId) {
        if let Some(listener) = self.continuous.remove(&destination) {
            trace!("Canceling updates for {:?}", destination);
            self.host.remove_updates(listener);
        }
    }

    fn request_single_fix(&mut self, options: &RequestOptions) -> PendingFix {
        self.forget_finished_requests();
        let request = PendingFix::new();
        let priority = options.priority();
        let Some(provider) = select_provider(self.host.as_ref(), priority) else {
            debug!("No provider for single fix request with {:?}", priority);
            request.complete(None);
            return request;
        };
        if let Some((fix, age)) = self.host.last_known_fix(&provider)
            && options.accepts_update_age(age)
        {
            debug!("Answering single fix request with cached fix of {}", provider);
            request.complete(Some(fix));
            return request;
        }

        let listener = self.host.create_listener();
        let host = self.host.clone();
        request.on_cancel(move || {
            debug!("Single fix request canceled");
            host.remove_updates(listener);
        });
        let mut shot = SingleShot {
            request: request.clone(),
            priority,
            provider: None,
        };
        arm(self.host.as_ref(), listener, &mut shot, Some(provider));
        self.single.insert(listener, shot);
        request
    }

    fn handle_host_event(&mut self, event: HostEvent) -> Option<AdapterEvent> {
        self.forget_finished_requests();
        let listener = event.listener;
        if let Some(destination) = self.continuous_destination(listener) {
            return Some(match event.kind {
                HostEventKind::Fix(fix) => AdapterEvent::Fix { destination, fix },
                HostEventKind::ProviderEnabled(provider) => {
                    AdapterEvent::ProviderAvailabilityChanged {
                        destination,
                        provider,
                        enabled: true,
                    }
                }
                HostEventKind::ProviderDisabled(provider) => {
                    AdapterEvent::ProviderAvailabilityChanged {
                        destination,
                        provider,
                        enabled: false,
                    }
                }
            });
        }

        let Some(shot) = self.single.get_mut(&listener) else {
            trace!("Ignoring stale event for listener {:?}", listener);
            return None;
        };
        match event.kind {
            HostEventKind::Fix(fix) => {
                let current = shot.provider.as_deref();
                if current != Some(fix.provider()) && current != Some(PASSIVE_PROVIDER) {
                    trace!("Ignoring fix of superseded provider {}", fix.provider());
                    return None;
                }
                if let Some(shot) = self.single.remove(&listener) {
                    self.host.remove_updates(listener);
                    shot.request.complete(Some(fix));
                }
            }
            HostEventKind::ProviderDisabled(provider) => {
                if shot.provider.as_deref() == Some(provider.as_str()) {
                    debug!("Provider {} of single fix request disabled", provider);
                    let next = select_provider(self.host.as_ref(), shot.priority);
                    arm(self.host.as_ref(), listener, shot, next);
                }
            }
            HostEventKind::ProviderEnabled(provider) => {
                let best = select_provider(self.host.as_ref(), shot.priority);
                if best.is_some() && best != shot.provider {
                    debug!("Provider {} enabled, reselecting", provider);
                    arm(self.host.as_ref(), listener, shot, best);
                }
            }
        }
        None
    }
}
