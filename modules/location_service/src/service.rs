// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::adapter::{AdapterEvent, DestinationId, PendingFix, SourceAdapter};
use crate::analytics::AnalyticsSink;
use crate::command::{Command, CommandReceiver, CommandSender};
use crate::messenger::{MessengerHandle, ServiceMessage};
use crate::policy::{AppState, Policy, PolicyStore};
use common::options::{OptionsError, RawRequestOptions, RequestOptions};
use common::pending::Outcome;
use common::position::Fix;
use common::record::UpdateType;
use gnss::{HostEvent, HostEventReceiver};
use module_core::{EventKind, Module, ModuleCtx};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, trace, warn};

/// The external collaborators the service consults.
#[derive(Clone)]
pub struct Collaborators {
    pub policy: Arc<dyn PolicyStore>,
    pub app_state: Arc<dyn AppState>,
    pub analytics: Arc<dyn AnalyticsSink>,
}

struct PendingEntry {
    ticket: u64,
    request: PendingFix,
}

type PendingTable = Arc<Mutex<HashMap<u32, PendingEntry>>>;

fn lock_table(table: &PendingTable) -> MutexGuard<'_, HashMap<u32, PendingEntry>> {
    table.lock().unwrap_or_else(|e| e.into_inner())
}

fn reply(reply_to: &MessengerHandle, requester_id: u32, fix: Option<Fix>) {
    if let Err(e) = reply_to.send(ServiceMessage::SingleFixResult { requester_id, fix }) {
        debug!("Failed to answer single fix request {}: {}", requester_id, e);
    }
}

/// Coordinates continuous updates and single-shot requests over one
/// [`SourceAdapter`].
///
/// Commands arrive through the [`CommandSender`] returned by
/// [`new`](Self::new), backend events through the host event channel. Both
/// are processed one at a time by [`run`](Module::run), so all state below
/// is only touched from that loop. Completion listeners of single-shot
/// requests share the request table and may run on whichever thread
/// resolves a request.
pub struct CoordinationService<A: SourceAdapter> {
    ctx: ModuleCtx,
    commands: CommandReceiver,
    host_events: HostEventReceiver,
    adapter: A,
    collaborators: Collaborators,
    subscribers: Vec<MessengerHandle>,
    pending: PendingTable,
    next_ticket: u64,
    last_options: Option<RequestOptions>,
    updates_stopped: bool,
}

impl<A: SourceAdapter> CoordinationService<A> {
    pub fn new(
        ctx: ModuleCtx,
        adapter: A,
        host_events: HostEventReceiver,
        collaborators: Collaborators,
    ) -> (Self, CommandSender) {
        let (sender, commands) = CommandSender::channel();
        let service = CoordinationService {
            ctx,
            commands,
            host_events,
            adapter,
            collaborators,
            subscribers: Vec::new(),
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_ticket: 0,
            last_options: None,
            updates_stopped: false,
        };
        (service, sender)
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    /// Number of single-shot requests that did not finish yet.
    pub fn pending_requests(&self) -> usize {
        lock_table(&self.pending).len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// The options of the last continuous request, `None` once stopped.
    pub fn last_options(&self) -> Option<&RequestOptions> {
        self.last_options.as_ref()
    }

    pub fn handle_command(&mut self, command: Command) {
        trace!("Handling command {:?}", command);
        match command {
            Command::StartUpdates => self.start_updates(false),
            Command::StopUpdates => self.stop_updates(),
            Command::ProviderAvailabilityChanged { provider, enabled } => {
                debug!("Provider {} enabled: {}, reselecting", provider, enabled);
                self.start_updates(true);
            }
            Command::LocationUpdate { fix, options } => self.location_update(fix, options),
            Command::Subscribe(subscriber) => self.subscribe(subscriber),
            Command::Unsubscribe(subscriber) => self.unsubscribe(&subscriber),
            Command::RequestSingleFix {
                options,
                requester_id,
                reply_to,
            } => self.request_single_fix(options, requester_id, reply_to),
            Command::CancelSingleFix { requester_id } => self.cancel_single_fix(requester_id),
            Command::PolicyChanged => {
                if self.updates_allowed() {
                    self.start_updates(false);
                } else {
                    self.stop_updates();
                }
            }
        }
    }

    pub fn handle_host_event(&mut self, event: HostEvent) {
        match self.adapter.handle_host_event(event) {
            Some(AdapterEvent::Fix { destination, fix }) if destination == DestinationId::UPDATES => {
                self.location_update(Some(fix), None);
            }
            Some(AdapterEvent::ProviderAvailabilityChanged {
                destination,
                provider,
                enabled,
            }) if destination == DestinationId::UPDATES => {
                self.handle_command(Command::ProviderAvailabilityChanged { provider, enabled });
            }
            Some(event) => trace!("Ignoring adapter event {:?}", event),
            None => {}
        }
    }

    fn policy(&self) -> Policy {
        Policy::read(self.collaborators.policy.as_ref())
    }

    fn updates_allowed(&self) -> bool {
        self.policy()
            .allows_updates(self.collaborators.app_state.is_foreground())
    }

    fn start_updates(&mut self, force: bool) {
        let policy = self.policy();
        if !policy.allows_updates(self.collaborators.app_state.is_foreground()) {
            debug!("Location updates are not allowed, not starting");
            return;
        }
        if !force && !self.updates_stopped && self.last_options.as_ref() == Some(&policy.options)
        {
            trace!("Location updates already requested with {:?}", policy.options);
            return;
        }
        if !self.adapter.connect() {
            warn!("Positioning backend unavailable, location updates stay pending");
            return;
        }
        self.adapter.cancel_updates(DestinationId::UPDATES);
        self.adapter
            .request_updates(&policy.options, DestinationId::UPDATES);
        info!("Location updates requested with {:?}", policy.options);
        self.last_options = Some(policy.options);
        self.updates_stopped = false;
    }

    fn stop_updates(&mut self) {
        if self.updates_stopped {
            trace!("Location updates already stopped");
            return;
        }
        self.adapter.cancel_updates(DestinationId::UPDATES);
        self.updates_stopped = true;
        self.last_options = None;
        info!("Location updates stopped");
    }

    fn location_update(&mut self, fix: Option<Fix>, options: Option<RawRequestOptions>) {
        if let Some(raw) = options {
            match RequestOptions::try_from(raw) {
                Ok(options) => self.last_options = Some(options),
                Err(e) => debug!("Ignoring options of location update: {}", e),
            }
        }
        let Some(fix) = fix else {
            trace!("Location update without fix");
            return;
        };
        if !self.updates_allowed() {
            debug!("Location updates are not allowed, dropping fix");
            return;
        }
        self.collaborators
            .analytics
            .record_fix(&fix, None, UpdateType::Continuous);
        self.subscribers.retain(|subscriber| {
            match subscriber.send(ServiceMessage::NewFix(fix.clone())) {
                Ok(()) => true,
                Err(e) => {
                    debug!("Removing subscriber {:?}: {}", subscriber, e);
                    false
                }
            }
        });
    }

    fn subscribe(&mut self, subscriber: MessengerHandle) {
        if self.subscribers.contains(&subscriber) {
            trace!("{:?} already subscribed", subscriber);
            return;
        }
        debug!("{:?} subscribed", subscriber);
        self.subscribers.push(subscriber);
    }

    fn unsubscribe(&mut self, subscriber: &MessengerHandle) {
        self.subscribers.retain(|registered| registered != subscriber);
    }

    fn request_single_fix(
        &mut self,
        options: Option<RawRequestOptions>,
        requester_id: u32,
        reply_to: MessengerHandle,
    ) {
        let previous = lock_table(&self.pending).remove(&requester_id);
        if let Some(previous) = previous {
            debug!("Replacing single fix request {}", requester_id);
            previous.request.cancel();
        }

        let options = match options
            .ok_or(OptionsError::Missing)
            .and_then(RequestOptions::try_from)
        {
            Ok(options) => options,
            Err(e) => {
                warn!("Rejecting single fix request {}: {}", requester_id, e);
                reply(&reply_to, requester_id, None);
                return;
            }
        };
        if !self.adapter.connect() {
            warn!("Positioning backend unavailable, failing request {}", requester_id);
            reply(&reply_to, requester_id, None);
            return;
        }
        let request = self.adapter.request_single_fix(&options);
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        lock_table(&self.pending).insert(
            requester_id,
            PendingEntry {
                ticket,
                request: request.clone(),
            },
        );

        let pending = self.pending.clone();
        let analytics = self.collaborators.analytics.clone();
        request.add_listener(move |outcome| {
            {
                let mut table = lock_table(&pending);
                if table
                    .get(&requester_id)
                    .is_some_and(|entry| entry.ticket == ticket)
                {
                    table.remove(&requester_id);
                }
            }
            match outcome {
                Outcome::Canceled => trace!("Single fix request {} canceled", requester_id),
                Outcome::Completed(fix) => {
                    debug!(
                        "Single fix request {} finished, fix: {}",
                        requester_id,
                        fix.is_some()
                    );
                    reply(&reply_to, requester_id, fix.clone());
                    if let Some(fix) = fix {
                        analytics.record_fix(fix, Some(&options), UpdateType::Single);
                    }
                }
            }
        });
    }

    fn cancel_single_fix(&mut self, requester_id: u32) {
        let entry = lock_table(&self.pending).remove(&requester_id);
        match entry {
            Some(entry) => {
                debug!("Canceling single fix request {}", requester_id);
                entry.request.cancel();
            }
            None => trace!("No single fix request {} to cancel", requester_id),
        }
    }

    fn shutdown(&mut self) {
        let pending: Vec<PendingEntry> = lock_table(&self.pending)
            .drain()
            .map(|(_, entry)| entry)
            .collect();
        for entry in pending {
            entry.request.cancel();
        }
        self.stop_updates();
        self.adapter.disconnect();
    }
}

#[async_trait::async_trait]
impl<A: SourceAdapter> Module for CoordinationService<A> {
    async fn run(&mut self) -> Result<(), ()> {
        loop {
            tokio::select! {
                event = self.ctx.receiver.recv() => match event {
                    Ok(event) => {
                        if let EventKind::QuitEvent = event.kind {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                    Err(e) => debug!("Location service missed events: {}", e),
                },
                Some(command) = self.commands.recv() => self.handle_command(command),
                Some(event) = self.host_events.recv() => self.handle_host_event(event),
            }
        }
        self.shutdown();
        info!("Location service stopped");
        Ok(())
    }
}
