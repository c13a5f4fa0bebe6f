// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! In-process provider host.

use crate::{
    HostEvent, HostEventKind, HostEventReceiver, HostEventSender, ListenerId, ProviderHost,
    Subscription,
};
use algorithm::calculate_distance;
use algorithm::selection::{
    Accuracy, Criteria, PASSIVE_PROVIDER, Power, ProviderProperties, ProviderQuery,
    ProviderRecord, rank_providers,
};
use common::position::{Fix, Position};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

struct ProviderEntry {
    properties: ProviderProperties,
    enabled: bool,
    last_fix: Option<(Fix, Instant)>,
}

struct Registration {
    subscription: Subscription,
    last_delivered: Option<(Instant, Position)>,
}

impl Registration {
    /// Decides whether `fix` passes the throttling of this registration and
    /// remembers it as delivered if so.
    fn accept(&mut self, fix: &Fix, now: Instant) -> bool {
        let Subscription::Fixes {
            min_time,
            min_distance,
        } = self.subscription
        else {
            return false;
        };
        let position = fix.to_position();
        if let Some((at, last)) = &self.last_delivered
            && (now.duration_since(*at) < min_time
                || calculate_distance(last, &position) < min_distance)
        {
            return false;
        }
        self.last_delivered = Some((now, position));
        true
    }
}

#[derive(Default)]
struct RegistryState {
    providers: BTreeMap<String, ProviderEntry>,
    registrations: HashMap<ListenerId, BTreeMap<String, Registration>>,
    next_listener: u64,
}

/// A [`ProviderHost`] keeping named providers, their enabled flags and
/// listener registrations in memory.
///
/// Sources report fixes and availability changes through
/// [`report_fix`](Self::report_fix) and [`set_enabled`](Self::set_enabled);
/// the registry turns them into [`HostEvent`]s for the registered listeners.
/// The `passive` provider always exists and forwards every fix any other
/// provider reports.
pub struct ProviderRegistry {
    state: Mutex<RegistryState>,
    events: HostEventSender,
}

impl ProviderRegistry {
    pub fn new(events: HostEventSender) -> Self {
        let registry = ProviderRegistry {
            state: Mutex::new(RegistryState::default()),
            events,
        };
        registry.add_provider(
            PASSIVE_PROVIDER,
            ProviderProperties::new(Accuracy::Coarse, Power::Low),
            true,
        );
        registry
    }

    /// Creates a registry together with the receiving end of its event channel.
    pub fn channel() -> (Self, HostEventReceiver) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (ProviderRegistry::new(sender), receiver)
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn send(&self, listener: ListenerId, kind: HostEventKind) {
        if self.events.send(HostEvent { listener, kind }).is_err() {
            trace!("No receiver for host events of listener {:?}", listener);
        }
    }

    /// Adds a provider or replaces the properties of an existing one.
    ///
    /// Adding an already known provider keeps its registrations; a changed
    /// enabled flag is announced like [`set_enabled`](Self::set_enabled).
    /// Listeners watching the availability of any provider start watching a
    /// new one as well and learn about it right away if it is enabled.
    pub fn add_provider(&self, name: &str, properties: ProviderProperties, enabled: bool) {
        let mut state = self.lock();
        if let Some(entry) = state.providers.get_mut(name) {
            entry.properties = properties;
            drop(state);
            self.set_enabled(name, enabled);
            return;
        }
        state.providers.insert(
            name.to_owned(),
            ProviderEntry {
                properties,
                enabled,
                last_fix: None,
            },
        );
        debug!("Added provider {} (enabled: {})", name, enabled);

        let mut watchers = Vec::new();
        for (listener, providers) in state.registrations.iter_mut() {
            let watches = providers
                .values()
                .any(|registration| matches!(registration.subscription, Subscription::Availability));
            if watches {
                providers.insert(
                    name.to_owned(),
                    Registration {
                        subscription: Subscription::Availability,
                        last_delivered: None,
                    },
                );
                watchers.push(*listener);
            }
        }
        drop(state);
        if enabled {
            for listener in watchers {
                self.send(listener, HostEventKind::ProviderEnabled(name.to_owned()));
            }
        }
    }

    /// Enables or disables a provider and notifies every listener registered
    /// at it. Setting the current state again is a no-op.
    pub fn set_enabled(&self, name: &str, enabled: bool) {
        let mut state = self.lock();
        let Some(entry) = state.providers.get_mut(name) else {
            debug!("Ignoring state change of unknown provider {}", name);
            return;
        };
        if entry.enabled == enabled {
            return;
        }
        entry.enabled = enabled;
        debug!("Provider {} enabled: {}", name, enabled);
        let listeners: Vec<ListenerId> = state
            .registrations
            .iter()
            .filter(|(_, providers)| providers.contains_key(name))
            .map(|(listener, _)| *listener)
            .collect();
        drop(state);
        for listener in listeners {
            let kind = if enabled {
                HostEventKind::ProviderEnabled(name.to_owned())
            } else {
                HostEventKind::ProviderDisabled(name.to_owned())
            };
            self.send(listener, kind);
        }
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.lock()
            .providers
            .get(name)
            .is_some_and(|entry| entry.enabled)
    }

    /// Reports a fix measured by the provider named in the fix.
    ///
    /// Fixes of unknown or disabled providers are dropped.
    pub fn report_fix(&self, fix: Fix) {
        let now = Instant::now();
        let mut state = self.lock();
        match state.providers.get_mut(fix.provider()) {
            Some(entry) if entry.enabled => entry.last_fix = Some((fix.clone(), now)),
            _ => {
                trace!("Dropping fix of unavailable provider {}", fix.provider());
                return;
            }
        }
        let passive_enabled = state
            .providers
            .get(PASSIVE_PROVIDER)
            .is_some_and(|entry| entry.enabled);
        let mut receivers = Vec::new();
        for (listener, providers) in state.registrations.iter_mut() {
            let direct = providers
                .get_mut(fix.provider())
                .is_some_and(|registration| registration.accept(&fix, now));
            let passive = !direct
                && passive_enabled
                && fix.provider() != PASSIVE_PROVIDER
                && providers
                    .get_mut(PASSIVE_PROVIDER)
                    .is_some_and(|registration| registration.accept(&fix, now));
            if direct || passive {
                receivers.push(*listener);
            }
        }
        drop(state);
        for listener in receivers {
            self.send(listener, HostEventKind::Fix(fix.clone()));
        }
    }

    /// Names of the providers `listener` is currently registered at.
    pub fn registered_providers(&self, listener: ListenerId) -> Vec<String> {
        self.lock()
            .registrations
            .get(&listener)
            .map(|providers| providers.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of listeners holding at least one registration.
    pub fn listener_count(&self) -> usize {
        self.lock().registrations.len()
    }

    fn records(&self, enabled_only: bool) -> Vec<ProviderRecord> {
        self.lock()
            .providers
            .iter()
            .filter(|(_, entry)| entry.enabled || !enabled_only)
            .map(|(name, entry)| ProviderRecord {
                name: name.clone(),
                properties: entry.properties,
                enabled: entry.enabled,
            })
            .collect()
    }
}

impl ProviderQuery for ProviderRegistry {
    fn providers(&self, criteria: &Criteria, enabled_only: bool) -> Vec<String> {
        self.records(enabled_only)
            .into_iter()
            .filter(|record| record.properties.satisfies(criteria))
            .map(|record| record.name)
            .collect()
    }

    fn best_provider(&self, criteria: &Criteria, enabled_only: bool) -> Option<String> {
        let records = self.records(enabled_only);
        rank_providers(&records, criteria).map(|record| record.name.clone())
    }
}

impl ProviderHost for ProviderRegistry {
    fn is_available(&self) -> bool {
        true
    }

    fn create_listener(&self) -> ListenerId {
        let mut state = self.lock();
        state.next_listener += 1;
        ListenerId(state.next_listener)
    }

    fn request_updates(&self, provider: &str, subscription: Subscription, listener: ListenerId) {
        let mut state = self.lock();
        if !state.providers.contains_key(provider) {
            debug!("Listener {:?} requested unknown provider {}", listener, provider);
            return;
        }
        trace!(
            "Listener {:?} registered at {} with {:?}",
            listener, provider, subscription
        );
        state.registrations.entry(listener).or_default().insert(
            provider.to_owned(),
            Registration {
                subscription,
                last_delivered: None,
            },
        );
    }

    fn remove_updates(&self, listener: ListenerId) {
        if self.lock().registrations.remove(&listener).is_some() {
            trace!("Removed all registrations of listener {:?}", listener);
        }
    }

    fn last_known_fix(&self, provider: &str) -> Option<(Fix, Duration)> {
        self.lock()
            .providers
            .get(provider)
            .and_then(|entry| entry.last_fix.as_ref())
            .map(|(fix, at)| (fix.clone(), at.elapsed()))
    }
}
