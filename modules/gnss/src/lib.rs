// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! GNSS Modul for the location service
//!
//! Provides the positioning backend: a host that knows the named providers
//! and their live state, plus the sources (gpsd, simulated track) that feed
//! fixes into it. Everything the host has to tell its listeners is pushed
//! as a [`HostEvent`] into a channel, so listeners never run on the thread
//! that reported a fix or toggled a provider.

use algorithm::selection::ProviderQuery;
use common::position::Fix;
use std::time::Duration;

pub mod constant_source;
pub mod gpsd_source;
pub mod registry;

/// Handle identifying one listener registered at a [`ProviderHost`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

/// What a listener wants to hear from a provider.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Subscription {
    /// Fixes, at most one per `min_time` and only after moving `min_distance`
    /// meters, plus the enabled/disabled changes of the provider.
    Fixes { min_time: Duration, min_distance: f64 },
    /// Only the enabled/disabled changes of the provider.
    Availability,
}

impl Subscription {
    /// Every fix the provider reports.
    pub const ALL_FIXES: Subscription = Subscription::Fixes {
        min_time: Duration::ZERO,
        min_distance: 0.0,
    };
}

/// Notification for one listener.
#[derive(Clone, Debug, PartialEq)]
pub struct HostEvent {
    pub listener: ListenerId,
    pub kind: HostEventKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum HostEventKind {
    Fix(Fix),
    ProviderEnabled(String),
    ProviderDisabled(String),
}

pub type HostEventSender = tokio::sync::mpsc::UnboundedSender<HostEvent>;
pub type HostEventReceiver = tokio::sync::mpsc::UnboundedReceiver<HostEvent>;

/// The positioning backend a source adapter drives.
///
/// Implementations are shared between the coordination worker and the fix
/// sources, so every method takes `&self` and must be thread-safe.
pub trait ProviderHost: ProviderQuery + Send + Sync {
    /// Returns false if no positioning backend exists on this host at all.
    fn is_available(&self) -> bool;

    /// Allocates a fresh listener handle.
    fn create_listener(&self) -> ListenerId;

    /// Registers `listener` at `provider`, replacing an earlier registration
    /// of the same listener at the same provider.
    fn request_updates(&self, provider: &str, subscription: Subscription, listener: ListenerId);

    /// Drops every registration of `listener`.
    fn remove_updates(&self, listener: ListenerId);

    /// The last fix `provider` reported and its age.
    fn last_known_fix(&self, provider: &str) -> Option<(Fix, Duration)>;
}
