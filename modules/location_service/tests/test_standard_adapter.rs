// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use algorithm::selection::{Accuracy, PASSIVE_PROVIDER, Power, ProviderProperties};
use common::options::{Priority, RequestOptions};
use common::pending::Outcome;
use common::test_helper::fix::get_fix_from;
use gnss::HostEventReceiver;
use gnss::registry::ProviderRegistry;
use location_service::adapter::{AdapterEvent, DestinationId, SourceAdapter, StandardAdapter};
use std::sync::Arc;
use std::time::Duration;

fn create_registry() -> (Arc<ProviderRegistry>, HostEventReceiver) {
    let (registry, events) = ProviderRegistry::channel();
    registry.add_provider(
        "gps",
        ProviderProperties::new(Accuracy::Fine, Power::High),
        true,
    );
    registry.add_provider(
        "network",
        ProviderProperties::new(Accuracy::Coarse, Power::Low),
        true,
    );
    (Arc::new(registry), events)
}

fn options(priority: Priority) -> RequestOptions {
    RequestOptions::builder()
        .priority(priority)
        .min_time(Duration::ZERO)
        .min_distance(0.0)
        .build()
        .unwrap()
}

/// Feeds every queued host event into the adapter.
fn pump(
    adapter: &mut StandardAdapter<ProviderRegistry>,
    events: &mut HostEventReceiver,
) -> Vec<AdapterEvent> {
    let mut adapter_events = Vec::new();
    while let Ok(event) = events.try_recv() {
        adapter_events.extend(adapter.handle_host_event(event));
    }
    adapter_events
}

#[test_log::test]
fn continuous_updates_use_best_provider() {
    let (registry, mut events) = create_registry();
    let mut adapter = StandardAdapter::new(registry.clone());
    assert!(adapter.connect());
    adapter.request_updates(&options(Priority::HighAccuracy), DestinationId::UPDATES);

    registry.report_fix(get_fix_from("network"));
    registry.report_fix(get_fix_from("gps"));

    assert_eq!(
        pump(&mut adapter, &mut events),
        vec![AdapterEvent::Fix {
            destination: DestinationId::UPDATES,
            fix: get_fix_from("gps"),
        }]
    );
}

#[test_log::test]
fn continuous_updates_report_availability_changes() {
    let (registry, mut events) = create_registry();
    let mut adapter = StandardAdapter::new(registry.clone());
    adapter.connect();
    registry.set_enabled("gps", false);
    adapter.request_updates(&options(Priority::HighAccuracy), DestinationId::UPDATES);

    registry.set_enabled("gps", true);
    assert_eq!(
        pump(&mut adapter, &mut events),
        vec![AdapterEvent::ProviderAvailabilityChanged {
            destination: DestinationId::UPDATES,
            provider: "gps".to_owned(),
            enabled: true,
        }]
    );
}

#[test_log::test]
fn cancel_updates_removes_every_registration() {
    let (registry, mut events) = create_registry();
    let mut adapter = StandardAdapter::new(registry.clone());
    adapter.connect();
    adapter.request_updates(&options(Priority::LowPower), DestinationId::UPDATES);
    adapter.request_updates(&options(Priority::LowPower), DestinationId::UPDATES);
    assert_eq!(registry.listener_count(), 1);

    adapter.cancel_updates(DestinationId::UPDATES);
    adapter.cancel_updates(DestinationId::UPDATES);
    assert_eq!(registry.listener_count(), 0);

    registry.report_fix(get_fix_from("network"));
    assert!(pump(&mut adapter, &mut events).is_empty());
}

#[test_log::test]
fn no_power_updates_only_use_passive_provider() {
    let (registry, mut events) = create_registry();
    let mut adapter = StandardAdapter::new(registry.clone());
    adapter.connect();
    adapter.request_updates(&options(Priority::NoPower), DestinationId::UPDATES);

    registry.set_enabled(PASSIVE_PROVIDER, false);
    registry.report_fix(get_fix_from("gps"));
    let adapter_events = pump(&mut adapter, &mut events);
    assert!(
        adapter_events
            .iter()
            .all(|event| !matches!(event, AdapterEvent::Fix { .. }))
    );

    adapter.request_updates(&options(Priority::NoPower), DestinationId::UPDATES);
    registry.set_enabled(PASSIVE_PROVIDER, true);
    pump(&mut adapter, &mut events);
    adapter.request_updates(&options(Priority::NoPower), DestinationId::UPDATES);
    registry.report_fix(get_fix_from("gps"));
    assert_eq!(
        pump(&mut adapter, &mut events),
        vec![AdapterEvent::Fix {
            destination: DestinationId::UPDATES,
            fix: get_fix_from("gps"),
        }]
    );
}

#[test_log::test]
fn single_fix_completes_with_first_fix() {
    let (registry, mut events) = create_registry();
    let mut adapter = StandardAdapter::new(registry.clone());
    adapter.connect();
    let request = adapter.request_single_fix(&options(Priority::HighAccuracy));
    assert!(!request.is_done());

    registry.report_fix(get_fix_from("gps"));
    registry.report_fix(get_fix_from("gps"));
    assert!(pump(&mut adapter, &mut events).is_empty());

    assert_eq!(
        request.outcome(),
        Some(Outcome::Completed(Some(get_fix_from("gps"))))
    );
    assert_eq!(registry.listener_count(), 0);
    assert_eq!(adapter.active_single_requests(), 0);
}

#[test_log::test]
fn single_fix_without_provider_fails_immediately() {
    let (registry, _events) = ProviderRegistry::channel();
    let mut adapter = StandardAdapter::new(Arc::new(registry));
    adapter.connect();
    let request = adapter.request_single_fix(&options(Priority::BalancedPowerAccuracy));
    assert_eq!(request.outcome(), Some(Outcome::Completed(None)));
}

#[test_log::test]
fn single_fix_uses_cached_fix_within_update_age() {
    let (registry, _events) = create_registry();
    registry.report_fix(get_fix_from("network"));
    let mut adapter = StandardAdapter::new(registry.clone());
    adapter.connect();
    let options = RequestOptions::builder()
        .priority(Priority::LowPower)
        .max_update_age(Duration::from_secs(60))
        .build()
        .unwrap();

    let request = adapter.request_single_fix(&options);
    assert_eq!(
        request.outcome(),
        Some(Outcome::Completed(Some(get_fix_from("network"))))
    );
    assert_eq!(registry.listener_count(), 0);
}

#[test_log::test]
fn single_fix_rearms_when_provider_is_disabled() {
    let (registry, mut events) = create_registry();
    let mut adapter = StandardAdapter::new(registry.clone());
    adapter.connect();
    let request = adapter.request_single_fix(&options(Priority::HighAccuracy));
    let listener = gnss::ListenerId(1);
    assert!(registry.registered_providers(listener).contains(&"gps".to_owned()));

    registry.set_enabled("gps", false);
    pump(&mut adapter, &mut events);
    assert!(!request.is_done());

    // A fix queued by the previous provider is discarded after re-arming.
    registry.set_enabled("gps", true);
    registry.report_fix(get_fix_from("network"));
    pump(&mut adapter, &mut events);
    assert!(!request.is_done());

    registry.report_fix(get_fix_from("gps"));
    pump(&mut adapter, &mut events);
    assert_eq!(
        request.outcome(),
        Some(Outcome::Completed(Some(get_fix_from("gps"))))
    );
    assert_eq!(registry.listener_count(), 0);
}

#[test_log::test]
fn single_fix_falls_back_while_best_provider_is_disabled() {
    let (registry, mut events) = create_registry();
    let mut adapter = StandardAdapter::new(registry.clone());
    adapter.connect();
    let request = adapter.request_single_fix(&options(Priority::HighAccuracy));

    registry.set_enabled("gps", false);
    pump(&mut adapter, &mut events);
    registry.report_fix(get_fix_from("network"));
    pump(&mut adapter, &mut events);

    assert_eq!(
        request.outcome(),
        Some(Outcome::Completed(Some(get_fix_from("network"))))
    );
}

#[test_log::test]
fn canceled_single_fix_leaves_no_registrations() {
    let (registry, mut events) = create_registry();
    let mut adapter = StandardAdapter::new(registry.clone());
    adapter.connect();
    let request = adapter.request_single_fix(&options(Priority::HighAccuracy));
    assert_eq!(registry.listener_count(), 1);

    assert!(request.cancel());
    assert_eq!(registry.listener_count(), 0);

    registry.report_fix(get_fix_from("gps"));
    assert!(pump(&mut adapter, &mut events).is_empty());
    assert_eq!(request.outcome(), Some(Outcome::Canceled));
}

#[test_log::test]
fn disconnect_cancels_everything() {
    let (registry, _events) = create_registry();
    let mut adapter = StandardAdapter::new(registry.clone());
    adapter.connect();
    adapter.request_updates(&options(Priority::LowPower), DestinationId::UPDATES);
    let request = adapter.request_single_fix(&options(Priority::LowPower));

    adapter.disconnect();
    adapter.disconnect();
    assert!(request.is_canceled());
    assert_eq!(registry.listener_count(), 0);
}

#[test_log::test]
fn continuous_updates_learn_about_added_provider() {
    let (registry, mut events) = ProviderRegistry::channel();
    let registry = Arc::new(registry);
    let mut adapter = StandardAdapter::new(registry.clone());
    adapter.connect();
    adapter.request_updates(&options(Priority::HighAccuracy), DestinationId::UPDATES);

    registry.add_provider(
        "gps",
        ProviderProperties::new(Accuracy::Fine, Power::High),
        true,
    );
    assert_eq!(
        pump(&mut adapter, &mut events),
        vec![AdapterEvent::ProviderAvailabilityChanged {
            destination: DestinationId::UPDATES,
            provider: "gps".to_owned(),
            enabled: true,
        }]
    );

    adapter.request_updates(&options(Priority::HighAccuracy), DestinationId::UPDATES);
    registry.report_fix(get_fix_from("gps"));
    assert_eq!(
        pump(&mut adapter, &mut events),
        vec![AdapterEvent::Fix {
            destination: DestinationId::UPDATES,
            fix: get_fix_from("gps"),
        }]
    );
}

#[test_log::test]
fn single_fix_moves_to_added_provider() {
    let (registry, mut events) = ProviderRegistry::channel();
    let registry = Arc::new(registry);
    registry.add_provider(
        "network",
        ProviderProperties::new(Accuracy::Coarse, Power::Low),
        true,
    );
    let mut adapter = StandardAdapter::new(registry.clone());
    adapter.connect();
    let request = adapter.request_single_fix(&options(Priority::HighAccuracy));

    registry.add_provider(
        "gps",
        ProviderProperties::new(Accuracy::Fine, Power::High),
        true,
    );
    pump(&mut adapter, &mut events);
    registry.report_fix(get_fix_from("gps"));
    pump(&mut adapter, &mut events);

    assert_eq!(
        request.outcome(),
        Some(Outcome::Completed(Some(get_fix_from("gps"))))
    );
    assert_eq!(registry.listener_count(), 0);
}

#[test_log::test]
fn canceled_single_fix_is_forgotten_on_next_event() {
    let (registry, mut events) = create_registry();
    let mut adapter = StandardAdapter::new(registry.clone());
    adapter.connect();
    adapter.request_updates(&options(Priority::LowPower), DestinationId::UPDATES);
    let request = adapter.request_single_fix(&options(Priority::HighAccuracy));
    assert_eq!(adapter.active_single_requests(), 1);

    request.cancel();
    registry.report_fix(get_fix_from("network"));
    assert_eq!(pump(&mut adapter, &mut events).len(), 1);
    assert_eq!(adapter.active_single_requests(), 0);
}
