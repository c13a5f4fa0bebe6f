// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::position::Position;
use gnss::constant_source::{ConstantSource, SIMULATED_PROVIDER};
use gnss::registry::ProviderRegistry;
use gnss::{HostEventKind, HostEventReceiver, ProviderHost, Subscription};
use module_core::{EventBus, Module, ModuleCtx, test_helper::stop_module};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const VELOCITY: f64 = 2.77778;

fn positions() -> Vec<Position> {
    vec![
        Position::new(&52.026649, &11.282535),
        Position::new(&52.026751, &11.282047),
        Position::new(&52.026807, &11.281746),
    ]
}

fn start_module(
    ctx: ModuleCtx,
    registry: Arc<ProviderRegistry>,
) -> tokio::task::JoinHandle<Result<(), ()>> {
    tokio::spawn(async move {
        let mut source = ConstantSource::new(ctx, registry, &positions(), VELOCITY)
            .unwrap()
            .with_interval(Duration::from_millis(10));
        source.run().await
    })
}

async fn next_fix(events: &mut HostEventReceiver) -> common::position::Fix {
    loop {
        let event = timeout(Duration::from_millis(200), events.recv())
            .await
            .expect("No host event received in time")
            .expect("Host event channel closed");
        if let HostEventKind::Fix(fix) = event.kind {
            return fix;
        }
    }
}

#[test]
fn report_creation_error_with_empty_positions() {
    let event_bus = EventBus::default();
    let (registry, _events) = ProviderRegistry::channel();
    let source = ConstantSource::new(event_bus.context(), Arc::new(registry), &[], VELOCITY);
    assert!(source.is_err());
}

#[test]
fn report_creation_error_with_negative_velocity() {
    let event_bus = EventBus::default();
    let (registry, _events) = ProviderRegistry::channel();
    let source = ConstantSource::new(event_bus.context(), Arc::new(registry), &positions(), -1.0);
    assert!(source.is_err());
}

#[test_log::test(tokio::test)]
async fn starts_at_first_position_and_moves() {
    let event_bus = EventBus::default();
    let (registry, mut events) = ProviderRegistry::channel();
    let registry = Arc::new(registry);
    let listener = registry.create_listener();
    let mut handle = start_module(event_bus.context(), registry.clone());

    // The provider is only known once the module runs.
    timeout(Duration::from_millis(100), async {
        while !registry.is_enabled(SIMULATED_PROVIDER) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("Simulated provider not enabled in time");
    registry.request_updates(SIMULATED_PROVIDER, Subscription::ALL_FIXES, listener);

    let first = next_fix(&mut events).await;
    let second = next_fix(&mut events).await;
    assert_eq!(first.provider(), SIMULATED_PROVIDER);
    assert_eq!(first.velocity(), VELOCITY);
    assert!((first.latitude() - 52.0266).abs() < 0.001);
    assert!((first.longitude() - 11.2825).abs() < 0.001);
    assert_ne!(first.to_position(), second.to_position());

    stop_module(&event_bus, &mut handle).await;
    assert!(!registry.is_enabled(SIMULATED_PROVIDER));
}
