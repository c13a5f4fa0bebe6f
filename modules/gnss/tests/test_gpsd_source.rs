// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use gnss::gpsd_source::{GPS_PROVIDER, GpsdSource};
use gnss::registry::ProviderRegistry;
use gnss::{HostEventKind, HostEventReceiver, ProviderHost, Subscription};
use module_core::{EventBus, Module, test_helper::stop_module};
use std::sync::Arc;
use std::{io::Error, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
    time::timeout,
};

struct GpsdServer {
    socket: TcpListener,
    client: Option<TcpStream>,
}

impl GpsdServer {
    async fn new(addr: &str) -> GpsdServer {
        let listener = TcpListener::bind(addr).await;
        GpsdServer {
            socket: listener.unwrap_or_else(|e| panic!("Failed to bind gpsd test server on {addr}. Error: {e}")),
            client: None,
        }
    }

    async fn accept_client(&mut self) {
        match self.socket.accept().await {
            Ok((client, _)) => self.client = Some(client),
            Err(e) => panic!("Client connection failed. Error: {:?}", e),
        }
    }

    async fn send(&mut self, buf: &[u8]) -> Result<(), Error> {
        match self.client {
            Some(ref mut client) => client.write_all(buf).await,
            None => panic!("GPSD server no client is connected"),
        }
    }

    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        match self.client {
            Some(ref mut client) => client.read(buf).await,
            None => panic!("GPSD server no client is connected"),
        }
    }
}

const TIMEOUT: Duration = Duration::from_millis(100);

const TPV_MSG: &str = " \
{ \
    \"class\": \"TPV\", \
    \"time\": \"2005-06-08T10:34:48.283Z\", \
    \"lat\": 1.0, \
    \"lon\": 1.0, \
    \"speed\": 22.0, \
    \"mode\": 3 \
}\n";

const NO_FIX_TPV_MSG: &str = " \
{ \
    \"class\": \"TPV\", \
    \"time\": \"2005-06-08T10:34:49.283Z\", \
    \"mode\": 1 \
}\n";

struct Setup {
    event_bus: EventBus,
    registry: Arc<ProviderRegistry>,
    events: HostEventReceiver,
    server: GpsdServer,
    handle: JoinHandle<Result<(), ()>>,
}

async fn test_setup(addr: &str) -> Setup {
    let event_bus = EventBus::default();
    let (registry, events) = ProviderRegistry::channel();
    let registry = Arc::new(registry);
    let mut server = GpsdServer::new(addr).await;
    let mut source = GpsdSource::new(event_bus.context(), registry.clone(), addr)
        .await
        .expect("Failed to initialize gpsd source.");
    timeout(TIMEOUT, server.accept_client())
        .await
        .unwrap_or_else(|_| panic!("No client connected within {:?}", TIMEOUT));
    let handle = tokio::spawn(async move { source.run().await });
    Setup {
        event_bus,
        registry,
        events,
        server,
        handle,
    }
}

async fn wait_for_enabled(registry: &ProviderRegistry, enabled: bool) {
    timeout(TIMEOUT, async {
        while registry.is_enabled(GPS_PROVIDER) != enabled {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("gps provider not enabled: {enabled} in time"));
}

#[test_log::test(tokio::test)]
async fn report_invalid_address() {
    let event_bus = EventBus::default();
    let (registry, _events) = ProviderRegistry::channel();
    let source = GpsdSource::new(event_bus.context(), Arc::new(registry), "not an address").await;
    assert!(source.is_err());
}

#[test_log::test(tokio::test)]
async fn enable_gpsd_notifications() {
    let mut setup = test_setup("127.0.0.1:35510").await;
    let enable_cmd: &str = r#"?WATCH={"enable":true,"json":true}"#;
    let mut buf: Vec<u8> = vec![0; enable_cmd.len()];
    let _ = timeout(TIMEOUT, setup.server.receive(&mut buf))
        .await
        .unwrap_or_else(|_| panic!("Enable command not received in {:?}", TIMEOUT));
    let received_cmd =
        std::str::from_utf8(&buf).expect("Received enable command is not a valid string");
    assert_eq!(received_cmd, enable_cmd);
    assert!(!setup.registry.is_enabled(GPS_PROVIDER));
    stop_module(&setup.event_bus, &mut setup.handle).await;
}

#[test_log::test(tokio::test)]
async fn report_fix_and_follow_fix_mode() {
    let mut setup = test_setup("127.0.0.1:35511").await;
    let listener = setup.registry.create_listener();
    setup
        .registry
        .request_updates(GPS_PROVIDER, Subscription::ALL_FIXES, listener);

    setup
        .server
        .send(TPV_MSG.as_bytes())
        .await
        .expect("Failed to send TPV msg");
    wait_for_enabled(&setup.registry, true).await;

    let mut fix = None;
    while fix.is_none() {
        let event = timeout(TIMEOUT, setup.events.recv())
            .await
            .expect("No host event received in time")
            .expect("Host event channel closed");
        if let HostEventKind::Fix(received) = event.kind {
            fix = Some(received);
        }
    }
    let fix = fix.unwrap();
    assert_eq!(fix.provider(), GPS_PROVIDER);
    assert_eq!(fix.latitude(), 1.0);
    assert_eq!(fix.longitude(), 1.0);
    assert_eq!(fix.velocity(), 22.0);
    assert_eq!(fix.time().to_string(), "10:34:48.283");

    setup
        .server
        .send(NO_FIX_TPV_MSG.as_bytes())
        .await
        .expect("Failed to send TPV msg");
    wait_for_enabled(&setup.registry, false).await;
    stop_module(&setup.event_bus, &mut setup.handle).await;
}

#[test_log::test(tokio::test)]
async fn disable_provider_when_connection_closes() {
    let mut setup = test_setup("127.0.0.1:35512").await;
    setup
        .server
        .send(TPV_MSG.as_bytes())
        .await
        .expect("Failed to send TPV msg");
    wait_for_enabled(&setup.registry, true).await;

    drop(setup.server);
    wait_for_enabled(&setup.registry, false).await;
    stop_module(&setup.event_bus, &mut setup.handle).await;
}
