// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::registry::ProviderRegistry;
use algorithm::selection::{Accuracy, Power, ProviderProperties};
use common::position::Fix;
use futures::StreamExt;
use gpsd_proto::{Mode, Tpv};
use module_core::{EventKind, Module, ModuleCtx};
use std::{
    io::{self, Error, ErrorKind},
    net::SocketAddr,
    str::FromStr,
    sync::Arc,
};
use tokio::sync::Notify;
use tokio::{io::AsyncWriteExt, net::TcpStream};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info, warn};

/// Provider name of fixes reported by gpsd.
pub const GPS_PROVIDER: &str = "gps";

/// Turns gpsd TPV reports into fixes and availability changes of the `gps` provider.
struct GpsdRuntime {
    registry: Arc<ProviderRegistry>,
    /// The start signal for the reader task.
    notify: Arc<Notify>,
}

impl GpsdRuntime {
    fn process_tpv_msg(&self, tpv: &Tpv) {
        let has_fix = matches!(tpv.mode, Mode::Fix2d | Mode::Fix3d);
        self.registry.set_enabled(GPS_PROVIDER, has_fix);
        if !has_fix {
            return;
        }
        let Some(lat) = tpv.lat else { return };
        let Some(lon) = tpv.lon else { return };
        let Some(ref time) = tpv.time else { return };
        let Ok(datetime) = chrono::DateTime::<chrono::Utc>::from_str(time) else {
            debug!("Ignoring TPV report with invalid time {}", time);
            return;
        };
        let speed = tpv.speed.map(f64::from).unwrap_or_default();
        self.registry.report_fix(Fix::new(
            GPS_PROVIDER,
            lat,
            lon,
            speed,
            &datetime.time(),
            &datetime.date_naive(),
        ));
    }
}

async fn gpsd_reader(mut stream: TcpStream, runtime: GpsdRuntime) {
    runtime.notify.notified().await;
    if let Err(e) = stream
        .write_all(gpsd_proto::ENABLE_WATCH_CMD.as_bytes())
        .await
    {
        warn!("Failed to enable gpsd watch mode. Error: {}", e);
        return;
    }
    let mut framed = Framed::new(stream, LinesCodec::new());
    while let Some(result) = framed.next().await {
        match result {
            Ok(ref line) => {
                if let Ok(tpv) = serde_json::from_str::<Tpv>(line) {
                    runtime.process_tpv_msg(&tpv);
                }
            }
            Err(e) => warn!("GPSD receive error {e:?}"),
        }
    }
    info!("gpsd connection closed");
    runtime.registry.set_enabled(GPS_PROVIDER, false);
}

/// A provider backed by a gpsd daemon.
///
/// The `gps` provider is registered disabled and follows the fix mode gpsd
/// reports: enabled with a 2D/3D fix, disabled without one or once the
/// connection is lost.
pub struct GpsdSource {
    ctx: ModuleCtx,
    gpsd_handle: tokio::task::JoinHandle<()>,
    task_notify: Arc<Notify>,
    registry: Arc<ProviderRegistry>,
}

impl GpsdSource {
    pub async fn new(
        ctx: ModuleCtx,
        registry: Arc<ProviderRegistry>,
        address: &str,
    ) -> Result<Self, Error> {
        let address: SocketAddr = match address.parse() {
            Ok(addr) => addr,
            Err(e) => return Err(io::Error::new(ErrorKind::InvalidInput, e)),
        };
        let socket = TcpStream::connect(address).await?;
        registry.add_provider(
            GPS_PROVIDER,
            ProviderProperties::new(Accuracy::Fine, Power::High),
            false,
        );
        let notify = Arc::new(Notify::new());
        let runtime = GpsdRuntime {
            registry: registry.clone(),
            notify: notify.clone(),
        };
        let gpsd_handle = tokio::spawn(async move { gpsd_reader(socket, runtime).await });
        Ok(GpsdSource {
            ctx,
            gpsd_handle,
            task_notify: notify,
            registry,
        })
    }
}

#[async_trait::async_trait]
impl Module for GpsdSource {
    async fn run(&mut self) -> Result<(), ()> {
        self.task_notify.notify_one();
        loop {
            match self.ctx.receiver.recv().await {
                Ok(event) => {
                    if let EventKind::QuitEvent = event.kind {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                Err(e) => debug!("gpsd source missed events: {}", e),
            }
        }
        self.gpsd_handle.abort();
        self.registry.set_enabled(GPS_PROVIDER, false);
        Ok(())
    }
}
