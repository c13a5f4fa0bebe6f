// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use clap::{CommandFactory, Parser};
use common::options::RequestOptions;
use common::position::Position;
use dirs::data_local_dir;
use gnss::registry::ProviderRegistry;
use gnss::{constant_source::ConstantSource, gpsd_source::GpsdSource};
use location_service::adapter::StandardAdapter;
use location_service::analytics::EventBusAnalytics;
use location_service::command::{Command, CommandSender};
use location_service::messenger::{MessengerHandle, ServiceMessage};
use location_service::policy::{MemoryPolicyStore, PolicySettings, SharedForeground};
use location_service::service::{Collaborators, CoordinationService};
use module_core::{EventBus, EventKind, Module, ModuleCtx};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address of a gpsd daemon, e.g. 127.0.0.1:2947
    #[arg(short = 'd', long)]
    gpsd: Option<String>,
    /// CSV file with longitude,latitude rows to simulate a track
    #[arg(short = 's', long)]
    simulate: Option<String>,
    /// Velocity of the simulated track in m/s
    #[arg(long, default_value_t = 10.0)]
    velocity: f64,
    /// 1 = high accuracy, 2 = balanced, 3 = low power, 4 = no power
    #[arg(short, long)]
    priority: Option<i32>,
    /// Minimum time between updates in milliseconds
    #[arg(long)]
    min_time: Option<i64>,
    /// Minimum distance between updates in meters
    #[arg(long)]
    min_distance: Option<f64>,
    #[arg(long)]
    background_allowed: bool,
    /// Start with location updates disabled
    #[arg(long)]
    disabled: bool,
    /// Policy JSON file, defaults to <data dir>/locator/policy.json
    #[arg(long)]
    policy: Option<PathBuf>,
    /// Request a single fix and quit
    #[arg(long)]
    single: bool,
}

fn read_track_from_file(file_path: &str) -> Result<Vec<Position>, ()> {
    let mut rdr = csv::Reader::from_path(file_path).map_err(|e| {
        error!("Failed to open track file {}. Error: {}", file_path, e);
    })?;
    let mut positions = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| error!("Invalid track record. Error: {}", e))?;
        let (Some(longitude), Some(latitude)) = (record.get(0), record.get(1)) else {
            error!("Track record {:?} needs longitude and latitude", record);
            return Err(());
        };
        let longitude = f64::from_str(longitude.trim())
            .map_err(|e| error!("Invalid longitude. Error: {}", e))?;
        let latitude = f64::from_str(latitude.trim())
            .map_err(|e| error!("Invalid latitude. Error: {}", e))?;
        positions.push(Position {
            longitude,
            latitude,
        });
    }
    debug!("length of positions: {}", positions.len());
    Ok(positions)
}

fn default_policy_path() -> Option<PathBuf> {
    let mut path = data_local_dir()?;
    path.push("locator");
    path.push("policy.json");
    Some(path)
}

fn load_policy_file(path: &Path) -> Result<PolicySettings, ()> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        error!("Failed to read policy {}. Error: {}", path.display(), e);
    })?;
    let store = MemoryPolicyStore::from_json(&json).map_err(|e| {
        error!("Invalid policy {}. Error: {}", path.display(), e);
    })?;
    Ok(store.settings())
}

fn create_policy(cli: &Cli) -> Result<PolicySettings, ()> {
    let mut settings = match &cli.policy {
        Some(path) => load_policy_file(path)?,
        None => match default_policy_path() {
            Some(path) if path.exists() => load_policy_file(&path)?,
            _ => PolicySettings::default(),
        },
    };
    let mut raw = settings.options.to_raw();
    if let Some(priority) = cli.priority {
        raw.priority = priority;
    }
    if let Some(min_time) = cli.min_time {
        raw.min_time_ms = min_time;
    }
    if let Some(min_distance) = cli.min_distance {
        raw.min_distance = min_distance;
    }
    settings.options = RequestOptions::try_from(raw).map_err(|e| {
        error!("Invalid request options. Error: {}", e);
    })?;
    settings.enabled &= !cli.disabled;
    settings.background_allowed |= cli.background_allowed;
    Ok(settings)
}

async fn create_source(
    eb: &EventBus,
    registry: Arc<ProviderRegistry>,
    cli: &Cli,
) -> Result<Box<dyn Module>, ()> {
    if let Some(address) = &cli.gpsd {
        return match GpsdSource::new(eb.context(), registry, address).await {
            Ok(gpsd) => Ok(Box::new(gpsd)),
            Err(e) => {
                error!("Failed to connect to gpsd!. Error: {}", e);
                Err(())
            }
        };
    }
    if let Some(track) = &cli.simulate {
        let positions = read_track_from_file(track)?;
        return match ConstantSource::new(eb.context(), registry, &positions, cli.velocity) {
            Ok(source) => Ok(Box::new(source)),
            Err(e) => {
                error!("Failed to create simulated source. Error: {}", e);
                Err(())
            }
        };
    }
    error!("No location source specified. Use --gpsd or --simulate");
    let _ = Cli::command().print_help();
    Err(())
}

/// Prints what the service sends and quits after a single fix result.
struct Reporter {
    ctx: ModuleCtx,
    messages: UnboundedReceiver<ServiceMessage>,
    quit_after_single: bool,
}

#[async_trait::async_trait]
impl Module for Reporter {
    async fn run(&mut self) -> Result<(), ()> {
        loop {
            tokio::select! {
                event = self.ctx.receiver.recv() => match event {
                    Ok(event) => {
                        if let EventKind::QuitEvent = event.kind {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    Err(_) => {}
                },
                Some(message) = self.messages.recv() => match message {
                    ServiceMessage::NewFix(fix) => info!("Fix: {:?}", fix),
                    ServiceMessage::SingleFixResult { requester_id, fix } => {
                        match fix {
                            Some(fix) => info!("Single fix {}: {:?}", requester_id, fix),
                            None => warn!("Single fix request {} failed", requester_id),
                        }
                        if self.quit_after_single
                            && self.ctx.publish_event(EventKind::QuitEvent).is_err()
                        {
                            break;
                        }
                    }
                },
            }
        }
        Ok(())
    }
}

/// Either asks for one fix or subscribes `reply_to` and starts continuous updates.
fn send_initial_commands(
    commands: &CommandSender,
    reply_to: MessengerHandle,
    single: Option<RequestOptions>,
) -> Result<(), ()> {
    let initial = match single {
        Some(options) => vec![Command::RequestSingleFix {
            options: Some(options.to_raw()),
            requester_id: 1,
            reply_to,
        }],
        None => vec![Command::Subscribe(reply_to), Command::StartUpdates],
    };
    for command in initial {
        commands
            .send(command)
            .map_err(|e| error!("Failed to send command. Error: {}", e))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), ()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings = create_policy(&cli)?;
    let single = cli.single.then(|| settings.options.clone());
    let eb = EventBus::default();
    let (registry, host_events) = ProviderRegistry::channel();
    let registry = Arc::new(registry);
    let mut source = create_source(&eb, registry.clone(), &cli).await?;

    let ctx = eb.context();
    let collaborators = Collaborators {
        policy: Arc::new(MemoryPolicyStore::new(settings)),
        app_state: Arc::new(SharedForeground::new(true)),
        analytics: Arc::new(EventBusAnalytics::new(&ctx)),
    };
    let (mut service, commands) =
        CoordinationService::new(ctx, StandardAdapter::new(registry), host_events, collaborators);

    let (reply_to, messages) = MessengerHandle::channel();
    let mut reporter = Reporter {
        ctx: eb.context(),
        messages,
        quit_after_single: cli.single,
    };

    let quit_ctx = eb.context();
    ctrlc::set_handler(move || {
        info!("Quitting...");
        let _ = quit_ctx.publish_event(EventKind::QuitEvent);
    })
    .map_err(|e| error!("Failed to install Ctrl-C handler. Error: {}", e))?;

    send_initial_commands(&commands, reply_to, single)?;

    info!("Starting modules...");
    let (source_result, service_result, reporter_result) =
        tokio::join!(source.run(), service.run(), reporter.run());
    source_result.and(service_result).and(reporter_result)
}
