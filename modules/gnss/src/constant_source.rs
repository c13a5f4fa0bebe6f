// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::registry::ProviderRegistry;
use algorithm::selection::{Accuracy, Power, ProviderProperties};
use chrono::Utc;
use common::position::{Fix, Position};
use module_core::{EventKind, Module, ModuleCtx};
use std::{
    io::{Error, ErrorKind},
    sync::Arc,
    time::Duration,
};
use tracing::{debug, error, info};
use utm::{lat_lon_to_zone_number, lat_to_zone_letter, to_utm_wgs84, wsg84_utm_to_lat_lon};

/// Provider name used by [`ConstantSource`] unless configured otherwise.
pub const SIMULATED_PROVIDER: &str = "simulated";

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct UtmPoint {
    northing: f64,
    easting: f64,
    zone: u8,
    zone_letter: char,
}

fn convert_track_points(positions: &[Position]) -> Result<Vec<UtmPoint>, Error> {
    positions
        .iter()
        .map(|pos| {
            let zone = lat_lon_to_zone_number(pos.latitude, pos.longitude);
            let Some(zone_letter) = lat_to_zone_letter(pos.latitude) else {
                return Err(Error::new(
                    ErrorKind::InvalidData,
                    format!(
                        "Position lat: {}, long: {} can't be converted to UTM zone",
                        pos.latitude, pos.longitude
                    ),
                ));
            };
            let (northing, easting, _) = to_utm_wgs84(pos.latitude, pos.longitude, zone);
            Ok(UtmPoint {
                northing,
                easting,
                zone,
                zone_letter,
            })
        })
        .collect()
}

/// Moves along the configured points at a constant velocity.
struct ConstantSourceRuntime {
    points: Vec<UtmPoint>,
    next_point: usize,
    current: UtmPoint,
    velocity: f64,
    interval: Duration,
    provider: String,
}

impl ConstantSourceRuntime {
    /// Returns the fix at the current position and advances by one interval.
    fn tick(&mut self) -> Option<Fix> {
        let fix = self.current_fix();
        self.advance();
        fix
    }

    fn current_fix(&self) -> Option<Fix> {
        let (lat, long) = wsg84_utm_to_lat_lon(
            self.current.easting,
            self.current.northing,
            self.current.zone,
            self.current.zone_letter,
        )
        .ok()?;
        let now = Utc::now();
        Some(Fix::new(
            &self.provider,
            lat,
            long,
            self.velocity,
            &now.time(),
            &now.date_naive(),
        ))
    }

    fn advance(&mut self) {
        if self.points.len() < 2 {
            return;
        }
        let mut remaining = self.velocity * self.interval.as_secs_f64();
        while remaining > 0.0 {
            let target = self.points[self.next_point];
            let dn = target.northing - self.current.northing;
            let de = target.easting - self.current.easting;
            let length = (dn * dn + de * de).sqrt();
            if length > remaining {
                self.current.northing += dn / length * remaining;
                self.current.easting += de / length * remaining;
                return;
            }
            remaining -= length;
            self.current = target;
            self.next_point = (self.next_point + 1) % self.points.len();
        }
    }
}

#[derive(Clone)]
struct ConstantSourceConfig {
    points: Vec<UtmPoint>,
    velocity: f64,
    interval: Duration,
    provider: String,
    properties: ProviderProperties,
}

/// A simulated provider that travels a list of positions at a constant velocity
/// and reports a fix every interval.
///
/// The provider is registered and enabled in the [`ProviderRegistry`] while
/// the module runs and disabled when it quits.
pub struct ConstantSource {
    ctx: ModuleCtx,
    registry: Arc<ProviderRegistry>,
    config: ConstantSourceConfig,
}

impl ConstantSource {
    pub const POSITION_INTERVAL: Duration = Duration::from_millis(100);

    pub fn new(
        ctx: ModuleCtx,
        registry: Arc<ProviderRegistry>,
        positions: &[Position],
        velocity: f64,
    ) -> Result<Self, Error> {
        if positions.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "positions parameter is empty",
            ));
        }
        if !velocity.is_finite() || velocity < 0.0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("velocity {velocity} must be a finite, non-negative number"),
            ));
        }
        Ok(ConstantSource {
            ctx,
            registry,
            config: ConstantSourceConfig {
                points: convert_track_points(positions)?,
                velocity,
                interval: ConstantSource::POSITION_INTERVAL,
                provider: SIMULATED_PROVIDER.to_owned(),
                properties: ProviderProperties::new(Accuracy::Coarse, Power::Low),
            },
        })
    }

    /// Reports fixes under `name` with the given properties instead of the
    /// default coarse, low power `simulated` provider.
    pub fn with_provider(mut self, name: &str, properties: ProviderProperties) -> Self {
        self.config.provider = name.to_owned();
        self.config.properties = properties;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }
}

async fn constant_source_task(registry: Arc<ProviderRegistry>, config: ConstantSourceConfig) {
    let mut timer = tokio::time::interval(config.interval);
    let mut runtime = ConstantSourceRuntime {
        current: config.points[0],
        next_point: 1 % config.points.len(),
        points: config.points,
        velocity: config.velocity,
        interval: config.interval,
        provider: config.provider,
    };
    loop {
        timer.tick().await;
        match runtime.tick() {
            Some(fix) => registry.report_fix(fix),
            None => error!("Failed to convert simulated position {:?}", runtime.current),
        }
    }
}

#[async_trait::async_trait]
impl Module for ConstantSource {
    async fn run(&mut self) -> Result<(), ()> {
        self.registry
            .add_provider(&self.config.provider, self.config.properties, true);
        info!("Simulated provider {} started", self.config.provider);
        let registry = self.registry.clone();
        let config = self.config.clone();
        let task = tokio::spawn(async move { constant_source_task(registry, config).await });
        loop {
            match self.ctx.receiver.recv().await {
                Ok(event) => {
                    if let EventKind::QuitEvent = event.kind {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                Err(e) => debug!("Simulated provider missed events: {}", e),
            }
        }
        task.abort();
        self.registry.set_enabled(&self.config.provider, false);
        Ok(())
    }
}
