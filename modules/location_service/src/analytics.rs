// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::options::RequestOptions;
use common::position::Fix;
use common::record::{LocationRecord, UpdateType};
use module_core::{Event, EventKind, ModuleCtx};
use std::sync::Arc;
use tracing::trace;

/// Receives every fix the service accepted.
pub trait AnalyticsSink: Send + Sync {
    fn record_fix(&self, fix: &Fix, options: Option<&RequestOptions>, update_type: UpdateType);
}

/// Publishes accepted fixes as [`EventKind::LocationRecordedEvent`].
pub struct EventBusAnalytics {
    sender: tokio::sync::broadcast::Sender<Event>,
}

impl EventBusAnalytics {
    pub fn new(ctx: &ModuleCtx) -> Self {
        EventBusAnalytics {
            sender: ctx.sender.clone(),
        }
    }
}

impl AnalyticsSink for EventBusAnalytics {
    fn record_fix(&self, fix: &Fix, options: Option<&RequestOptions>, update_type: UpdateType) {
        let record = LocationRecord::new(fix.clone(), options.cloned(), update_type);
        let event = Event {
            kind: EventKind::LocationRecordedEvent(Arc::new(record)),
        };
        if self.sender.send(event).is_err() {
            trace!("No module listens for recorded locations");
        }
    }
}
