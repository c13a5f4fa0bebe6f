// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Policy collaborators of the coordination service.

use common::options::{OptionsError, RequestOptions};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Persisted location policy.
pub trait PolicyStore: Send + Sync {
    fn is_enabled(&self) -> bool;
    fn is_background_allowed(&self) -> bool;
    fn options(&self) -> RequestOptions;
    fn set_options(&self, options: RequestOptions);
}

/// Tells whether the application currently runs in the foreground.
pub trait AppState: Send + Sync {
    fn is_foreground(&self) -> bool;
}

/// Policy values read at the start of one command.
#[derive(Clone, Debug, PartialEq)]
pub struct Policy {
    pub enabled: bool,
    pub background_allowed: bool,
    pub options: RequestOptions,
}

impl Policy {
    pub fn read(store: &dyn PolicyStore) -> Self {
        Policy {
            enabled: store.is_enabled(),
            background_allowed: store.is_background_allowed(),
            options: store.options(),
        }
    }

    /// Updates are allowed while enabled, in the background only if that is permitted.
    pub fn allows_updates(&self, foreground: bool) -> bool {
        self.enabled && (foreground || self.background_allowed)
    }
}

fn enabled_by_default() -> bool {
    true
}

/// Serializable form of the policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicySettings {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub background_allowed: bool,
    #[serde(default)]
    pub options: RequestOptions,
}

impl Default for PolicySettings {
    fn default() -> Self {
        PolicySettings {
            enabled: true,
            background_allowed: false,
            options: RequestOptions::default(),
        }
    }
}

/// A [`PolicyStore`] holding the settings in memory.
#[derive(Debug, Default)]
pub struct MemoryPolicyStore {
    settings: RwLock<PolicySettings>,
}

impl MemoryPolicyStore {
    pub fn new(settings: PolicySettings) -> Self {
        MemoryPolicyStore {
            settings: RwLock::new(settings),
        }
    }

    /// Loads the settings from JSON. Missing fields take their defaults,
    /// invalid request options are rejected.
    pub fn from_json(json: &str) -> Result<Self, OptionsError> {
        let settings: PolicySettings = serde_json::from_str(json)?;
        Ok(MemoryPolicyStore::new(settings))
    }

    pub fn settings(&self) -> PolicySettings {
        self.settings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.update(|settings| settings.enabled = enabled);
    }

    pub fn set_background_allowed(&self, allowed: bool) {
        self.update(|settings| settings.background_allowed = allowed);
    }

    fn update<F: FnOnce(&mut PolicySettings)>(&self, change: F) {
        let mut settings = self.settings.write().unwrap_or_else(|e| e.into_inner());
        change(&mut settings);
        debug!("Policy changed to {:?}", *settings);
    }
}

impl PolicyStore for MemoryPolicyStore {
    fn is_enabled(&self) -> bool {
        self.settings().enabled
    }

    fn is_background_allowed(&self) -> bool {
        self.settings().background_allowed
    }

    fn options(&self) -> RequestOptions {
        self.settings().options
    }

    fn set_options(&self, options: RequestOptions) {
        self.update(|settings| settings.options = options);
    }
}

/// Foreground flag shared with whoever tracks the application lifecycle.
#[derive(Clone, Debug)]
pub struct SharedForeground(Arc<AtomicBool>);

impl SharedForeground {
    pub fn new(foreground: bool) -> Self {
        SharedForeground(Arc::new(AtomicBool::new(foreground)))
    }

    pub fn set(&self, foreground: bool) {
        self.0.store(foreground, Ordering::Relaxed);
    }
}

impl AppState for SharedForeground {
    fn is_foreground(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
