// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Request options describing how location updates should be acquired.
//!
//! [`RequestOptions`] is only ever built through [`RequestOptionsBuilder`] or
//! converted from the untrusted wire form [`RawRequestOptions`]. Both paths
//! validate, so every `RequestOptions` value in the system is well formed.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// The accuracy/power tradeoff requested from the positioning backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Priority {
    /// Most accurate provider regardless of power use.
    HighAccuracy,
    /// City block accuracy at medium power.
    BalancedPowerAccuracy,
    /// Coarse accuracy at low power.
    LowPower,
    /// Only fixes another consumer already caused (passive provider).
    NoPower,
}

impl Priority {
    /// Wire code of the priority.
    pub fn code(&self) -> i32 {
        match self {
            Priority::HighAccuracy => 1,
            Priority::BalancedPowerAccuracy => 2,
            Priority::LowPower => 3,
            Priority::NoPower => 4,
        }
    }
}

impl TryFrom<i32> for Priority {
    type Error = OptionsError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Priority::HighAccuracy),
            2 => Ok(Priority::BalancedPowerAccuracy),
            3 => Ok(Priority::LowPower),
            4 => Ok(Priority::NoPower),
            _ => Err(OptionsError::InvalidPriority(code)),
        }
    }
}

/// Reasons why request options are rejected at the boundary.
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("invalid priority code: {0}")]
    InvalidPriority(i32),
    #[error("minimum time must not be negative: {0} ms")]
    NegativeMinTime(i64),
    #[error("minimum distance must be a finite, non-negative number: {0}")]
    InvalidMinDistance(f64),
    #[error("update age must not be negative: {0} ms")]
    NegativeUpdateAge(i64),
    #[error("minimum update age {min:?} exceeds maximum update age {max:?}")]
    InvertedUpdateAge { min: Duration, max: Duration },
    #[error("request options are missing")]
    Missing,
    #[error("malformed request options: {0}")]
    Json(#[from] serde_json::Error),
}

/// Immutable description of the desired update behavior.
///
/// Two options are interchangeable iff all fields are equal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRequestOptions", into = "RawRequestOptions")]
pub struct RequestOptions {
    priority: Priority,
    min_time: Duration,
    min_distance: f64,
    min_update_age: Option<Duration>,
    max_update_age: Option<Duration>,
}

impl RequestOptions {
    pub const DEFAULT_MIN_TIME: Duration = Duration::from_secs(300);
    pub const DEFAULT_MIN_DISTANCE: f64 = 800.0;

    pub fn builder() -> RequestOptionsBuilder {
        RequestOptionsBuilder::default()
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Minimum time between two continuous updates.
    pub fn min_time(&self) -> Duration {
        self.min_time
    }

    /// Minimum distance in meters between two continuous updates.
    pub fn min_distance(&self) -> f64 {
        self.min_distance
    }

    pub fn min_update_age(&self) -> Option<Duration> {
        self.min_update_age
    }

    pub fn max_update_age(&self) -> Option<Duration> {
        self.max_update_age
    }

    /// Returns true if a cached fix of the given age may answer a single-shot request.
    ///
    /// Without a maximum update age cached fixes are never accepted.
    pub fn accepts_update_age(&self, age: Duration) -> bool {
        let Some(max) = self.max_update_age else {
            return false;
        };
        age >= self.min_update_age.unwrap_or(Duration::ZERO) && age <= max
    }

    /// Parses and validates options from their JSON wire form.
    pub fn from_json(json: &str) -> Result<Self, OptionsError> {
        let raw: RawRequestOptions = serde_json::from_str(json)?;
        RequestOptions::try_from(raw)
    }

    pub fn to_raw(&self) -> RawRequestOptions {
        RawRequestOptions::from(self.clone())
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        RequestOptions {
            priority: Priority::BalancedPowerAccuracy,
            min_time: RequestOptions::DEFAULT_MIN_TIME,
            min_distance: RequestOptions::DEFAULT_MIN_DISTANCE,
            min_update_age: None,
            max_update_age: None,
        }
    }
}

/// Builder for [`RequestOptions`]; starts from the defaults.
#[derive(Clone, Debug, Default)]
pub struct RequestOptionsBuilder {
    options: RequestOptions,
}

impl RequestOptionsBuilder {
    pub fn priority(mut self, priority: Priority) -> Self {
        self.options.priority = priority;
        self
    }

    pub fn min_time(mut self, min_time: Duration) -> Self {
        self.options.min_time = min_time;
        self
    }

    pub fn min_distance(mut self, min_distance: f64) -> Self {
        self.options.min_distance = min_distance;
        self
    }

    pub fn min_update_age(mut self, age: Duration) -> Self {
        self.options.min_update_age = Some(age);
        self
    }

    pub fn max_update_age(mut self, age: Duration) -> Self {
        self.options.max_update_age = Some(age);
        self
    }

    /// Validates the collected values and returns the options.
    ///
    /// # Errors
    ///
    /// * [`OptionsError::InvalidMinDistance`] if the distance is negative or not finite.
    /// * [`OptionsError::InvertedUpdateAge`] if the minimum update age exceeds the maximum.
    pub fn build(self) -> Result<RequestOptions, OptionsError> {
        let options = self.options;
        if !options.min_distance.is_finite() || options.min_distance < 0.0 {
            return Err(OptionsError::InvalidMinDistance(options.min_distance));
        }
        if let (Some(min), Some(max)) = (options.min_update_age, options.max_update_age)
            && min > max
        {
            return Err(OptionsError::InvertedUpdateAge { min, max });
        }
        Ok(options)
    }
}

/// Untrusted wire form of [`RequestOptions`] as it arrives with commands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawRequestOptions {
    pub priority: i32,
    pub min_time_ms: i64,
    pub min_distance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_update_age_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_update_age_ms: Option<i64>,
}

fn age_from_millis(ms: i64) -> Result<Duration, OptionsError> {
    u64::try_from(ms)
        .map(Duration::from_millis)
        .map_err(|_| OptionsError::NegativeUpdateAge(ms))
}

impl TryFrom<RawRequestOptions> for RequestOptions {
    type Error = OptionsError;

    fn try_from(raw: RawRequestOptions) -> Result<Self, Self::Error> {
        let min_time =
            u64::try_from(raw.min_time_ms).map_err(|_| OptionsError::NegativeMinTime(raw.min_time_ms))?;
        let mut builder = RequestOptions::builder()
            .priority(Priority::try_from(raw.priority)?)
            .min_time(Duration::from_millis(min_time))
            .min_distance(raw.min_distance);
        if let Some(ms) = raw.min_update_age_ms {
            builder = builder.min_update_age(age_from_millis(ms)?);
        }
        if let Some(ms) = raw.max_update_age_ms {
            builder = builder.max_update_age(age_from_millis(ms)?);
        }
        builder.build()
    }
}

/// Durations beyond the wire range are sent as `i64::MAX` milliseconds.
fn saturating_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

impl From<RequestOptions> for RawRequestOptions {
    fn from(options: RequestOptions) -> Self {
        RawRequestOptions {
            priority: options.priority.code(),
            min_time_ms: saturating_millis(options.min_time),
            min_distance: options.min_distance,
            min_update_age_ms: options.min_update_age.map(saturating_millis),
            max_update_age_ms: options.max_update_age.map(saturating_millis),
        }
    }
}
