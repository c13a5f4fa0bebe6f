// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::serde::{date, time};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Represents a geographical coordinate with latitude and longitude.
///
/// The `Position` struct is commonly used to store a point on Earth
/// in decimal degrees. Latitude values range from -90.0 to 90.0, and
/// longitude values range from -180.0 to 180.0.
///
/// # Example
///
/// ```rust
/// use common::position::Position;
///
/// let pos = Position {
///     latitude: 52.5200,
///     longitude: 13.4050,
/// };
///
/// println!("{:?}", pos);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    /// Creates a new [`Position`] with the given latitude and longitude.
    ///
    /// ```rust
    /// use common::position::Position;
    ///
    /// let pos = Position::new(&52.5200, &13.4050);
    /// assert_eq!(pos.latitude, 52.5200);
    /// ```
    pub fn new(latitude: &f64, longitude: &f64) -> Self {
        Position {
            latitude: *latitude,
            longitude: *longitude,
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// One reported position sample from a positioning provider.
///
/// A fix stores the name of the provider that produced it, the coordinate,
/// the velocity, an optional horizontal accuracy and the UTC timestamp of
/// the measurement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    provider: String,
    latitude: f64,
    longitude: f64,
    velocity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    accuracy: Option<f64>,
    #[serde(with = "time")]
    time: NaiveTime,
    #[serde(with = "date")]
    date: NaiveDate,
}

impl Fix {
    /// Creates a new [`Fix`] reported by `provider`.
    ///
    /// # Arguments
    ///
    /// * `provider` – Name of the provider that measured the fix.
    /// * `latitude` – Latitude in decimal degrees. Positive for northern hemisphere.
    /// * `longitude` – Longitude in decimal degrees. Positive for eastern hemisphere.
    /// * `velocity` – Speed in meters per second.
    /// * `time` – Timestamp of the fix in UTC.
    /// * `date` – Date of the fix in UTC.
    ///
    /// # Example
    ///
    /// ```rust
    /// use common::position::Fix;
    ///
    /// let now = chrono::Utc::now();
    /// let fix = Fix::new("gps", 52.0, 13.0, 15.5, &now.time(), &now.date_naive());
    /// assert_eq!(fix.provider(), "gps");
    /// ```
    pub fn new(
        provider: &str,
        latitude: f64,
        longitude: f64,
        velocity: f64,
        time: &NaiveTime,
        date: &NaiveDate,
    ) -> Fix {
        Fix {
            provider: provider.to_owned(),
            latitude,
            longitude,
            velocity,
            accuracy: None,
            time: *time,
            date: *date,
        }
    }

    /// Returns the fix with the horizontal accuracy (in meters) attached.
    pub fn with_accuracy(mut self, accuracy: f64) -> Fix {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Name of the provider that reported this fix.
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Returns the latitude in decimal degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Returns the longitude in decimal degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Returns the velocity in meters per second.
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Returns the horizontal accuracy in meters, if the provider reported one.
    pub fn accuracy(&self) -> Option<f64> {
        self.accuracy
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Drops the measurement metadata and returns the bare coordinate.
    pub fn to_position(&self) -> Position {
        Position {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}
