// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Pure algorithms shared by the positioning backend and the location service.

use common::position::Position;

pub mod selection;

/// Calculates the approximate distance in meters between two geographic positions.
///
/// This function uses a simplified equirectangular approximation to determine
/// the distance between two latitude/longitude points. It assumes that the
/// Earth's surface is locally flat and therefore does not account for
/// large-scale curvature or ellipsoidal effects, making it suitable only
/// for relatively short distances such as the minimum distance between two
/// continuous updates.
///
/// # Notes
/// - The function expects latitude and longitude values in **degrees**.
/// - Accuracy decreases over long distances or near the poles.
pub fn calculate_distance(pos1: &Position, pos2: &Position) -> f64 {
    let lat = (pos1.latitude + pos2.latitude) / 2.0 * 0.01745;
    let dx = 111300.0 * lat.cos() * (pos1.longitude - pos2.longitude);
    let dy = 111300.0 * (pos1.latitude - pos2.latitude);
    (dx * dx + dy * dy).sqrt()
}
