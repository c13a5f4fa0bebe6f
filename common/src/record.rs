// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::options::RequestOptions;
use crate::position::Fix;

/// How a recorded fix was acquired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateType {
    /// Delivered by an open-ended subscription.
    Continuous,
    /// Answer to a single-shot request.
    Single,
}

/// A finished fix as it is handed to analytics.
///
/// `options` is only set for fixes that answer a single-shot request.
#[derive(Clone, Debug, PartialEq)]
pub struct LocationRecord {
    pub fix: Fix,
    pub options: Option<RequestOptions>,
    pub update_type: UpdateType,
}

impl LocationRecord {
    pub fn new(fix: Fix, options: Option<RequestOptions>, update_type: UpdateType) -> Self {
        LocationRecord {
            fix,
            options,
            update_type,
        }
    }
}
