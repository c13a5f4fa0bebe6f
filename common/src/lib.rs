// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Common Modul for the location service
//!
//! Provides the common data types that are used across every modul:
//! fixes, request options, the single-shot pending request and the
//! records handed to analytics.

pub mod options;
pub mod pending;
pub mod position;
pub mod record;
pub mod serde;
pub mod test_helper;
