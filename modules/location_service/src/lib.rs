// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Location update coordination.
//!
//! The [`CoordinationService`](service::CoordinationService) owns one
//! [`SourceAdapter`](adapter::SourceAdapter) and serializes every command and
//! backend event through a single worker loop. Continuous fixes are fanned
//! out to subscribers, single-shot requests are answered through the
//! messenger the requester handed in.

pub mod adapter;
pub mod analytics;
pub mod command;
pub mod messenger;
pub mod policy;
pub mod service;
pub mod test_helper;
