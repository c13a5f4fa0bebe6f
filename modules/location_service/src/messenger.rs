// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::position::Fix;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Message the service sends to subscribers and single-shot requesters.
#[derive(Clone, Debug, PartialEq)]
pub enum ServiceMessage {
    /// A continuous fix for every subscriber.
    NewFix(Fix),
    /// Answer to one single-shot request. `fix` is `None` if the request failed.
    SingleFixResult { requester_id: u32, fix: Option<Fix> },
}

#[derive(Debug, Error, PartialEq)]
pub enum MessengerError {
    #[error("the receiving endpoint is gone")]
    Disconnected,
}

/// Capability to deliver one message to an endpoint that may have vanished.
pub trait Messenger: Send + Sync {
    fn send(&self, message: ServiceMessage) -> Result<(), MessengerError>;
}

impl Messenger for tokio::sync::mpsc::UnboundedSender<ServiceMessage> {
    fn send(&self, message: ServiceMessage) -> Result<(), MessengerError> {
        tokio::sync::mpsc::UnboundedSender::send(self, message)
            .map_err(|_| MessengerError::Disconnected)
    }
}

/// Shared handle to a [`Messenger`].
///
/// Two handles are equal if they were cloned from the same handle; the
/// messenger behind it is never compared.
#[derive(Clone)]
pub struct MessengerHandle(Arc<dyn Messenger>);

impl MessengerHandle {
    pub fn new<M: Messenger + 'static>(messenger: M) -> Self {
        MessengerHandle(Arc::new(messenger))
    }

    /// Creates a handle backed by a channel and returns the receiving end.
    pub fn channel() -> (Self, tokio::sync::mpsc::UnboundedReceiver<ServiceMessage>) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (MessengerHandle::new(sender), receiver)
    }

    pub fn send(&self, message: ServiceMessage) -> Result<(), MessengerError> {
        self.0.send(message)
    }
}

impl PartialEq for MessengerHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for MessengerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessengerHandle({:p})", Arc::as_ptr(&self.0))
    }
}
