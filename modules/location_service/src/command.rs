// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::messenger::MessengerHandle;
use common::options::RawRequestOptions;
use common::position::Fix;
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands accepted by the coordination service.
///
/// Options travel in their raw form and are validated by the service, so a
/// malformed request is answered instead of being rejected at the sender.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    StartUpdates,
    StopUpdates,
    /// A provider was enabled or disabled; forces a fresh selection.
    ProviderAvailabilityChanged { provider: String, enabled: bool },
    /// A fix for the continuous subscribers. Options that come along become
    /// the last requested options.
    LocationUpdate {
        fix: Option<Fix>,
        options: Option<RawRequestOptions>,
    },
    Subscribe(MessengerHandle),
    Unsubscribe(MessengerHandle),
    RequestSingleFix {
        options: Option<RawRequestOptions>,
        requester_id: u32,
        reply_to: MessengerHandle,
    },
    CancelSingleFix { requester_id: u32 },
    /// The stored policy changed; updates start or stop accordingly.
    PolicyChanged,
}

#[derive(Debug, Error, PartialEq)]
pub enum ServiceError {
    #[error("the coordination service is not running")]
    Stopped,
}

pub type CommandReceiver = UnboundedReceiver<Command>;

/// Cloneable sending side of the service's command queue.
#[derive(Clone, Debug)]
pub struct CommandSender(UnboundedSender<Command>);

impl CommandSender {
    pub fn channel() -> (Self, CommandReceiver) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (CommandSender(sender), receiver)
    }

    pub fn send(&self, command: Command) -> Result<(), ServiceError> {
        self.0.send(command).map_err(|_| ServiceError::Stopped)
    }
}
