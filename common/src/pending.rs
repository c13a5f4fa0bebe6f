// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Cancelable, single-assignment result of one in-flight request.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

/// Terminal state of a [`PendingRequest`].
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome<T> {
    /// The request finished with the given value.
    Completed(T),
    /// The request was canceled before a value arrived.
    Canceled,
}

type Listener<T> = Box<dyn FnOnce(&Outcome<T>) + Send>;
type CancelHook = Box<dyn FnOnce() + Send>;

struct Inner<T> {
    outcome: Option<Arc<Outcome<T>>>,
    listeners: Vec<Listener<T>>,
    cancel_hooks: Vec<CancelHook>,
}

/// A cancelable future for exactly one result.
///
/// The request starts pending and moves exactly once into either
/// [`Outcome::Completed`] or [`Outcome::Canceled`]. Later transitions are
/// ignored; a result delivered after cancellation is discarded.
///
/// Clones share the same state. Listeners run synchronously on the thread
/// performing the terminal transition, outside of the internal lock, so a
/// listener may query the request it is attached to.
pub struct PendingRequest<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for PendingRequest<T> {
    fn clone(&self) -> Self {
        PendingRequest {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for PendingRequest<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for PendingRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.lock().outcome.as_deref() {
            None => "pending",
            Some(Outcome::Completed(_)) => "completed",
            Some(Outcome::Canceled) => "canceled",
        };
        f.debug_struct("PendingRequest").field("state", &state).finish()
    }
}

impl<T> PendingRequest<T> {
    pub fn new() -> Self {
        PendingRequest {
            inner: Arc::new(Mutex::new(Inner {
                outcome: None,
                listeners: Vec::new(),
                cancel_hooks: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Completes the request with `value`.
    ///
    /// Returns `false` without touching the state if the request already
    /// reached a terminal state.
    pub fn complete(&self, value: T) -> bool {
        let (outcome, listeners) = {
            let mut inner = self.lock();
            if inner.outcome.is_some() {
                trace!("Discarding result for an already finished request");
                return false;
            }
            let outcome = Arc::new(Outcome::Completed(value));
            inner.outcome = Some(outcome.clone());
            inner.cancel_hooks.clear();
            (outcome, std::mem::take(&mut inner.listeners))
        };
        listeners.into_iter().for_each(|listener| listener(outcome.as_ref()));
        true
    }

    /// Cancels the request.
    ///
    /// Cancel hooks run first so any backend registration is torn down before
    /// listeners observe [`Outcome::Canceled`]. Returns `false` if the request
    /// already reached a terminal state.
    pub fn cancel(&self) -> bool {
        let (outcome, hooks, listeners) = {
            let mut inner = self.lock();
            if inner.outcome.is_some() {
                return false;
            }
            let outcome = Arc::new(Outcome::Canceled);
            inner.outcome = Some(outcome.clone());
            (
                outcome,
                std::mem::take(&mut inner.cancel_hooks),
                std::mem::take(&mut inner.listeners),
            )
        };
        hooks.into_iter().for_each(|hook| hook());
        listeners.into_iter().for_each(|listener| listener(outcome.as_ref()));
        true
    }

    /// Attaches a completion listener.
    ///
    /// If the request is already terminal the listener runs immediately with
    /// the stored outcome.
    pub fn add_listener<F>(&self, listener: F)
    where
        F: FnOnce(&Outcome<T>) + Send + 'static,
    {
        let outcome = {
            let mut inner = self.lock();
            match inner.outcome.clone() {
                Some(outcome) => outcome,
                None => {
                    inner.listeners.push(Box::new(listener));
                    return;
                }
            }
        };
        listener(outcome.as_ref());
    }

    /// Registers teardown work that runs synchronously when the request is canceled.
    ///
    /// Hooks are dropped without running once the request completes. A hook
    /// added to an already canceled request runs immediately.
    pub fn on_cancel<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut inner = self.lock();
            let canceled = inner
                .outcome
                .as_deref()
                .map(|outcome| matches!(outcome, Outcome::Canceled));
            match canceled {
                None => {
                    inner.cancel_hooks.push(Box::new(hook));
                    return;
                }
                Some(false) => return,
                Some(true) => {}
            }
        }
        hook();
    }

    pub fn is_done(&self) -> bool {
        self.lock().outcome.is_some()
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self.lock().outcome.as_deref(), Some(Outcome::Canceled))
    }

    /// Returns the terminal outcome, or `None` while the request is pending.
    pub fn outcome(&self) -> Option<Outcome<T>>
    where
        T: Clone,
    {
        self.lock().outcome.as_deref().cloned()
    }
}
