// Callback authentication
// This file implements the single-slot state machine deciding which venue may
// reenter the router while a callback-style swap is in flight
//
// Numan Thabit 2025 Nov

use alloy_primitives::Address;
use std::ops::{Deref, DerefMut};
use tracing::{debug, warn};

use crate::errors::RouteError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallbackState {
    #[default]
    Idle,
    Armed(Address),
}

/// Holds at most one pending callback authorization. Nested callbacks are not
/// supported: arming an armed slot fails.
#[derive(Debug, Default)]
pub struct CallbackAuthenticator {
    state: CallbackState,
}

impl CallbackAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CallbackState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, CallbackState::Armed(_))
    }

    /// `Idle -> Armed(venue)`.
    pub fn arm(&mut self, venue: Address) -> Result<(), RouteError> {
        match self.state {
            CallbackState::Idle => {
                self.state = CallbackState::Armed(venue);
                debug!(%venue, "callback slot armed");
                Ok(())
            }
            CallbackState::Armed(pending) => Err(RouteError::CallbackAlreadyArmed {
                pending,
                requested: venue,
            }),
        }
    }

    /// Succeeds only when armed for exactly `caller`. An idle slot expects the
    /// zero address, which no venue can call from.
    pub fn authenticate(&self, caller: Address) -> Result<(), RouteError> {
        let expected = match self.state {
            CallbackState::Armed(expected) => expected,
            CallbackState::Idle => Address::ZERO,
        };
        if self.is_armed() && caller == expected {
            Ok(())
        } else {
            Err(RouteError::UnexpectedCallbackSender { caller, expected })
        }
    }

    /// `Armed -> Idle`. Called right after a successful `authenticate` and
    /// before any funds move, so one arming pays out at most once.
    pub fn consume(&mut self) {
        self.state = CallbackState::Idle;
    }

    /// Post-call check: a venue left armed never called back.
    pub fn ensure_idle(&mut self) -> Result<(), RouteError> {
        match self.state {
            CallbackState::Idle => Ok(()),
            CallbackState::Armed(venue) => {
                self.reset();
                Err(RouteError::SwapCallbackNotExecuted { venue })
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = CallbackState::Idle;
    }

    /// Borrow the slot for the duration of one route. The slot is reset when
    /// the scope is dropped, whichever way the route exits.
    pub fn scope(&mut self) -> CallbackScope<'_> {
        CallbackScope { slot: self }
    }
}

pub struct CallbackScope<'a> {
    slot: &'a mut CallbackAuthenticator,
}

impl Deref for CallbackScope<'_> {
    type Target = CallbackAuthenticator;

    fn deref(&self) -> &Self::Target {
        self.slot
    }
}

impl DerefMut for CallbackScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.slot
    }
}

impl Drop for CallbackScope<'_> {
    fn drop(&mut self) {
        if let CallbackState::Armed(venue) = self.slot.state {
            warn!(%venue, "callback slot still armed at route exit; clearing");
        }
        self.slot.reset();
    }
}
