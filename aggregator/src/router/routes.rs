// Route types
// This file defines the decoded form of a route: command codes, steps and the
// venue calls each step splits its input across
//
// Numan Thabit 2025 Nov

use alloy_primitives::Address;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::ledger::Permit;
use crate::venues::adapter::AdapterTag;

/// Weight denominator. A venue weighted `FULL_SHARE` takes the whole
/// remaining input of its step.
pub const FULL_SHARE: u16 = 0xFFFF;

/// Leading byte of every step on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandCode {
    UseEngineBalance = 0x01,
    PullFromCaller = 0x02,
    DistributeNative = 0x03,
    UseSingleVenueWithEngineBalance = 0x04,
    ApplyPermit = 0x06,
}

impl CommandCode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::UseEngineBalance),
            0x02 => Some(Self::PullFromCaller),
            0x03 => Some(Self::DistributeNative),
            0x04 => Some(Self::UseSingleVenueWithEngineBalance),
            0x06 => Some(Self::ApplyPermit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UseEngineBalance => "use_engine_balance",
            Self::PullFromCaller => "pull_from_caller",
            Self::DistributeNative => "distribute_native",
            Self::UseSingleVenueWithEngineBalance => "use_single_venue",
            Self::ApplyPermit => "apply_permit",
        }
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CommandCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One adapter invocation inside a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueCall {
    pub share_weight: u16,
    pub tag: AdapterTag,
    /// Opaque to the engine; interpreted by the adapter behind `tag`.
    pub params: Vec<u8>,
}

impl VenueCall {
    pub fn new(share_weight: u16, tag: AdapterTag, params: Vec<u8>) -> Self {
        Self {
            share_weight,
            tag,
            params,
        }
    }

    /// A call that takes the whole step input.
    pub fn full(tag: AdapterTag, params: Vec<u8>) -> Self {
        Self::new(FULL_SHARE, tag, params)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Funds pulled from the caller via allowance.
    PullFromCaller { asset: Address, venues: Vec<VenueCall> },
    /// Funds taken from the engine's current holdings of `asset`.
    UseEngineBalance { asset: Address, venues: Vec<VenueCall> },
    /// All of the engine's holdings of `asset` into one venue; the tail of a
    /// multi-hop chain.
    UseSingleVenueWithEngineBalance { asset: Address, venue: VenueCall },
    /// The caller's attached native value, split across venues.
    DistributeNative { venues: Vec<VenueCall> },
    /// Pre-authorization for the route's input asset.
    ApplyPermit(Permit),
}

impl Step {
    pub fn command(&self) -> CommandCode {
        match self {
            Step::PullFromCaller { .. } => CommandCode::PullFromCaller,
            Step::UseEngineBalance { .. } => CommandCode::UseEngineBalance,
            Step::UseSingleVenueWithEngineBalance { .. } => {
                CommandCode::UseSingleVenueWithEngineBalance
            }
            Step::DistributeNative { .. } => CommandCode::DistributeNative,
            Step::ApplyPermit(_) => CommandCode::ApplyPermit,
        }
    }

    pub fn venue_count(&self) -> usize {
        match self {
            Step::PullFromCaller { venues, .. }
            | Step::UseEngineBalance { venues, .. }
            | Step::DistributeNative { venues } => venues.len(),
            Step::UseSingleVenueWithEngineBalance { .. } => 1,
            Step::ApplyPermit(_) => 0,
        }
    }
}
