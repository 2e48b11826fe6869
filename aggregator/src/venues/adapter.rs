// Venue adapter module
// This file defines the contract between the route executor and venue adapters,
// the registry that resolves adapter tags, and the context adapters run in
//
// Numan Thabit 2025 Nov

use alloy_primitives::{Address, I256, U256};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::RouteError;
use crate::ledger::{AssetLedger, NATIVE_ASSET};
use crate::router::callback::CallbackAuthenticator;

/// Four-byte invocation tag at the head of every venue payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AdapterTag(pub [u8; 4]);

impl AdapterTag {
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let tag: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
        Some(Self(tag))
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for AdapterTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for AdapterTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One venue invocation as seen by an adapter.
#[derive(Debug, Clone)]
pub struct SwapRequest<'p> {
    pub asset_in: Address,
    /// Whoever funds the swap: the caller (pulled via allowance) or the engine.
    pub payer: Address,
    pub amount_in: U256,
    /// Adapter-specific parameters, tag already stripped.
    pub params: &'p [u8],
}

/// Where a swap's output lands. The executor measures this balance before and
/// after the call instead of trusting anything the adapter reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputTarget {
    pub asset: Address,
    pub recipient: Address,
}

/// Signed balance changes a callback-style venue reports when it calls back.
/// Positive means the venue is owed that amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwedAmounts {
    pub amount0: I256,
    pub amount1: I256,
}

impl OwedAmounts {
    /// The positive side, if any.
    pub fn owed(&self) -> Option<U256> {
        if self.amount0.is_positive() {
            Some(self.amount0.unsigned_abs())
        } else if self.amount1.is_positive() {
            Some(self.amount1.unsigned_abs())
        } else {
            None
        }
    }
}

/// Who pays a callback-style venue, in what asset and up to how much. Fixed by
/// the adapter when it arms the slot and kept on the router's side of the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackTerms {
    pub asset: Address,
    pub payer: Address,
    pub max_amount: U256,
}

/// Integration for one family of trading venues.
pub trait VenueAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Asset and recipient that receive this call's output.
    fn output_target(&self, asset_in: Address, params: &[u8]) -> Result<OutputTarget, RouteError>;

    /// Runs one swap. Nothing returned here is trusted for accounting.
    fn execute_swap(
        &self,
        ctx: &mut SwapContext<'_>,
        request: &SwapRequest<'_>,
    ) -> Result<(), RouteError>;

    /// Pays a venue that called back mid-swap. Only reached after the sender
    /// has been authenticated against the armed callback slot. Payment must
    /// follow `terms`; `data` is whatever the venue chose to send back.
    fn settle_callback(
        &self,
        ctx: &mut SwapContext<'_>,
        sender: Address,
        terms: CallbackTerms,
        owed: OwedAmounts,
        data: &[u8],
    ) -> Result<(), RouteError> {
        let _ = (ctx, terms, owed, data);
        Err(RouteError::invalid_call_data(format!(
            "{} does not accept swap callbacks (sender {sender})",
            self.name()
        )))
    }
}

/// What a venue can reach of the router while it executes a swap.
pub trait SwapHost {
    fn ledger_mut(&mut self) -> &mut dyn AssetLedger;

    /// Reentrant entry point venues use to collect what they are owed.
    fn swap_callback(
        &mut self,
        sender: Address,
        tag: AdapterTag,
        owed: OwedAmounts,
        data: &[u8],
    ) -> Result<(), RouteError>;
}

/// Maps invocation tags to adapters.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<AdapterTag, Arc<dyn VenueAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tag: AdapterTag, adapter: Arc<dyn VenueAdapter>) {
        let name = adapter.name();
        if let Some(previous) = self.adapters.insert(tag, adapter) {
            warn!(%tag, previous = previous.name(), replacement = name, "adapter tag re-registered");
        }
    }

    pub fn with_adapter(mut self, tag: AdapterTag, adapter: Arc<dyn VenueAdapter>) -> Self {
        self.register(tag, adapter);
        self
    }

    pub fn resolve(&self, tag: AdapterTag) -> Result<&dyn VenueAdapter, RouteError> {
        self.adapters
            .get(&tag)
            .map(Arc::as_ref)
            .ok_or(RouteError::UnknownSelector(tag))
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self
            .adapters
            .iter()
            .map(|(tag, a)| (tag.to_string(), a.name()))
            .collect();
        entries.sort();
        f.debug_map().entries(entries).finish()
    }
}

/// Execution context for a single venue call: the ledger, the callback slot
/// and the registry used to dispatch reentrant callbacks.
pub struct SwapContext<'a> {
    ledger: &'a mut dyn AssetLedger,
    callbacks: &'a mut CallbackAuthenticator,
    registry: &'a AdapterRegistry,
    engine: Address,
    terms: Option<CallbackTerms>,
}

impl<'a> SwapContext<'a> {
    pub fn new(
        ledger: &'a mut dyn AssetLedger,
        callbacks: &'a mut CallbackAuthenticator,
        registry: &'a AdapterRegistry,
        engine: Address,
    ) -> Self {
        Self {
            ledger,
            callbacks,
            registry,
            engine,
            terms: None,
        }
    }

    /// The router's own address.
    pub fn engine(&self) -> Address {
        self.engine
    }

    pub fn ledger(&self) -> &dyn AssetLedger {
        &*self.ledger
    }

    /// Arms the callback slot for `venue` ahead of a callback-style swap. The
    /// authenticated callback is settled against `terms` and nothing else.
    pub fn arm_callback(&mut self, venue: Address, terms: CallbackTerms) -> Result<(), RouteError> {
        self.callbacks.arm(venue)?;
        self.terms = Some(terms);
        Ok(())
    }

    /// Moves swap input from `payer` to `to`: a plain transfer out of the
    /// engine's holdings, or an allowance pull from the caller.
    pub fn pay(
        &mut self,
        asset: Address,
        payer: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), RouteError> {
        if payer == self.engine {
            self.ledger.transfer(asset, self.engine, to, amount)?;
        } else if asset == NATIVE_ASSET {
            return Err(RouteError::invalid_call_data(
                "native input must be paid from the engine balance",
            ));
        } else {
            self.ledger
                .transfer_from(asset, self.engine, payer, to, amount)?;
        }
        Ok(())
    }
}

impl SwapHost for SwapContext<'_> {
    fn ledger_mut(&mut self) -> &mut dyn AssetLedger {
        &mut *self.ledger
    }

    fn swap_callback(
        &mut self,
        sender: Address,
        tag: AdapterTag,
        owed: OwedAmounts,
        data: &[u8],
    ) -> Result<(), RouteError> {
        self.callbacks.authenticate(sender)?;
        self.callbacks.consume();
        let terms = self
            .terms
            .take()
            .ok_or_else(|| RouteError::invalid_call_data("callback slot armed without settlement terms"))?;

        let registry = self.registry;
        let adapter = registry.resolve(tag)?;
        debug!(%sender, %tag, adapter = adapter.name(), payer = %terms.payer, "swap callback authenticated");
        adapter.settle_callback(self, sender, terms, owed, data)
    }
}
