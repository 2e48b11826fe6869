// Test fixtures
// This file provides addresses, a pre-funded world with the bundled venues,
// and misbehaving adapters and pools for exercising the router's defenses
//
// Numan Thabit 2025 Nov

use alloy_primitives::{Address, I256, U256};
use std::sync::Arc;

use crate::codec::{put_address, put_u256, Cursor};
use crate::config::EngineConfig;
use crate::errors::RouteError;
use crate::ledger::{AssetLedger, InMemoryLedger, NATIVE_ASSET};
use crate::router::routes::VenueCall;
use crate::router::{CallContext, CoreRouter, ExecutionResult, RouteRequest};
use crate::venues::adapter::{
    AdapterRegistry, AdapterTag, OutputTarget, OwedAmounts, SwapContext, SwapHost, SwapRequest,
    VenueAdapter,
};
use crate::venues::amm::{
    ConstantProductAdapter, ConstantProductParams, ConstantProductPool, CONSTANT_PRODUCT_TAG,
};
use crate::venues::concentrated::{
    CallbackPoolAdapter, CallbackPoolParams, CallbackVenue, FixedRatePool, CALLBACK_POOL_TAG,
};
use crate::venues::native::{NativeWrapperAdapter, WrapMode, WrapParams, NATIVE_WRAPPER_TAG};

pub fn addr(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

pub fn engine() -> Address {
    addr(0xE1)
}
pub fn caller() -> Address {
    addr(0xCA)
}
pub fn destination() -> Address {
    addr(0xDE)
}
pub fn token_a() -> Address {
    addr(0x0A)
}
pub fn token_b() -> Address {
    addr(0x0B)
}
pub fn token_c() -> Address {
    addr(0x0C)
}
pub fn weth() -> Address {
    addr(0x77)
}

/// cpmm token_a/token_b, 1e6 each side.
pub fn pool_ab() -> Address {
    addr(0xA0)
}
/// cpmm token_b/token_c, 1e6 / 2e6.
pub fn pool_bc() -> Address {
    addr(0xB0)
}
/// cpmm weth/token_a, 1e6 each side.
pub fn pool_wa() -> Address {
    addr(0x70)
}
/// clmm fixed-rate token_a -> token_c at 2:1.
pub fn pool_ac() -> Address {
    addr(0xAC)
}

pub fn amount(value: u64) -> U256 {
    U256::from(value)
}

pub const ONE_TO_ONE_TAG: AdapterTag = AdapterTag::new(*b"1to1");
pub const MISREPORTING_TAG: AdapterTag = AdapterTag::new(*b"liar");

/// `venue:20 | asset_out:20 | recipient:20`
pub fn one_to_one_params(venue: Address, asset_out: Address, recipient: Address) -> Vec<u8> {
    let mut buf = Vec::with_capacity(60);
    put_address(&mut buf, venue);
    put_address(&mut buf, asset_out);
    put_address(&mut buf, recipient);
    buf
}

fn decode_one_to_one(params: &[u8]) -> Result<(Address, Address, Address), RouteError> {
    let mut cur = Cursor::new(params);
    let parsed = (cur.read_address()?, cur.read_address()?, cur.read_address()?);
    cur.finish()?;
    Ok(parsed)
}

/// Takes the input into `venue` and pays the same amount of `asset_out` from
/// the venue's own holdings.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneToOneAdapter;

impl VenueAdapter for OneToOneAdapter {
    fn name(&self) -> &'static str {
        "one_to_one"
    }

    fn output_target(&self, _asset_in: Address, params: &[u8]) -> Result<OutputTarget, RouteError> {
        let (_, asset, recipient) = decode_one_to_one(params)?;
        Ok(OutputTarget { asset, recipient })
    }

    fn execute_swap(
        &self,
        ctx: &mut SwapContext<'_>,
        request: &SwapRequest<'_>,
    ) -> Result<(), RouteError> {
        let (venue, asset_out, recipient) = decode_one_to_one(request.params)?;
        ctx.pay(request.asset_in, request.payer, venue, request.amount_in)?;
        ctx.ledger_mut()
            .transfer(asset_out, venue, recipient, request.amount_in)?;
        Ok(())
    }
}

/// Same params as [`OneToOneAdapter`] but pays the output back into the venue
/// itself while claiming the recipient gets it.
#[derive(Debug, Clone, Copy, Default)]
pub struct MisreportingAdapter;

impl VenueAdapter for MisreportingAdapter {
    fn name(&self) -> &'static str {
        "misreporting"
    }

    fn output_target(&self, asset_in: Address, params: &[u8]) -> Result<OutputTarget, RouteError> {
        OneToOneAdapter.output_target(asset_in, params)
    }

    fn execute_swap(
        &self,
        ctx: &mut SwapContext<'_>,
        request: &SwapRequest<'_>,
    ) -> Result<(), RouteError> {
        let (venue, _, _) = decode_one_to_one(request.params)?;
        ctx.pay(request.asset_in, request.payer, venue, request.amount_in)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RogueBehavior {
    /// Pays out and never calls back.
    SkipCallback,
    /// Calls back a second time after being paid.
    DoubleCallback,
    /// Calls back claiming to be someone else.
    SpoofSender(Address),
    /// Claims twice what the swap was sized at.
    Overclaim,
    /// Calls back with data naming another account as the payer.
    ForgePayer(Address),
}

/// Callback pool selling token_a for token_c 1:1 that misbehaves as told.
#[derive(Debug, Clone, Copy)]
pub struct RogueCallbackVenue {
    pub address: Address,
    pub behavior: RogueBehavior,
}

impl RogueCallbackVenue {
    pub fn new(address: Address, behavior: RogueBehavior) -> Self {
        Self { address, behavior }
    }
}

impl CallbackVenue for RogueCallbackVenue {
    fn address(&self) -> Address {
        self.address
    }

    fn token0(&self) -> Address {
        token_a()
    }

    fn token1(&self) -> Address {
        token_c()
    }

    fn swap(
        &self,
        host: &mut dyn SwapHost,
        recipient: Address,
        _zero_for_one: bool,
        amount_in: U256,
        data: &[u8],
    ) -> Result<(), RouteError> {
        host.ledger_mut()
            .transfer(token_c(), self.address, recipient, amount_in)?;

        let owed_in = I256::try_from(amount_in).unwrap_or(I256::MAX);
        let owed = |amount0: I256| OwedAmounts {
            amount0,
            amount1: -owed_in,
        };
        match self.behavior {
            RogueBehavior::SkipCallback => Ok(()),
            RogueBehavior::DoubleCallback => {
                host.swap_callback(self.address, CALLBACK_POOL_TAG, owed(owed_in), data)?;
                host.swap_callback(self.address, CALLBACK_POOL_TAG, owed(owed_in), data)
            }
            RogueBehavior::SpoofSender(sender) => {
                host.swap_callback(sender, CALLBACK_POOL_TAG, owed(owed_in), data)
            }
            RogueBehavior::Overclaim => {
                let doubled = owed_in.saturating_add(owed_in);
                host.swap_callback(self.address, CALLBACK_POOL_TAG, owed(doubled), data)
            }
            RogueBehavior::ForgePayer(payer) => {
                // asset | payer | cap naming someone else as payer
                let mut forged = Vec::with_capacity(72);
                put_address(&mut forged, token_a());
                put_address(&mut forged, payer);
                put_u256(&mut forged, U256::MAX);
                host.swap_callback(self.address, CALLBACK_POOL_TAG, owed(owed_in), &forged)
            }
        }
    }
}

pub fn rogue_pool(behavior: RogueBehavior) -> Address {
    match behavior {
        RogueBehavior::SkipCallback => addr(0xF1),
        RogueBehavior::DoubleCallback => addr(0xF2),
        RogueBehavior::SpoofSender(_) => addr(0xF3),
        RogueBehavior::Overclaim => addr(0xF4),
        RogueBehavior::ForgePayer(_) => addr(0xF5),
    }
}

/// Bystander with a standing token_a allowance to the engine.
pub fn bystander() -> Address {
    addr(0x99)
}

pub fn cpmm(weight: u16, pool: Address, zero_for_one: bool, recipient: Address, fee: u32) -> VenueCall {
    let params = ConstantProductParams {
        pool,
        zero_for_one,
        destination: recipient,
        fee,
    };
    VenueCall::new(weight, CONSTANT_PRODUCT_TAG, params.encode())
}

pub fn clmm(weight: u16, pool: Address, zero_for_one: bool, recipient: Address) -> VenueCall {
    let params = CallbackPoolParams {
        pool,
        zero_for_one,
        destination: recipient,
    };
    VenueCall::new(weight, CALLBACK_POOL_TAG, params.encode())
}

pub fn wrap(weight: u16, mode: WrapMode, recipient: Address) -> VenueCall {
    let params = WrapParams {
        mode,
        destination: recipient,
    };
    VenueCall::new(weight, NATIVE_WRAPPER_TAG, params.encode())
}

/// Registry with every bundled adapter plus the test adapters, the fixed-rate
/// pool and one rogue pool per behavior.
pub fn registry(spoofed: Address) -> AdapterRegistry {
    let cpmm = ConstantProductAdapter::new()
        .with_pool(ConstantProductPool::new(pool_ab(), token_a(), token_b()))
        .with_pool(ConstantProductPool::new(pool_bc(), token_b(), token_c()))
        .with_pool(ConstantProductPool::new(pool_wa(), weth(), token_a()));

    let mut clmm = CallbackPoolAdapter::new()
        .with_pool(Arc::new(FixedRatePool::new(pool_ac(), token_a(), token_c(), 2, 1)));
    for behavior in [
        RogueBehavior::SkipCallback,
        RogueBehavior::DoubleCallback,
        RogueBehavior::SpoofSender(spoofed),
        RogueBehavior::Overclaim,
        RogueBehavior::ForgePayer(bystander()),
    ] {
        clmm = clmm.with_pool(Arc::new(RogueCallbackVenue::new(rogue_pool(behavior), behavior)));
    }

    AdapterRegistry::new()
        .with_adapter(CONSTANT_PRODUCT_TAG, Arc::new(cpmm))
        .with_adapter(CALLBACK_POOL_TAG, Arc::new(clmm))
        .with_adapter(NATIVE_WRAPPER_TAG, Arc::new(NativeWrapperAdapter::new(weth())))
        .with_adapter(ONE_TO_ONE_TAG, Arc::new(OneToOneAdapter))
        .with_adapter(MISREPORTING_TAG, Arc::new(MisreportingAdapter))
}

/// A funded ledger and a router over [`registry`].
pub struct World {
    pub ledger: InMemoryLedger,
    pub router: CoreRouter,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::new(engine()))
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let mut ledger = InMemoryLedger::new();
        let liquidity = amount(1_000_000);

        ledger.set_balance(token_a(), pool_ab(), liquidity);
        ledger.set_balance(token_b(), pool_ab(), liquidity);
        ledger.set_balance(token_b(), pool_bc(), liquidity);
        ledger.set_balance(token_c(), pool_bc(), amount(2_000_000));
        ledger.set_balance(weth(), pool_wa(), liquidity);
        ledger.set_balance(token_a(), pool_wa(), liquidity);
        ledger.set_balance(token_a(), pool_ac(), liquidity);
        ledger.set_balance(token_c(), pool_ac(), liquidity);
        // unissued wrapped supply held by the token itself
        ledger.set_balance(weth(), weth(), liquidity);
        for behavior in [
            RogueBehavior::SkipCallback,
            RogueBehavior::DoubleCallback,
            RogueBehavior::SpoofSender(Address::ZERO),
            RogueBehavior::Overclaim,
            RogueBehavior::ForgePayer(Address::ZERO),
        ] {
            ledger.set_balance(token_c(), rogue_pool(behavior), liquidity);
        }

        let spoofed = addr(0x66);
        let router = CoreRouter::new(config, Arc::new(registry(spoofed)));
        Self { ledger, router }
    }

    /// Gives the caller `value` of `asset` and an unlimited allowance to the
    /// engine (native needs no allowance).
    pub fn fund_caller(&mut self, asset: Address, value: U256) {
        self.ledger
            .mint(asset, caller(), value)
            .expect("caller balance fits in 256 bits");
        if asset != NATIVE_ASSET {
            self.ledger.approve(asset, caller(), engine(), U256::MAX);
        }
    }

    pub fn request(
        &self,
        asset_in: Address,
        amount_in: U256,
        asset_out: Address,
        min_amount_out: U256,
        route: Vec<u8>,
    ) -> RouteRequest {
        RouteRequest {
            asset_in,
            amount_in,
            asset_out,
            min_amount_out,
            destination: destination(),
            route,
        }
    }

    pub fn process(&mut self, request: &RouteRequest) -> Result<ExecutionResult, RouteError> {
        self.process_with_value(request, U256::ZERO)
    }

    pub fn process_with_value(
        &mut self,
        request: &RouteRequest,
        value: U256,
    ) -> Result<ExecutionResult, RouteError> {
        let call = CallContext::new(caller()).with_value(value);
        self.router.process_route(&mut self.ledger, call, request)
    }

    pub fn balance(&self, asset: Address, holder: Address) -> U256 {
        self.ledger.balance_of(asset, holder)
    }
}
