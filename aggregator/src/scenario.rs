// Scenario replay
// This file loads a YAML description of a ledger, its venues and a batch of
// route calls, and replays the calls through a CoreRouter
//
// Numan Thabit 2025 Nov

use alloy_primitives::{Address, U256};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{EngineConfig, ReservePolicy, DEFAULT_MAX_ROUTE_BYTES};
use crate::ledger::{AssetLedger, InMemoryLedger, NATIVE_ASSET};
use crate::router::{
    encode_route, CallContext, CoreRouter, ExecutionReport, RouteProcessed, RouteRequest, Step,
    VenueCall, FULL_SHARE,
};
use crate::venues::{
    AdapterRegistry, AdapterTag, CallbackPoolAdapter, CallbackPoolParams, ConstantProductAdapter,
    ConstantProductParams, ConstantProductPool, FixedRatePool, NativeWrapperAdapter, WrapMode,
    WrapParams, CALLBACK_POOL_TAG, CONSTANT_PRODUCT_TAG, NATIVE_WRAPPER_TAG,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub engine: Address,
    #[serde(default)]
    pub reserve_policy: ReservePolicy,
    pub max_route_bytes: Option<usize>,
    #[serde(default)]
    pub time: u64,
    #[serde(default)]
    pub balances: Vec<BalanceSpec>,
    #[serde(default)]
    pub allowances: Vec<AllowanceSpec>,
    #[serde(default)]
    pub transfer_fees: Vec<TransferFeeSpec>,
    #[serde(default)]
    pub native_rejecters: Vec<Address>,
    #[serde(default)]
    pub cpmm_pools: Vec<PoolSpec>,
    #[serde(default)]
    pub fixed_rate_pools: Vec<FixedRatePoolSpec>,
    pub wrapped_native: Option<Address>,
    pub routes: Vec<RouteCallSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceSpec {
    pub asset: Address,
    pub holder: Address,
    pub amount: U256,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AllowanceSpec {
    pub asset: Address,
    pub owner: Address,
    pub spender: Address,
    pub amount: U256,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferFeeSpec {
    pub asset: Address,
    pub bps: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolSpec {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixedRatePoolSpec {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub numerator: u64,
    pub denominator: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteCallSpec {
    pub name: String,
    pub caller: Address,
    #[serde(default)]
    pub value: U256,
    pub asset_in: Address,
    pub amount_in: U256,
    pub asset_out: Address,
    #[serde(default)]
    pub min_amount_out: U256,
    pub destination: Address,
    pub route: RouteSpec,
}

/// Either raw bytes or a structured step list encoded at run time; exactly
/// one must be given.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteSpec {
    pub hex: Option<String>,
    pub steps: Option<Vec<StepSpec>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum StepSpec {
    PullFromCaller { asset: Address, venues: Vec<VenueSpec> },
    UseEngineBalance { asset: Address, venues: Vec<VenueSpec> },
    UseSingleVenue { asset: Address, venue: VenueSpec },
    DistributeNative { venues: Vec<VenueSpec> },
    /// Signed at run time for the call's caller, input asset and the engine.
    ApplyPermit { value: U256, deadline: U256 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct VenueSpec {
    #[serde(default = "full_share")]
    pub weight: u16,
    pub venue: VenueKind,
}

fn full_share() -> u16 {
    FULL_SHARE
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VenueKind {
    Cpmm {
        pool: Address,
        zero_for_one: bool,
        destination: Address,
        #[serde(default)]
        fee: u32,
    },
    Clmm {
        pool: Address,
        zero_for_one: bool,
        destination: Address,
    },
    Wrap {
        destination: Address,
    },
    Unwrap {
        destination: Address,
    },
    /// Any registered tag with hex params.
    Raw { tag: String, params: String },
}

/// One line of replay output.
#[derive(Debug, Clone, Serialize)]
pub struct RouteOutcome {
    pub name: String,
    pub ok: bool,
    pub route: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_out: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<RouteProcessed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ExecutionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Scenario {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("invalid scenario")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            engine_address: self.engine,
            reserve_policy: self.reserve_policy,
            max_route_bytes: self.max_route_bytes.unwrap_or(DEFAULT_MAX_ROUTE_BYTES),
        }
    }

    pub fn build_ledger(&self) -> InMemoryLedger {
        let mut ledger = InMemoryLedger::new();
        ledger.set_time(self.time);
        for b in &self.balances {
            ledger.set_balance(b.asset, b.holder, b.amount);
        }
        for a in &self.allowances {
            ledger.approve(a.asset, a.owner, a.spender, a.amount);
        }
        for f in &self.transfer_fees {
            ledger.set_transfer_fee(f.asset, f.bps);
        }
        for r in &self.native_rejecters {
            ledger.reject_native(*r);
        }
        ledger
    }

    pub fn build_registry(&self) -> AdapterRegistry {
        let cpmm = self.cpmm_pools.iter().fold(ConstantProductAdapter::new(), |a, p| {
            a.with_pool(ConstantProductPool::new(p.address, p.token0, p.token1))
        });
        let clmm = self.fixed_rate_pools.iter().fold(CallbackPoolAdapter::new(), |a, p| {
            a.with_pool(Arc::new(FixedRatePool::new(
                p.address,
                p.token0,
                p.token1,
                p.numerator,
                p.denominator,
            )))
        });
        let mut registry = AdapterRegistry::new()
            .with_adapter(CONSTANT_PRODUCT_TAG, Arc::new(cpmm))
            .with_adapter(CALLBACK_POOL_TAG, Arc::new(clmm));
        if let Some(token) = self.wrapped_native {
            registry.register(NATIVE_WRAPPER_TAG, Arc::new(NativeWrapperAdapter::new(token)));
        }
        registry
    }

    /// Replays every route against one ledger, in order. Route failures are
    /// reported in the outcome; only malformed scenario input is an error.
    pub fn run(&self, engine: Option<EngineConfig>) -> Result<Vec<RouteOutcome>> {
        let config = engine.unwrap_or_else(|| self.engine_config());
        config.validate()?;
        let mut ledger = self.build_ledger();
        let mut router = CoreRouter::new(config, Arc::new(self.build_registry()));
        info!(routes = self.routes.len(), engine = %router.engine(), "replaying scenario");

        let mut outcomes = Vec::with_capacity(self.routes.len());
        for spec in &self.routes {
            let route = spec
                .route
                .to_bytes(&ledger, spec, router.engine())
                .with_context(|| format!("route {}", spec.name))?;
            let request = RouteRequest {
                asset_in: spec.asset_in,
                amount_in: spec.amount_in,
                asset_out: spec.asset_out,
                min_amount_out: spec.min_amount_out,
                destination: spec.destination,
                route,
            };
            let call = CallContext::new(spec.caller).with_value(spec.value);
            let route_hex = format!("0x{}", hex::encode(&request.route));
            debug!(name = %spec.name, route = %route_hex, "replaying route");

            let outcome = match router.process_route(&mut ledger, call, &request) {
                Ok(result) => RouteOutcome {
                    name: spec.name.clone(),
                    ok: true,
                    route: route_hex,
                    amount_out: Some(result.amount_out.to_string()),
                    event: Some(result.event),
                    report: Some(result.report),
                    error_kind: None,
                    error: None,
                },
                Err(err) => RouteOutcome {
                    name: spec.name.clone(),
                    ok: false,
                    route: route_hex,
                    amount_out: None,
                    event: None,
                    report: None,
                    error_kind: Some(err.kind()),
                    error: Some(err.to_string()),
                },
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}

impl RouteSpec {
    fn to_bytes(&self, ledger: &InMemoryLedger, call: &RouteCallSpec, engine: Address) -> Result<Vec<u8>> {
        match (&self.hex, &self.steps) {
            (Some(text), None) => {
                let text = text.strip_prefix("0x").unwrap_or(text);
                hex::decode(text).context("route is not valid hex")
            }
            (None, Some(specs)) => {
                let steps = specs
                    .iter()
                    .map(|s| s.to_step(ledger, call, engine))
                    .collect::<Result<Vec<_>>>()?;
                Ok(encode_route(&steps)?)
            }
            _ => bail!("route needs exactly one of `hex` or `steps`"),
        }
    }
}

impl StepSpec {
    fn to_step(&self, ledger: &InMemoryLedger, call: &RouteCallSpec, engine: Address) -> Result<Step> {
        Ok(match self {
            StepSpec::PullFromCaller { asset, venues: v } => Step::PullFromCaller {
                asset: *asset,
                venues: venue_calls(v)?,
            },
            StepSpec::UseEngineBalance { asset, venues: v } => Step::UseEngineBalance {
                asset: *asset,
                venues: venue_calls(v)?,
            },
            StepSpec::UseSingleVenue { asset, venue } => Step::UseSingleVenueWithEngineBalance {
                asset: *asset,
                venue: venue.to_call()?,
            },
            StepSpec::DistributeNative { venues: v } => Step::DistributeNative { venues: venue_calls(v)? },
            StepSpec::ApplyPermit { value, deadline } => {
                if call.asset_in == NATIVE_ASSET {
                    bail!("permit on the native asset");
                }
                Step::ApplyPermit(ledger.sign_permit(call.asset_in, call.caller, engine, *value, *deadline))
            }
        })
    }
}

fn venue_calls(specs: &[VenueSpec]) -> Result<Vec<VenueCall>> {
    specs.iter().map(VenueSpec::to_call).collect()
}

impl VenueSpec {
    fn to_call(&self) -> Result<VenueCall> {
        let (tag, params) = match &self.venue {
            VenueKind::Cpmm {
                pool,
                zero_for_one,
                destination,
                fee,
            } => (
                CONSTANT_PRODUCT_TAG,
                ConstantProductParams {
                    pool: *pool,
                    zero_for_one: *zero_for_one,
                    destination: *destination,
                    fee: *fee,
                }
                .encode(),
            ),
            VenueKind::Clmm {
                pool,
                zero_for_one,
                destination,
            } => (
                CALLBACK_POOL_TAG,
                CallbackPoolParams {
                    pool: *pool,
                    zero_for_one: *zero_for_one,
                    destination: *destination,
                }
                .encode(),
            ),
            VenueKind::Wrap { destination } => (
                NATIVE_WRAPPER_TAG,
                WrapParams {
                    mode: WrapMode::Wrap,
                    destination: *destination,
                }
                .encode(),
            ),
            VenueKind::Unwrap { destination } => (
                NATIVE_WRAPPER_TAG,
                WrapParams {
                    mode: WrapMode::Unwrap,
                    destination: *destination,
                }
                .encode(),
            ),
            VenueKind::Raw { tag, params } => {
                let tag_bytes = hex::decode(tag.strip_prefix("0x").unwrap_or(tag))
                    .context("venue tag is not valid hex")?;
                let tag = AdapterTag::from_slice(&tag_bytes)
                    .filter(|_| tag_bytes.len() == 4)
                    .context("venue tag must be 4 bytes")?;
                let params = hex::decode(params.strip_prefix("0x").unwrap_or(params))
                    .context("venue params are not valid hex")?;
                (tag, params)
            }
        };
        Ok(VenueCall::new(self.weight, tag, params))
    }
}
