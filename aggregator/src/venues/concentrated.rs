// Callback pool adapter module
// This file implements the adapter for venues that pay out first and then call
// back into the router to collect what they are owed
//
// Numan Thabit 2025 Nov

use alloy_primitives::{Address, I256, U256};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::codec::{put_address, Cursor};
use crate::errors::RouteError;
use crate::venues::adapter::{
    AdapterTag, CallbackTerms, OutputTarget, OwedAmounts, SwapContext, SwapHost, SwapRequest,
    VenueAdapter,
};

pub const CALLBACK_POOL_TAG: AdapterTag = AdapterTag::new(*b"clmm");

/// A venue that settles by calling back into its host mid-swap.
pub trait CallbackVenue: Send + Sync {
    fn address(&self) -> Address;

    fn token0(&self) -> Address;

    fn token1(&self) -> Address;

    /// Sends output to `recipient`, then invokes `host.swap_callback` with
    /// the signed deltas and `data` passed through.
    fn swap(
        &self,
        host: &mut dyn SwapHost,
        recipient: Address,
        zero_for_one: bool,
        amount_in: U256,
        data: &[u8],
    ) -> Result<(), RouteError>;
}

/// Pool quoting a fixed `numerator / denominator` price of token1 per token0.
#[derive(Debug, Clone)]
pub struct FixedRatePool {
    address: Address,
    token0: Address,
    token1: Address,
    numerator: U256,
    denominator: U256,
    callback_tag: AdapterTag,
}

impl FixedRatePool {
    pub fn new(address: Address, token0: Address, token1: Address, numerator: u64, denominator: u64) -> Self {
        Self {
            address,
            token0,
            token1,
            numerator: U256::from(numerator),
            denominator: U256::from(denominator),
            callback_tag: CALLBACK_POOL_TAG,
        }
    }

    /// Registration tag of the adapter this pool calls back through.
    pub fn with_callback_tag(mut self, tag: AdapterTag) -> Self {
        self.callback_tag = tag;
        self
    }

    pub fn quote(&self, zero_for_one: bool, amount_in: U256) -> Option<U256> {
        let (num, den) = if zero_for_one {
            (self.numerator, self.denominator)
        } else {
            (self.denominator, self.numerator)
        };
        amount_in.checked_mul(num)?.checked_div(den)
    }
}

impl CallbackVenue for FixedRatePool {
    fn address(&self) -> Address {
        self.address
    }

    fn token0(&self) -> Address {
        self.token0
    }

    fn token1(&self) -> Address {
        self.token1
    }

    fn swap(
        &self,
        host: &mut dyn SwapHost,
        recipient: Address,
        zero_for_one: bool,
        amount_in: U256,
        data: &[u8],
    ) -> Result<(), RouteError> {
        let (token_in, token_out) = if zero_for_one {
            (self.token0, self.token1)
        } else {
            (self.token1, self.token0)
        };
        let amount_out = self
            .quote(zero_for_one, amount_in)
            .ok_or(RouteError::WrongPoolReserves { pool: self.address })?;
        if amount_out > host.ledger_mut().balance_of(token_out, self.address) {
            return Err(RouteError::WrongPoolReserves { pool: self.address });
        }

        host.ledger_mut()
            .transfer(token_out, self.address, recipient, amount_out)?;

        let paid_before = host.ledger_mut().balance_of(token_in, self.address);
        let owed_in = signed(amount_in)?;
        let sent_out = -signed(amount_out)?;
        let owed = if zero_for_one {
            OwedAmounts {
                amount0: owed_in,
                amount1: sent_out,
            }
        } else {
            OwedAmounts {
                amount0: sent_out,
                amount1: owed_in,
            }
        };
        host.swap_callback(self.address, self.callback_tag, owed, data)?;

        let paid = host
            .ledger_mut()
            .balance_of(token_in, self.address)
            .saturating_sub(paid_before);
        if paid < amount_in {
            return Err(RouteError::VenueRejected {
                venue: self.address,
                reason: format!("callback paid {paid}, owed {amount_in}"),
            });
        }
        Ok(())
    }
}

fn signed(amount: U256) -> Result<I256, RouteError> {
    I256::try_from(amount).map_err(|_| RouteError::invalid_call_data("amount exceeds signed range"))
}

/// Packed adapter parameters: `pool:20 | direction:1 | destination:20`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackPoolParams {
    pub pool: Address,
    pub zero_for_one: bool,
    pub destination: Address,
}

impl CallbackPoolParams {
    pub const LEN: usize = 20 + 1 + 20;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::LEN);
        put_address(&mut buf, self.pool);
        buf.push(if self.zero_for_one { 0 } else { 1 });
        put_address(&mut buf, self.destination);
        buf
    }

    pub fn decode(params: &[u8]) -> Result<Self, RouteError> {
        if params.len() != Self::LEN {
            return Err(RouteError::invalid_call_data(format!(
                "clmm params must be {} bytes, got {}",
                Self::LEN,
                params.len()
            )));
        }
        let mut cur = Cursor::new(params);
        let pool = cur.read_address()?;
        let direction = cur.read_u8()?;
        let destination = cur.read_address()?;
        if pool == Address::ZERO || destination == Address::ZERO || direction > 1 {
            return Err(RouteError::invalid_call_data("malformed clmm params"));
        }
        Ok(Self {
            pool,
            zero_for_one: direction == 0,
            destination,
        })
    }
}

/// Adapter over callback-settled pools.
#[derive(Clone, Default)]
pub struct CallbackPoolAdapter {
    pools: HashMap<Address, Arc<dyn CallbackVenue>>,
}

impl CallbackPoolAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool(mut self, pool: Arc<dyn CallbackVenue>) -> Self {
        self.pools.insert(pool.address(), pool);
        self
    }

    fn pool_for(
        &self,
        asset_in: Address,
        params: &CallbackPoolParams,
    ) -> Result<(&dyn CallbackVenue, Address), RouteError> {
        let pool = self
            .pools
            .get(&params.pool)
            .ok_or_else(|| RouteError::invalid_call_data(format!("unknown clmm pool {}", params.pool)))?;
        let (token_in, token_out) = if params.zero_for_one {
            (pool.token0(), pool.token1())
        } else {
            (pool.token1(), pool.token0())
        };
        if token_in != asset_in {
            return Err(RouteError::invalid_call_data(format!(
                "pool {} sells {token_in}, step supplies {asset_in}",
                params.pool
            )));
        }
        Ok((pool.as_ref(), token_out))
    }
}

impl fmt::Debug for CallbackPoolAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackPoolAdapter")
            .field("pools", &self.pools.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl VenueAdapter for CallbackPoolAdapter {
    fn name(&self) -> &'static str {
        "clmm"
    }

    fn output_target(&self, asset_in: Address, params: &[u8]) -> Result<OutputTarget, RouteError> {
        let params = CallbackPoolParams::decode(params)?;
        let (_, token_out) = self.pool_for(asset_in, &params)?;
        Ok(OutputTarget {
            asset: token_out,
            recipient: params.destination,
        })
    }

    fn execute_swap(
        &self,
        ctx: &mut SwapContext<'_>,
        request: &SwapRequest<'_>,
    ) -> Result<(), RouteError> {
        let params = CallbackPoolParams::decode(request.params)?;
        let (pool, _) = self.pool_for(request.asset_in, &params)?;
        let terms = CallbackTerms {
            asset: request.asset_in,
            payer: request.payer,
            max_amount: request.amount_in,
        };

        ctx.arm_callback(pool.address(), terms)?;
        pool.swap(ctx, params.destination, params.zero_for_one, request.amount_in, &[])
    }

    // the venue's `data` carries nothing settlement depends on
    fn settle_callback(
        &self,
        ctx: &mut SwapContext<'_>,
        sender: Address,
        terms: CallbackTerms,
        owed: OwedAmounts,
        _data: &[u8],
    ) -> Result<(), RouteError> {
        let amount = owed
            .owed()
            .ok_or_else(|| RouteError::invalid_call_data("callback reports nothing owed"))?;
        if amount > terms.max_amount {
            return Err(RouteError::invalid_call_data(format!(
                "pool {sender} claims {amount}, swap was sized {}",
                terms.max_amount
            )));
        }
        debug!(pool = %sender, %amount, payer = %terms.payer, "settling callback");
        ctx.pay(terms.asset, terms.payer, sender, amount)
    }
}
