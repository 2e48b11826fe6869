// AMM venue adapter module
// This file implements the adapter for constant-product pools whose reserves
// are the pool's own ledger balances
//
// Numan Thabit 2025 Nov

use alloy_primitives::{Address, U256};
use std::collections::HashMap;
use tracing::debug;

use crate::codec::{put_address, put_u24, Cursor};
use crate::errors::RouteError;
use crate::venues::adapter::{
    AdapterTag, OutputTarget, SwapContext, SwapHost, SwapRequest, VenueAdapter,
};

pub const CONSTANT_PRODUCT_TAG: AdapterTag = AdapterTag::new(*b"cpmm");

/// Fee denominator: fees are expressed in millionths.
pub const FEE_DENOMINATOR: u32 = 1_000_000;

/// A two-asset pool. Reserves are read from the ledger at swap time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantProductPool {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
}

impl ConstantProductPool {
    pub fn new(address: Address, token0: Address, token1: Address) -> Self {
        Self {
            address,
            token0,
            token1,
        }
    }

    /// `(token_in, token_out)` for a direction byte; 0 sells token0.
    pub fn tokens(&self, zero_for_one: bool) -> (Address, Address) {
        if zero_for_one {
            (self.token0, self.token1)
        } else {
            (self.token1, self.token0)
        }
    }
}

/// Packed adapter parameters: `pool:20 | direction:1 | destination:20 | fee:3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantProductParams {
    pub pool: Address,
    pub zero_for_one: bool,
    pub destination: Address,
    pub fee: u32,
}

impl ConstantProductParams {
    pub const LEN: usize = 20 + 1 + 20 + 3;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::LEN);
        put_address(&mut buf, self.pool);
        buf.push(if self.zero_for_one { 0 } else { 1 });
        put_address(&mut buf, self.destination);
        put_u24(&mut buf, self.fee);
        buf
    }

    pub fn decode(params: &[u8]) -> Result<Self, RouteError> {
        if params.len() != Self::LEN {
            return Err(RouteError::invalid_call_data(format!(
                "cpmm params must be {} bytes, got {}",
                Self::LEN,
                params.len()
            )));
        }
        let mut cur = Cursor::new(params);
        let pool = cur.read_address()?;
        let direction = cur.read_u8()?;
        let destination = cur.read_address()?;
        let fee = cur.read_u24()?;
        cur.finish()?;

        if pool == Address::ZERO || destination == Address::ZERO {
            return Err(RouteError::invalid_call_data("cpmm pool and destination must be set"));
        }
        if direction > 1 {
            return Err(RouteError::invalid_call_data(format!(
                "cpmm direction must be 0 or 1, got {direction}"
            )));
        }
        if fee >= FEE_DENOMINATOR {
            return Err(RouteError::invalid_call_data(format!("cpmm fee {fee} out of range")));
        }
        Ok(Self {
            pool,
            zero_for_one: direction == 0,
            destination,
            fee,
        })
    }
}

/// `x * y = k` output for `amount_in` after the fee. `None` on overflow.
pub fn get_amount_out(
    amount_in: U256,
    reserve_in: U256,
    reserve_out: U256,
    fee: u32,
) -> Option<U256> {
    let amount_in_with_fee = amount_in.checked_mul(U256::from(FEE_DENOMINATOR - fee))?;
    let numerator = amount_in_with_fee.checked_mul(reserve_out)?;
    let denominator = reserve_in
        .checked_mul(U256::from(FEE_DENOMINATOR))?
        .checked_add(amount_in_with_fee)?;
    numerator.checked_div(denominator)
}

/// Adapter over a set of known constant-product pools.
#[derive(Debug, Clone, Default)]
pub struct ConstantProductAdapter {
    pools: HashMap<Address, ConstantProductPool>,
}

impl ConstantProductAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool(mut self, pool: ConstantProductPool) -> Self {
        self.pools.insert(pool.address, pool);
        self
    }

    fn pool_for(
        &self,
        asset_in: Address,
        params: &ConstantProductParams,
    ) -> Result<(ConstantProductPool, Address), RouteError> {
        let pool = self
            .pools
            .get(&params.pool)
            .copied()
            .ok_or_else(|| RouteError::invalid_call_data(format!("unknown cpmm pool {}", params.pool)))?;
        let (token_in, token_out) = pool.tokens(params.zero_for_one);
        if token_in != asset_in {
            return Err(RouteError::invalid_call_data(format!(
                "pool {} sells {token_in}, step supplies {asset_in}",
                pool.address
            )));
        }
        Ok((pool, token_out))
    }
}

impl VenueAdapter for ConstantProductAdapter {
    fn name(&self) -> &'static str {
        "cpmm"
    }

    fn output_target(&self, asset_in: Address, params: &[u8]) -> Result<OutputTarget, RouteError> {
        let params = ConstantProductParams::decode(params)?;
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
        let params = ConstantProductParams::decode(request.params)?;
        let (pool, token_out) = self.pool_for(request.asset_in, &params)?;

        let reserve_in = ctx.ledger().balance_of(request.asset_in, pool.address);
        let reserve_out = ctx.ledger().balance_of(token_out, pool.address);
        if reserve_in.is_zero() || reserve_out.is_zero() {
            return Err(RouteError::WrongPoolReserves { pool: pool.address });
        }

        ctx.pay(request.asset_in, request.payer, pool.address, request.amount_in)?;
        // what the pool actually received, net of any transfer fee
        let received = ctx
            .ledger()
            .balance_of(request.asset_in, pool.address)
            .saturating_sub(reserve_in);
        if received.is_zero() {
            return Err(RouteError::VenueRejected {
                venue: pool.address,
                reason: "insufficient input amount".to_string(),
            });
        }

        let amount_out = get_amount_out(received, reserve_in, reserve_out, params.fee)
            .ok_or(RouteError::WrongPoolReserves { pool: pool.address })?;
        if amount_out.is_zero() {
            return Err(RouteError::VenueRejected {
                venue: pool.address,
                reason: "insufficient output amount".to_string(),
            });
        }

        ctx.ledger_mut()
            .transfer(token_out, pool.address, params.destination, amount_out)?;
        debug!(
            pool = %pool.address,
            %received,
            %amount_out,
            destination = %params.destination,
            "cpmm swap"
        );
        Ok(())
    }
}
