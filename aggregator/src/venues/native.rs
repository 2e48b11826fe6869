// Native wrapper adapter module
// This file implements wrapping and unwrapping of the native asset through a
// wrapped-token contract that backs its supply one to one
//
// Numan Thabit 2025 Nov

use alloy_primitives::Address;
use tracing::debug;

use crate::codec::{put_address, Cursor};
use crate::errors::RouteError;
use crate::ledger::NATIVE_ASSET;
use crate::venues::adapter::{
    AdapterTag, OutputTarget, SwapContext, SwapHost, SwapRequest, VenueAdapter,
};

pub const NATIVE_WRAPPER_TAG: AdapterTag = AdapterTag::new(*b"wrap");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    Wrap,
    Unwrap,
}

/// Packed adapter parameters: `mode:1 | destination:20`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapParams {
    pub mode: WrapMode,
    pub destination: Address,
}

impl WrapParams {
    pub const LEN: usize = 1 + 20;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::LEN);
        buf.push(match self.mode {
            WrapMode::Wrap => 0,
            WrapMode::Unwrap => 1,
        });
        put_address(&mut buf, self.destination);
        buf
    }

    pub fn decode(params: &[u8]) -> Result<Self, RouteError> {
        if params.len() != Self::LEN {
            return Err(RouteError::invalid_call_data(format!(
                "wrap params must be {} bytes, got {}",
                Self::LEN,
                params.len()
            )));
        }
        let mut cur = Cursor::new(params);
        let mode = match cur.read_u8()? {
            0 => WrapMode::Wrap,
            1 => WrapMode::Unwrap,
            other => {
                return Err(RouteError::invalid_call_data(format!("unknown wrap mode {other}")))
            }
        };
        let destination = cur.read_address()?;
        if destination == Address::ZERO {
            return Err(RouteError::invalid_call_data("wrap destination must be set"));
        }
        Ok(Self { mode, destination })
    }
}

/// The wrapped-native token. Its own address is both the token id and the
/// holder of the native backing and the unissued wrapped supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrappedNative {
    pub token: Address,
}

#[derive(Debug, Clone, Copy)]
pub struct NativeWrapperAdapter {
    wrapped: WrappedNative,
}

impl NativeWrapperAdapter {
    pub fn new(token: Address) -> Self {
        Self {
            wrapped: WrappedNative { token },
        }
    }

    pub fn wrapped_token(&self) -> Address {
        self.wrapped.token
    }

    fn check_input(&self, asset_in: Address, mode: WrapMode) -> Result<(), RouteError> {
        let expected = match mode {
            WrapMode::Wrap => NATIVE_ASSET,
            WrapMode::Unwrap => self.wrapped.token,
        };
        if asset_in != expected {
            return Err(RouteError::invalid_call_data(format!(
                "{mode:?} expects {expected}, step supplies {asset_in}"
            )));
        }
        Ok(())
    }
}

impl VenueAdapter for NativeWrapperAdapter {
    fn name(&self) -> &'static str {
        "wrap"
    }

    fn output_target(&self, asset_in: Address, params: &[u8]) -> Result<OutputTarget, RouteError> {
        let params = WrapParams::decode(params)?;
        self.check_input(asset_in, params.mode)?;
        let asset = match params.mode {
            WrapMode::Wrap => self.wrapped.token,
            WrapMode::Unwrap => NATIVE_ASSET,
        };
        Ok(OutputTarget {
            asset,
            recipient: params.destination,
        })
    }

    fn execute_swap(
        &self,
        ctx: &mut SwapContext<'_>,
        request: &SwapRequest<'_>,
    ) -> Result<(), RouteError> {
        let params = WrapParams::decode(request.params)?;
        self.check_input(request.asset_in, params.mode)?;
        let token = self.wrapped.token;

        let asset_out = match params.mode {
            WrapMode::Wrap => token,
            WrapMode::Unwrap => NATIVE_ASSET,
        };
        let before = ctx.ledger().balance_of(request.asset_in, token);
        ctx.pay(request.asset_in, request.payer, token, request.amount_in)?;
        let received = ctx
            .ledger()
            .balance_of(request.asset_in, token)
            .saturating_sub(before);
        if received > ctx.ledger().balance_of(asset_out, token) {
            return Err(RouteError::WrongPoolReserves { pool: token });
        }
        ctx.ledger_mut()
            .transfer(asset_out, token, params.destination, received)?;
        debug!(mode = ?params.mode, %received, destination = %params.destination, "native wrapper");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AssetLedger, InMemoryLedger};
    use crate::router::callback::CallbackAuthenticator;
    use crate::venues::adapter::AdapterRegistry;
    use alloy_primitives::U256;

    fn weth() -> Address {
        Address::repeat_byte(0x77)
    }
    fn engine() -> Address {
        Address::repeat_byte(0xE1)
    }

    fn run(ledger: &mut InMemoryLedger, asset_in: Address, mode: WrapMode, dest: Address, amount: u64) -> Result<(), RouteError> {
        let adapter = NativeWrapperAdapter::new(weth());
        let registry = AdapterRegistry::new();
        let mut slot = CallbackAuthenticator::new();
        let params = WrapParams { mode, destination: dest }.encode();
        let mut ctx = SwapContext::new(ledger, &mut slot, &registry, engine());
        adapter.execute_swap(
            &mut ctx,
            &SwapRequest {
                asset_in,
                payer: engine(),
                amount_in: U256::from(amount),
                params: &params,
            },
        )
    }

    #[test]
    fn wrap_and_unwrap_are_one_to_one() {
        let mut ledger = InMemoryLedger::new();
        ledger.set_balance(NATIVE_ASSET, engine(), U256::from(50u64));
        ledger.set_balance(weth(), weth(), U256::from(1_000u64));

        run(&mut ledger, NATIVE_ASSET, WrapMode::Wrap, engine(), 50).unwrap();
        assert_eq!(ledger.balance_of(weth(), engine()), U256::from(50u64));
        assert_eq!(ledger.balance_of(NATIVE_ASSET, weth()), U256::from(50u64));

        run(&mut ledger, weth(), WrapMode::Unwrap, engine(), 20).unwrap();
        assert_eq!(ledger.balance_of(NATIVE_ASSET, engine()), U256::from(20u64));
        assert_eq!(ledger.balance_of(weth(), engine()), U256::from(30u64));
    }

    #[test]
    fn unwrap_to_rejecting_recipient_fails() {
        let mut ledger = InMemoryLedger::new();
        ledger.set_balance(weth(), engine(), U256::from(10u64));
        ledger.set_balance(NATIVE_ASSET, weth(), U256::from(10u64));
        let refuser = Address::repeat_byte(0x0F);
        ledger.reject_native(refuser);

        let err = run(&mut ledger, weth(), WrapMode::Unwrap, refuser, 10).unwrap_err();
        assert_eq!(err.kind(), "ledger");
    }

    #[test]
    fn mode_must_match_input_asset() {
        let params = WrapParams {
            mode: WrapMode::Unwrap,
            destination: engine(),
        }
        .encode();
        let adapter = NativeWrapperAdapter::new(weth());
        assert!(adapter.output_target(NATIVE_ASSET, &params).is_err());
        assert!(WrapParams::decode(&[2; 21]).is_err());
    }
}
