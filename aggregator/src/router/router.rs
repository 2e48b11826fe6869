// Core router - the route processing entry point
// This file ties validation, decoding, execution and slippage enforcement
// together inside one ledger transaction
//
// Numan Thabit 2025 Nov

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::errors::RouteError;
use crate::ledger::AssetLedger;
use crate::metrics;
use crate::router::accounting::BalanceSnapshot;
use crate::router::callback::{CallbackAuthenticator, CallbackState};
use crate::router::decoder::decode_route;
use crate::router::execution::{ExecutionEnv, ExecutionReport, ExecutionStats, RouteExecutor};
use crate::router::routes::Step;
use crate::router::validation::validate_route_request;
use crate::venues::adapter::AdapterRegistry;

/// Who is calling and what native value rides along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub value: U256,
}

impl CallContext {
    pub fn new(caller: Address) -> Self {
        Self {
            caller,
            value: U256::ZERO,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequest {
    pub asset_in: Address,
    pub amount_in: U256,
    pub asset_out: Address,
    pub min_amount_out: U256,
    pub destination: Address,
    pub route: Vec<u8>,
}

/// Emitted once per successful route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteProcessed {
    pub caller: Address,
    pub destination: Address,
    pub asset_in: Address,
    pub asset_out: Address,
    pub amount_in: U256,
    pub min_amount_out: U256,
    pub amount_out: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub amount_out: U256,
    pub event: RouteProcessed,
    pub report: ExecutionReport,
}

/// Entry point for route execution. Owns the callback slot, so a router
/// processes one route at a time.
pub struct CoreRouter {
    config: EngineConfig,
    executor: RouteExecutor,
    callbacks: CallbackAuthenticator,
}

impl CoreRouter {
    pub fn new(config: EngineConfig, registry: Arc<AdapterRegistry>) -> Self {
        let executor = RouteExecutor::new(registry, config.engine_address, config.reserve_policy);
        Self {
            config,
            executor,
            callbacks: CallbackAuthenticator::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn engine(&self) -> Address {
        self.config.engine_address
    }

    pub fn executor(&self) -> &RouteExecutor {
        &self.executor
    }

    pub fn stats(&self) -> ExecutionStats {
        self.executor.get_stats()
    }

    pub fn callback_state(&self) -> CallbackState {
        self.callbacks.state()
    }

    /// Executes `request.route` for `call.caller`. Either every step succeeds
    /// and at least `min_amount_out` of `asset_out` reaches the destination, or
    /// the ledger is rolled back and nothing moves.
    #[tracing::instrument(
        skip_all,
        fields(
            caller = %call.caller,
            asset_in = %request.asset_in,
            asset_out = %request.asset_out,
            route_len = request.route.len()
        )
    )]
    pub fn process_route(
        &mut self,
        ledger: &mut dyn AssetLedger,
        call: CallContext,
        request: &RouteRequest,
    ) -> Result<ExecutionResult, RouteError> {
        let started = Instant::now();
        let outcome = self.process_inner(ledger, call, request);
        metrics::ROUTE_LATENCY.observe(started.elapsed().as_secs_f64());

        match &outcome {
            Ok(result) => {
                metrics::record_success();
                info!(
                    amount_in = %request.amount_in,
                    amount_out = %result.amount_out,
                    destination = %request.destination,
                    "route processed"
                );
            }
            Err(err) => {
                metrics::record_failure(err.kind());
                warn!(kind = err.kind(), error = %err, "route failed");
            }
        }
        outcome
    }

    fn process_inner(
        &mut self,
        ledger: &mut dyn AssetLedger,
        call: CallContext,
        request: &RouteRequest,
    ) -> Result<ExecutionResult, RouteError> {
        validate_route_request(&self.config, &call, request).into_result()?;
        let steps = decode_route(&request.route)?;

        let engine = self.config.engine_address;
        let env = ExecutionEnv {
            caller: call.caller,
            asset_in: request.asset_in,
            amount_in: request.amount_in,
        };

        ledger.begin();
        let executed = {
            let mut scope = self.callbacks.scope();
            Self::run_steps(&self.executor, ledger, &mut scope, engine, &call, &env, request, &steps)
        };
        self.executor.record_outcome(executed.is_ok());

        match executed {
            Ok((amount_out, report)) => {
                ledger.commit();
                let event = RouteProcessed {
                    caller: call.caller,
                    destination: request.destination,
                    asset_in: request.asset_in,
                    asset_out: request.asset_out,
                    amount_in: request.amount_in,
                    min_amount_out: request.min_amount_out,
                    amount_out,
                };
                Ok(ExecutionResult {
                    amount_out,
                    event,
                    report,
                })
            }
            Err(err) => {
                ledger.rollback();
                Err(err)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_steps(
        executor: &RouteExecutor,
        ledger: &mut dyn AssetLedger,
        callbacks: &mut CallbackAuthenticator,
        engine: Address,
        call: &CallContext,
        env: &ExecutionEnv,
        request: &RouteRequest,
        steps: &[Step],
    ) -> Result<(U256, ExecutionReport), RouteError> {
        if !call.value.is_zero() {
            ledger.transfer_native(call.caller, engine, call.value)?;
        }

        let destination = BalanceSnapshot::take(&*ledger, request.asset_out, request.destination);
        let report = executor.execute(&mut *ledger, callbacks, env, steps)?;
        let amount_out = destination.gained(&*ledger);

        if amount_out < request.min_amount_out {
            return Err(RouteError::SwapTokenOutAmountTooLow { actual: amount_out });
        }
        Ok((amount_out, report))
    }
}
