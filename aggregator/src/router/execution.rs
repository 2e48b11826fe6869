// Route executor - runs decoded steps against venue adapters
// This file implements the command dispatcher: it sizes each step's input,
// splits it across venues, invokes adapters and measures what they deliver
//
// Numan Thabit 2025 Nov

use alloy_primitives::{Address, U256};
use serde::Serialize;
use std::slice;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::config::ReservePolicy;
use crate::errors::RouteError;
use crate::ledger::{AssetLedger, NATIVE_ASSET};
use crate::metrics::VENUE_CALLS;
use crate::router::accounting::{BalanceSnapshot, SpendTracker};
use crate::router::callback::CallbackAuthenticator;
use crate::router::routes::{CommandCode, Step, VenueCall};
use crate::router::shares::split_amount;
use crate::venues::adapter::{AdapterRegistry, AdapterTag, SwapContext, SwapRequest};

/// Execution statistics for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionStats {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    pub venue_calls: u64,
    pub skipped_allocations: u64,
    pub success_rate: f64,
}

/// Who is routing what, as seen by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionEnv {
    pub caller: Address,
    pub asset_in: Address,
    /// Declared input; caps caller-funded steps.
    pub amount_in: U256,
}

/// One adapter invocation and what it was measured to deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VenueFill {
    pub adapter: &'static str,
    pub tag: AdapterTag,
    pub amount_in: U256,
    pub output_asset: Address,
    pub recipient: Address,
    pub amount_out: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub command: CommandCode,
    pub asset: Address,
    pub total_in: U256,
    pub fills: Vec<VenueFill>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub steps: Vec<StepReport>,
    /// Caller-funded input charged against the declared amount.
    pub spent: U256,
}

/// Dispatches decoded steps. Holds no per-route state; everything a route
/// mutates lives in the ledger and the callback slot handed in.
pub struct RouteExecutor {
    registry: Arc<AdapterRegistry>,
    engine: Address,
    reserve_policy: ReservePolicy,
    total_executions: AtomicU64,
    successful_executions: AtomicU64,
    failed_executions: AtomicU64,
    venue_calls: AtomicU64,
    skipped_allocations: AtomicU64,
}

impl RouteExecutor {
    pub fn new(registry: Arc<AdapterRegistry>, engine: Address, reserve_policy: ReservePolicy) -> Self {
        Self {
            registry,
            engine,
            reserve_policy,
            total_executions: AtomicU64::new(0),
            successful_executions: AtomicU64::new(0),
            failed_executions: AtomicU64::new(0),
            venue_calls: AtomicU64::new(0),
            skipped_allocations: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn engine(&self) -> Address {
        self.engine
    }

    /// Get execution statistics
    pub fn get_stats(&self) -> ExecutionStats {
        let total = self.total_executions.load(Ordering::Relaxed);
        let successful = self.successful_executions.load(Ordering::Relaxed);
        ExecutionStats {
            total_executions: total,
            successful_executions: successful,
            failed_executions: self.failed_executions.load(Ordering::Relaxed),
            venue_calls: self.venue_calls.load(Ordering::Relaxed),
            skipped_allocations: self.skipped_allocations.load(Ordering::Relaxed),
            success_rate: if total > 0 {
                successful as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    /// Counts one finished route. Called once the whole route, slippage check
    /// included, has succeeded or failed.
    pub fn record_outcome(&self, succeeded: bool) {
        self.total_executions.fetch_add(1, Ordering::Relaxed);
        if succeeded {
            self.successful_executions.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_executions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Runs `steps` in order. The first failing step aborts the rest; undoing
    /// earlier steps is the caller's job (ledger rollback).
    pub fn execute(
        &self,
        ledger: &mut dyn AssetLedger,
        callbacks: &mut CallbackAuthenticator,
        env: &ExecutionEnv,
        steps: &[Step],
    ) -> Result<ExecutionReport, RouteError> {
        let mut tracker = SpendTracker::new(env.asset_in, env.amount_in);
        let mut report = ExecutionReport::default();

        for (index, step) in steps.iter().enumerate() {
            match self.execute_step(ledger, callbacks, env, &mut tracker, index, step) {
                Ok(step_report) => report.steps.push(step_report),
                Err(err) => {
                    debug!(index, command = %step.command(), error = %err, "step failed");
                    return Err(err);
                }
            }
        }

        report.spent = tracker.spent();
        Ok(report)
    }

    fn execute_step(
        &self,
        ledger: &mut dyn AssetLedger,
        callbacks: &mut CallbackAuthenticator,
        env: &ExecutionEnv,
        tracker: &mut SpendTracker,
        index: usize,
        step: &Step,
    ) -> Result<StepReport, RouteError> {
        let (asset, total_in, payer, venues): (Address, U256, Address, &[VenueCall]) = match step {
            Step::ApplyPermit(permit) => {
                ledger.permit(env.asset_in, env.caller, self.engine, permit)?;
                debug!(index, owner = %env.caller, value = %permit.value, "permit applied");
                return Ok(StepReport {
                    index,
                    command: CommandCode::ApplyPermit,
                    asset: env.asset_in,
                    total_in: U256::ZERO,
                    fills: Vec::new(),
                });
            }
            Step::PullFromCaller { asset, venues } => {
                tracker.charge(*asset, env.amount_in)?;
                (*asset, env.amount_in, env.caller, venues.as_slice())
            }
            Step::DistributeNative { venues } => {
                tracker.charge(NATIVE_ASSET, env.amount_in)?;
                (NATIVE_ASSET, env.amount_in, self.engine, venues.as_slice())
            }
            Step::UseEngineBalance { asset, venues } => {
                let total = self.engine_drawable(ledger, *asset);
                (*asset, total, self.engine, venues.as_slice())
            }
            Step::UseSingleVenueWithEngineBalance { asset, venue } => {
                let total = self.engine_drawable(ledger, *asset);
                (*asset, total, self.engine, slice::from_ref(venue))
            }
        };

        debug!(
            index,
            command = %step.command(),
            %asset,
            total_in = %total_in,
            venues = venues.len(),
            "executing step"
        );

        let weights: Vec<u16> = venues.iter().map(|v| v.share_weight).collect();
        let allocations = split_amount(total_in, &weights);
        let mut fills = Vec::with_capacity(venues.len());

        for (venue, amount) in venues.iter().zip(allocations) {
            if amount.is_zero() {
                self.skipped_allocations.fetch_add(1, Ordering::Relaxed);
                trace!(index, tag = %venue.tag, "zero allocation skipped");
                continue;
            }
            let fill = self.invoke_venue(ledger, callbacks, asset, payer, amount, venue)?;
            fills.push(fill);
        }

        Ok(StepReport {
            index,
            command: step.command(),
            asset,
            total_in,
            fills,
        })
    }

    fn engine_drawable(&self, ledger: &dyn AssetLedger, asset: Address) -> U256 {
        self.reserve_policy
            .drawable(ledger.balance_of(asset, self.engine))
    }

    fn invoke_venue(
        &self,
        ledger: &mut dyn AssetLedger,
        callbacks: &mut CallbackAuthenticator,
        asset_in: Address,
        payer: Address,
        amount_in: U256,
        venue: &VenueCall,
    ) -> Result<VenueFill, RouteError> {
        let adapter = self.registry.resolve(venue.tag)?;
        let target = adapter.output_target(asset_in, &venue.params)?;
        let snapshot = BalanceSnapshot::take(&*ledger, target.asset, target.recipient);

        let request = SwapRequest {
            asset_in,
            payer,
            amount_in,
            params: &venue.params,
        };
        {
            let mut ctx = SwapContext::new(&mut *ledger, &mut *callbacks, &self.registry, self.engine);
            adapter.execute_swap(&mut ctx, &request)?;
        }
        callbacks.ensure_idle()?;

        let amount_out = snapshot.gained(&*ledger);
        self.venue_calls.fetch_add(1, Ordering::Relaxed);
        VENUE_CALLS.with_label_values(&[adapter.name()]).inc();
        debug!(
            adapter = adapter.name(),
            tag = %venue.tag,
            amount_in = %amount_in,
            amount_out = %amount_out,
            recipient = %target.recipient,
            "venue call complete"
        );

        Ok(VenueFill {
            adapter: adapter.name(),
            tag: venue.tag,
            amount_in,
            output_asset: target.asset,
            recipient: target.recipient,
            amount_out,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;
    use crate::router::routes::FULL_SHARE;
    use crate::testkit::{self, OneToOneAdapter, ONE_TO_ONE_TAG};

    fn executor(policy: ReservePolicy) -> RouteExecutor {
        let registry = AdapterRegistry::new().with_adapter(ONE_TO_ONE_TAG, Arc::new(OneToOneAdapter));
        RouteExecutor::new(Arc::new(registry), testkit::engine(), policy)
    }

    fn env(amount: u64) -> ExecutionEnv {
        ExecutionEnv {
            caller: testkit::caller(),
            asset_in: testkit::token_a(),
            amount_in: U256::from(amount),
        }
    }

    fn funded_ledger() -> InMemoryLedger {
        let mut ledger = InMemoryLedger::new();
        ledger.set_balance(testkit::token_a(), testkit::caller(), U256::from(1_000u64));
        ledger.approve(testkit::token_a(), testkit::caller(), testkit::engine(), U256::MAX);
        // venues hold output liquidity
        ledger.set_balance(testkit::token_b(), testkit::addr(0x51), U256::from(1_000u64));
        ledger.set_balance(testkit::token_b(), testkit::addr(0x52), U256::from(1_000u64));
        ledger
    }

    fn to_dest(weight: u16, venue: Address) -> VenueCall {
        VenueCall::new(
            weight,
            ONE_TO_ONE_TAG,
            testkit::one_to_one_params(venue, testkit::token_b(), testkit::destination()),
        )
    }

    #[test]
    fn split_pull_fills_each_venue_proportionally() {
        let exec = executor(ReservePolicy::DrawFull);
        let mut ledger = funded_ledger();
        let mut slot = CallbackAuthenticator::new();
        let steps = vec![Step::PullFromCaller {
            asset: testkit::token_a(),
            venues: vec![to_dest(1, testkit::addr(0x51)), to_dest(3, testkit::addr(0x52))],
        }];

        let report = exec.execute(&mut ledger, &mut slot, &env(100), &steps).unwrap();
        let fills = &report.steps[0].fills;
        assert_eq!(fills[0].amount_in, U256::from(25u64));
        assert_eq!(fills[1].amount_in, U256::from(75u64));
        assert_eq!(fills[1].amount_out, U256::from(75u64));
        assert_eq!(report.spent, U256::from(100u64));
        assert_eq!(
            ledger.balance_of(testkit::token_b(), testkit::destination()),
            U256::from(100u64)
        );
    }

    #[test]
    fn zero_allocation_is_skipped_without_resolving_adapter() {
        let exec = executor(ReservePolicy::DrawFull);
        let mut ledger = funded_ledger();
        let mut slot = CallbackAuthenticator::new();
        let unknown = VenueCall::new(0, AdapterTag(*b"none"), vec![]);
        let steps = vec![Step::PullFromCaller {
            asset: testkit::token_a(),
            venues: vec![unknown, to_dest(FULL_SHARE, testkit::addr(0x51))],
        }];

        let report = exec.execute(&mut ledger, &mut slot, &env(10), &steps).unwrap();
        assert_eq!(report.steps[0].fills.len(), 1);
        assert_eq!(exec.get_stats().skipped_allocations, 1);
    }

    #[test]
    fn leading_full_share_venue_takes_the_whole_step() {
        let exec = executor(ReservePolicy::DrawFull);
        let mut ledger = funded_ledger();
        let mut slot = CallbackAuthenticator::new();
        let unknown = VenueCall::new(7, AdapterTag(*b"none"), vec![]);
        let steps = vec![Step::PullFromCaller {
            asset: testkit::token_a(),
            venues: vec![to_dest(FULL_SHARE, testkit::addr(0x51)), unknown],
        }];

        let report = exec.execute(&mut ledger, &mut slot, &env(100), &steps).unwrap();
        let fills = &report.steps[0].fills;
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].amount_in, U256::from(100u64));
        assert_eq!(exec.get_stats().skipped_allocations, 1);
    }

    #[test]
    fn unknown_tag_with_nonzero_share_fails() {
        let exec = executor(ReservePolicy::DrawFull);
        let mut ledger = funded_ledger();
        let mut slot = CallbackAuthenticator::new();
        let steps = vec![Step::PullFromCaller {
            asset: testkit::token_a(),
            venues: vec![VenueCall::full(AdapterTag(*b"none"), vec![])],
        }];
        assert_eq!(
            exec.execute(&mut ledger, &mut slot, &env(10), &steps),
            Err(RouteError::UnknownSelector(AdapterTag(*b"none")))
        );
        assert_eq!(exec.get_stats().total_executions, 0);

        exec.record_outcome(false);
        let stats = exec.get_stats();
        assert_eq!(stats.failed_executions, 1);
        assert_eq!(stats.success_rate, 0.0);
    }

    #[test]
    fn engine_balance_step_honours_reserve_policy() {
        let exec = executor(ReservePolicy::KeepOneUnit);
        let mut ledger = funded_ledger();
        ledger.set_balance(testkit::token_a(), testkit::engine(), U256::from(40u64));
        let mut slot = CallbackAuthenticator::new();
        let steps = vec![Step::UseSingleVenueWithEngineBalance {
            asset: testkit::token_a(),
            venue: to_dest(0, testkit::addr(0x51)),
        }];

        let report = exec.execute(&mut ledger, &mut slot, &env(0), &steps).unwrap();
        assert_eq!(report.steps[0].total_in, U256::from(39u64));
        assert_eq!(
            ledger.balance_of(testkit::token_a(), testkit::engine()),
            U256::from(1u64)
        );
    }

    #[test]
    fn second_pull_exceeds_declared_input() {
        let exec = executor(ReservePolicy::DrawFull);
        let mut ledger = funded_ledger();
        let mut slot = CallbackAuthenticator::new();
        let pull = Step::PullFromCaller {
            asset: testkit::token_a(),
            venues: vec![to_dest(1, testkit::addr(0x51))],
        };
        let err = exec
            .execute(&mut ledger, &mut slot, &env(10), &[pull.clone(), pull])
            .unwrap_err();
        assert_eq!(
            err,
            RouteError::SwapTokenInSpendingExceeded {
                available: U256::ZERO,
                required: U256::from(10u64),
            }
        );
    }
}
