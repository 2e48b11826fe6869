// Balance-delta accounting
// This file tracks how much of the declared input a route has spent and
// measures output as observed balance changes
//
// Numan Thabit 2025 Nov

use alloy_primitives::{Address, U256};

use crate::errors::RouteError;
use crate::ledger::AssetLedger;

/// Cumulative charge of caller-funded steps against the declared input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpendTracker {
    asset_in: Address,
    declared: U256,
    spent: U256,
}

impl SpendTracker {
    pub fn new(asset_in: Address, declared: U256) -> Self {
        Self {
            asset_in,
            declared,
            spent: U256::ZERO,
        }
    }

    /// What is still available for `asset`. Nothing is available for any
    /// asset other than the route's input.
    pub fn available(&self, asset: Address) -> U256 {
        if asset == self.asset_in {
            self.declared - self.spent
        } else {
            U256::ZERO
        }
    }

    pub fn spent(&self) -> U256 {
        self.spent
    }

    /// Records `amount` of `asset` as spent.
    pub fn charge(&mut self, asset: Address, amount: U256) -> Result<(), RouteError> {
        let available = self.available(asset);
        if amount > available {
            return Err(RouteError::SwapTokenInSpendingExceeded {
                available,
                required: amount,
            });
        }
        self.spent += amount;
        Ok(())
    }
}

/// A holder's balance of one asset at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub asset: Address,
    pub holder: Address,
    pub before: U256,
}

impl BalanceSnapshot {
    pub fn take(ledger: &dyn AssetLedger, asset: Address, holder: Address) -> Self {
        Self {
            asset,
            holder,
            before: ledger.balance_of(asset, holder),
        }
    }

    /// Increase since the snapshot; a decrease counts as zero.
    pub fn gained(&self, ledger: &dyn AssetLedger) -> U256 {
        ledger
            .balance_of(self.asset, self.holder)
            .saturating_sub(self.before)
    }
}
