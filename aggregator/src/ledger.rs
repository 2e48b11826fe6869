// Asset ledger module
// This file defines the custody boundary the engine talks to (balances,
// transfers, pre-authorizations, transactions) and an in-memory implementation
//
// Numan Thabit 2025 Nov

use alloy_primitives::{address, keccak256, Address, B256, U256};
use std::collections::{HashMap, HashSet};
use tracing::{trace, warn};

use crate::errors::LedgerError;

/// Sentinel asset id for the chain's native asset.
pub const NATIVE_ASSET: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

const BPS_DENOMINATOR: u64 = 10_000;

/// Off-ledger pre-authorization letting `spender` pull `value` of an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permit {
    pub value: U256,
    pub deadline: U256,
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

/// Custody primitives the engine relies on. Failures are reported, never
/// absorbed. `begin`/`commit`/`rollback` give the engine all-or-nothing
/// semantics across a whole route; transactions may nest.
pub trait AssetLedger {
    fn balance_of(&self, asset: Address, holder: Address) -> U256;

    fn allowance(&self, asset: Address, owner: Address, spender: Address) -> U256;

    fn approve(&mut self, asset: Address, owner: Address, spender: Address, amount: U256);

    /// Moves `amount` out of `from`. For [`NATIVE_ASSET`] this is a native transfer.
    fn transfer(
        &mut self,
        asset: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LedgerError>;

    /// Moves `amount` out of `from` on behalf of `spender`, consuming allowance.
    fn transfer_from(
        &mut self,
        asset: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LedgerError>;

    fn transfer_native(&mut self, from: Address, to: Address, amount: U256)
        -> Result<(), LedgerError>;

    fn permit(
        &mut self,
        asset: Address,
        owner: Address,
        spender: Address,
        permit: &Permit,
    ) -> Result<(), LedgerError>;

    fn begin(&mut self);

    fn commit(&mut self);

    fn rollback(&mut self);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LedgerState {
    balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    nonces: HashMap<(Address, Address), u64>,
}

/// Ledger kept entirely in memory. Supports fee-on-transfer assets, recipients
/// that refuse native value, and a deterministic permit signer standing in for
/// a real signature scheme.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    state: LedgerState,
    journal: Vec<LedgerState>,
    transfer_fee_bps: HashMap<Address, u16>,
    native_rejecters: HashSet<Address>,
    now: u64,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&mut self, asset: Address, holder: Address, amount: U256) {
        self.state.balances.insert((asset, holder), amount);
    }

    /// Credits `amount` to `holder`. Fails rather than wrapping past `U256::MAX`.
    pub fn mint(&mut self, asset: Address, holder: Address, amount: U256) -> Result<(), LedgerError> {
        let balance = self.balance_of(asset, holder);
        let credited = balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow { asset, holder })?;
        self.set_balance(asset, holder, credited);
        Ok(())
    }

    /// Charges `bps` of every transfer of `asset`; the fee is burned.
    pub fn set_transfer_fee(&mut self, asset: Address, bps: u16) {
        self.transfer_fee_bps.insert(asset, bps);
    }

    pub fn reject_native(&mut self, recipient: Address) {
        self.native_rejecters.insert(recipient);
    }

    pub fn set_time(&mut self, now: u64) {
        self.now = now;
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn nonce(&self, asset: Address, owner: Address) -> u64 {
        self.state
            .nonces
            .get(&(asset, owner))
            .copied()
            .unwrap_or_default()
    }

    /// Open transaction depth.
    pub fn depth(&self) -> usize {
        self.journal.len()
    }

    /// Sum of all balances of `asset`, or `None` if it does not fit in 256 bits.
    pub fn total_supply(&self, asset: Address) -> Option<U256> {
        self.state
            .balances
            .iter()
            .filter(|((a, _), _)| *a == asset)
            .try_fold(U256::ZERO, |acc, (_, v)| acc.checked_add(*v))
    }

    /// Produces the permit `owner` would sign for the current nonce.
    pub fn sign_permit(
        &self,
        asset: Address,
        owner: Address,
        spender: Address,
        value: U256,
        deadline: U256,
    ) -> Permit {
        let nonce = self.nonce(asset, owner);
        let mut preimage = Vec::with_capacity(6 + 20 * 3 + 32 * 2 + 8);
        preimage.extend_from_slice(b"permit");
        preimage.extend_from_slice(asset.as_slice());
        preimage.extend_from_slice(owner.as_slice());
        preimage.extend_from_slice(spender.as_slice());
        preimage.extend_from_slice(&value.to_be_bytes::<32>());
        preimage.extend_from_slice(&nonce.to_be_bytes());
        preimage.extend_from_slice(&deadline.to_be_bytes::<32>());
        let r = keccak256(&preimage);
        Permit {
            value,
            deadline,
            v: 27,
            r,
            s: keccak256(r),
        }
    }

    fn transfer_fee(&self, asset: Address, amount: U256) -> U256 {
        match self.transfer_fee_bps.get(&asset) {
            Some(bps) if asset != NATIVE_ASSET => {
                let bps = U256::from(*bps);
                let denominator = U256::from(BPS_DENOMINATOR);
                // amount * bps / 10_000 split so the product never leaves 256 bits
                (amount / denominator) * bps + (amount % denominator) * bps / denominator
            }
            _ => U256::ZERO,
        }
    }

    fn move_balance(
        &mut self,
        asset: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        let balance = self.balance_of(asset, from);
        if balance < amount {
            return Err(LedgerError::InsufficientBalance {
                asset,
                holder: from,
                balance,
                required: amount,
            });
        }
        let received = amount - self.transfer_fee(asset, amount);
        if from != to {
            let credited = self
                .balance_of(asset, to)
                .checked_add(received)
                .ok_or(LedgerError::BalanceOverflow { asset, holder: to })?;
            self.set_balance(asset, from, balance - amount);
            self.set_balance(asset, to, credited);
        } else {
            self.set_balance(asset, from, balance - amount + received);
        }
        trace!(%asset, %from, %to, %amount, %received, "ledger transfer");
        Ok(())
    }
}

impl AssetLedger for InMemoryLedger {
    fn balance_of(&self, asset: Address, holder: Address) -> U256 {
        self.state
            .balances
            .get(&(asset, holder))
            .copied()
            .unwrap_or_default()
    }

    fn allowance(&self, asset: Address, owner: Address, spender: Address) -> U256 {
        self.state
            .allowances
            .get(&(asset, owner, spender))
            .copied()
            .unwrap_or_default()
    }

    fn approve(&mut self, asset: Address, owner: Address, spender: Address, amount: U256) {
        self.state
            .allowances
            .insert((asset, owner, spender), amount);
    }

    fn transfer(
        &mut self,
        asset: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        if asset == NATIVE_ASSET {
            return self.transfer_native(from, to, amount);
        }
        self.move_balance(asset, from, to, amount)
    }

    fn transfer_from(
        &mut self,
        asset: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        if asset == NATIVE_ASSET {
            return Err(LedgerError::NativeTransferFrom { owner: from });
        }
        if spender != from {
            let allowance = self.allowance(asset, from, spender);
            if allowance < amount {
                return Err(LedgerError::InsufficientAllowance {
                    asset,
                    owner: from,
                    spender,
                    allowance,
                    required: amount,
                });
            }
            if allowance != U256::MAX {
                self.approve(asset, from, spender, allowance - amount);
            }
        }
        self.move_balance(asset, from, to, amount)
    }

    fn transfer_native(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        if self.native_rejecters.contains(&to) {
            return Err(LedgerError::NativeTransferRejected { recipient: to });
        }
        self.move_balance(NATIVE_ASSET, from, to, amount)
    }

    fn permit(
        &mut self,
        asset: Address,
        owner: Address,
        spender: Address,
        permit: &Permit,
    ) -> Result<(), LedgerError> {
        let now = U256::from(self.now);
        if permit.deadline < now {
            return Err(LedgerError::PermitExpired {
                deadline: permit.deadline,
                now,
            });
        }
        let expected = self.sign_permit(asset, owner, spender, permit.value, permit.deadline);
        if expected != *permit {
            return Err(LedgerError::InvalidPermit { owner });
        }
        self.approve(asset, owner, spender, permit.value);
        *self.state.nonces.entry((asset, owner)).or_default() += 1;
        Ok(())
    }

    fn begin(&mut self) {
        self.journal.push(self.state.clone());
    }

    fn commit(&mut self) {
        if self.journal.pop().is_none() {
            warn!("commit without an open ledger transaction");
        }
    }

    fn rollback(&mut self) {
        match self.journal.pop() {
            Some(saved) => self.state = saved,
            None => warn!("rollback without an open ledger transaction"),
        }
    }
}
