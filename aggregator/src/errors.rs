// Error types and error handling module
// This file defines the error taxonomy surfaced by route decoding, execution
// and the asset ledger
//
// Numan Thabit 2025 Nov

use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::venues::adapter::AdapterTag;

/// Structural problems found while reading a route buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unrecognized command code {code:#04x} at offset {offset}")]
    UnknownCommand { code: u8, offset: usize },
    #[error("buffer truncated at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("step at offset {offset} declares no venues")]
    EmptyVenueList { offset: usize },
    #[error("venue payload at offset {offset} is shorter than an adapter tag")]
    MissingAdapterTag { offset: usize },
    #[error("{count} unexpected trailing bytes at offset {offset}")]
    TrailingBytes { offset: usize, count: usize },
}

/// Failures reported by the asset ledger. Never absorbed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient balance of {asset} for {holder}: have {balance}, need {required}")]
    InsufficientBalance {
        asset: Address,
        holder: Address,
        balance: U256,
        required: U256,
    },
    #[error("insufficient allowance of {asset} from {owner} to {spender}: have {allowance}, need {required}")]
    InsufficientAllowance {
        asset: Address,
        owner: Address,
        spender: Address,
        allowance: U256,
        required: U256,
    },
    #[error("native asset cannot be pulled with transfer_from (owner {owner})")]
    NativeTransferFrom { owner: Address },
    #[error("native transfer rejected by recipient {recipient}")]
    NativeTransferRejected { recipient: Address },
    #[error("permit expired: deadline {deadline}, now {now}")]
    PermitExpired { deadline: U256, now: U256 },
    #[error("invalid permit signature for owner {owner}")]
    InvalidPermit { owner: Address },
    #[error("balance of {asset} for {holder} would exceed the maximum")]
    BalanceOverflow { asset: Address, holder: Address },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("unknown command code: {0}")]
    UnknownCommandCode(#[from] DecodeError),
    #[error("unknown selector {0}")]
    UnknownSelector(AdapterTag),
    #[error("invalid call data: {0}")]
    InvalidCallData(String),
    #[error("token in spending exceeded: available {available}, required {required}")]
    SwapTokenInSpendingExceeded { available: U256, required: U256 },
    #[error("token out amount too low: {actual}")]
    SwapTokenOutAmountTooLow { actual: U256 },
    #[error("unexpected callback sender {caller}, expected {expected}")]
    UnexpectedCallbackSender { caller: Address, expected: Address },
    #[error("swap callback not executed by {venue}")]
    SwapCallbackNotExecuted { venue: Address },
    #[error("callback already armed for {pending}, cannot arm {requested}")]
    CallbackAlreadyArmed { pending: Address, requested: Address },
    #[error("wrong pool reserves for {pool}")]
    WrongPoolReserves { pool: Address },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("venue {venue} rejected swap: {reason}")]
    VenueRejected { venue: Address, reason: String },
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl RouteError {
    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RouteError::UnknownCommandCode(_) => "unknown_command_code",
            RouteError::UnknownSelector(_) => "unknown_selector",
            RouteError::InvalidCallData(_) => "invalid_call_data",
            RouteError::SwapTokenInSpendingExceeded { .. } => "token_in_spending_exceeded",
            RouteError::SwapTokenOutAmountTooLow { .. } => "token_out_amount_too_low",
            RouteError::UnexpectedCallbackSender { .. } => "unexpected_callback_sender",
            RouteError::SwapCallbackNotExecuted { .. } => "swap_callback_not_executed",
            RouteError::CallbackAlreadyArmed { .. } => "callback_already_armed",
            RouteError::WrongPoolReserves { .. } => "wrong_pool_reserves",
            RouteError::InvalidRequest(_) => "invalid_request",
            RouteError::VenueRejected { .. } => "venue_rejected",
            RouteError::Ledger(_) => "ledger",
        }
    }

    pub(crate) fn invalid_call_data(reason: impl Into<String>) -> Self {
        RouteError::InvalidCallData(reason.into())
    }
}
