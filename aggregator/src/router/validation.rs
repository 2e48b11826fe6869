// Pre-execution validation module
// Validates a route request against engine settings before anything is decoded
// or moved
//
// Numan Thabit 2025 Nov

use alloy_primitives::{Address, U256};
use tracing::warn;

use crate::config::EngineConfig;
use crate::errors::RouteError;
use crate::ledger::NATIVE_ASSET;
use crate::router::router::{CallContext, RouteRequest};

/// Pre-execution validation result
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: String) {
        self.is_valid = false;
        self.errors.push(error);
    }

    pub fn into_result(self) -> Result<(), RouteError> {
        if self.is_valid {
            Ok(())
        } else {
            Err(RouteError::InvalidRequest(self.errors.join("; ")))
        }
    }
}

/// Collects every problem with `request` rather than stopping at the first.
pub fn validate_route_request(
    config: &EngineConfig,
    call: &CallContext,
    request: &RouteRequest,
) -> ValidationResult {
    let mut result = ValidationResult::new();

    if request.destination == Address::ZERO {
        result.add_error("destination is the zero address".to_string());
    }

    if request.route.len() > config.max_route_bytes {
        result.add_error(format!(
            "route of {} bytes exceeds limit of {}",
            request.route.len(),
            config.max_route_bytes
        ));
    }

    if call.value > U256::ZERO && request.asset_in != NATIVE_ASSET {
        result.add_error(format!(
            "native value {} attached to a route spending {}",
            call.value, request.asset_in
        ));
    }

    if request.asset_in == NATIVE_ASSET && call.value < request.amount_in {
        result.add_error(format!(
            "attached value {} is below declared amount_in {}",
            call.value, request.amount_in
        ));
    }

    if request.asset_in == request.asset_out {
        // legal (e.g. arbitrage loops), but unusual enough to surface
        warn!(asset = %request.asset_in, "route starts and ends in the same asset");
    }

    result
}
