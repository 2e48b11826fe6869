// Library root module for ultra-router
// This file defines the public API and module structure for the route
// execution engine: decoding, dispatch, callback authentication and accounting
//
// Numan Thabit 2025 Nov

pub mod codec;
pub mod config;
pub mod errors;
pub mod ledger;
pub mod metrics;
pub mod router;
pub mod scenario;
pub mod venues;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use errors::{DecodeError, LedgerError, RouteError};
pub use ledger::{AssetLedger, InMemoryLedger, Permit, NATIVE_ASSET};
pub use router::{CallContext, CoreRouter, ExecutionResult, RouteProcessed, RouteRequest};
