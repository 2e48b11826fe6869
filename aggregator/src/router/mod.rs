// Router module - route decoding, dispatch and execution
// This file wires the decoder, the step executor, the callback slot and the
// core router entry point together
//
// Numan Thabit 2025 Nov

pub mod accounting;
pub mod builder;
pub mod callback;
pub mod decoder;
pub mod execution;
pub mod routes;
pub mod shares;
pub mod validation;

#[allow(clippy::module_inception)]
pub mod router;

pub use builder::{encode_route, RouteBuilder};
pub use callback::{CallbackAuthenticator, CallbackScope, CallbackState};
pub use decoder::{decode_route, RouteDecoder};
pub use execution::{ExecutionEnv, ExecutionReport, ExecutionStats, RouteExecutor, StepReport, VenueFill};
pub use router::{CallContext, CoreRouter, ExecutionResult, RouteProcessed, RouteRequest};
pub use routes::{CommandCode, Step, VenueCall, FULL_SHARE};
pub use shares::split_amount;
