// Venue module - adapter contract and bundled venue integrations
//
// Numan Thabit 2025 Nov

pub mod adapter;
pub mod amm;
pub mod concentrated;
pub mod native;

pub use adapter::{
    AdapterRegistry, AdapterTag, CallbackTerms, OutputTarget, OwedAmounts, SwapContext, SwapHost, SwapRequest,
    VenueAdapter,
};
pub use amm::{ConstantProductAdapter, ConstantProductParams, ConstantProductPool, CONSTANT_PRODUCT_TAG};
pub use concentrated::{CallbackPoolAdapter, CallbackPoolParams, CallbackVenue, FixedRatePool, CALLBACK_POOL_TAG};
pub use native::{NativeWrapperAdapter, WrapMode, WrapParams, NATIVE_WRAPPER_TAG};
