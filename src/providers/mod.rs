//! External inference providers — uniform gateway over heterogeneous
//! chat-completion and generation APIs, plus the parallel call coordinator.

pub mod gateway;
pub mod parallel;
pub mod types;

pub use gateway::ProviderGateway;
pub use parallel::{run_parallel, run_parallel_vision};
pub use types::{
    ApiShape, CallOptions, InferenceClient, MockInferenceClient, ProviderCallResult,
    ProviderConfig, ProviderId, TextRequest, Usage, VisionRequest, DEFAULT_CALL_TIMEOUT,
};
