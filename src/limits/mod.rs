//! Request limits — fixed-window rate limiting and plan-based feature
//! gating.

pub mod features;
pub mod rate;

pub use features::{
    Entitlements, EntitlementSource, Feature, FeatureGate, Plan, StaticEntitlements,
};
pub use rate::{RateDecision, RateLimiter};
