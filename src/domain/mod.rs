//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors, money)
//! - `payment` - Payment entity, state machine, and processor event model
//! - `provider` - Provider payout account capabilities and status derivation

pub mod foundation;
pub mod payment;
pub mod provider;
