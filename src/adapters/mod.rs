//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `stripe` - Payment processor gateway
//! - `postgres` - PostgreSQL persistence
//! - `http` - REST API surface
//! - `notify` - Buffered notification delivery

pub mod http;
pub mod notify;
pub mod postgres;
pub mod stripe;
