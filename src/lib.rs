//! RoamVet Payments - Payment Lifecycle & Webhook Reconciliation Service
//!
//! This crate owns split-payment intent creation against the payment
//! processor, durable payment state with idempotent webhook reconciliation,
//! and provider connected-account status synchronization for the RoamVet
//! mobile veterinary marketplace.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
