//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Processor Ports
//!
//! - `ProcessorGateway` - Payment processor API and webhook verification
//!
//! ## Persistence Ports
//!
//! - `PaymentLedger` - Append-only payment rows with CAS transitions
//! - `PaymentReader` - Payment history views
//! - `ProviderAccountStore` - Connected-account records
//! - `AppointmentDirectory` - Appointment lookups and status write-back
//! - `UserDirectory` - Contact details and processor customer ids
//!
//! ## Delivery Ports
//!
//! - `Notifier` - Fire-and-forget user notifications

mod appointment_directory;
mod notifier;
mod payment_ledger;
mod payment_reader;
mod processor_gateway;
mod provider_account_store;
mod user_directory;

pub use appointment_directory::{
    AppointmentDirectory, AppointmentPaymentStatus, AppointmentSnapshot,
};
pub use notifier::{Notification, NotificationKind, Notifier};
pub use payment_ledger::{PaymentLedger, TransitionOutcome};
pub use payment_reader::{PaymentReader, PaymentRole};
pub use processor_gateway::{
    ConnectedAccount, CreateAccountRequest, CreateCustomerRequest, CreateIntentRequest,
    GatewayError, GatewayErrorCode, IntentHandle, OnboardingLink, ProcessorCustomer,
    ProcessorGateway,
};
pub use provider_account_store::ProviderAccountStore;
pub use user_directory::{UserContact, UserDirectory};
