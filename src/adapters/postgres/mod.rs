//! PostgreSQL adapters - Database implementations for persistence ports.
//!
//! - `PostgresPaymentLedger` - insert-once payment rows with CAS transitions
//! - `PostgresPaymentReader` - read-optimized payment history queries
//! - `PostgresProviderAccountStore` - connected-account mirror
//! - `PostgresAppointmentDirectory` - appointment slice plus status write-back
//! - `PostgresUserDirectory` - contact lookup and customer-id persistence

mod appointment_directory;
mod payment_ledger;
mod payment_reader;
mod provider_account_store;
mod user_directory;

pub use appointment_directory::PostgresAppointmentDirectory;
pub use payment_ledger::PostgresPaymentLedger;
pub use payment_reader::PostgresPaymentReader;
pub use provider_account_store::PostgresProviderAccountStore;
pub use user_directory::PostgresUserDirectory;
