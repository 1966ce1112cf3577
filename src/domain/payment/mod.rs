//! Payment bounded context: the payment entity, its state machine, and the
//! processor event model that drives it.

mod errors;
mod events;
mod payment;
mod status;
mod transition;

pub use errors::PaymentFlowError;
pub use events::{GatewayEvent, GatewayEventKind};
pub use payment::{Payment, PaymentMethodSummary};
pub use status::PaymentStatus;
pub use transition::{classify_stale, transition_for, PaymentTransition, StaleKind};
