//! Infrastructure provisioning: idempotent resource creation and bounded
//! polling to terminal states.

pub mod containers;
pub mod manager;
pub mod poll;

pub use manager::{InfraError, InfraManager};
pub use poll::{poll_until, PollConfig, PollOutcome};
