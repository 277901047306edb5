//! Kong admin API side of the tool.
//!
//! [`AdminClient`] is the authenticated HTTP client with the retry policy,
//! [`model`] holds the domain value types and the wire objects, and
//! [`GatewayManager`] implements the route/consumer/credential operations on
//! top of both.

pub mod client;
pub mod gateway;
pub mod model;

pub use client::{AdminApiError, AdminClient, RetryPolicy};
pub use gateway::{GatewayError, GatewayManager};
pub use model::{Consumer, JwtCredential, Route};
