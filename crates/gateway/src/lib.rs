//! Paystack gateway client and retry coordination.
//!
//! This crate provides:
//! - `PaystackClient` - the reqwest implementation of the
//!   `PaymentGateway` seam defined in `kobo-core`
//! - `RetryCoordinator` - bounded backoff around outbound transfers

pub mod paystack;
pub mod retry;

pub use paystack::PaystackClient;
pub use retry::RetryCoordinator;
