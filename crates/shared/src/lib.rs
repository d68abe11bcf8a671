//! Shared types, configuration, and auth primitives for Kobo.
//!
//! This crate provides common building blocks used across all other crates:
//! - Fixed-point money type (minor units, never floats)
//! - Application configuration management
//! - JWT claims and token validation

pub mod auth;
pub mod config;
pub mod jwt;
pub mod types;

pub use auth::Claims;
pub use config::AppConfig;
pub use jwt::{JwtError, JwtService};
pub use types::money::Money;
