//! REST API client module for the Singlelink account service.
//!
//! This module provides the `ApiClient` used to log in and look up
//! accounts, along with the `AuthApi` and `AccountDirectory` traits the
//! session manager depends on.
//!
//! Authenticated calls carry a JWT bearer token obtained from `POST /login`.
//! The token is injected per request rather than set on a shared client.

pub mod client;
pub mod error;
pub mod service;

pub use client::ApiClient;
pub use error::ApiError;
pub use service::{AccountDirectory, AuthApi};
