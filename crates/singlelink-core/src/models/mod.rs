//! Data models for Singlelink accounts and the login exchange.
//!
//! - `User`: an account record as returned by the API
//! - `Credential`: email/password pair submitted at sign-in
//! - `LoginResponse`: the `{token, user}` body returned by `POST /login`

pub mod user;

pub use user::{Credential, LoginResponse, User};
