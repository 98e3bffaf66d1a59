//! Singlelink session core.
//!
//! Holds the signed-in user for a front-end, persists the session token
//! and account id as cookies, and talks to the Singlelink REST API to log
//! in and look up accounts.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod router;

pub use api::{AccountDirectory, ApiClient, ApiError, AuthApi};
pub use auth::{
    CookieJar, CookieOptions, FileCookieJar, MemoryCookieJar, SessionManager, SignInError,
    SignInOutcome, SignOutScope, TOKEN_COOKIE, USER_ID_COOKIE,
};
pub use config::Config;
pub use models::{Credential, LoginResponse, User};
pub use router::{HistoryRouter, Router, ACCOUNT_ROUTE, ROOT_ROUTE};
