//! Authentication module for managing the signed-in session.
//!
//! This module provides:
//! - `SessionManager`: holds the current user and drives sign-in/sign-out
//! - `CookieJar`: the persisted half of the session (`MemoryCookieJar`,
//!   `FileCookieJar`)
//!
//! Session cookies expire after 24 hours.

pub mod cookies;
pub mod session;

pub use cookies::{
    Cookie, CookieError, CookieJar, CookieOptions, FileCookieJar, MemoryCookieJar, TOKEN_COOKIE,
    USER_ID_COOKIE,
};
pub use session::{SessionManager, SignInError, SignInOutcome, SignOutScope};
