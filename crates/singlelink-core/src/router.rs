//! Navigation seam between the session and whatever is showing it.

use std::sync::{Mutex, PoisonError};

use tracing::debug;

/// Landing route after a successful sign-in
pub const ACCOUNT_ROUTE: &str = "/account";

/// Route shown after sign-out
pub const ROOT_ROUTE: &str = "/";

pub trait Router: Send + Sync {
    fn push(&self, path: &str);
}

/// Router that records every navigation.
#[derive(Debug, Default)]
pub struct HistoryRouter {
    history: Mutex<Vec<String>>,
}

impl HistoryRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Router for HistoryRouter {
    fn push(&self, path: &str) {
        debug!(path, "Navigate");
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }
}
