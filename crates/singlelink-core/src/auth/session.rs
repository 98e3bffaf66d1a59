//! The signed-in session: held user, bearer token and session cookies.
//!
//! `SessionManager` restores a session from cookies at startup, signs in
//! and out, and tells subscribers when the held user changes.

use std::sync::{Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{AccountDirectory, ApiClient, ApiError, AuthApi};
use crate::models::{Credential, LoginResponse, User};
use crate::router::{Router, ACCOUNT_ROUTE, ROOT_ROUTE};

use super::cookies::{CookieError, CookieJar, CookieOptions, TOKEN_COOKIE, USER_ID_COOKIE};

/// What `sign_out` clears besides the token cookie.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignOutScope {
    /// Drop the token cookie only. The user id cookie and held user remain.
    #[default]
    TokenOnly,
    /// Drop both cookies and the held user.
    Full,
}

#[derive(Error, Debug)]
pub enum SignInError {
    #[error("Login rejected: {0}")]
    Rejected(#[from] ApiError),

    #[error("Failed to persist session: {0}")]
    Persist(#[from] CookieError),
}

/// Result of a sign-in attempt. Failures are reported, never raised.
#[derive(Debug)]
pub enum SignInOutcome {
    SignedIn(User),
    Failed(SignInError),
}

impl SignInOutcome {
    pub fn is_signed_in(&self) -> bool {
        matches!(self, SignInOutcome::SignedIn(_))
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            SignInOutcome::SignedIn(user) => Some(user),
            SignInOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&SignInError> {
        match self {
            SignInOutcome::SignedIn(_) => None,
            SignInOutcome::Failed(e) => Some(e),
        }
    }
}

/// Holds the signed-in user and mirrors the session into a cookie jar.
///
/// Built once at startup and shared by reference. Every operation takes
/// `&self`, so overlapping sign-ins are allowed; the last to finish wins.
/// Cookies, token and held user are committed together under `commit`,
/// so they always describe the same account.
pub struct SessionManager<A, J, R> {
    api: A,
    cookies: J,
    router: R,
    sign_out_scope: SignOutScope,
    token: RwLock<Option<String>>,
    user: watch::Sender<Option<User>>,
    commit: Mutex<()>,
}

impl<A, J, R> SessionManager<A, J, R>
where
    A: AuthApi + AccountDirectory,
    J: CookieJar,
    R: Router,
{
    pub fn new(api: A, cookies: J, router: R) -> Self {
        let (user, _) = watch::channel(None);
        Self {
            api,
            cookies,
            router,
            sign_out_scope: SignOutScope::default(),
            token: RwLock::new(None),
            user,
            commit: Mutex::new(()),
        }
    }

    pub fn with_sign_out_scope(mut self, scope: SignOutScope) -> Self {
        self.sign_out_scope = scope;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn cookies(&self) -> &J {
        &self.cookies
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    pub fn sign_out_scope(&self) -> SignOutScope {
        self.sign_out_scope
    }

    pub fn user(&self) -> Option<User> {
        self.user.borrow().clone()
    }

    /// True exactly when a user is held.
    pub fn is_authenticated(&self) -> bool {
        self.user.borrow().is_some()
    }

    /// Receiver that observes every change of the held user.
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.user.subscribe()
    }

    /// Replace the held user. No network or cookie side effects.
    pub fn set_user(&self, user: User) {
        self.user.send_if_modified(|held| {
            if held.as_ref() == Some(&user) {
                return false;
            }
            *held = Some(user);
            true
        });
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `Authorization` header value for requests made on behalf of this session.
    pub fn authorization(&self) -> Option<String> {
        self.token().map(|t| format!("Bearer {}", t))
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// Restore the session from cookies. Returns whether a user was restored.
    pub async fn bootstrap(&self) -> bool {
        let Some(user_id) = self.cookies.get(USER_ID_COOKIE).filter(|id| !id.is_empty()) else {
            debug!("No stored user id, starting signed out");
            return false;
        };

        let token = self.cookies.get(TOKEN_COOKIE);

        match self.api.get_account_by_id(&user_id, token.as_deref()).await {
            Ok(user) => {
                info!(user_id = %user.id, "Session restored");
                let _guard = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
                if token.is_some() {
                    self.set_token(token);
                }
                self.set_user(user);
                true
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to restore session");
                false
            }
        }
    }

    /// Sign in with the given credentials.
    ///
    /// On failure nothing is written and the held user is untouched.
    pub async fn sign_in(&self, credential: &Credential) -> SignInOutcome {
        match self.establish(credential).await {
            Ok(user) => SignInOutcome::SignedIn(user),
            Err(e) => {
                warn!(error = %e, "Sign-in failed");
                SignInOutcome::Failed(e)
            }
        }
    }

    async fn establish(&self, credential: &Credential) -> Result<User, SignInError> {
        let LoginResponse { token, user: profile } = self.api.login(credential).await?;
        let user_id = profile.id.clone();

        let account = match self.api.get_account_by_id(&user_id, Some(&token)).await {
            Ok(account) => account,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Account lookup failed, using login profile");
                profile
            }
        };

        // No awaits past this point: the whole session is written in one step.
        let _guard = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
        self.persist(&token, &user_id)?;
        self.set_token(Some(token));
        self.set_user(account.clone());
        self.router.push(ACCOUNT_ROUTE);

        info!(user_id = %user_id, "Signed in");
        Ok(account)
    }

    fn persist(&self, token: &str, user_id: &str) -> Result<(), CookieError> {
        let options = CookieOptions::session_default();
        self.cookies.set(TOKEN_COOKIE, token, &options)?;
        if let Err(e) = self.cookies.set(USER_ID_COOKIE, user_id, &options) {
            // Leave no half-written session behind
            let _ = self.cookies.destroy(TOKEN_COOKIE);
            return Err(e);
        }
        Ok(())
    }

    pub fn sign_out(&self) {
        let _guard = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.cookies.destroy(TOKEN_COOKIE) {
            warn!(error = %e, "Failed to remove token cookie");
        }
        self.set_token(None);

        if self.sign_out_scope == SignOutScope::Full {
            if let Err(e) = self.cookies.destroy(USER_ID_COOKIE) {
                warn!(error = %e, "Failed to remove user id cookie");
            }
            self.user.send_if_modified(|held| held.take().is_some());
        }

        self.router.push(ROOT_ROUTE);
        info!(scope = ?self.sign_out_scope, "Signed out");
    }
}

impl<J, R> SessionManager<ApiClient, J, R> {
    /// API client that presents this session's bearer token on every request.
    pub fn authorized_client(&self) -> Option<ApiClient> {
        let token = self.token.read().unwrap_or_else(PoisonError::into_inner);
        token.as_ref().map(|t| self.api.with_token(t.clone()))
    }
}
