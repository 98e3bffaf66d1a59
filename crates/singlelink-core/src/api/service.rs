//! Collaborator seams used by the session manager.

use async_trait::async_trait;

use crate::models::{Credential, LoginResponse, User};

use super::ApiError;

/// Exchanges credentials for a bearer token.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, credential: &Credential) -> Result<LoginResponse, ApiError>;
}

/// Looks up accounts by id.
///
/// `bearer` is the session token to present on this one request, if any.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn get_account_by_id(&self, user_id: &str, bearer: Option<&str>) -> Result<User, ApiError>;
}
