//! Sign-in and sign-up flows feeding the session store.

use crate::api::{self, Api, ApiError};
use crate::session::{Profile, SessionStore};

/// Exchanges credentials for a token and persists the session. Bad
/// credentials come back as the server's message; nothing is stored on
/// failure.
pub async fn sign_in(
    api: &dyn Api,
    sessions: &SessionStore,
    email: &str,
    password: &str,
) -> Result<Profile, ApiError> {
    let resp = api::login(api, email, password).await?;
    sessions.login(&resp.token, &resp.user);
    Ok(resp.user)
}

/// Creates an account. No session side effect; the caller signs in after.
pub async fn sign_up(api: &dyn Api, email: &str, password: &str) -> Result<(), ApiError> {
    api::create_user(api, email, password).await
}
