//! Session and authentication requests
//!
//! Sign-in exchanges a third-party identity token for a platform session.
//! A sign-in is first attempted without creating a user record; if the
//! platform answers 404 (no user exists for that identity), the request is
//! retried exactly once with user creation enabled, and the outcome of that
//! second attempt is final.

use thiserror::Error;
use tracing::debug;

use crate::api::{ApiError, SessionParams, SessionService};
use crate::data::IdentityProvider;

/// Errors that can occur during session requests
#[derive(Debug, Error)]
pub enum AuthError {
    /// The session request failed against the platform
    #[error("session request failed: {0}")]
    Network(#[from] ApiError),
}

/// Result of a successful sign-in
#[derive(Debug, Clone)]
pub struct AuthenticationResponse {
    /// Handle of the signed-in user
    pub user_handle: String,
    /// Bearer token for the new session
    pub session_token: String,
}

/// Sign-in with a third-party identity provider
#[derive(Debug, Clone)]
pub struct SignInRequest {
    provider: IdentityProvider,
    access_token: String,
    instance_id: String,
    create_user: bool,
}

impl SignInRequest {
    /// Creates a sign-in request for an existing user
    ///
    /// # Arguments
    /// * `provider` - Identity provider that issued the token
    /// * `access_token` - Third-party access token
    /// * `instance_id` - Installation identifier of this SDK instance
    pub fn new(
        provider: IdentityProvider,
        access_token: impl Into<String>,
        instance_id: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            access_token: access_token.into(),
            instance_id: instance_id.into(),
            create_user: false,
        }
    }

    fn params(&self) -> SessionParams {
        SessionParams {
            identity_provider: self.provider,
            access_token: self.access_token.clone(),
            instance_id: self.instance_id.clone(),
            create_user: self.create_user,
        }
    }

    /// Sends the sign-in request
    ///
    /// If the platform answers 404 while `create_user` is still false, the
    /// request is retried once with `create_user` set, and the second
    /// response is returned whatever its status. A 404 on the retry is a
    /// plain error; it is never retried again.
    pub async fn send(
        mut self,
        service: &impl SessionService,
    ) -> Result<AuthenticationResponse, AuthError> {
        match service.post_session(&self.params()).await {
            Err(err) if err.is_not_found() && !self.create_user => {
                debug!("no user record for this identity, retrying with create_user");
                self.create_user = true;
                let created = service.post_session(&self.params()).await?;
                Ok(AuthenticationResponse {
                    user_handle: created.user_handle,
                    session_token: created.session_token,
                })
            }
            Err(err) => Err(err.into()),
            Ok(created) => Ok(AuthenticationResponse {
                user_handle: created.user_handle,
                session_token: created.session_token,
            }),
        }
    }
}

/// Sign-out of the current session
#[derive(Debug, Clone, Default)]
pub struct SignOutRequest;

impl SignOutRequest {
    /// Deletes the current session on the platform
    pub async fn send(self, service: &impl SessionService) -> Result<(), AuthError> {
        service.delete_session().await?;
        Ok(())
    }
}
