//! Sign-in, password change and sign-out

use tracing::{info, warn};

use common::{ClientError, ClientResult, Credential, CredentialStore, Role};

use crate::{
    gateway::Gateway,
    guard::Workspace,
    models::{ChangePasswordRequest, LoginResponse, MessageResponse},
    validation,
};

/// Credentials typed into the login form
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    /// Workspace the user picked before signing in
    pub scope: Role,
}

/// Authentication workflow on top of the gateway's credential store
#[derive(Clone)]
pub struct AuthService {
    gateway: Gateway,
}

impl AuthService {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Authenticate and, when the role matches the requested scope, store the credential
    ///
    /// A role mismatch leaves the store untouched.
    pub async fn login(&self, form: &LoginForm) -> ClientResult<Workspace> {
        validation::validate_login_email(&form.username).map_err(ClientError::Validation)?;
        validation::validate_login_password(&form.password).map_err(ClientError::Validation)?;

        let username = form.username.trim();
        info!("Login attempt for user: {}", username);

        let response: LoginResponse = self
            .gateway
            .post_form(
                "/auth/login",
                &[
                    ("username", username),
                    ("password", form.password.as_str()),
                    ("scope", form.scope.as_str()),
                ],
            )
            .await?;

        if response.role != form.scope {
            warn!(
                "Login for {} returned role {} but {} was requested",
                username, response.role, form.scope
            );
            return Err(ClientError::RoleMismatch {
                actual: response.role,
            });
        }

        self.gateway.store().set_credential(Credential {
            token: response.access_token,
            role: response.role,
            display_name: response.full_name,
            must_change_password: response.must_change_password,
        });
        info!("Signed in as {} ({})", username, response.role);

        Ok(Workspace::for_role(response.role))
    }

    /// Change the signed-in user's password
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> ClientResult<String> {
        validation::validate_new_password(new_password, confirm_password)
            .map_err(ClientError::Validation)?;

        let response: MessageResponse = self
            .gateway
            .post_json(
                "/auth/change-password",
                &ChangePasswordRequest {
                    current_password: current_password.to_string(),
                    new_password: new_password.to_string(),
                },
            )
            .await?;

        if !self.gateway.store().clear_forced_password_change() {
            warn!("Password updated after the credential was cleared");
        }
        info!("Password updated");

        Ok(response
            .message
            .unwrap_or_else(|| "Password updated successfully.".to_string()))
    }

    /// Explicit sign-out; safe to call any number of times
    pub fn logout(&self) -> bool {
        let cleared = self.gateway.store().logout();
        if cleared {
            info!("Signed out");
        }
        cleared
    }

    pub fn current(&self) -> Option<Credential> {
        self.gateway.store().current()
    }
}
