use std::sync::Arc;

use super::cognito_service::{IdentityError, IdentityProvider};
use super::jwt::{JwtError, JwtService};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("Failed to issue session token: {0}")]
    Token(#[from] JwtError),
}

#[derive(Clone)]
pub struct AuthService {
    provider: Arc<dyn IdentityProvider>,
    jwt: JwtService,
}

impl AuthService {
    pub fn new(provider: Arc<dyn IdentityProvider>, jwt: JwtService) -> Self {
        Self { provider, jwt }
    }

    /// Creates the account. Returns the message to show the user.
    pub async fn register(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "Password should be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        self.provider.sign_up(&email, password).await?;
        log::info!("Registered {}", email);
        Ok("Registration Successful".to_string())
    }

    /// Signs in with the provider and returns `(email, session token)`.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(String, String), AuthError> {
        let email = normalize_email(email)?;
        if password.is_empty() {
            return Err(IdentityError::InvalidCredentials.into());
        }

        let session = self.provider.sign_in(&email, password).await?;
        log::debug!(
            "Provider session for {} valid for {}s",
            email,
            session.expires_in
        );

        let token = self.jwt.generate_token(&email)?;
        log::info!("{} signed in", email);
        Ok((email, token))
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AuthError::Validation(
            "Please enter a valid email address".to_string(),
        ));
    }
    Ok(email.to_lowercase())
}
