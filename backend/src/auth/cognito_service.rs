use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_cognitoidentityprovider::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_cognitoidentityprovider::types::{AttributeType, AuthFlowType};

use super::models::ProviderSession;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The provider refused the request; the message is the provider's own.
    #[error("{0}")]
    Rejected(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Email/password accounts held by an external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<(), IdentityError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderSession, IdentityError>;
}

/// Cognito user pool accessed with a public app client (no client secret) and
/// the `USER_PASSWORD_AUTH` flow.
#[derive(Clone)]
pub struct CognitoService {
    client: CognitoClient,
    client_id: String,
}

impl CognitoService {
    pub fn new(client: CognitoClient, client_id: String) -> Self {
        Self { client, client_id }
    }
}

fn provider_message<E: ProvideErrorMetadata>(err: &E) -> String {
    err.message()
        .or_else(|| err.code())
        .unwrap_or("Request rejected by identity provider")
        .to_string()
}

#[async_trait]
impl IdentityProvider for CognitoService {
    async fn sign_up(&self, email: &str, password: &str) -> Result<(), IdentityError> {
        let email_attribute = AttributeType::builder()
            .name("email")
            .value(email)
            .build()
            .map_err(|e| IdentityError::Rejected(e.to_string()))?;

        match self
            .client
            .sign_up()
            .client_id(&self.client_id)
            .username(email)
            .password(password)
            .user_attributes(email_attribute)
            .send()
            .await
        {
            Ok(output) => {
                log::info!(
                    "Cognito sign-up accepted for {} (confirmed: {})",
                    email,
                    output.user_confirmed()
                );
                Ok(())
            }
            Err(SdkError::ServiceError(service)) => {
                let message = provider_message(service.err());
                log::warn!("Cognito rejected sign-up for {}: {}", email, message);
                Err(IdentityError::Rejected(message))
            }
            Err(e) => {
                log::error!("Cognito sign-up request failed: {:?}", e);
                Err(IdentityError::Unavailable(e.to_string()))
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderSession, IdentityError> {
        let output = match self
            .client
            .initiate_auth()
            .auth_flow(AuthFlowType::UserPasswordAuth)
            .client_id(&self.client_id)
            .auth_parameters("USERNAME", email)
            .auth_parameters("PASSWORD", password)
            .send()
            .await
        {
            Ok(output) => output,
            Err(SdkError::ServiceError(service)) => {
                log::warn!(
                    "Cognito rejected sign-in for {}: {}",
                    email,
                    provider_message(service.err())
                );
                return Err(IdentityError::InvalidCredentials);
            }
            Err(e) => {
                log::error!("Cognito sign-in request failed: {:?}", e);
                return Err(IdentityError::Unavailable(e.to_string()));
            }
        };

        if let Some(challenge) = output.challenge_name() {
            log::warn!("Cognito requires {:?} for {}", challenge, email);
            return Err(IdentityError::Rejected(format!(
                "Additional verification required: {}",
                challenge.as_str()
            )));
        }

        let result = output
            .authentication_result()
            .ok_or(IdentityError::InvalidCredentials)?;
        if result.access_token().is_none() {
            return Err(IdentityError::InvalidCredentials);
        }

        Ok(ProviderSession {
            expires_in: result.expires_in(),
        })
    }
}
