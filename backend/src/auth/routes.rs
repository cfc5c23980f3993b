use actix_web::{HttpResponse, web};
use shared::{Credentials, ErrorKind, LoginResponse, RegisterResponse};

use crate::routes::error_response;

use super::cognito_service::IdentityError;
use super::service::{AuthError, AuthService};

fn auth_error_response(err: &AuthError) -> HttpResponse {
    let kind = match err {
        AuthError::Validation(_) | AuthError::Identity(IdentityError::Rejected(_)) => {
            ErrorKind::ValidationError
        }
        AuthError::Identity(IdentityError::InvalidCredentials) => ErrorKind::InvalidCredentials,
        AuthError::Identity(IdentityError::Unavailable(_)) => ErrorKind::ProviderUnavailable,
        AuthError::Token(e) => {
            log::error!("Could not issue session token: {}", e);
            return error_response(ErrorKind::Internal, "Could not start a session");
        }
    };
    error_response(kind, err.to_string())
}

pub async fn register(
    auth: web::Data<AuthService>,
    body: web::Json<Credentials>,
) -> HttpResponse {
    match auth.register(&body.email, &body.password).await {
        Ok(message) => HttpResponse::Ok().json(RegisterResponse {
            success: true,
            message,
        }),
        Err(e) => {
            log::info!("Registration refused: {}", e);
            auth_error_response(&e)
        }
    }
}

pub async fn login(auth: web::Data<AuthService>, body: web::Json<Credentials>) -> HttpResponse {
    match auth.authenticate(&body.email, &body.password).await {
        Ok((email, token)) => HttpResponse::Ok().json(LoginResponse { token, email }),
        Err(e) => auth_error_response(&e),
    }
}
