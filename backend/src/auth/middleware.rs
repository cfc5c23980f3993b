use super::jwt::JwtService;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use actix_web::{FromRequest, HttpRequest, error::ErrorUnauthorized};
use futures::future::{Ready, err, ok};
use shared::{ApiError, ErrorKind};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

/// Rejects requests without a valid session token. The verified email is
/// stored in the request extensions for [`AuthenticatedUser`].
#[derive(Clone)]
pub struct AuthMiddleware {
    jwt_service: Arc<JwtService>,
}

impl AuthMiddleware {
    pub fn new(jwt_service: JwtService) -> Self {
        Self {
            jwt_service: Arc::new(jwt_service),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<actix_web::body::EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareService {
            service: Rc::new(service),
            jwt_service: self.jwt_service.clone(),
        })
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    jwt_service: Arc<JwtService>,
}

#[derive(Debug)]
enum TokenError {
    NoAuthHeader,
    InvalidHeaderFormat,
    NotBearerToken,
    VerificationFailed(String),
}

impl TokenError {
    fn log_message(&self, path: &str) -> String {
        match self {
            TokenError::NoAuthHeader => format!("No Authorization header found for path: {}", path),
            TokenError::InvalidHeaderFormat => {
                format!("Invalid Authorization header format (non-UTF-8) for path: {}", path)
            }
            TokenError::NotBearerToken => {
                format!("Authorization header for path {} doesn't start with 'Bearer '", path)
            }
            TokenError::VerificationFailed(e) => {
                format!("Token verification failed for path {}: {}", path, e)
            }
        }
    }

    fn client_error(&self) -> ApiError {
        let message = match self {
            TokenError::VerificationFailed(_) => "Session expired or invalid, please log in again",
            _ => "Missing or invalid authorization token",
        };
        ApiError::new(ErrorKind::Unauthorized, message)
    }
}

fn validate_request_token(
    req: &ServiceRequest,
    jwt_service: &JwtService,
) -> Result<String, TokenError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .ok_or(TokenError::NoAuthHeader)?;
    let auth_str = auth_header
        .to_str()
        .map_err(|_| TokenError::InvalidHeaderFormat)?;
    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or(TokenError::NotBearerToken)?;

    let claims = jwt_service
        .verify_token(token)
        .map_err(|e| TokenError::VerificationFailed(e.to_string()))?;

    log::debug!("Session token verified for {}", claims.sub);
    Ok(claims.sub)
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<actix_web::body::EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let jwt_service = self.jwt_service.clone();

        Box::pin(async move {
            let path = req.path().to_string();

            match validate_request_token(&req, &jwt_service) {
                Ok(email) => {
                    req.extensions_mut().insert(AuthenticatedUser(email));
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(token_error) => {
                    log::warn!("{}", token_error.log_message(&path));

                    let (http_req, _payload) = req.into_parts();
                    let response = HttpResponse::Unauthorized()
                        .json(token_error.client_error())
                        .map_into_right_body();
                    Ok(ServiceResponse::new(http_req, response))
                }
            }
        })
    }
}

/// Email of the signed-in user. Only available behind [`AuthMiddleware`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub String);

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>() {
            Some(user) => ok(user.clone()),
            None => {
                log::error!(
                    "AuthenticatedUser requested on unprotected path {}",
                    req.path()
                );
                err(ErrorUnauthorized("Missing or invalid authorization token"))
            }
        }
    }
}
