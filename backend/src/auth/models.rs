use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Email, also the history key
    pub exp: usize,
    pub iat: usize,
}

/// What the identity provider granted on a password sign-in. Its own tokens
/// stay with the provider; callers get a session token from `JwtService`.
#[derive(Debug, Clone, Copy)]
pub struct ProviderSession {
    pub expires_in: i32,
}
