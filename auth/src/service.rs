//! gRPC surface of the token authority.

use crate::error::AuthError;
use crate::password;
use crate::stores::{NewUser, UserStore};
use crate::token::{TokenAuthority, TokenValidity, token_preview};
use staykey_proto::v1::auth_service_server::AuthService as AuthServiceApi;
use staykey_proto::v1::{
    LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, ValidateRequest,
    ValidateResponse,
};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{info, warn};

/// Role assigned to every self-registered account.
const DEFAULT_ROLE: &str = "guest";

/// Token authority service: accounts plus bearer tokens.
pub struct AuthService<S: UserStore> {
    store: Arc<S>,
    tokens: Arc<TokenAuthority>,
}

impl<S: UserStore> AuthService<S> {
    /// Create the service over a user store and token authority.
    pub fn new(store: Arc<S>, tokens: Arc<TokenAuthority>) -> Self {
        Self { store, tokens }
    }
}

/// Reject empty or whitespace-only required fields, returning the trimmed
/// value.
fn require_field<'a>(value: &'a str, field: &'static str) -> Result<&'a str, AuthError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AuthError::MissingField { field })
    } else {
        Ok(trimmed)
    }
}

#[tonic::async_trait]
impl<S: UserStore + 'static> AuthServiceApi for AuthService<S> {
    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<RegisterResponse>, Status> {
        let req = request.into_inner();

        let email = require_field(&req.email, "email")?;
        let name = require_field(&req.name, "name")?;
        // Passwords are significant byte-for-byte, so only presence is
        // checked before the policy runs.
        if req.password.is_empty() {
            return Err(AuthError::MissingField { field: "password" }.into());
        }
        password::validate_password(&req.password)?;

        let password_hash = password::hash_password(&req.password)?;
        let user = self
            .store
            .create(NewUser {
                email: email.to_string(),
                password_hash,
                name: name.to_string(),
                role: DEFAULT_ROLE.to_string(),
            })
            .await?;

        info!(user_id = %user.id, "user registered");

        Ok(Response::new(RegisterResponse {
            user_id: user.id.to_string(),
        }))
    }

    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        let req = request.into_inner();

        let email = require_field(&req.email, "email")?;
        if req.password.is_empty() {
            return Err(AuthError::MissingField { field: "password" }.into());
        }

        // Unknown email and wrong password take the same path to the same
        // error: the response must not reveal which one it was.
        let user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !password::verify_password(&req.password, &user.password_hash) {
            warn!(user_id = %user.id, "login with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        let issued = self.tokens.issue(user.id, &user.role, &user.email)?;
        info!(user_id = %user.id, expires_in = issued.expires_in, "token issued");

        Ok(Response::new(LoginResponse {
            access_token: issued.access_token,
            expires_in: issued.expires_in,
        }))
    }

    async fn validate(
        &self,
        request: Request<ValidateRequest>,
    ) -> Result<Response<ValidateResponse>, Status> {
        let req = request.into_inner();

        // Soft outcome: every failure mode is valid=false, never a Status.
        let response = match self.tokens.validate(&req.access_token) {
            TokenValidity::Valid { user_id, role } => ValidateResponse {
                valid: true,
                user_id: user_id.to_string(),
                role,
            },
            TokenValidity::Invalid => {
                info!(
                    token = %token_preview(&req.access_token),
                    "rejected invalid token"
                );
                ValidateResponse {
                    valid: false,
                    user_id: String::new(),
                    role: String::new(),
                }
            },
        };

        Ok(Response::new(response))
    }
}
