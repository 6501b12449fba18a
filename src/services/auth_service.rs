use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use sea_orm::DatabaseConnection;

use crate::db::entities::user;
use crate::db::services::user_service;
use crate::web::error::AppError;
use crate::web::models::{
    AuthenticatedUser, ChangePasswordRequest, Claims, LoginRequest, LoginResponse, RegisterRequest,
    UserResponse,
};

const MIN_PASSWORD_LEN: usize = 6;
const MIN_NAME_LEN: usize = 2;
const TOKEN_TTL_HOURS: i64 = 24;

pub async fn register_user(
    db: &DatabaseConnection,
    req: RegisterRequest,
    jwt_secret: &str,
) -> Result<LoginResponse, AppError> {
    let name = req.name.trim();
    let email = req.email.trim();

    if name.chars().count() < MIN_NAME_LEN {
        return Err(AppError::InvalidInput(
            "Name must be at least 2 characters".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(AppError::InvalidInput("Invalid email".to_string()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let user = user_service::create_user(db, name, email, &req.password).await?;
    create_jwt_for_user(&user, jwt_secret)
}

pub async fn login_user(
    db: &DatabaseConnection,
    req: LoginRequest,
    jwt_secret: &str,
) -> Result<LoginResponse, AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Email and password are required".to_string(),
        ));
    }

    // A missing user and a wrong password are indistinguishable on the wire.
    let user = user_service::find_by_email(db, &req.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !user_service::validate_password(&user, &req.password)? {
        return Err(AppError::InvalidCredentials);
    }

    create_jwt_for_user(&user, jwt_secret)
}

pub fn create_jwt_for_user(
    user: &user::Model,
    jwt_secret: &str,
) -> Result<LoginResponse, AppError> {
    let now = Utc::now();
    let expiration = (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize;

    let claims = Claims {
        sub: user.email.clone(),
        user_id: user.id,
        exp: expiration,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::TokenCreationError(e.to_string()))?;

    Ok(LoginResponse {
        token,
        user: UserResponse {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
        },
    })
}

pub async fn change_password(
    db: &DatabaseConnection,
    auth_user: &AuthenticatedUser,
    req: ChangePasswordRequest,
) -> Result<(), AppError> {
    if req.current_password.is_empty() || req.new_password.is_empty() {
        return Err(AppError::InvalidInput(
            "Current and new password are required".to_string(),
        ));
    }
    if req.new_password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(
            "New password must be at least 6 characters".to_string(),
        ));
    }

    let user = user_service::find_by_email(db, &auth_user.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !user_service::validate_password(&user, &req.current_password)? {
        return Err(AppError::InvalidCredentials);
    }

    user_service::update_password(db, auth_user.id, &req.new_password).await
}
