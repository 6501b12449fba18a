use axum::{
    body::Body as AxumBody,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use std::sync::Arc;
use tracing::warn;

use crate::db::services::user_service;
use crate::web::models::{AuthenticatedUser, Claims};
use crate::web::{AppState, error::AppError};

pub async fn auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request<AxumBody>,
    next: Next,
) -> Result<Response, AppError> {
    let jwt_secret = &state.config.jwt_secret;

    // Authorization header first, then the login cookie.
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|s| s.to_string())
        .or_else(|| jar.get("token").map(|c| c.value().to_string()))
        .ok_or(AppError::InvalidCredentials)?;

    let token_data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => {
            warn!(error = ?e, "JWT decoding error during auth middleware");
            AppError::InvalidCredentials
        }
    })?;

    // The account may have been deleted since the token was minted.
    let user = user_service::find_by_id(&state.db, token_data.claims.user_id)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let authenticated_user = AuthenticatedUser {
        id: user.id,
        name: user.name,
        email: user.email,
    };
    req.extensions_mut().insert(authenticated_user);
    Ok(next.run(req).await)
}
