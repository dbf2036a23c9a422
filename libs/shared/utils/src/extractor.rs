use std::sync::Arc;

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
    body::Body,
};

use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::messages;
use shared_config::AppConfig;

use crate::jwt::validate_token;

/// Bearer-token guard for staff routes. Puts the validated [`User`] into the
/// request extensions.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth(messages::UNAUTHORIZED.to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth(messages::UNAUTHORIZED.to_string()))?;

    let token = auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth(messages::UNAUTHORIZED.to_string()))?;

    let user = validate_token(token, &config.supabase_jwt_secret).map_err(|e| {
        tracing::debug!("Rejecting request: {}", e);
        AppError::Auth(messages::UNAUTHORIZED.to_string())
    })?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Auth user id of a doctor token. The subject is a Supabase user UUID; the
/// doctor profile it owns is resolved separately.
pub fn require_doctor(user: &User) -> Result<Uuid, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Forbidden(messages::FORBIDDEN.to_string()));
    }
    Uuid::parse_str(&user.id).map_err(|_| {
        tracing::debug!("Doctor token subject {} is not a user id", user.id);
        AppError::Forbidden(messages::FORBIDDEN.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, role: &str) -> User {
        User {
            id: id.to_string(),
            email: None,
            role: Some(role.to_string()),
            created_at: None,
        }
    }

    #[test]
    fn doctor_subject_is_a_user_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(require_doctor(&user(&id.to_string(), "doctor")).unwrap(), id);
    }

    #[test]
    fn non_doctor_or_numeric_subject_is_forbidden() {
        let id = Uuid::new_v4().to_string();
        assert!(matches!(require_doctor(&user(&id, "patient")), Err(AppError::Forbidden(_))));
        assert!(matches!(require_doctor(&user("2", "doctor")), Err(AppError::Forbidden(_))));
    }
}
