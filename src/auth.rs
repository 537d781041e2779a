use crate::api::helper::run_query;
use crate::errors::AppError;
use crate::model::principal::{Principal, Role, Session};
use crate::schema::sessions;
use anyhow::anyhow;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use deadpool_diesel::postgres::Pool;
use diesel::dsl::now;
use diesel::prelude::*;
use tracing::{debug, warn};
use uuid::Uuid;

/// Hashes a password on the blocking pool.
pub async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|join_err| AppError::InternalServerError(anyhow!("Hashing task failed: {}", join_err)))?
        .map_err(AppError::from)
}

/// Checks a password against a stored bcrypt hash. A malformed hash never matches.
pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|join_err| {
            AppError::InternalServerError(anyhow!("Verification task failed: {}", join_err))
        })?;

    match outcome {
        Ok(valid) => Ok(valid),
        Err(err) => {
            warn!("Stored password hash could not be verified: {}", err);
            Ok(false)
        }
    }
}

/// Extracts the session token from `Authorization: Bearer <uuid>`.
///
/// `None` when the header is absent, an error when it is present but malformed.
pub fn bearer_token(headers: &HeaderMap) -> Option<Result<Uuid, AppError>> {
    let value = headers.get(AUTHORIZATION)?;
    let parsed = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| Uuid::parse_str(token.trim()).ok())
        .ok_or_else(|| AppError::Unauthorized("Malformed authorization header".to_string()));
    Some(parsed)
}

impl<S> FromRequestParts<S> for Principal
where
    Pool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))??;
        let pool = Pool::from_ref(state);

        let principal = run_query(&pool, move |conn| {
            let session = sessions::table
                .find(token)
                .filter(sessions::expires_at.gt(now))
                .select(Session::as_select())
                .first::<Session>(conn)
                .optional()?;

            let Some(session) = session else {
                return Ok(None);
            };
            let Ok(role) = session.role.parse::<Role>() else {
                return Ok(None);
            };
            Principal::load(conn, role, &session.principal_id)
        })
        .await?;

        match principal {
            Some(principal) => {
                debug!(
                    "Authenticated {} {} via session token",
                    principal.role(),
                    principal.key()
                );
                Ok(principal)
            }
            None => {
                warn!("Rejected unknown or expired session token");
                Err(AppError::Unauthorized(
                    "Session is invalid or has expired".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_parses_uuid() {
        let token = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        assert_eq!(bearer_token(&headers).unwrap().unwrap(), token);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(
            bearer_token(&headers),
            Some(Err(AppError::Unauthorized(_)))
        ));
    }

    #[tokio::test]
    async fn hashed_password_verifies() {
        let hash = hash_password("correct horse".to_string(), 4).await.unwrap();
        assert_ne!(hash, "correct horse");
        assert!(verify_password("correct horse".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong".to_string(), hash).await.unwrap());
        assert!(!verify_password("x".to_string(), "not-a-hash".to_string()).await.unwrap());
    }
}
