use super::helper::{self, StudentScope};
use crate::Settings;
use crate::errors::AppError;
use crate::model::principal::{Principal, StudentProfile};
use crate::schema::{activities, students};
use crate::uploads;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use deadpool_diesel::postgres::Pool;
use diesel::prelude::*;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Serves a stored certificate or proof.
///
/// Only files referenced by a submission of a student in the caller's scope
/// are served.
///
/// Returns
/// * the raw file with its content type (200 OK).
/// * `403 Forbidden`: If the owning student is outside the caller's scope.
/// * `404 Not Found`: If the name is not an issued upload name, no submission references it,
///   or the file is gone from disk.
/// * `500 Internal Server Error`: If a database or file system error occurs.
#[instrument(skip(pool, settings, principal))]
pub async fn get_upload(
    principal: Principal,
    State(pool): State<Pool>,
    State(settings): State<Arc<Settings>>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let not_found = || AppError::NotFound(format!("File {} not found", filename));
    let path = settings.uploads.resolve(&filename).ok_or_else(not_found)?;

    let owner = helper::run_query(&pool, {
        let filename = filename.clone();
        move |conn| {
            activities::table
                .inner_join(students::table)
                .filter(
                    activities::certificate
                        .eq(filename.clone())
                        .or(activities::proof.eq(filename)),
                )
                .select(StudentProfile::as_select())
                .first::<StudentProfile>(conn)
                .optional()
        }
    })
    .await?
    .ok_or_else(not_found)?;

    if !StudentScope::of(&principal).contains(&owner) {
        warn!(
            "{} {} denied access to a file of student {}",
            principal.role(),
            principal.key(),
            owner.prn
        );
        return Err(AppError::Forbidden(
            "This file belongs to a student outside your scope".to_string(),
        ));
    }

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!("Upload {} is referenced but missing on disk", filename);
            return Err(not_found());
        }
        Err(err) => return Err(err.into()),
    };

    info!("Serving {} ({} bytes)", filename, bytes.len());
    Ok(([(CONTENT_TYPE, uploads::content_type(&filename))], bytes).into_response())
}
