use super::helper::{self, StudentScope};
use crate::Settings;
use crate::errors::AppError;
use crate::model::dashboard::{StudentDashboard, StudentProgress};
use crate::model::principal::Principal;
use crate::model::reference::{ActivityLevel, ActivityMaster, FIXED_LEVEL, PointsType};
use crate::model::submission::{NewSubmission, SubmissionReceipt, SubmissionView};
use crate::payloads::student::{StudentAction, StudentParams, SubmissionForm};
use crate::response::ApiResponse;
use crate::schema::{activities, activities_master, activity_levels};
use crate::uploads::FileSlot;
use crate::verification::{SubmissionStatus, same_level};
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use deadpool_diesel::postgres::Pool;
use diesel::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

const RECENT_SUBMISSIONS: i64 = 5;

/// Dispatches `GET /student` by its `action`.
#[instrument(skip(pool, principal))]
pub async fn get_student(
    principal: Principal,
    State(pool): State<Pool>,
    Query(params): Query<StudentParams>,
) -> Result<Response, AppError> {
    let prn = match (params.prn, &principal) {
        (Some(prn), _) => prn,
        (None, Principal::Student(student)) => student.prn.clone(),
        (None, _) => {
            return Err(AppError::BadRequest(
                "Missing required parameter 'prn'".to_string(),
            ));
        }
    };

    match params.action {
        StudentAction::Dashboard => Ok(dashboard(&pool, &principal, prn).await?.into_response()),
        StudentAction::MySubmissions => {
            Ok(my_submissions(&pool, &principal, prn).await?.into_response())
        }
    }
}

/// Builds a student's progress overview.
///
/// Returns (wrapped in `ApiResponse`)
/// * `StudentDashboard`: totals, compliance, category breakdown and the five latest submissions (200 OK).
/// * `403 Forbidden`: If the student is outside the caller's scope.
/// * `404 Not Found`: If the PRN does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
async fn dashboard(
    pool: &Pool,
    principal: &Principal,
    prn: String,
) -> Result<ApiResponse<StudentDashboard>, AppError> {
    info!("Fetching dashboard for student {}", prn);
    let student = helper::load_student_in_scope(pool, principal, prn).await?;

    let (standing, recent) = helper::run_query(pool, {
        let prn = student.prn.clone();
        move |conn| {
            let standing = helper::load_standings(conn, &StudentScope::Single(prn.clone()))?
                .into_iter()
                .next();
            let recent = helper::load_submission_views(conn, &prn, false, Some(RECENT_SUBMISSIONS))?;
            Ok((standing, recent))
        }
    })
    .await?;

    let standing = standing.ok_or_else(|| {
        AppError::NotFound(format!("Student with PRN {} not found", student.prn))
    })?;

    debug!(
        "Student {} earned {} of {} points",
        student.prn, standing.summary.earned_points, standing.summary.required_points
    );
    Ok(ApiResponse::ok(StudentDashboard {
        progress: StudentProgress {
            earned_points: standing.summary.earned_points,
            required_points: standing.summary.required_points,
            progress_percentage: standing.summary.progress_percentage,
            compliance: standing.summary.compliance,
            total_submissions: standing.total_submissions,
            approved_submissions: standing.approved_submissions,
        },
        categories: standing.summary.categories,
        recent_submissions: recent,
        student,
    }))
}

/// Lists every submission of a student, newest first.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<SubmissionView>`: submissions with activity names (200 OK).
/// * `403 Forbidden`: If the student is outside the caller's scope.
/// * `404 Not Found`: If the PRN does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
async fn my_submissions(
    pool: &Pool,
    principal: &Principal,
    prn: String,
) -> Result<ApiResponse<Vec<SubmissionView>>, AppError> {
    let student = helper::load_student_in_scope(pool, principal, prn).await?;

    let submissions = helper::run_query(pool, move |conn| {
        helper::load_submission_views(conn, &student.prn, false, None)
    })
    .await?;

    info!("Fetched {} submissions", submissions.len());
    Ok(ApiResponse::ok(submissions))
}

struct UploadedFile {
    file_name: String,
    bytes: Vec<u8>,
}

/// Records a new activity claim with its certificate and proof.
///
/// Request Body: multipart form with `action=submit_activity`, the fields of
/// `SubmissionForm` and the files `certificate` and `proof`.
///
/// Returns (wrapped in `ApiResponse`)
/// * `SubmissionReceipt`: id and stored file names of the new Pending submission (201 Created).
/// * `400 Bad Request`: If a field or file is missing or malformed.
/// * `403 Forbidden`: If the caller is not the student named by `prn`.
/// * `404 Not Found`: If the activity does not exist.
/// * `413 Payload Too Large`: If a file exceeds the upload limit.
/// * `422 Unprocessable Entity`: If the activity is inactive, in another category, or the level is unknown.
/// * `500 Internal Server Error`: If storing the files or the row fails.
#[instrument(skip(pool, settings, principal, multipart))]
pub async fn submit_activity(
    principal: Principal,
    State(pool): State<Pool>,
    State(settings): State<Arc<Settings>>,
    mut multipart: Multipart,
) -> Result<ApiResponse<SubmissionReceipt>, AppError> {
    let student = principal.as_student()?.clone();

    let mut fields = HashMap::new();
    let mut files: HashMap<&'static str, UploadedFile> = HashMap::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match FileSlot::from_field_name(&name) {
            Some(slot) => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                files.insert(
                    slot.field_name(),
                    UploadedFile {
                        file_name,
                        bytes: bytes.to_vec(),
                    },
                );
            }
            None => {
                let value = field.text().await?;
                fields.insert(name, value);
            }
        }
    }

    let form = SubmissionForm::from_fields(&fields)?;
    helper::ensure_self(Some(&form.prn), &student.prn)?;
    info!(
        "Student {} submitting activity {} in category {}",
        student.prn, form.activity_type, form.category
    );

    let uploads = &settings.uploads;
    let mut validated = Vec::with_capacity(2);
    for slot in [FileSlot::Certificate, FileSlot::Proof] {
        let file = files.remove(slot.field_name()).ok_or_else(|| {
            AppError::BadRequest(format!("Missing required file '{}'", slot.field_name()))
        })?;
        slot.extension_for(&file.file_name)?;
        uploads.check_size(slot, file.bytes.len())?;
        validated.push((slot, file));
    }

    let level = resolve_level(&pool, &form).await?;

    let mut stored = Vec::with_capacity(2);
    for (slot, file) in &validated {
        match uploads.store(*slot, &file.file_name, &file.bytes).await {
            Ok(name) => stored.push(name),
            Err(err) => {
                uploads.discard(&stored).await;
                return Err(err);
            }
        }
    }
    let (certificate, proof) = (stored[0].clone(), stored[1].clone());

    let new_submission = NewSubmission {
        prn: student.prn.clone(),
        category: form.category.code().to_string(),
        activity_type: form.activity_type,
        level,
        date: form.date,
        certificate: certificate.clone(),
        proof: Some(proof.clone()),
        proof_type: Some(form.proof_type.as_str().to_string()),
        remarks: form.remarks,
    };

    let inserted = helper::run_query(&pool, move |conn| {
        diesel::insert_into(activities::table)
            .values(&new_submission)
            .returning(activities::id)
            .get_result::<i64>(conn)
    })
    .await;

    match inserted {
        Ok(id) => {
            info!("Student {} created submission {}", student.prn, id);
            Ok(ApiResponse::success(
                StatusCode::CREATED,
                SubmissionReceipt {
                    id,
                    status: SubmissionStatus::Pending.as_str().to_string(),
                    certificate,
                    proof,
                },
            )
            .with_message("Activity submitted successfully"))
        }
        Err(err) => {
            error!("Submission insert failed, removing stored files: {}", err);
            uploads.discard(&stored).await;
            Err(err)
        }
    }
}

/// Checks the claimed activity and returns the level label to store.
async fn resolve_level(pool: &Pool, form: &SubmissionForm) -> Result<String, AppError> {
    let activity_id = form.activity_type;
    let found = helper::run_query(pool, move |conn| {
        let activity = activities_master::table
            .find(activity_id)
            .select(ActivityMaster::as_select())
            .first::<ActivityMaster>(conn)
            .optional()?;
        let levels = match &activity {
            Some(_) => activity_levels::table
                .filter(activity_levels::activity_id.eq(activity_id))
                .order(activity_levels::id.asc())
                .select(ActivityLevel::as_select())
                .load::<ActivityLevel>(conn)?,
            None => Vec::new(),
        };
        Ok(activity.map(|a| (a, levels)))
    })
    .await?;

    let Some((activity, levels)) = found else {
        return Err(AppError::NotFound(format!(
            "Activity with ID {} not found",
            activity_id
        )));
    };
    if !activity.active {
        warn!("Submission for inactive activity {}", activity.id);
        return Err(AppError::UnprocessableEntity(format!(
            "Activity '{}' is no longer accepting submissions",
            activity.activity_name
        )));
    }
    if activity.category != form.category.code() {
        return Err(AppError::UnprocessableEntity(format!(
            "Activity '{}' belongs to category {}, not {}",
            activity.activity_name, activity.category, form.category
        )));
    }

    match activity.points_type() {
        PointsType::Fixed if form.level.is_empty() || same_level(&form.level, FIXED_LEVEL) => {
            Ok(FIXED_LEVEL.to_string())
        }
        PointsType::Fixed => Err(AppError::UnprocessableEntity(format!(
            "Activity '{}' awards fixed points and has no level '{}'",
            activity.activity_name, form.level
        ))),
        PointsType::Level => levels
            .iter()
            .find(|l| same_level(&l.level, &form.level))
            .map(|l| l.level.clone())
            .ok_or_else(|| {
                AppError::UnprocessableEntity(format!(
                    "Unknown level '{}' for activity '{}'",
                    form.level, activity.activity_name
                ))
            }),
    }
}
