use super::helper::{self, StudentScope};
use crate::compliance::{self, Category, ComplianceTally};
use crate::errors::AppError;
use crate::model::dashboard::{
    CategoryAverage, CoordinatorDashboard, CoordinatorStats, StudentCertificates,
};
use crate::model::principal::{CoordinatorProfile, Principal, StudentProfile};
use crate::model::reference::{ActivityLevel, ActivityMaster};
use crate::model::submission::{PendingSubmission, Submission, VerificationOutcome};
use crate::payloads::coordinator::{
    CoordinatorAction, CoordinatorCommand, CoordinatorParams, VerifySubmissionPayload,
};
use crate::response::ApiResponse;
use crate::schema::{activities, activities_master, activity_levels, students};
use crate::verification::{self, SubmissionStatus, VerificationError};
use axum::Json;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use deadpool_diesel::postgres::Pool;
use diesel::prelude::*;
use tracing::{debug, info, instrument, warn};

const RECENT_PENDING: i64 = 10;

/// Dispatches `GET /coordinator` by its `action`.
#[instrument(skip(pool, principal))]
pub async fn get_coordinator(
    principal: Principal,
    State(pool): State<Pool>,
    Query(params): Query<CoordinatorParams>,
) -> Result<Response, AppError> {
    let coordinator = principal.as_coordinator()?.clone();
    helper::ensure_self(params.id.as_ref(), &coordinator.id)?;

    match params.action {
        CoordinatorAction::Dashboard => Ok(dashboard(&pool, coordinator).await?.into_response()),
        CoordinatorAction::PendingSubmissions => {
            Ok(pending_submissions(&pool, coordinator).await?.into_response())
        }
        CoordinatorAction::GetStudentCertificates => {
            let prn = params.prn.ok_or_else(|| {
                AppError::BadRequest("Missing required parameter 'prn'".to_string())
            })?;
            Ok(student_certificates(&pool, &principal, prn)
                .await?
                .into_response())
        }
    }
}

/// Builds the class overview of a coordinator.
///
/// Returns (wrapped in `ApiResponse`)
/// * `CoordinatorDashboard`: class stats, per-student standing, category averages
///   and the ten most recent pending submissions (200 OK).
/// * `500 Internal Server Error`: If a database error occurs.
async fn dashboard(
    pool: &Pool,
    coordinator: CoordinatorProfile,
) -> Result<ApiResponse<CoordinatorDashboard>, AppError> {
    info!(
        "Fetching dashboard for coordinator {} ({} year {})",
        coordinator.id, coordinator.department, coordinator.year
    );

    let (standings, pending_count, recent_pending) = helper::run_query(pool, {
        let department = coordinator.department.clone();
        let year = coordinator.year;
        move |conn| {
            let scope = StudentScope::Class {
                department: department.clone(),
                year,
            };
            let standings = helper::load_standings(conn, &scope)?;
            let pending_count = activities::table
                .inner_join(students::table)
                .filter(activities::status.eq(SubmissionStatus::Pending.as_str()))
                .filter(students::dept.eq(department.clone()))
                .filter(students::year.eq(year))
                .count()
                .get_result::<i64>(conn)?;
            let recent =
                helper::load_pending_for_class(conn, &department, year, true, Some(RECENT_PENDING))?;
            Ok((standings, pending_count, recent))
        }
    })
    .await?;

    let tally: ComplianceTally = standings.iter().map(|s| s.compliance()).collect();
    let category_averages = Category::ALL
        .iter()
        .map(|category| CategoryAverage {
            category: *category,
            name: category.display_name().to_string(),
            average_progress: compliance::average_progress(standings.iter().map(|s| {
                s.summary
                    .categories
                    .iter()
                    .find(|c| c.category == *category)
                    .map(|c| c.progress_percentage)
                    .unwrap_or(0.0)
            })),
        })
        .collect();

    debug!(
        "Coordinator {} class: {} students, {} pending",
        coordinator.id,
        standings.len(),
        pending_count
    );
    Ok(ApiResponse::ok(CoordinatorDashboard {
        stats: CoordinatorStats {
            total_students: standings.len() as i64,
            pending_submissions: pending_count,
            compliant: tally.compliant,
            in_progress: tally.in_progress,
            at_risk: tally.at_risk,
        },
        students: standings.iter().map(|s| s.to_row()).collect(),
        category_averages,
        recent_pending,
        coordinator,
    }))
}

/// Lists all pending submissions of the coordinator's class, oldest first.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<PendingSubmission>`: pending submissions with student and activity names (200 OK).
/// * `500 Internal Server Error`: If a database error occurs.
async fn pending_submissions(
    pool: &Pool,
    coordinator: CoordinatorProfile,
) -> Result<ApiResponse<Vec<PendingSubmission>>, AppError> {
    let pending = helper::run_query(pool, move |conn| {
        helper::load_pending_for_class(conn, &coordinator.department, coordinator.year, false, None)
    })
    .await?;

    info!("Fetched {} pending submissions", pending.len());
    Ok(ApiResponse::ok(pending))
}

/// Shows one class student's profile with all of their submissions.
///
/// Returns (wrapped in `ApiResponse`)
/// * `StudentCertificates`: the student and their submissions, newest first (200 OK).
/// * `403 Forbidden`: If the student is not in the coordinator's class.
/// * `404 Not Found`: If the PRN does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
async fn student_certificates(
    pool: &Pool,
    principal: &Principal,
    prn: String,
) -> Result<ApiResponse<StudentCertificates>, AppError> {
    let student = helper::load_student_in_scope(pool, principal, prn).await?;

    let submissions = helper::run_query(pool, {
        let prn = student.prn.clone();
        move |conn| helper::load_submission_views(conn, &prn, false, None)
    })
    .await?;

    info!(
        "Fetched {} submissions of student {}",
        submissions.len(),
        student.prn
    );
    Ok(ApiResponse::ok(StudentCertificates {
        student,
        submissions,
    }))
}

/// Dispatches `POST /coordinator` by its `action`.
#[instrument(skip(pool, principal, payload))]
pub async fn post_coordinator(
    principal: Principal,
    State(pool): State<Pool>,
    Json(payload): Json<CoordinatorCommand>,
) -> Result<ApiResponse<VerificationOutcome>, AppError> {
    match payload {
        CoordinatorCommand::VerifySubmission(payload) => {
            verify_submission(&pool, &principal, payload).await
        }
    }
}

/// Approves or rejects a pending submission.
///
/// The transition is a conditional update on `status = 'Pending'`, so a
/// submission is decided at most once.
///
/// Returns (wrapped in `ApiResponse`)
/// * `VerificationOutcome`: the new status, awarded points and verifier (200 OK).
/// * `403 Forbidden`: If the caller is not a coordinator, `coordinator_id` names someone else,
///   or the student is outside the coordinator's class.
/// * `404 Not Found`: If the submission does not exist.
/// * `409 Conflict`: If the submission was already approved or rejected.
/// * `422 Unprocessable Entity`: If the awarded points are negative or above the level's cap.
/// * `500 Internal Server Error`: If a database error occurs.
async fn verify_submission(
    pool: &Pool,
    principal: &Principal,
    payload: VerifySubmissionPayload,
) -> Result<ApiResponse<VerificationOutcome>, AppError> {
    let coordinator = principal.as_coordinator()?.clone();
    helper::ensure_self(payload.coordinator_id.as_ref(), &coordinator.id)?;
    let submission_id = payload.submission_id;
    info!(
        "Coordinator {} verifying submission {} ({:?})",
        coordinator.id, submission_id, payload.verification_action
    );

    let found = helper::run_query(pool, move |conn| {
        let row = activities::table
            .inner_join(students::table)
            .inner_join(activities_master::table)
            .filter(activities::id.eq(submission_id))
            .select((
                Submission::as_select(),
                StudentProfile::as_select(),
                ActivityMaster::as_select(),
            ))
            .first::<(Submission, StudentProfile, ActivityMaster)>(conn)
            .optional()?;
        let Some((submission, student, activity)) = row else {
            return Ok(None);
        };
        let levels = activity_levels::table
            .filter(activity_levels::activity_id.eq(activity.id))
            .order(activity_levels::id.asc())
            .select(ActivityLevel::as_select())
            .load::<ActivityLevel>(conn)?;
        Ok(Some((submission, student, activity, levels)))
    })
    .await?;

    let Some((submission, student, activity, levels)) = found else {
        warn!("Submission {} not found", submission_id);
        return Err(AppError::NotFound(format!(
            "Submission with ID {} not found",
            submission_id
        )));
    };

    if !StudentScope::of(principal).contains(&student) {
        warn!(
            "Coordinator {} may not verify submission {} of student {}",
            coordinator.id, submission_id, student.prn
        );
        return Err(AppError::Forbidden(format!(
            "Submission {} belongs to a student outside your class",
            submission_id
        )));
    }

    let current = submission.status.parse::<SubmissionStatus>().map_err(|e| {
        AppError::InternalServerError(anyhow::anyhow!(
            "Submission {} has an invalid status: {}",
            submission_id,
            e
        ))
    })?;
    let cap = activity.scale(&levels).cap_for(&submission.level);
    let award = verification::decide(current, payload.verification_action, payload.points, cap)
        .map_err(|err| match err {
            VerificationError::AlreadyDecided(_) => AppError::Conflict(err.to_string()),
            VerificationError::NegativePoints(_) | VerificationError::ExceedsCap { .. } => {
                AppError::UnprocessableEntity(err.to_string())
            }
        })?;

    let remarks = payload
        .remarks
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    let verifier = coordinator.id;
    let verified_at = helper::run_query(pool, move |conn| {
        diesel::update(
            activities::table
                .filter(activities::id.eq(submission_id))
                .filter(activities::status.eq(SubmissionStatus::Pending.as_str())),
        )
        .set((
            activities::status.eq(award.status.as_str()),
            activities::points.eq(award.points),
            activities::coordinator_remarks.eq(remarks),
            activities::verified_by.eq(Some(verifier)),
            activities::verified_at.eq(Some(Utc::now())),
        ))
        .returning(activities::verified_at)
        .get_result::<Option<DateTime<Utc>>>(conn)
        .optional()
    })
    .await?;

    let Some(Some(verified_at)) = verified_at else {
        warn!(
            "Submission {} was decided concurrently before coordinator {}",
            submission_id, coordinator.id
        );
        return Err(AppError::Conflict(format!(
            "Submission {} has already been verified",
            submission_id
        )));
    };

    info!(
        "Submission {} {} by coordinator {} with {} points",
        submission_id, award.status, coordinator.id, award.points
    );
    Ok(ApiResponse::ok(VerificationOutcome {
        submission_id,
        status: award.status.as_str().to_string(),
        points: award.points,
        verified_by: verifier,
        verified_at,
    })
    .with_message(format!("Submission {}", award.status.as_str().to_lowercase())))
}
