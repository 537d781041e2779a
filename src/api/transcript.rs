use super::helper;
use crate::compliance;
use crate::errors::AppError;
use crate::model::dashboard::{Transcript, TranscriptSummary};
use crate::model::principal::Principal;
use crate::payloads::transcript::{TranscriptAction, TranscriptParams};
use crate::response::ApiResponse;
use crate::schema::activities;
use crate::verification::SubmissionStatus;
use axum::extract::{Query, State};
use chrono::Utc;
use deadpool_diesel::postgres::Pool;
use diesel::prelude::*;
use tracing::{info, instrument};

/// Builds the MAP transcript of a student.
///
/// Only approved activities appear, most recent activity date first.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Transcript`: profile, summary, category breakdown and approved activities (200 OK).
/// * `400 Bad Request`: If a staff caller omits `prn`.
/// * `403 Forbidden`: If the student is outside the caller's scope.
/// * `404 Not Found`: If the PRN does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, principal))]
pub async fn get_transcript(
    principal: Principal,
    State(pool): State<Pool>,
    Query(params): Query<TranscriptParams>,
) -> Result<ApiResponse<Transcript>, AppError> {
    let TranscriptAction::Get = params.action;
    let prn = match (params.prn, &principal) {
        (Some(prn), _) => prn,
        (None, Principal::Student(student)) => student.prn.clone(),
        (None, _) => {
            return Err(AppError::BadRequest(
                "Missing required parameter 'prn'".to_string(),
            ));
        }
    };
    info!("Generating transcript for student {}", prn);

    let student = helper::load_student_in_scope(&pool, &principal, prn).await?;

    let (rule, ledger, approved) = helper::run_query(&pool, {
        let student = student.clone();
        move |conn| {
            let rule = helper::find_rule(conn, &student)?;
            let ledger = activities::table
                .filter(activities::prn.eq(&student.prn))
                .filter(activities::status.eq(SubmissionStatus::Approved.as_str()))
                .select((activities::category, activities::points))
                .load::<(String, i32)>(conn)?;
            let approved = helper::load_submission_views(conn, &student.prn, true, None)?;
            Ok((rule, ledger, approved))
        }
    })
    .await?;

    let entries: Vec<compliance::LedgerEntry> = ledger
        .into_iter()
        .filter_map(|(category, points)| {
            category.parse().ok().map(|category| compliance::LedgerEntry {
                category,
                status: SubmissionStatus::Approved,
                points: i64::from(points),
            })
        })
        .collect();
    let summary = compliance::summarize(&entries, rule.as_ref());

    info!(
        "Transcript for {}: {} of {} points ({})",
        student.prn,
        summary.earned_points,
        summary.required_points,
        summary.compliance.label()
    );
    Ok(ApiResponse::ok(Transcript {
        summary: TranscriptSummary {
            earned_points: summary.earned_points,
            required_points: summary.required_points,
            progress_percentage: summary.progress_percentage,
            compliance: summary.compliance,
            approved_activities: approved.len() as i64,
        },
        categories: summary.categories,
        activities: approved,
        generated_at: Utc::now(),
        student,
    }))
}
