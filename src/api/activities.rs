use super::admin::load_catalog;
use super::helper;
use crate::compliance::Category;
use crate::errors::AppError;
use crate::model::principal::Principal;
use crate::model::reference::{ActivityLevel, ActivityMaster, ActivityWithLevels, LevelPoints};
use crate::payloads::activities::{ActivitiesAction, ActivitiesParams};
use crate::response::ApiResponse;
use crate::schema::{activities_master, activity_levels};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use deadpool_diesel::postgres::Pool;
use diesel::prelude::*;
use tracing::{info, instrument};

/// Dispatches `GET /activities` by its `action`. Open to every authenticated role.
#[instrument(skip(pool, _principal))]
pub async fn get_activities(
    _principal: Principal,
    State(pool): State<Pool>,
    Query(params): Query<ActivitiesParams>,
) -> Result<Response, AppError> {
    match params.action {
        ActivitiesAction::GetByCategory => {
            let category = params
                .category
                .ok_or_else(|| {
                    AppError::BadRequest("Missing required parameter 'category'".to_string())
                })?
                .parse::<Category>()
                .map_err(AppError::BadRequest)?;
            Ok(by_category(&pool, category).await?.into_response())
        }
        ActivitiesAction::GetLevels => {
            let activity_id = params.activity_id.ok_or_else(|| {
                AppError::BadRequest("Missing required parameter 'activity_id'".to_string())
            })?;
            Ok(levels(&pool, activity_id).await?.into_response())
        }
    }
}

/// Returns (wrapped in `ApiResponse`)
/// * `Vec<ActivityWithLevels>`: active activities of the category with their levels (200 OK).
/// * `500 Internal Server Error`: If a database error occurs.
async fn by_category(
    pool: &Pool,
    category: Category,
) -> Result<ApiResponse<Vec<ActivityWithLevels>>, AppError> {
    let catalog =
        helper::run_query(pool, move |conn| load_catalog(conn, Some(category), true)).await?;
    info!(
        "Fetched {} active activities in category {}",
        catalog.len(),
        category
    );
    Ok(ApiResponse::ok(catalog))
}

/// Levels a student can claim for an activity.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<LevelPoints>`: `[{level: "Fixed", points}]` for fixed activities,
///   otherwise the stored levels in insertion order (200 OK).
/// * `404 Not Found`: If the activity does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
async fn levels(pool: &Pool, activity_id: i64) -> Result<ApiResponse<Vec<LevelPoints>>, AppError> {
    let options = helper::run_query(pool, move |conn| {
        let Some(activity) = activities_master::table
            .find(activity_id)
            .select(ActivityMaster::as_select())
            .first::<ActivityMaster>(conn)
            .optional()?
        else {
            return Ok(None);
        };
        let levels = activity_levels::table
            .filter(activity_levels::activity_id.eq(activity_id))
            .order(activity_levels::id.asc())
            .select(ActivityLevel::as_select())
            .load::<ActivityLevel>(conn)?;
        Ok(Some(activity.level_options(&levels)))
    })
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Activity with ID {} not found", activity_id)))?;

    info!("Fetched {} levels for activity {}", options.len(), activity_id);
    Ok(ApiResponse::ok(options))
}
