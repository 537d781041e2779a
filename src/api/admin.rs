use super::helper::{self, Standing, StudentScope};
use crate::Settings;
use crate::auth::hash_password;
use crate::compliance::{self, Category, Compliance, ComplianceTally};
use crate::errors::AppError;
use crate::model::dashboard::{
    AdminDashboard, AdminStats, DepartmentRow, MonthlyTrend, ProgrammeRow,
};
use crate::model::principal::{
    AdminChangeset, AdminProfile, CoordinatorChangeset, CoordinatorProfile, HodChangeset,
    HodProfile, NewAdmin, NewCoordinator, NewHod, NewStudent, Principal, Role, StudentChangeset,
    StudentProfile, UserListing,
};
use crate::model::reference::{
    ActivityLevel, ActivityMaster, ActivityWithLevels, LevelPoints, NewActivityLevel,
    ProgrammeRule,
};
use crate::payloads::admin::{
    ActivityPayload, AdminCommand, AdminParams, AdminQuery, ProgramRulePayload, UserPayload,
    ValidatedActivity,
};
use crate::response::ApiResponse;
use crate::schema::{
    activities, activities_master, activity_levels, admins, coordinators, hods, programme_rules,
    students,
};
use crate::verification::SubmissionStatus;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use deadpool_diesel::postgres::Pool;
use diesel::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const TREND_MONTHS: u32 = 6;

/// Dispatches `GET /admin` by its `action`.
#[instrument(skip(pool, principal))]
pub async fn get_admin(
    principal: Principal,
    State(pool): State<Pool>,
    Query(params): Query<AdminParams>,
) -> Result<Response, AppError> {
    principal.as_admin()?;

    match params.action {
        AdminQuery::Dashboard => Ok(dashboard(&pool).await?.into_response()),
        AdminQuery::GetUsers => Ok(get_users(&pool, params.user_type.unwrap_or(Role::Student))
            .await?
            .into_response()),
        AdminQuery::GetProgramRules => Ok(get_program_rules(&pool).await?.into_response()),
        AdminQuery::GetActivities => {
            let category = params
                .category
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .map(|c| c.parse::<Category>().map_err(AppError::BadRequest))
                .transpose()?;
            Ok(get_activities(&pool, category).await?.into_response())
        }
    }
}

/// Builds the institution-wide overview.
///
/// Returns (wrapped in `ApiResponse`)
/// * `AdminDashboard`: system stats, programme and department rows, six-month trend (200 OK).
/// * `500 Internal Server Error`: If a database error occurs.
async fn dashboard(pool: &Pool) -> Result<ApiResponse<AdminDashboard>, AppError> {
    info!("Fetching admin dashboard");
    let today = Utc::now().date_naive();
    let window_start = trend_window_start(today);

    let (standings, programmes_with_rules, submitted, approved) =
        helper::run_query(pool, move |conn| {
            let standings = helper::load_standings(conn, &StudentScope::All)?;
            let programmes_with_rules = programme_rules::table
                .select(programme_rules::programme)
                .distinct()
                .load::<String>(conn)?
                .len() as i64;
            let since = window_start
                .and_hms_opt(0, 0, 0)
                .map(|t| t.and_utc())
                .unwrap_or_else(Utc::now);
            let submitted = activities::table
                .filter(activities::submitted_at.ge(since))
                .select(activities::submitted_at)
                .load::<DateTime<Utc>>(conn)?;
            let approved = activities::table
                .filter(activities::status.eq(SubmissionStatus::Approved.as_str()))
                .filter(activities::verified_at.ge(since))
                .select(activities::verified_at)
                .load::<Option<DateTime<Utc>>>(conn)?
                .into_iter()
                .flatten()
                .collect::<Vec<_>>();
            Ok((standings, programmes_with_rules, submitted, approved))
        })
        .await?;

    let stats = AdminStats {
        total_students: standings.len() as i64,
        approved_activities: standings.iter().map(|s| s.approved_submissions).sum(),
        average_progress: compliance::average_progress(standings.iter().map(|s| s.progress())),
        programmes_with_rules,
    };
    debug!(
        "Admin dashboard covers {} students and {} approved activities",
        stats.total_students, stats.approved_activities
    );

    Ok(ApiResponse::ok(AdminDashboard {
        stats,
        programmes: programme_rows(&standings),
        departments: department_rows(&standings),
        trends: monthly_trends(today, &submitted, &approved),
    }))
}

fn group_by<'a, F>(standings: &'a [Standing], key: F) -> BTreeMap<String, Vec<&'a Standing>>
where
    F: Fn(&Standing) -> &str,
{
    let mut groups: BTreeMap<String, Vec<&Standing>> = BTreeMap::new();
    for standing in standings {
        groups.entry(key(standing).to_string()).or_default().push(standing);
    }
    groups
}

fn programme_rows(standings: &[Standing]) -> Vec<ProgrammeRow> {
    group_by(standings, |s| s.student.programme.as_str())
        .into_iter()
        .map(|(programme, members)| ProgrammeRow {
            programme,
            students: members.len() as i64,
            eligible: members
                .iter()
                .filter(|s| s.compliance() == Compliance::Compliant)
                .count() as i64,
            average_progress: compliance::average_progress(members.iter().map(|s| s.progress())),
            approved_activities: members.iter().map(|s| s.approved_submissions).sum(),
        })
        .collect()
}

fn department_rows(standings: &[Standing]) -> Vec<DepartmentRow> {
    group_by(standings, |s| s.student.dept.as_str())
        .into_iter()
        .map(|(department, members)| {
            let tally: ComplianceTally = members.iter().map(|s| s.compliance()).collect();
            DepartmentRow {
                department,
                students: members.len() as i64,
                compliant: tally.compliant,
                at_risk: tally.at_risk,
                average_progress: compliance::average_progress(
                    members.iter().map(|s| s.progress()),
                ),
                approved_activities: members.iter().map(|s| s.approved_submissions).sum(),
            }
        })
        .collect()
}

/// First day of the oldest month in the trend window ending at `today`.
fn trend_window_start(today: NaiveDate) -> NaiveDate {
    let first_of_month = today.with_day(1).unwrap_or(today);
    first_of_month
        .checked_sub_months(Months::new(TREND_MONTHS - 1))
        .unwrap_or(first_of_month)
}

/// Counts submissions and approvals per month, oldest month first.
fn monthly_trends(
    today: NaiveDate,
    submitted: &[DateTime<Utc>],
    approved: &[DateTime<Utc>],
) -> Vec<MonthlyTrend> {
    let start = trend_window_start(today);
    let months: Vec<NaiveDate> = (0..TREND_MONTHS)
        .filter_map(|offset| start.checked_add_months(Months::new(offset)))
        .collect();

    let mut counts: HashMap<(i32, u32), (i64, i64)> = months
        .iter()
        .map(|m| ((m.year(), m.month()), (0, 0)))
        .collect();
    for at in submitted {
        if let Some(entry) = counts.get_mut(&(at.year(), at.month())) {
            entry.0 += 1;
        }
    }
    for at in approved {
        if let Some(entry) = counts.get_mut(&(at.year(), at.month())) {
            entry.1 += 1;
        }
    }

    months
        .iter()
        .map(|m| {
            let (submissions, approvals) = counts
                .get(&(m.year(), m.month()))
                .copied()
                .unwrap_or((0, 0));
            MonthlyTrend {
                month: m.format("%Y-%m").to_string(),
                submissions,
                approvals,
            }
        })
        .collect()
}

/// Lists the users of one role.
///
/// Returns (wrapped in `ApiResponse`)
/// * `UserListing`: profiles without password hashes (200 OK).
/// * `500 Internal Server Error`: If a database error occurs.
async fn get_users(pool: &Pool, role: Role) -> Result<ApiResponse<UserListing>, AppError> {
    let listing = helper::run_query(pool, move |conn| {
        Ok(match role {
            Role::Student => UserListing::Students(
                students::table
                    .select(StudentProfile::as_select())
                    .order((students::first_name.asc(), students::last_name.asc()))
                    .load(conn)?,
            ),
            Role::Coordinator => UserListing::Coordinators(
                coordinators::table
                    .select(CoordinatorProfile::as_select())
                    .order((
                        coordinators::department.asc(),
                        coordinators::year.asc(),
                        coordinators::name.asc(),
                    ))
                    .load(conn)?,
            ),
            Role::Hod => UserListing::Hods(
                hods::table
                    .select(HodProfile::as_select())
                    .order((hods::department.asc(), hods::name.asc()))
                    .load(conn)?,
            ),
            Role::Admin => UserListing::Admins(
                admins::table
                    .select(AdminProfile::as_select())
                    .order(admins::name.asc())
                    .load(conn)?,
            ),
        })
    })
    .await?;

    info!("Listed {} users", role);
    Ok(ApiResponse::ok(listing))
}

/// Returns (wrapped in `ApiResponse`)
/// * `Vec<ProgrammeRule>`: newest admission year first (200 OK).
/// * `500 Internal Server Error`: If a database error occurs.
async fn get_program_rules(pool: &Pool) -> Result<ApiResponse<Vec<ProgrammeRule>>, AppError> {
    let rules = helper::run_query(pool, |conn| {
        programme_rules::table
            .select(ProgrammeRule::as_select())
            .order((
                programme_rules::admission_year.desc(),
                programme_rules::programme.asc(),
            ))
            .load::<ProgrammeRule>(conn)
    })
    .await?;

    info!("Fetched {} programme rules", rules.len());
    Ok(ApiResponse::ok(rules))
}

/// Loads catalog entries with their levels, in stored level order.
pub(crate) fn load_catalog(
    conn: &mut PgConnection,
    category: Option<Category>,
    active_only: bool,
) -> QueryResult<Vec<ActivityWithLevels>> {
    let mut query = activities_master::table
        .select(ActivityMaster::as_select())
        .order((activities_master::activity_name.asc(), activities_master::id.asc()))
        .into_boxed();
    if let Some(category) = category {
        query = query.filter(activities_master::category.eq(category.code()));
    }
    if active_only {
        query = query.filter(activities_master::active.eq(true));
    }
    let catalog = query.load::<ActivityMaster>(conn)?;

    let ids: Vec<i64> = catalog.iter().map(|a| a.id).collect();
    let mut levels: HashMap<i64, Vec<LevelPoints>> = HashMap::new();
    for level in activity_levels::table
        .filter(activity_levels::activity_id.eq_any(&ids))
        .order(activity_levels::id.asc())
        .select(ActivityLevel::as_select())
        .load::<ActivityLevel>(conn)?
    {
        levels.entry(level.activity_id).or_default().push(LevelPoints {
            level: level.level,
            points: level.points,
        });
    }

    Ok(catalog
        .into_iter()
        .map(|activity| {
            let activity_levels = levels.remove(&activity.id).unwrap_or_default();
            ActivityWithLevels::assemble(activity, activity_levels)
        })
        .collect())
}

/// Lists the catalog including inactive activities.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<ActivityWithLevels>`: activities ordered by name (200 OK).
/// * `500 Internal Server Error`: If a database error occurs.
async fn get_activities(
    pool: &Pool,
    category: Option<Category>,
) -> Result<ApiResponse<Vec<ActivityWithLevels>>, AppError> {
    let catalog = helper::run_query(pool, move |conn| load_catalog(conn, category, false)).await?;
    info!("Fetched {} catalog activities", catalog.len());
    Ok(ApiResponse::ok(catalog))
}

/// Dispatches `POST /admin` by its `action`.
#[instrument(skip(pool, settings, principal, payload))]
pub async fn post_admin(
    principal: Principal,
    State(pool): State<Pool>,
    State(settings): State<Arc<Settings>>,
    Json(payload): Json<AdminCommand>,
) -> Result<Response, AppError> {
    let admin = principal.as_admin()?;
    debug!("Admin {} issued command", admin.id);

    match payload {
        AdminCommand::CreateUser(user) => {
            Ok(create_user(&pool, &settings, user).await?.into_response())
        }
        AdminCommand::UpdateUser(user) => {
            Ok(update_user(&pool, &settings, user).await?.into_response())
        }
        AdminCommand::CreateProgramRule(rule) => {
            Ok(create_program_rule(&pool, rule).await?.into_response())
        }
        AdminCommand::UpdateProgramRule { id, rule } => {
            Ok(update_program_rule(&pool, id, rule).await?.into_response())
        }
        AdminCommand::DeleteProgramRule { id } => {
            Ok(delete_program_rule(&pool, id).await?.into_response())
        }
        AdminCommand::CreateActivity(activity) => {
            Ok(create_activity(&pool, activity).await?.into_response())
        }
        AdminCommand::UpdateActivity { id, activity } => {
            Ok(update_activity(&pool, id, activity).await?.into_response())
        }
        AdminCommand::DeleteActivity { id } => {
            Ok(delete_activity(&pool, id).await?.into_response())
        }
    }
}

/// Creates a user of any role. Returns the login identifier.
///
/// Returns (wrapped in `ApiResponse`)
/// * `String`: the PRN or the new numeric id (201 Created).
/// * `409 Conflict`: If a student with that PRN already exists.
/// * `422 Unprocessable Entity`: If a field is invalid or the password is missing.
/// * `500 Internal Server Error`: If a database or hashing error occurs.
async fn create_user(
    pool: &Pool,
    settings: &Settings,
    user: UserPayload,
) -> Result<ApiResponse<String>, AppError> {
    user.validate()?;
    let role = user.role();
    let password = user.password().cloned().ok_or_else(|| {
        AppError::UnprocessableEntity("A password is required for new users".to_string())
    })?;
    let password_hash = hash_password(password.expose().to_string(), settings.bcrypt_cost).await?;

    let key = match user {
        UserPayload::Student(s) => {
            let prn = s.prn.trim().to_string();
            let new_student = NewStudent {
                prn: prn.clone(),
                first_name: s.first_name.trim().to_string(),
                middle_name: s.middle_name.map(|m| m.trim().to_string()).filter(|m| !m.is_empty()),
                last_name: s.last_name.trim().to_string(),
                dept: s.dept.trim().to_string(),
                year: s.year,
                programme: s.programme.trim().to_string(),
                admission_year: s.admission_year,
                course_duration: s.course_duration,
                password_hash,
            };
            let conn = pool.get().await?;
            conn.interact(move |conn| {
                diesel::insert_into(students::table)
                    .values(&new_student)
                    .execute(conn)
            })
            .await?
            .map_err(|e| {
                helper::conflict_on_duplicate(e, format!("Student with PRN {} already exists", prn))
            })?;
            prn
        }
        UserPayload::Coordinator(c) => {
            let new_coordinator = NewCoordinator {
                name: c.name.trim().to_string(),
                department: c.department.trim().to_string(),
                year: c.year,
                password_hash,
            };
            helper::run_query(pool, move |conn| {
                diesel::insert_into(coordinators::table)
                    .values(&new_coordinator)
                    .returning(coordinators::id)
                    .get_result::<i64>(conn)
            })
            .await?
            .to_string()
        }
        UserPayload::Hod(h) => {
            let new_hod = NewHod {
                name: h.name.trim().to_string(),
                department: h.department.trim().to_string(),
                password_hash,
            };
            helper::run_query(pool, move |conn| {
                diesel::insert_into(hods::table)
                    .values(&new_hod)
                    .returning(hods::id)
                    .get_result::<i64>(conn)
            })
            .await?
            .to_string()
        }
        UserPayload::Admin(a) => {
            let new_admin = NewAdmin {
                name: a.name.trim().to_string(),
                password_hash,
            };
            helper::run_query(pool, move |conn| {
                diesel::insert_into(admins::table)
                    .values(&new_admin)
                    .returning(admins::id)
                    .get_result::<i64>(conn)
            })
            .await?
            .to_string()
        }
    };

    info!("Created {} {}", role, key);
    Ok(ApiResponse::success(StatusCode::CREATED, key).with_message("User saved successfully"))
}

/// Updates a user's profile, and their password when one is supplied.
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool`: true if the user was updated (200 OK).
/// * `404 Not Found`: If no such user exists.
/// * `422 Unprocessable Entity`: If a field is invalid or `user_id` is missing for staff.
/// * `500 Internal Server Error`: If a database or hashing error occurs.
async fn update_user(
    pool: &Pool,
    settings: &Settings,
    user: UserPayload,
) -> Result<ApiResponse<bool>, AppError> {
    user.validate()?;
    let role = user.role();
    let password_hash = match user.password() {
        Some(password) => {
            Some(hash_password(password.expose().to_string(), settings.bcrypt_cost).await?)
        }
        None => None,
    };
    let missing_id =
        || AppError::UnprocessableEntity("Field 'user_id' is required to update staff".to_string());

    let (key, updated) = match user {
        UserPayload::Student(s) => {
            let prn = s.prn.trim().to_string();
            let changes = StudentChangeset {
                first_name: s.first_name.trim().to_string(),
                middle_name: Some(s.middle_name.map(|m| m.trim().to_string()).filter(|m| !m.is_empty())),
                last_name: s.last_name.trim().to_string(),
                dept: s.dept.trim().to_string(),
                year: s.year,
                programme: s.programme.trim().to_string(),
                admission_year: s.admission_year,
                course_duration: s.course_duration,
                password_hash,
            };
            let target = prn.clone();
            let updated = helper::run_query(pool, move |conn| {
                diesel::update(students::table.find(target))
                    .set(&changes)
                    .execute(conn)
            })
            .await?;
            (prn, updated)
        }
        UserPayload::Coordinator(c) => {
            let id = c.user_id.ok_or_else(missing_id)?;
            let changes = CoordinatorChangeset {
                name: c.name.trim().to_string(),
                department: c.department.trim().to_string(),
                year: c.year,
                password_hash,
            };
            let updated = helper::run_query(pool, move |conn| {
                diesel::update(coordinators::table.find(id))
                    .set(&changes)
                    .execute(conn)
            })
            .await?;
            (id.to_string(), updated)
        }
        UserPayload::Hod(h) => {
            let id = h.user_id.ok_or_else(missing_id)?;
            let changes = HodChangeset {
                name: h.name.trim().to_string(),
                department: h.department.trim().to_string(),
                password_hash,
            };
            let updated = helper::run_query(pool, move |conn| {
                diesel::update(hods::table.find(id)).set(&changes).execute(conn)
            })
            .await?;
            (id.to_string(), updated)
        }
        UserPayload::Admin(a) => {
            let id = a.user_id.ok_or_else(missing_id)?;
            let changes = AdminChangeset {
                name: a.name.trim().to_string(),
                password_hash,
            };
            let updated = helper::run_query(pool, move |conn| {
                diesel::update(admins::table.find(id)).set(&changes).execute(conn)
            })
            .await?;
            (id.to_string(), updated)
        }
    };

    if updated == 0 {
        warn!("Update of unknown {} {}", role, key);
        return Err(AppError::NotFound(format!("{} {} not found", role, key)));
    }
    info!("Updated {} {}", role, key);
    Ok(ApiResponse::ok(true).with_message("User saved successfully"))
}

/// Returns (wrapped in `ApiResponse`)
/// * `i64`: id of the new rule (201 Created).
/// * `409 Conflict`: If a rule for that admission year and programme exists.
/// * `422 Unprocessable Entity`: If a value is invalid or the total disagrees with the categories.
/// * `500 Internal Server Error`: If a database error occurs.
async fn create_program_rule(
    pool: &Pool,
    rule: ProgramRulePayload,
) -> Result<ApiResponse<i64>, AppError> {
    let new_rule = rule.into_new_rule()?;
    let label = format!("{} {}", new_rule.programme, new_rule.admission_year);

    let conn = pool.get().await?;
    let id = conn
        .interact(move |conn| {
            diesel::insert_into(programme_rules::table)
                .values(&new_rule)
                .returning(programme_rules::id)
                .get_result::<i64>(conn)
        })
        .await?
        .map_err(|e| {
            helper::conflict_on_duplicate(e, format!("A rule for {} already exists", label))
        })?;

    info!("Created programme rule {} for {}", id, label);
    Ok(ApiResponse::success(StatusCode::CREATED, id).with_message("Program rule saved successfully"))
}

/// Returns (wrapped in `ApiResponse`)
/// * `bool`: true if the rule was updated (200 OK).
/// * `404 Not Found`: If the rule does not exist.
/// * `409 Conflict`: If another rule already covers that admission year and programme.
/// * `422 Unprocessable Entity`: If a value is invalid or the total disagrees with the categories.
/// * `500 Internal Server Error`: If a database error occurs.
async fn update_program_rule(
    pool: &Pool,
    id: i64,
    rule: ProgramRulePayload,
) -> Result<ApiResponse<bool>, AppError> {
    let changes = rule.into_new_rule()?;
    let label = format!("{} {}", changes.programme, changes.admission_year);

    let conn = pool.get().await?;
    let updated = conn
        .interact(move |conn| {
            diesel::update(programme_rules::table.find(id))
                .set(&changes)
                .execute(conn)
        })
        .await?
        .map_err(|e| {
            helper::conflict_on_duplicate(e, format!("A rule for {} already exists", label))
        })?;

    if updated == 0 {
        return Err(AppError::NotFound(format!(
            "Programme rule with ID {} not found",
            id
        )));
    }
    info!("Updated programme rule {}", id);
    Ok(ApiResponse::ok(true).with_message("Program rule saved successfully"))
}

/// Returns (wrapped in `ApiResponse`)
/// * `bool`: true if the rule was deleted (200 OK).
/// * `404 Not Found`: If the rule does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
async fn delete_program_rule(pool: &Pool, id: i64) -> Result<ApiResponse<bool>, AppError> {
    let deleted = helper::run_query(pool, move |conn| {
        diesel::delete(programme_rules::table.find(id)).execute(conn)
    })
    .await?;

    if deleted == 0 {
        return Err(AppError::NotFound(format!(
            "Programme rule with ID {} not found",
            id
        )));
    }
    info!("Deleted programme rule {}", id);
    Ok(ApiResponse::ok(true).with_message("Program rule deleted successfully"))
}

fn level_rows(activity_id: i64, levels: &[(String, i32)]) -> Vec<NewActivityLevel> {
    levels
        .iter()
        .map(|(level, points)| NewActivityLevel {
            activity_id,
            level: level.clone(),
            points: *points,
        })
        .collect()
}

/// Adds a catalog activity and its levels in one transaction.
///
/// Returns (wrapped in `ApiResponse`)
/// * `i64`: id of the new activity (201 Created).
/// * `400 Bad Request`: If the category is not A-E.
/// * `422 Unprocessable Entity`: If the points type and levels disagree or a level is invalid.
/// * `500 Internal Server Error`: If a database error or transaction failure occurs.
async fn create_activity(
    pool: &Pool,
    activity: ActivityPayload,
) -> Result<ApiResponse<i64>, AppError> {
    let ValidatedActivity { activity, levels } = activity.validate()?;
    info!(
        "Creating {} activity '{}' with {} levels",
        activity.points_type,
        activity.activity_name,
        levels.len()
    );

    let conn = pool.get().await?;
    let id: Result<i64, AppError> = conn
        .interact(move |conn| {
            conn.transaction(|tx| {
                let id = diesel::insert_into(activities_master::table)
                    .values(&activity)
                    .returning(activities_master::id)
                    .get_result::<i64>(tx)?;
                diesel::insert_into(activity_levels::table)
                    .values(&level_rows(id, &levels))
                    .execute(tx)?;
                Ok(id)
            })
        })
        .await?;
    let id = id?;

    info!("Created activity {}", id);
    Ok(ApiResponse::success(StatusCode::CREATED, id).with_message("Activity saved successfully"))
}

/// Replaces an activity's fields and levels in one transaction.
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool`: true if the activity was updated (200 OK).
/// * `400 Bad Request`: If the category is not A-E.
/// * `404 Not Found`: If the activity does not exist.
/// * `422 Unprocessable Entity`: If the points type and levels disagree or a level is invalid.
/// * `500 Internal Server Error`: If a database error or transaction failure occurs.
async fn update_activity(
    pool: &Pool,
    id: i64,
    activity: ActivityPayload,
) -> Result<ApiResponse<bool>, AppError> {
    let ValidatedActivity { activity, levels } = activity.validate()?;

    let conn = pool.get().await?;
    let updated: Result<bool, AppError> = conn
        .interact(move |conn| {
            conn.transaction(|tx| {
                let updated = diesel::update(activities_master::table.find(id))
                    .set(&activity)
                    .execute(tx)?;
                if updated == 0 {
                    return Ok(false);
                }
                diesel::delete(activity_levels::table.filter(activity_levels::activity_id.eq(id)))
                    .execute(tx)?;
                diesel::insert_into(activity_levels::table)
                    .values(&level_rows(id, &levels))
                    .execute(tx)?;
                Ok(true)
            })
        })
        .await?;

    if !updated? {
        return Err(AppError::NotFound(format!(
            "Activity with ID {} not found",
            id
        )));
    }
    info!("Updated activity {}", id);
    Ok(ApiResponse::ok(true).with_message("Activity saved successfully"))
}

/// Disables an activity; existing submissions keep referencing it.
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool`: true if the activity was disabled (200 OK).
/// * `404 Not Found`: If the activity does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
async fn delete_activity(pool: &Pool, id: i64) -> Result<ApiResponse<bool>, AppError> {
    let updated = helper::run_query(pool, move |conn| {
        diesel::update(activities_master::table.find(id))
            .set(activities_master::active.eq(false))
            .execute(conn)
    })
    .await?;

    if updated == 0 {
        return Err(AppError::NotFound(format!(
            "Activity with ID {} not found",
            id
        )));
    }
    info!("Disabled activity {}", id);
    Ok(ApiResponse::ok(true).with_message("Activity deleted successfully"))
}
