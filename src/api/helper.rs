use crate::compliance::{self, Category, Compliance, LedgerEntry, PointsSummary, Requirements};
use crate::errors::AppError;
use crate::model::dashboard::StudentStanding;
use crate::model::principal::{Principal, StudentProfile};
use crate::model::reference::ProgrammeRule;
use crate::model::submission::{PendingSubmission, Submission, SubmissionView};
use crate::schema::{activities, activities_master, programme_rules, students};
use crate::verification::SubmissionStatus;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::collections::HashMap;
use tracing::{debug, error, warn};

pub(crate) async fn run_query<T, F>(
    pool: &deadpool_diesel::postgres::Pool,
    query: F,
) -> Result<T, AppError>
where
    F: FnOnce(&mut diesel::PgConnection) -> Result<T, DieselError> + Send + 'static,
    T: Send + 'static,
{
    let conn = pool.get().await.map_err(|pool_err| {
        error!(
            "Failed to get DB connection object from pool: {:?}",
            pool_err
        );
        AppError::from(pool_err)
    })?;
    debug!("DB connection object obtained from pool for interaction");

    let res = conn.interact(query).await;

    match res {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(diesel_err)) => {
            error!("Diesel query failed within interaction: {:?}", diesel_err);
            Err(AppError::from(diesel_err))
        }
        Err(interact_err) => {
            error!("Deadpool interact error: {:?}", interact_err);
            Err(AppError::from(interact_err))
        }
    }
}

/// Maps a unique-constraint violation to 409, anything else to the generic conversion.
pub(crate) fn conflict_on_duplicate(err: DieselError, message: impl Into<String>) -> AppError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            warn!("Unique constraint violated: {}", info.message());
            AppError::Conflict(message.into())
        }
        other => AppError::from(other),
    }
}

/// Which students a dashboard aggregates over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StudentScope {
    Class { department: String, year: i32 },
    Department(String),
    All,
    Single(String),
}

impl StudentScope {
    /// Scope a principal may read students in. Students only see themselves.
    pub(crate) fn of(principal: &Principal) -> Self {
        match principal {
            Principal::Student(s) => StudentScope::Single(s.prn.clone()),
            Principal::Coordinator(c) => StudentScope::Class {
                department: c.department.clone(),
                year: c.year,
            },
            Principal::Hod(h) => StudentScope::Department(h.department.clone()),
            Principal::Admin(_) => StudentScope::All,
        }
    }

    pub(crate) fn contains(&self, student: &StudentProfile) -> bool {
        match self {
            StudentScope::Class { department, year } => {
                student.dept == *department && student.year == *year
            }
            StudentScope::Department(department) => student.dept == *department,
            StudentScope::All => true,
            StudentScope::Single(prn) => student.prn == *prn,
        }
    }
}

/// A student with their aggregated points.
#[derive(Debug, Clone)]
pub(crate) struct Standing {
    pub student: StudentProfile,
    pub summary: PointsSummary,
    pub total_submissions: i64,
    pub approved_submissions: i64,
    pub last_activity: Option<DateTime<Utc>>,
}

impl Standing {
    pub(crate) fn compliance(&self) -> Compliance {
        self.summary.compliance
    }

    pub(crate) fn progress(&self) -> f64 {
        self.summary.progress_percentage
    }

    pub(crate) fn to_row(&self) -> StudentStanding {
        StudentStanding {
            prn: self.student.prn.clone(),
            name: self.student.full_name(),
            programme: self.student.programme.clone(),
            year: self.student.year,
            earned_points: self.summary.earned_points,
            required_points: self.summary.required_points,
            progress_percentage: self.summary.progress_percentage,
            compliance: self.summary.compliance,
            last_activity: self.last_activity,
        }
    }
}

/// Loads every programme rule keyed by (admission_year, programme).
pub(crate) fn load_rules(
    conn: &mut PgConnection,
) -> QueryResult<HashMap<(i32, String), Requirements>> {
    let rules = programme_rules::table
        .select(ProgrammeRule::as_select())
        .load::<ProgrammeRule>(conn)?;
    Ok(rules
        .into_iter()
        .map(|rule| {
            let requirements = rule.requirements();
            ((rule.admission_year, rule.programme), requirements)
        })
        .collect())
}

pub(crate) fn find_rule(
    conn: &mut PgConnection,
    student: &StudentProfile,
) -> QueryResult<Option<Requirements>> {
    programme_rules::table
        .filter(programme_rules::admission_year.eq(student.admission_year))
        .filter(programme_rules::programme.eq(&student.programme))
        .select(ProgrammeRule::as_select())
        .first::<ProgrammeRule>(conn)
        .optional()
        .map(|rule| rule.map(|r| r.requirements()))
}

/// Aggregates points for every student in `scope`, ordered by PRN.
pub(crate) fn load_standings(
    conn: &mut PgConnection,
    scope: &StudentScope,
) -> QueryResult<Vec<Standing>> {
    let mut query = students::table
        .select(StudentProfile::as_select())
        .order(students::prn.asc())
        .into_boxed();
    query = match scope {
        StudentScope::Class { department, year } => query
            .filter(students::dept.eq(department.clone()))
            .filter(students::year.eq(*year)),
        StudentScope::Department(department) => {
            query.filter(students::dept.eq(department.clone()))
        }
        StudentScope::All => query,
        StudentScope::Single(prn) => query.filter(students::prn.eq(prn.clone())),
    };
    let roster = query.load::<StudentProfile>(conn)?;
    if roster.is_empty() {
        return Ok(Vec::new());
    }

    let rules = load_rules(conn)?;
    let prns: Vec<String> = roster.iter().map(|s| s.prn.clone()).collect();
    let rows = activities::table
        .filter(activities::prn.eq_any(prns))
        .select((
            activities::prn,
            activities::category,
            activities::status,
            activities::points,
            activities::submitted_at,
        ))
        .load::<(String, String, String, i32, DateTime<Utc>)>(conn)?;

    let mut ledgers: HashMap<String, Vec<LedgerEntry>> = HashMap::new();
    let mut totals: HashMap<String, (i64, Option<DateTime<Utc>>)> = HashMap::new();
    for (prn, category, status, points, submitted_at) in rows {
        let counters = totals.entry(prn.clone()).or_insert((0, None));
        counters.0 += 1;
        counters.1 = counters.1.max(Some(submitted_at));

        match (category.parse::<Category>(), status.parse::<SubmissionStatus>()) {
            (Ok(category), Ok(status)) => ledgers.entry(prn).or_default().push(LedgerEntry {
                category,
                status,
                points: i64::from(points),
            }),
            _ => warn!(
                "Skipping ledger row of {} with category '{}' and status '{}'",
                prn, category, status
            ),
        }
    }

    Ok(roster
        .into_iter()
        .map(|student| {
            let ledger = ledgers.remove(&student.prn).unwrap_or_default();
            let (total_submissions, last_activity) =
                totals.remove(&student.prn).unwrap_or((0, None));
            let rule = rules.get(&(student.admission_year, student.programme.clone()));
            let approved_submissions = ledger
                .iter()
                .filter(|e| e.status == SubmissionStatus::Approved)
                .count() as i64;
            Standing {
                summary: compliance::summarize(&ledger, rule),
                student,
                total_submissions,
                approved_submissions,
                last_activity,
            }
        })
        .collect())
}

/// Submissions of one student with activity names, newest first.
pub(crate) fn load_submission_views(
    conn: &mut PgConnection,
    prn: &str,
    approved_only: bool,
    limit: Option<i64>,
) -> QueryResult<Vec<SubmissionView>> {
    let mut query = activities::table
        .inner_join(activities_master::table)
        .filter(activities::prn.eq(prn.to_string()))
        .select((Submission::as_select(), activities_master::activity_name))
        .order((activities::submitted_at.desc(), activities::id.desc()))
        .into_boxed();
    if approved_only {
        query = query
            .filter(activities::status.eq(SubmissionStatus::Approved.as_str()))
            .order((activities::date.desc(), activities::id.desc()));
    }
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    Ok(query
        .load::<(Submission, String)>(conn)?
        .into_iter()
        .map(SubmissionView::from)
        .collect())
}

/// Pending submissions of one class with activity and student names.
pub(crate) fn load_pending_for_class(
    conn: &mut PgConnection,
    department: &str,
    year: i32,
    newest_first: bool,
    limit: Option<i64>,
) -> QueryResult<Vec<PendingSubmission>> {
    let mut query = activities::table
        .inner_join(students::table)
        .inner_join(activities_master::table)
        .filter(activities::status.eq(SubmissionStatus::Pending.as_str()))
        .filter(students::dept.eq(department.to_string()))
        .filter(students::year.eq(year))
        .select((
            Submission::as_select(),
            activities_master::activity_name,
            StudentProfile::as_select(),
        ))
        .into_boxed();
    query = if newest_first {
        query.order((activities::submitted_at.desc(), activities::id.desc()))
    } else {
        query.order((activities::submitted_at.asc(), activities::id.asc()))
    };
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    Ok(query
        .load::<(Submission, String, StudentProfile)>(conn)?
        .into_iter()
        .map(|(submission, activity_name, student)| PendingSubmission {
            submission,
            activity_name,
            student_name: student.full_name(),
        })
        .collect())
}

/// Loads one student or fails with 404, then checks the caller may see them.
pub(crate) async fn load_student_in_scope(
    pool: &deadpool_diesel::postgres::Pool,
    principal: &Principal,
    prn: String,
) -> Result<StudentProfile, AppError> {
    let lookup = prn.clone();
    let student = run_query(pool, move |conn| {
        students::table
            .find(lookup)
            .select(StudentProfile::as_select())
            .first::<StudentProfile>(conn)
            .optional()
    })
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Student with PRN {} not found", prn)))?;

    if !StudentScope::of(principal).contains(&student) {
        warn!(
            "{} {} attempted to access student {} outside their scope",
            principal.role(),
            principal.key(),
            student.prn
        );
        return Err(AppError::Forbidden(format!(
            "Student {} is outside your scope",
            student.prn
        )));
    }
    Ok(student)
}

/// Fails with 403 when a client-supplied id names someone other than the caller.
pub(crate) fn ensure_self<T: PartialEq + std::fmt::Display>(
    supplied: Option<&T>,
    actual: &T,
) -> Result<(), AppError> {
    match supplied {
        Some(supplied) if supplied != actual => Err(AppError::Forbidden(format!(
            "Identifier {} does not match the authenticated user",
            supplied
        ))),
        _ => Ok(()),
    }
}
