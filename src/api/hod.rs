use super::helper::{self, Standing, StudentScope};
use crate::compliance::{self, ComplianceTally};
use crate::errors::AppError;
use crate::model::dashboard::{ClassRow, HodDashboard, HodStats};
use crate::model::principal::Principal;
use crate::payloads::hod::{HodAction, HodParams};
use crate::response::ApiResponse;
use axum::extract::{Query, State};
use deadpool_diesel::postgres::Pool;
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// Builds the department overview of a head of department.
///
/// Returns (wrapped in `ApiResponse`)
/// * `HodDashboard`: department stats, class-wise rows and compliance distribution (200 OK).
/// * `403 Forbidden`: If the caller is not a HoD or `id` names another HoD.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, principal))]
pub async fn get_hod(
    principal: Principal,
    State(pool): State<Pool>,
    Query(params): Query<HodParams>,
) -> Result<ApiResponse<HodDashboard>, AppError> {
    let hod = principal.as_hod()?.clone();
    helper::ensure_self(params.id.as_ref(), &hod.id)?;

    match params.action {
        HodAction::Dashboard => {
            info!("Fetching dashboard for HoD {} ({})", hod.id, hod.department);
            let standings = helper::run_query(&pool, {
                let scope = StudentScope::Department(hod.department.clone());
                move |conn| helper::load_standings(conn, &scope)
            })
            .await?;

            let distribution: ComplianceTally = standings.iter().map(|s| s.compliance()).collect();
            let stats = HodStats {
                total_students: standings.len() as i64,
                average_progress: compliance::average_progress(standings.iter().map(|s| s.progress())),
                at_risk: distribution.at_risk,
                total_points: standings.iter().map(|s| s.summary.earned_points).sum(),
            };

            info!(
                "HoD {} department has {} students",
                hod.id, stats.total_students
            );
            Ok(ApiResponse::ok(HodDashboard {
                hod,
                stats,
                classes: class_rows(&standings),
                distribution,
            }))
        }
    }
}

/// Groups standings by (programme, year), ordered by programme then year.
fn class_rows(standings: &[Standing]) -> Vec<ClassRow> {
    let mut classes: BTreeMap<(String, i32), Vec<&Standing>> = BTreeMap::new();
    for standing in standings {
        classes
            .entry((standing.student.programme.clone(), standing.student.year))
            .or_default()
            .push(standing);
    }

    classes
        .into_iter()
        .map(|((programme, year), members)| {
            let tally: ComplianceTally = members.iter().map(|s| s.compliance()).collect();
            ClassRow {
                programme,
                year,
                students: members.len() as i64,
                compliant: tally.compliant,
                in_progress: tally.in_progress,
                at_risk: tally.at_risk,
                average_progress: compliance::average_progress(members.iter().map(|s| s.progress())),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::{summarize, Category, LedgerEntry, Requirements};
    use crate::model::principal::StudentProfile;
    use crate::verification::SubmissionStatus;
    use float_cmp::approx_eq;

    fn standing(prn: &str, programme: &str, year: i32, earned: i64) -> Standing {
        let rule = Requirements {
            technical: 100,
            total_points: 100,
            ..Requirements::default()
        };
        let ledger = [LedgerEntry {
            category: Category::A,
            status: SubmissionStatus::Approved,
            points: earned,
        }];
        Standing {
            student: StudentProfile {
                prn: prn.to_string(),
                first_name: "F".to_string(),
                middle_name: None,
                last_name: "L".to_string(),
                dept: "Computer".to_string(),
                year,
                programme: programme.to_string(),
                admission_year: 2023,
                course_duration: 4,
            },
            summary: summarize(&ledger, Some(&rule)),
            total_submissions: 1,
            approved_submissions: 1,
            last_activity: None,
        }
    }

    #[test]
    fn classes_are_grouped_by_programme_and_year() {
        let standings = vec![
            standing("P1", "B.Tech", 2, 100),
            standing("P2", "B.Tech", 2, 20),
            standing("P3", "B.Tech", 3, 60),
            standing("P4", "M.Tech", 1, 0),
        ];
        let rows = class_rows(&standings);

        assert_eq!(rows.len(), 3);
        assert_eq!((rows[0].programme.as_str(), rows[0].year), ("B.Tech", 2));
        assert_eq!(rows[0].students, 2);
        assert_eq!(rows[0].compliant, 1);
        assert_eq!(rows[0].at_risk, 1);
        assert!(approx_eq!(f64, rows[0].average_progress, 60.0, ulps = 2));
        assert_eq!(rows[1].in_progress, 1);
        assert_eq!(rows[2].programme, "M.Tech");
        assert_eq!(rows[2].at_risk, 1);
    }
}
