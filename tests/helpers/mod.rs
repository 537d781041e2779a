#![allow(dead_code)]

use axum::Router;
use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
pub(crate) use axum_test::TestServer;
use chrono::NaiveDate;
pub(crate) use deadpool_diesel::postgres::{
    Manager as TestManager, Pool as TestPool, Runtime as TestRuntime,
};
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use map_points_server::model::principal::{NewAdmin, NewCoordinator, NewHod, NewStudent};
use map_points_server::model::reference::{NewActivity, NewActivityLevel, NewProgrammeRule};
use map_points_server::model::submission::NewSubmission;
use map_points_server::uploads::UploadStore;
use map_points_server::{Settings, init_schema, init_test_router, schema};
use serde_json::{Value, json};
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "secret-pass";
pub const TEST_MAX_UPLOAD_BYTES: usize = 16 * 1024;
const TEST_BCRYPT_COST: u32 = 4;

// test infra setup

/// Integration tests need a disposable Postgres database in `TEST_DATABASE_URL`.
pub fn get_test_db_pool() -> Option<TestPool> {
    let Ok(db_url) = std::env::var("TEST_DATABASE_URL") else {
        println!("TEST_DATABASE_URL is not set, skipping database test");
        return None;
    };

    let manager = TestManager::new(&db_url, TestRuntime::Tokio1);
    let pool = TestPool::builder(manager)
        .max_size(8)
        .build()
        .expect("Failed to create test database pool");
    Some(pool)
}

pub fn test_settings() -> Settings {
    let dir = std::env::temp_dir().join(format!("map-uploads-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("Failed to create test upload directory");
    Settings {
        uploads: UploadStore::new(dir, TEST_MAX_UPLOAD_BYTES),
        session_ttl: chrono::TimeDelta::hours(1),
        bcrypt_cost: TEST_BCRYPT_COST,
    }
}

pub async fn setup_test_environment() -> Option<(TestServer, TestPool)> {
    let test_pool = get_test_db_pool()?;
    init_schema(&test_pool)
        .await
        .expect("Failed to apply schema to test database");
    clear_test_database(&test_pool).await;
    let app: Router = init_test_router(test_pool.clone(), test_settings());
    let server = TestServer::new(app).expect("Failed to create TestServer");
    Some((server, test_pool))
}

async fn clear_test_database(pool: &TestPool) {
    let conn = pool.get().await.expect("Failed to get conn for cleanup");
    conn.interact(|conn| {
        conn.transaction::<_, DieselError, _>(|tx_conn| {
            diesel::delete(schema::sessions::table).execute(tx_conn)?;
            diesel::delete(schema::activities::table).execute(tx_conn)?;
            diesel::delete(schema::activity_levels::table).execute(tx_conn)?;
            diesel::delete(schema::activities_master::table).execute(tx_conn)?;
            diesel::delete(schema::programme_rules::table).execute(tx_conn)?;
            diesel::delete(schema::students::table).execute(tx_conn)?;
            diesel::delete(schema::coordinators::table).execute(tx_conn)?;
            diesel::delete(schema::hods::table).execute(tx_conn)?;
            diesel::delete(schema::admins::table).execute(tx_conn)?;
            Ok(())
        })
    })
    .await
    .expect("Database interaction failed during cleanup")
    .expect("Diesel cleanup transaction failed");
}

fn test_hash() -> String {
    bcrypt::hash(TEST_PASSWORD, TEST_BCRYPT_COST).expect("Failed to hash test password")
}

async fn interact<T, F>(pool: &TestPool, f: F) -> T
where
    F: FnOnce(&mut PgConnection) -> QueryResult<T> + Send + 'static,
    T: Send + 'static,
{
    let conn = pool.get().await.expect("Failed to get test connection");
    conn.interact(f)
        .await
        .expect("Test interaction failed")
        .expect("Test query failed")
}

// fixtures

/// Inserts a student of the given class, admitted in 2023 for four years.
pub async fn create_test_student(
    pool: &TestPool,
    prn: &str,
    programme: &str,
    dept: &str,
    year: i32,
) -> String {
    let new_student = NewStudent {
        prn: prn.to_string(),
        first_name: format!("First{}", prn),
        middle_name: None,
        last_name: "Tester".to_string(),
        dept: dept.to_string(),
        year,
        programme: programme.to_string(),
        admission_year: 2023,
        course_duration: 4,
        password_hash: test_hash(),
    };
    interact(pool, move |conn| {
        diesel::insert_into(schema::students::table)
            .values(&new_student)
            .returning(schema::students::prn)
            .get_result::<String>(conn)
    })
    .await
}

pub async fn create_test_coordinator(pool: &TestPool, name: &str, department: &str, year: i32) -> i64 {
    let new_coordinator = NewCoordinator {
        name: name.to_string(),
        department: department.to_string(),
        year,
        password_hash: test_hash(),
    };
    interact(pool, move |conn| {
        diesel::insert_into(schema::coordinators::table)
            .values(&new_coordinator)
            .returning(schema::coordinators::id)
            .get_result::<i64>(conn)
    })
    .await
}

pub async fn create_test_hod(pool: &TestPool, name: &str, department: &str) -> i64 {
    let new_hod = NewHod {
        name: name.to_string(),
        department: department.to_string(),
        password_hash: test_hash(),
    };
    interact(pool, move |conn| {
        diesel::insert_into(schema::hods::table)
            .values(&new_hod)
            .returning(schema::hods::id)
            .get_result::<i64>(conn)
    })
    .await
}

pub async fn create_test_admin(pool: &TestPool, name: &str) -> i64 {
    let new_admin = NewAdmin {
        name: name.to_string(),
        password_hash: test_hash(),
    };
    interact(pool, move |conn| {
        diesel::insert_into(schema::admins::table)
            .values(&new_admin)
            .returning(schema::admins::id)
            .get_result::<i64>(conn)
    })
    .await
}

/// Requirements are given in category order A to E.
pub async fn create_test_rule(pool: &TestPool, programme: &str, requirements: [i32; 5]) -> i64 {
    let new_rule = NewProgrammeRule {
        admission_year: 2023,
        programme: programme.to_string(),
        duration: 4,
        technical: requirements[0],
        sports_cultural: requirements[1],
        community_outreach: requirements[2],
        innovation: requirements[3],
        leadership: requirements[4],
        total_points: requirements.iter().sum(),
    };
    interact(pool, move |conn| {
        diesel::insert_into(schema::programme_rules::table)
            .values(&new_rule)
            .returning(schema::programme_rules::id)
            .get_result::<i64>(conn)
    })
    .await
}

pub async fn create_test_fixed_activity(
    pool: &TestPool,
    category: &str,
    name: &str,
    points: i32,
) -> i64 {
    let new_activity = NewActivity {
        category: category.to_string(),
        activity_name: name.to_string(),
        document_evidence: "Certificate".to_string(),
        points_type: "Fixed".to_string(),
        min_points: points,
        max_points: points,
    };
    interact(pool, move |conn| {
        diesel::insert_into(schema::activities_master::table)
            .values(&new_activity)
            .returning(schema::activities_master::id)
            .get_result::<i64>(conn)
    })
    .await
}

pub async fn create_test_level_activity(
    pool: &TestPool,
    category: &str,
    name: &str,
    levels: &[(&str, i32)],
) -> i64 {
    let min = levels.iter().map(|(_, p)| *p).min().unwrap_or(0);
    let max = levels.iter().map(|(_, p)| *p).max().unwrap_or(0);
    let new_activity = NewActivity {
        category: category.to_string(),
        activity_name: name.to_string(),
        document_evidence: "Certificate".to_string(),
        points_type: "Level".to_string(),
        min_points: min,
        max_points: max,
    };
    let levels: Vec<(String, i32)> = levels.iter().map(|(l, p)| (l.to_string(), *p)).collect();
    interact(pool, move |conn| {
        conn.transaction::<_, DieselError, _>(|tx| {
            let id = diesel::insert_into(schema::activities_master::table)
                .values(&new_activity)
                .returning(schema::activities_master::id)
                .get_result::<i64>(tx)?;
            let rows: Vec<NewActivityLevel> = levels
                .into_iter()
                .map(|(level, points)| NewActivityLevel {
                    activity_id: id,
                    level,
                    points,
                })
                .collect();
            diesel::insert_into(schema::activity_levels::table)
                .values(&rows)
                .execute(tx)?;
            Ok(id)
        })
    })
    .await
}

/// Inserts a submission dated `date`, then applies `status` and `points` directly.
pub async fn create_test_submission(
    pool: &TestPool,
    prn: &str,
    category: &str,
    activity_id: i64,
    level: &str,
    status: &str,
    points: i32,
    date: NaiveDate,
) -> i64 {
    let new_submission = NewSubmission {
        prn: prn.to_string(),
        category: category.to_string(),
        activity_type: activity_id,
        level: level.to_string(),
        date,
        certificate: format!("{}.pdf", Uuid::new_v4()),
        proof: Some(format!("{}.jpg", Uuid::new_v4())),
        proof_type: Some("event_image".to_string()),
        remarks: String::new(),
    };
    let status = status.to_string();
    interact(pool, move |conn| {
        let id = diesel::insert_into(schema::activities::table)
            .values(&new_submission)
            .returning(schema::activities::id)
            .get_result::<i64>(conn)?;
        if status != "Pending" {
            diesel::update(schema::activities::table.find(id))
                .set((
                    schema::activities::status.eq(&status),
                    schema::activities::points.eq(points),
                    schema::activities::verified_at.eq(Some(chrono::Utc::now())),
                ))
                .execute(conn)?;
        }
        Ok(id)
    })
    .await
}

pub async fn submission_status(pool: &TestPool, id: i64) -> (String, i32) {
    interact(pool, move |conn| {
        schema::activities::table
            .find(id)
            .select((schema::activities::status, schema::activities::points))
            .first::<(String, i32)>(conn)
    })
    .await
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

// endpoint helpers

/// Logs in with `TEST_PASSWORD` and returns the bearer token.
pub async fn login(server: &TestServer, user_type: &str, username: &str) -> String {
    let response = server
        .post("/auth")
        .json(&json!({
            "action": "login",
            "userType": user_type,
            "username": username,
            "password": TEST_PASSWORD,
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    body["data"]["token"]
        .as_str()
        .expect("login response carries a token")
        .to_string()
}

/// A complete `submit_activity` form; tests remove or replace parts as needed.
pub fn submission_form(prn: &str, category: &str, activity_id: i64, level: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("action", "submit_activity")
        .add_text("prn", prn.to_string())
        .add_text("category", category.to_string())
        .add_text("activity_type", activity_id.to_string())
        .add_text("level", level.to_string())
        .add_text("date", "2025-01-15")
        .add_text("proof_type", "event_image")
        .add_text("remarks", "Inter-college hackathon")
        .add_part(
            "certificate",
            Part::bytes(b"%PDF-1.4 test certificate".to_vec())
                .file_name("certificate.pdf")
                .mime_type("application/pdf"),
        )
        .add_part(
            "proof",
            Part::bytes(vec![0xFF, 0xD8, 0xFF, 0xE0])
                .file_name("proof.jpg")
                .mime_type("image/jpeg"),
        )
}
