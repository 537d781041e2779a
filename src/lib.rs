use crate::cli::Args;
use crate::errors::AppError;
use crate::model::principal::NewAdmin;
use crate::schema::admins;
use crate::uploads::UploadStore;
use anyhow::Context;
use axum::Router;
use axum::extract::{DefaultBodyLimit, FromRef};
use axum::routing::{get, post};
use chrono::TimeDelta;
use deadpool_diesel::Runtime;
use deadpool_diesel::postgres::{Manager, Pool};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use std::sync::Arc;
use tracing::info;

pub mod cli;
pub mod compliance;
pub mod model;
pub mod payloads;
pub mod response;
pub mod schema;
pub mod uploads;
pub mod verification;

mod api;
mod auth;
mod errors;

const SCHEMA_SQL: &str = include_str!("../migrations/2025-06-01-000000_create_map_tables/up.sql");

/// Room for multipart framing and text fields on top of the two files.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Immutable runtime settings shared by all handlers.
#[derive(Debug, Clone)]
pub struct Settings {
    pub uploads: UploadStore,
    pub session_ttl: TimeDelta,
    pub bcrypt_cost: u32,
}

impl Settings {
    pub fn from_args(args: &Args) -> Self {
        Settings {
            uploads: UploadStore::new(args.upload_dir.clone(), args.max_upload_bytes),
            session_ttl: TimeDelta::hours(args.session_ttl_hours),
            bcrypt_cost: args.bcrypt_cost,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub settings: Arc<Settings>,
}

impl FromRef<AppState> for Pool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<Settings> {
    fn from_ref(state: &AppState) -> Self {
        state.settings.clone()
    }
}

pub async fn init_router(args: &Args) -> anyhow::Result<Router> {
    info!("Initializing database pool...");
    let pool = init_pool(&args.connection_str, args.db_pool_max_size)
        .context("Failed to initialize database pool")?;

    info!("Applying database schema...");
    init_schema(&pool)
        .await
        .context("Failed to apply database schema")?;

    if let Some(password) = &args.bootstrap_admin_password {
        bootstrap_admin(&pool, &args.bootstrap_admin_name, password, args.bcrypt_cost)
            .await
            .context("Failed to create bootstrap administrator")?;
    }

    info!("Initializing router...");
    Ok(init_router_internal(pool, Settings::from_args(args)))
}

pub fn init_test_router(pool: Pool, settings: Settings) -> Router {
    init_router_internal(pool, settings)
}

fn init_router_internal(pool: Pool, settings: Settings) -> Router {
    let body_limit = settings.uploads.max_bytes().saturating_mul(2) + MULTIPART_OVERHEAD_BYTES;
    let state = AppState {
        pool,
        settings: Arc::new(settings),
    };

    Router::new()
        // login is the only route reachable without a bearer token
        .route("/auth", post(api::auth::auth))
        .route(
            "/student",
            get(api::student::get_student).post(api::student::submit_activity),
        )
        .route(
            "/coordinator",
            get(api::coordinator::get_coordinator).post(api::coordinator::post_coordinator),
        )
        .route("/hod", get(api::hod::get_hod))
        .route(
            "/admin",
            get(api::admin::get_admin).post(api::admin::post_admin),
        )
        .route("/activities", get(api::activities::get_activities))
        .route("/transcript", get(api::transcript::get_transcript))
        .route("/uploads/{filename}", get(api::files::get_upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

fn init_pool(conn_str: &str, max_size: u32) -> anyhow::Result<Pool> {
    let manager = Manager::new(conn_str, Runtime::Tokio1);
    let pool = Pool::builder(manager).max_size(max_size as usize).build()?;
    Ok(pool)
}

/// Creates missing tables. Every statement is `IF NOT EXISTS`.
pub async fn init_schema(pool: &Pool) -> anyhow::Result<()> {
    api::helper::run_query(pool, |conn| conn.batch_execute(SCHEMA_SQL)).await?;
    Ok(())
}

/// Creates the first administrator when the admins table is empty.
async fn bootstrap_admin(
    pool: &Pool,
    name: &str,
    password: &str,
    cost: u32,
) -> Result<(), AppError> {
    let existing = api::helper::run_query(pool, |conn| {
        admins::table.count().get_result::<i64>(conn)
    })
    .await?;
    if existing > 0 {
        return Ok(());
    }

    let new_admin = NewAdmin {
        name: name.to_string(),
        password_hash: auth::hash_password(password.to_string(), cost).await?,
    };
    let id = api::helper::run_query(pool, move |conn| {
        diesel::insert_into(admins::table)
            .values(&new_admin)
            .returning(admins::id)
            .get_result::<i64>(conn)
    })
    .await?;

    info!("Created bootstrap administrator with id {}", id);
    Ok(())
}
