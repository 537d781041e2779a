use crate::errors::AppError;
use crate::schema::{admins, coordinators, hods, sessions, students};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The four kinds of principal that can log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Coordinator,
    Hod,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Coordinator => "coordinator",
            Role::Hod => "hod",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "coordinator" => Ok(Role::Coordinator),
            "hod" => Ok(Role::Hod),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown user type: {}", s)),
        }
    }
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = students)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StudentProfile {
    pub prn: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub dept: String,
    pub year: i32,
    pub programme: String,
    pub admission_year: i32,
    pub course_duration: i32,
}

impl StudentProfile {
    pub fn full_name(&self) -> String {
        match self.middle_name.as_deref().filter(|m| !m.is_empty()) {
            Some(middle) => format!("{} {} {}", self.first_name, middle, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = coordinators)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CoordinatorProfile {
    pub id: i64,
    pub name: String,
    pub department: String,
    pub year: i32,
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = hods)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct HodProfile {
    pub id: i64,
    pub name: String,
    pub department: String,
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = admins)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AdminProfile {
    pub id: i64,
    pub name: String,
}

/// An authenticated user of any role. Never carries the password hash.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "user_type", rename_all = "lowercase")]
pub enum Principal {
    Student(StudentProfile),
    Coordinator(CoordinatorProfile),
    Hod(HodProfile),
    Admin(AdminProfile),
}

impl Principal {
    pub fn role(&self) -> Role {
        match self {
            Principal::Student(_) => Role::Student,
            Principal::Coordinator(_) => Role::Coordinator,
            Principal::Hod(_) => Role::Hod,
            Principal::Admin(_) => Role::Admin,
        }
    }

    /// Login identifier: the PRN for students, the numeric id otherwise.
    pub fn key(&self) -> String {
        match self {
            Principal::Student(s) => s.prn.clone(),
            Principal::Coordinator(c) => c.id.to_string(),
            Principal::Hod(h) => h.id.to_string(),
            Principal::Admin(a) => a.id.to_string(),
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Principal::Student(s) => s.full_name(),
            Principal::Coordinator(c) => c.name.clone(),
            Principal::Hod(h) => h.name.clone(),
            Principal::Admin(a) => a.name.clone(),
        }
    }

    fn denied(&self, wanted: Role) -> AppError {
        AppError::Forbidden(format!(
            "This action requires the {} role, but the caller is a {}.",
            wanted,
            self.role()
        ))
    }

    pub fn as_student(&self) -> Result<&StudentProfile, AppError> {
        match self {
            Principal::Student(s) => Ok(s),
            _ => Err(self.denied(Role::Student)),
        }
    }

    pub fn as_coordinator(&self) -> Result<&CoordinatorProfile, AppError> {
        match self {
            Principal::Coordinator(c) => Ok(c),
            _ => Err(self.denied(Role::Coordinator)),
        }
    }

    pub fn as_hod(&self) -> Result<&HodProfile, AppError> {
        match self {
            Principal::Hod(h) => Ok(h),
            _ => Err(self.denied(Role::Hod)),
        }
    }

    pub fn as_admin(&self) -> Result<&AdminProfile, AppError> {
        match self {
            Principal::Admin(a) => Ok(a),
            _ => Err(self.denied(Role::Admin)),
        }
    }

    /// Looks a principal up by role and login identifier.
    ///
    /// Returns the profile together with its stored password hash, or `None`
    /// when no such user exists (including non-numeric staff identifiers).
    pub fn find_with_hash(
        conn: &mut PgConnection,
        role: Role,
        username: &str,
    ) -> QueryResult<Option<(Principal, String)>> {
        match role {
            Role::Student => students::table
                .find(username)
                .select((StudentProfile::as_select(), students::password_hash))
                .first::<(StudentProfile, String)>(conn)
                .optional()
                .map(|found| found.map(|(p, hash)| (Principal::Student(p), hash))),
            Role::Coordinator => {
                let Ok(id) = username.trim().parse::<i64>() else {
                    return Ok(None);
                };
                coordinators::table
                    .find(id)
                    .select((CoordinatorProfile::as_select(), coordinators::password_hash))
                    .first::<(CoordinatorProfile, String)>(conn)
                    .optional()
                    .map(|found| found.map(|(p, hash)| (Principal::Coordinator(p), hash)))
            }
            Role::Hod => {
                let Ok(id) = username.trim().parse::<i64>() else {
                    return Ok(None);
                };
                hods::table
                    .find(id)
                    .select((HodProfile::as_select(), hods::password_hash))
                    .first::<(HodProfile, String)>(conn)
                    .optional()
                    .map(|found| found.map(|(p, hash)| (Principal::Hod(p), hash)))
            }
            Role::Admin => {
                let Ok(id) = username.trim().parse::<i64>() else {
                    return Ok(None);
                };
                admins::table
                    .find(id)
                    .select((AdminProfile::as_select(), admins::password_hash))
                    .first::<(AdminProfile, String)>(conn)
                    .optional()
                    .map(|found| found.map(|(p, hash)| (Principal::Admin(p), hash)))
            }
        }
    }

    pub fn load(conn: &mut PgConnection, role: Role, key: &str) -> QueryResult<Option<Principal>> {
        Self::find_with_hash(conn, role, key).map(|found| found.map(|(principal, _)| principal))
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = students)]
pub struct NewStudent {
    pub prn: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub dept: String,
    pub year: i32,
    pub programme: String,
    pub admission_year: i32,
    pub course_duration: i32,
    pub password_hash: String,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = students)]
pub struct StudentChangeset {
    pub first_name: String,
    // None leaves the column untouched, Some(None) clears it
    pub middle_name: Option<Option<String>>,
    pub last_name: String,
    pub dept: String,
    pub year: i32,
    pub programme: String,
    pub admission_year: i32,
    pub course_duration: i32,
    pub password_hash: Option<String>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = coordinators)]
pub struct NewCoordinator {
    pub name: String,
    pub department: String,
    pub year: i32,
    pub password_hash: String,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = coordinators)]
pub struct CoordinatorChangeset {
    pub name: String,
    pub department: String,
    pub year: i32,
    pub password_hash: Option<String>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = hods)]
pub struct NewHod {
    pub name: String,
    pub department: String,
    pub password_hash: String,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = hods)]
pub struct HodChangeset {
    pub name: String,
    pub department: String,
    pub password_hash: Option<String>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = admins)]
pub struct NewAdmin {
    pub name: String,
    pub password_hash: String,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = admins)]
pub struct AdminChangeset {
    pub name: String,
    pub password_hash: Option<String>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Session {
    pub token: Uuid,
    pub role: String,
    pub principal_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = sessions)]
pub struct NewSession {
    pub token: Uuid,
    pub role: String,
    pub principal_id: String,
    pub expires_at: DateTime<Utc>,
    // created_at has a DB default (CURRENT_TIMESTAMP)
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub user: Principal,
    pub token: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(untagged)]
pub enum UserListing {
    Students(Vec<StudentProfile>),
    Coordinators(Vec<CoordinatorProfile>),
    Hods(Vec<HodProfile>),
    Admins(Vec<AdminProfile>),
}
