use crate::schema::activities;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of the additional proof attached to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofType {
    Geotag,
    EventImage,
    GroupImage,
}

impl ProofType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofType::Geotag => "geotag",
            ProofType::EventImage => "event_image",
            ProofType::GroupImage => "group_image",
        }
    }
}

impl fmt::Display for ProofType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProofType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "geotag" => Ok(ProofType::Geotag),
            "event_image" => Ok(ProofType::EventImage),
            "group_image" => Ok(ProofType::GroupImage),
            other => Err(format!(
                "Invalid proof type '{}', expected geotag, event_image or group_image",
                other
            )),
        }
    }
}

/// A row of the submission ledger.
#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = activities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Submission {
    pub id: i64,
    pub prn: String,
    pub category: String,
    pub activity_type: i64,
    pub level: String,
    pub date: NaiveDate,
    pub certificate: String,
    pub proof: Option<String>,
    pub proof_type: Option<String>,
    pub remarks: String,
    pub status: String,
    pub points: i32,
    pub coordinator_remarks: Option<String>,
    pub verified_by: Option<i64>,
    pub verified_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = activities)]
pub struct NewSubmission {
    pub prn: String,
    pub category: String,
    pub activity_type: i64,
    pub level: String,
    pub date: NaiveDate,
    pub certificate: String,
    pub proof: Option<String>,
    pub proof_type: Option<String>,
    pub remarks: String,
    // status, points and submitted_at have DB defaults ('Pending', 0, CURRENT_TIMESTAMP)
}

/// A submission together with the name of the claimed activity.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SubmissionView {
    #[serde(flatten)]
    pub submission: Submission,
    pub activity_name: String,
}

impl From<(Submission, String)> for SubmissionView {
    fn from((submission, activity_name): (Submission, String)) -> Self {
        SubmissionView {
            submission,
            activity_name,
        }
    }
}

/// A pending submission as listed to a coordinator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PendingSubmission {
    #[serde(flatten)]
    pub submission: Submission,
    pub activity_name: String,
    pub student_name: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SubmissionReceipt {
    pub id: i64,
    pub status: String,
    pub certificate: String,
    pub proof: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct VerificationOutcome {
    pub submission_id: i64,
    pub status: String,
    pub points: i32,
    pub verified_by: i64,
    pub verified_at: DateTime<Utc>,
}
