use crate::compliance::Category;
use crate::errors::AppError;
use crate::model::submission::ProofType;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StudentAction {
    Dashboard,
    MySubmissions,
}

#[derive(Deserialize, Debug)]
pub struct StudentParams {
    pub action: StudentAction,
    /// Defaults to the caller's own PRN.
    pub prn: Option<String>,
}

/// Text part of a `submit_activity` multipart body, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionForm {
    pub prn: String,
    pub category: Category,
    pub activity_type: i64,
    pub level: String,
    pub date: NaiveDate,
    pub proof_type: ProofType,
    pub remarks: String,
}

fn required<'a>(fields: &'a HashMap<String, String>, name: &str) -> Result<&'a str, AppError> {
    fields
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("Missing required field '{}'", name)))
}

impl SubmissionForm {
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, AppError> {
        match fields.get("action").map(|a| a.trim()) {
            Some("submit_activity") => {}
            Some(other) => {
                return Err(AppError::BadRequest(format!("Unknown action '{}'", other)));
            }
            None => {
                return Err(AppError::BadRequest(
                    "Missing required field 'action'".to_string(),
                ));
            }
        }

        let prn = required(fields, "prn")?.to_string();
        let category = required(fields, "category")?
            .parse::<Category>()
            .map_err(AppError::BadRequest)?;
        let activity_type = required(fields, "activity_type")?
            .parse::<i64>()
            .map_err(|_| AppError::BadRequest("Field 'activity_type' must be an integer id".to_string()))?;
        let date = NaiveDate::parse_from_str(required(fields, "date")?, "%Y-%m-%d")
            .map_err(|_| AppError::BadRequest("Field 'date' must be formatted as YYYY-MM-DD".to_string()))?;
        let proof_type = required(fields, "proof_type")?
            .parse::<ProofType>()
            .map_err(AppError::BadRequest)?;

        Ok(SubmissionForm {
            prn,
            category,
            activity_type,
            // empty is allowed for fixed-point activities
            level: fields.get("level").map(|l| l.trim().to_string()).unwrap_or_default(),
            date,
            proof_type,
            remarks: fields.get("remarks").map(|r| r.trim().to_string()).unwrap_or_default(),
        })
    }
}
