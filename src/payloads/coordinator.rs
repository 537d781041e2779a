use crate::verification::Decision;
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorAction {
    Dashboard,
    PendingSubmissions,
    GetStudentCertificates,
}

#[derive(Deserialize, Debug)]
pub struct CoordinatorParams {
    pub action: CoordinatorAction,
    /// Coordinator id; must be the caller's when present.
    pub id: Option<i64>,
    /// Required by `get_student_certificates`.
    pub prn: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CoordinatorCommand {
    VerifySubmission(VerifySubmissionPayload),
}

#[derive(Deserialize, Debug)]
pub struct VerifySubmissionPayload {
    pub submission_id: i64,
    pub verification_action: Decision,
    pub points: Option<i32>,
    pub remarks: Option<String>,
    pub coordinator_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn verify_payload_parses_decision() {
        let CoordinatorCommand::VerifySubmission(payload) = serde_json::from_value(json!({
            "action": "verify_submission",
            "submission_id": 12,
            "verification_action": "approve",
            "points": 9,
            "remarks": "ok",
            "coordinator_id": 3
        }))
        .unwrap();
        assert_eq!(payload.verification_action, Decision::Approve);
        assert_eq!(payload.points, Some(9));
    }

    #[test]
    fn unknown_decision_is_rejected() {
        let result = serde_json::from_value::<CoordinatorCommand>(json!({
            "action": "verify_submission",
            "submission_id": 12,
            "verification_action": "maybe"
        }));
        assert!(result.is_err());
    }
}
