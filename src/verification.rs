//! Submission lifecycle: `Pending -> Approved | Rejected`, terminal afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "Pending",
            SubmissionStatus::Approved => "Approved",
            SubmissionStatus::Rejected => "Rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubmissionStatus::Pending)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(SubmissionStatus::Pending),
            "Approved" => Ok(SubmissionStatus::Approved),
            "Rejected" => Ok(SubmissionStatus::Rejected),
            _ => Err(format!("Unknown submission status '{}'", s)),
        }
    }
}

/// A coordinator's verdict on a pending submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn target_status(&self) -> SubmissionStatus {
        match self {
            Decision::Approve => SubmissionStatus::Approved,
            Decision::Reject => SubmissionStatus::Rejected,
        }
    }
}

/// Normalized form of a level label; labels with equal keys name the same level.
pub fn level_key(label: &str) -> String {
    label.to_lowercase()
}

pub fn same_level(a: &str, b: &str) -> bool {
    level_key(a) == level_key(b)
}

/// How many points an activity may award.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointsScale {
    Fixed(i32),
    /// `(label, points)` pairs in stored order.
    Level(Vec<(String, i32)>),
}

impl PointsScale {
    /// Upper bound for a submission claimed at `level`.
    ///
    /// Falls back to the highest level when the label is no longer part of
    /// the scale (levels may have been edited after submission).
    pub fn cap_for(&self, level: &str) -> i32 {
        match self {
            PointsScale::Fixed(points) => *points,
            PointsScale::Level(levels) => levels
                .iter()
                .find(|(label, _)| same_level(label, level))
                .map(|(_, points)| *points)
                .or_else(|| levels.iter().map(|(_, points)| *points).max())
                .unwrap_or(0),
        }
    }
}

/// Values written to the ledger when a decision is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Award {
    pub status: SubmissionStatus,
    pub points: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("Submission is already {0} and cannot be verified again")]
    AlreadyDecided(SubmissionStatus),
    #[error("Awarded points must not be negative (got {0})")]
    NegativePoints(i32),
    #[error("Awarded points {requested} exceed the maximum of {cap} for this activity level")]
    ExceedsCap { requested: i32, cap: i32 },
}

/// Computes the outcome of `decision` for a submission currently in `current`.
///
/// Rejections always award 0. Approvals without explicit points award the
/// cap of the claimed level.
pub fn decide(
    current: SubmissionStatus,
    decision: Decision,
    requested_points: Option<i32>,
    cap: i32,
) -> Result<Award, VerificationError> {
    if current.is_terminal() {
        return Err(VerificationError::AlreadyDecided(current));
    }

    let points = match decision {
        Decision::Reject => 0,
        Decision::Approve => {
            let points = requested_points.unwrap_or(cap);
            if points < 0 {
                return Err(VerificationError::NegativePoints(points));
            }
            if points > cap {
                return Err(VerificationError::ExceedsCap {
                    requested: points,
                    cap,
                });
            }
            points
        }
    };

    Ok(Award {
        status: decision.target_status(),
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels() -> PointsScale {
        PointsScale::Level(vec![
            ("College".to_string(), 3),
            ("State".to_string(), 9),
            ("National".to_string(), 12),
        ])
    }

    #[test]
    fn approve_awards_requested_points_within_cap() {
        let award = decide(SubmissionStatus::Pending, Decision::Approve, Some(8), 9).unwrap();
        assert_eq!(award.status, SubmissionStatus::Approved);
        assert_eq!(award.points, 8);
    }

    #[test]
    fn approve_without_points_awards_cap() {
        let award = decide(SubmissionStatus::Pending, Decision::Approve, None, 12).unwrap();
        assert_eq!(award.points, 12);
    }

    #[test]
    fn reject_ignores_requested_points() {
        let award = decide(SubmissionStatus::Pending, Decision::Reject, Some(50), 9).unwrap();
        assert_eq!(award.status, SubmissionStatus::Rejected);
        assert_eq!(award.points, 0);
    }

    #[test]
    fn decided_submissions_cannot_be_verified_again() {
        for current in [SubmissionStatus::Approved, SubmissionStatus::Rejected] {
            let err = decide(current, Decision::Approve, Some(1), 9).unwrap_err();
            assert_eq!(err, VerificationError::AlreadyDecided(current));
        }
    }

    #[test]
    fn points_outside_scale_are_rejected() {
        assert_eq!(
            decide(SubmissionStatus::Pending, Decision::Approve, Some(10), 9),
            Err(VerificationError::ExceedsCap {
                requested: 10,
                cap: 9
            })
        );
        assert_eq!(
            decide(SubmissionStatus::Pending, Decision::Approve, Some(-1), 9),
            Err(VerificationError::NegativePoints(-1))
        );
    }

    #[test]
    fn cap_follows_claimed_level() {
        let scale = levels();
        assert_eq!(scale.cap_for("College"), 3);
        assert_eq!(scale.cap_for("state"), 9);
        assert_eq!(scale.cap_for("International"), 12);
        assert_eq!(PointsScale::Fixed(5).cap_for("Fixed"), 5);
        assert_eq!(PointsScale::Level(Vec::new()).cap_for("Any"), 0);
    }

    #[test]
    fn non_ascii_labels_fold_the_same_way_everywhere() {
        assert!(same_level("État", "ÉTAT"));
        assert_eq!(level_key("État"), level_key("état"));
        assert!(!same_level("État", "Etat"));

        let scale = PointsScale::Level(vec![("État".to_string(), 7), ("Mondial".to_string(), 15)]);
        assert_eq!(scale.cap_for("ÉTAT"), 7);
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            SubmissionStatus::Pending,
            SubmissionStatus::Approved,
            SubmissionStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<SubmissionStatus>(), Ok(status));
        }
        assert!("approved".parse::<SubmissionStatus>().is_err());
    }
}
