use crate::compliance::Category;
use crate::errors::AppError;
use crate::model::principal::Role;
use crate::model::reference::{NewActivity, NewProgrammeRule, PointsType};
use crate::payloads::auth::Password;
use crate::verification::level_key;
use serde::Deserialize;
use std::collections::HashSet;

// Column widths of the backing tables.
const PRN_LEN: usize = 32;
const SHORT_TEXT_LEN: usize = 100;
const NAME_LEN: usize = 200;
const ACTIVITY_NAME_LEN: usize = 255;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdminQuery {
    Dashboard,
    GetUsers,
    GetProgramRules,
    GetActivities,
}

#[derive(Deserialize, Debug)]
pub struct AdminParams {
    pub action: AdminQuery,
    /// User table listed by `get_users`; students when omitted.
    #[serde(rename = "type")]
    pub user_type: Option<Role>,
    /// Optional category filter for `get_activities`.
    pub category: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AdminCommand {
    CreateUser(UserPayload),
    UpdateUser(UserPayload),
    CreateProgramRule(ProgramRulePayload),
    UpdateProgramRule {
        id: i64,
        #[serde(flatten)]
        rule: ProgramRulePayload,
    },
    DeleteProgramRule {
        id: i64,
    },
    CreateActivity(ActivityPayload),
    UpdateActivity {
        id: i64,
        #[serde(flatten)]
        activity: ActivityPayload,
    },
    DeleteActivity {
        id: i64,
    },
}

#[derive(Deserialize, Debug)]
#[serde(tag = "user_type", rename_all = "lowercase")]
pub enum UserPayload {
    Student(StudentUserPayload),
    Coordinator(CoordinatorUserPayload),
    Hod(HodUserPayload),
    Admin(AdminUserPayload),
}

impl UserPayload {
    pub fn role(&self) -> Role {
        match self {
            UserPayload::Student(_) => Role::Student,
            UserPayload::Coordinator(_) => Role::Coordinator,
            UserPayload::Hod(_) => Role::Hod,
            UserPayload::Admin(_) => Role::Admin,
        }
    }

    pub fn password(&self) -> Option<&Password> {
        match self {
            UserPayload::Student(s) => s.password.as_ref(),
            UserPayload::Coordinator(c) => c.password.as_ref(),
            UserPayload::Hod(h) => h.password.as_ref(),
            UserPayload::Admin(a) => a.password.as_ref(),
        }
    }

    /// Checks the fields shared by create and update.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.password().is_some_and(|p| p.is_blank()) {
            return Err(AppError::UnprocessableEntity(
                "Password must not be blank".to_string(),
            ));
        }
        match self {
            UserPayload::Student(s) => {
                non_blank("prn", &s.prn)?;
                non_blank("first_name", &s.first_name)?;
                non_blank("last_name", &s.last_name)?;
                non_blank("dept", &s.dept)?;
                non_blank("programme", &s.programme)?;
                max_len("prn", &s.prn, PRN_LEN)?;
                max_len("first_name", &s.first_name, SHORT_TEXT_LEN)?;
                max_len(
                    "middle_name",
                    s.middle_name.as_deref().unwrap_or_default(),
                    SHORT_TEXT_LEN,
                )?;
                max_len("last_name", &s.last_name, SHORT_TEXT_LEN)?;
                max_len("dept", &s.dept, SHORT_TEXT_LEN)?;
                max_len("programme", &s.programme, SHORT_TEXT_LEN)?;
                positive("year", s.year)?;
                positive("course_duration", s.course_duration)?;
                positive("admission_year", s.admission_year)
            }
            UserPayload::Coordinator(c) => {
                non_blank("name", &c.name)?;
                non_blank("department", &c.department)?;
                max_len("name", &c.name, NAME_LEN)?;
                max_len("department", &c.department, SHORT_TEXT_LEN)?;
                positive("year", c.year)
            }
            UserPayload::Hod(h) => {
                non_blank("name", &h.name)?;
                non_blank("department", &h.department)?;
                max_len("name", &h.name, NAME_LEN)?;
                max_len("department", &h.department, SHORT_TEXT_LEN)
            }
            UserPayload::Admin(a) => {
                non_blank("name", &a.name)?;
                max_len("name", &a.name, NAME_LEN)
            }
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct StudentUserPayload {
    pub prn: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub dept: String,
    pub year: i32,
    pub programme: String,
    pub admission_year: i32,
    pub course_duration: i32,
    pub password: Option<Password>,
}

#[derive(Deserialize, Debug)]
pub struct CoordinatorUserPayload {
    /// Required on update.
    pub user_id: Option<i64>,
    pub name: String,
    pub department: String,
    pub year: i32,
    pub password: Option<Password>,
}

#[derive(Deserialize, Debug)]
pub struct HodUserPayload {
    pub user_id: Option<i64>,
    pub name: String,
    pub department: String,
    pub password: Option<Password>,
}

#[derive(Deserialize, Debug)]
pub struct AdminUserPayload {
    pub user_id: Option<i64>,
    pub name: String,
    pub password: Option<Password>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ProgramRulePayload {
    pub admission_year: i32,
    pub programme: String,
    pub duration: i32,
    pub technical: i32,
    pub sports_cultural: i32,
    pub community_outreach: i32,
    pub innovation: i32,
    pub leadership: i32,
    /// Derived from the categories when omitted.
    pub total_points: Option<i32>,
}

impl ProgramRulePayload {
    pub fn into_new_rule(self) -> Result<NewProgrammeRule, AppError> {
        non_blank("programme", &self.programme)?;
        max_len("programme", &self.programme, SHORT_TEXT_LEN)?;
        positive("admission_year", self.admission_year)?;
        positive("duration", self.duration)?;

        let categories = [
            ("technical", self.technical),
            ("sports_cultural", self.sports_cultural),
            ("community_outreach", self.community_outreach),
            ("innovation", self.innovation),
            ("leadership", self.leadership),
        ];
        for (name, value) in categories {
            if value < 0 {
                return Err(AppError::UnprocessableEntity(format!(
                    "Field '{}' must not be negative",
                    name
                )));
            }
        }

        let sum: i64 = categories.iter().map(|(_, value)| i64::from(*value)).sum();
        let sum = i32::try_from(sum).map_err(|_| {
            AppError::UnprocessableEntity(format!(
                "Category requirements add up to {}, above the maximum of {}",
                sum,
                i32::MAX
            ))
        })?;
        let total_points = match self.total_points {
            Some(total) if total != sum => {
                return Err(AppError::UnprocessableEntity(format!(
                    "total_points ({}) must equal the sum of the category requirements ({})",
                    total, sum
                )));
            }
            _ => sum,
        };

        Ok(NewProgrammeRule {
            admission_year: self.admission_year,
            programme: self.programme.trim().to_string(),
            duration: self.duration,
            technical: self.technical,
            sports_cultural: self.sports_cultural,
            community_outreach: self.community_outreach,
            innovation: self.innovation,
            leadership: self.leadership,
            total_points,
        })
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct LevelPayload {
    pub level: String,
    pub points: i32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ActivityPayload {
    pub category: String,
    pub activity_name: String,
    #[serde(default)]
    pub document_evidence: String,
    pub points_type: PointsType,
    pub min_points: Option<i32>,
    pub max_points: Option<i32>,
    #[serde(default)]
    pub levels: Vec<LevelPayload>,
}

/// A catalog entry ready to be written, levels in submitted order.
#[derive(Debug)]
pub struct ValidatedActivity {
    pub activity: NewActivity,
    pub levels: Vec<(String, i32)>,
}

impl ActivityPayload {
    pub fn validate(self) -> Result<ValidatedActivity, AppError> {
        let category = self
            .category
            .parse::<Category>()
            .map_err(AppError::BadRequest)?;
        non_blank("activity_name", &self.activity_name)?;
        max_len("activity_name", &self.activity_name, ACTIVITY_NAME_LEN)?;

        let (min_points, max_points, levels) = match self.points_type {
            PointsType::Fixed => {
                if !self.levels.is_empty() {
                    return Err(AppError::UnprocessableEntity(
                        "Fixed activities must not define levels".to_string(),
                    ));
                }
                let min = self.min_points.ok_or_else(|| {
                    AppError::UnprocessableEntity(
                        "Fixed activities require min_points".to_string(),
                    )
                })?;
                (min, self.max_points.unwrap_or(min), Vec::new())
            }
            PointsType::Level => {
                if self.levels.is_empty() {
                    return Err(AppError::UnprocessableEntity(
                        "Level activities require at least one level".to_string(),
                    ));
                }
                let mut seen = HashSet::new();
                let mut levels = Vec::with_capacity(self.levels.len());
                for level in self.levels {
                    let label = level.level.trim().to_string();
                    if label.is_empty() {
                        return Err(AppError::UnprocessableEntity(
                            "Level labels must not be empty".to_string(),
                        ));
                    }
                    max_len("level", &label, SHORT_TEXT_LEN)?;
                    if !seen.insert(level_key(&label)) {
                        return Err(AppError::UnprocessableEntity(format!(
                            "Duplicate level '{}'",
                            label
                        )));
                    }
                    if level.points < 0 {
                        return Err(AppError::UnprocessableEntity(format!(
                            "Level '{}' must not have negative points",
                            label
                        )));
                    }
                    levels.push((label, level.points));
                }
                let lowest = levels.iter().map(|(_, p)| *p).min().unwrap_or(0);
                let highest = levels.iter().map(|(_, p)| *p).max().unwrap_or(0);
                (
                    self.min_points.unwrap_or(lowest),
                    self.max_points.unwrap_or(highest),
                    levels,
                )
            }
        };

        if min_points < 0 {
            return Err(AppError::UnprocessableEntity(
                "min_points must not be negative".to_string(),
            ));
        }
        if max_points < min_points {
            return Err(AppError::UnprocessableEntity(format!(
                "max_points ({}) must not be lower than min_points ({})",
                max_points, min_points
            )));
        }

        Ok(ValidatedActivity {
            activity: NewActivity {
                category: category.code().to_string(),
                activity_name: self.activity_name.trim().to_string(),
                document_evidence: self.document_evidence.trim().to_string(),
                points_type: self.points_type.as_str().to_string(),
                min_points,
                max_points,
            },
            levels,
        })
    }
}

fn non_blank(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        Err(AppError::UnprocessableEntity(format!(
            "Field '{}' must not be empty",
            field
        )))
    } else {
        Ok(())
    }
}

fn max_len(field: &str, value: &str, limit: usize) -> Result<(), AppError> {
    if value.trim().chars().count() > limit {
        Err(AppError::UnprocessableEntity(format!(
            "Field '{}' must be at most {} characters",
            field, limit
        )))
    } else {
        Ok(())
    }
}

fn positive(field: &str, value: i32) -> Result<(), AppError> {
    if value <= 0 {
        Err(AppError::UnprocessableEntity(format!(
            "Field '{}' must be positive",
            field
        )))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(total: Option<i32>) -> ProgramRulePayload {
        ProgramRulePayload {
            admission_year: 2023,
            programme: "B.Tech".to_string(),
            duration: 4,
            technical: 45,
            sports_cultural: 10,
            community_outreach: 10,
            innovation: 25,
            leadership: 10,
            total_points: total,
        }
    }

    fn level_activity(levels: Vec<(&str, i32)>) -> ActivityPayload {
        ActivityPayload {
            category: "A".to_string(),
            activity_name: "Paper Presentation".to_string(),
            document_evidence: "Certificate".to_string(),
            points_type: PointsType::Level,
            min_points: None,
            max_points: None,
            levels: levels
                .into_iter()
                .map(|(level, points)| LevelPayload {
                    level: level.to_string(),
                    points,
                })
                .collect(),
        }
    }

    #[test]
    fn rule_total_is_derived_or_checked() {
        assert_eq!(rule(None).into_new_rule().unwrap().total_points, 100);
        assert_eq!(rule(Some(100)).into_new_rule().unwrap().total_points, 100);
        assert!(matches!(
            rule(Some(120)).into_new_rule(),
            Err(AppError::UnprocessableEntity(_))
        ));
    }

    #[test]
    fn rule_total_overflow_is_rejected() {
        let mut huge = rule(None);
        huge.technical = i32::MAX;
        huge.sports_cultural = 1;
        huge.community_outreach = 0;
        huge.innovation = 0;
        huge.leadership = 0;
        assert!(matches!(
            huge.clone().into_new_rule(),
            Err(AppError::UnprocessableEntity(_))
        ));

        huge.total_points = Some(i32::MIN);
        assert!(matches!(
            huge.into_new_rule(),
            Err(AppError::UnprocessableEntity(_))
        ));
    }

    #[test]
    fn overlong_fields_are_unprocessable() {
        let mut long_programme = rule(None);
        long_programme.programme = "B".repeat(101);
        assert!(matches!(
            long_programme.into_new_rule(),
            Err(AppError::UnprocessableEntity(_))
        ));

        let mut long_name = level_activity(vec![("College", 3)]);
        long_name.activity_name = "x".repeat(256);
        assert!(matches!(
            long_name.validate(),
            Err(AppError::UnprocessableEntity(_))
        ));

        let long_level = "L".repeat(150);
        assert!(matches!(
            level_activity(vec![(long_level.as_str(), 3)]).validate(),
            Err(AppError::UnprocessableEntity(_))
        ));
        // Width counts characters, not bytes.
        let accented = "é".repeat(100);
        assert!(level_activity(vec![(accented.as_str(), 3)]).validate().is_ok());

        let user: UserPayload = serde_json::from_value(json!({
            "user_type": "student",
            "prn": "P".repeat(40),
            "first_name": "Asha",
            "last_name": "Patil",
            "dept": "CSE",
            "year": 2,
            "programme": "B.Tech",
            "admission_year": 2023,
            "course_duration": 4
        }))
        .unwrap();
        assert!(matches!(
            user.validate(),
            Err(AppError::UnprocessableEntity(_))
        ));
    }

    #[test]
    fn duplicate_levels_fold_like_submission_matching() {
        assert!(level_activity(vec![("État", 3), ("ÉTAT", 4)]).validate().is_err());
        let distinct = level_activity(vec![("État", 3), ("Etat", 4)]).validate().unwrap();
        assert_eq!(distinct.levels.len(), 2);
    }

    #[test]
    fn level_activity_keeps_order_and_derives_bounds() {
        let validated = level_activity(vec![("College", 3), ("State", 9), ("National", 12)])
            .validate()
            .unwrap();
        assert_eq!(validated.activity.min_points, 3);
        assert_eq!(validated.activity.max_points, 12);
        assert_eq!(validated.activity.points_type, "Level");
        let labels: Vec<&str> = validated.levels.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["College", "State", "National"]);
    }

    #[test]
    fn level_activity_rejects_bad_levels() {
        assert!(level_activity(vec![]).validate().is_err());
        assert!(level_activity(vec![("State", 3), ("state", 4)]).validate().is_err());
        assert!(level_activity(vec![("State", -1)]).validate().is_err());
        assert!(level_activity(vec![(" ", 1)]).validate().is_err());
    }

    #[test]
    fn fixed_activity_must_not_carry_levels() {
        let mut fixed = level_activity(vec![("College", 3)]);
        fixed.points_type = PointsType::Fixed;
        fixed.min_points = Some(5);
        assert!(fixed.clone().validate().is_err());

        fixed.levels.clear();
        let validated = fixed.validate().unwrap();
        assert_eq!(validated.activity.min_points, 5);
        assert_eq!(validated.activity.max_points, 5);
        assert!(validated.levels.is_empty());
    }

    #[test]
    fn create_user_payload_is_tagged_by_user_type() {
        let command: AdminCommand = serde_json::from_value(json!({
            "action": "create_user",
            "user_type": "coordinator",
            "name": "R. Kulkarni",
            "department": "Computer",
            "year": 2,
            "password": "pw"
        }))
        .unwrap();
        let AdminCommand::CreateUser(user) = command else {
            panic!("expected create_user");
        };
        assert_eq!(user.role(), Role::Coordinator);
        assert!(user.validate().is_ok());
    }

    #[test]
    fn update_activity_flattens_fields_next_to_id() {
        let command: AdminCommand = serde_json::from_value(json!({
            "action": "update_activity",
            "id": 8,
            "category": "B",
            "activity_name": "Marathon",
            "points_type": "Fixed",
            "min_points": 4
        }))
        .unwrap();
        let AdminCommand::UpdateActivity { id, activity } = command else {
            panic!("expected update_activity");
        };
        assert_eq!(id, 8);
        assert_eq!(activity.min_points, Some(4));
    }
}
