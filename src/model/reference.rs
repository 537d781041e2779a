use crate::compliance::Requirements;
use crate::schema::{activities_master, activity_levels, programme_rules};
use crate::verification::PointsScale;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointsType {
    Fixed,
    Level,
}

impl PointsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointsType::Fixed => "Fixed",
            PointsType::Level => "Level",
        }
    }
}

impl fmt::Display for PointsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PointsType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Fixed" => Ok(PointsType::Fixed),
            "Level" => Ok(PointsType::Level),
            _ => Err(format!("Unknown points type '{}'", s)),
        }
    }
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = programme_rules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProgrammeRule {
    pub id: i64,
    pub admission_year: i32,
    pub programme: String,
    pub duration: i32,
    pub technical: i32,
    pub sports_cultural: i32,
    pub community_outreach: i32,
    pub innovation: i32,
    pub leadership: i32,
    pub total_points: i32,
}

impl ProgrammeRule {
    pub fn requirements(&self) -> Requirements {
        Requirements {
            technical: self.technical,
            sports_cultural: self.sports_cultural,
            community_outreach: self.community_outreach,
            innovation: self.innovation,
            leadership: self.leadership,
            total_points: self.total_points,
        }
    }
}

#[derive(Insertable, AsChangeset, Debug)]
#[diesel(table_name = programme_rules)]
pub struct NewProgrammeRule {
    pub admission_year: i32,
    pub programme: String,
    pub duration: i32,
    pub technical: i32,
    pub sports_cultural: i32,
    pub community_outreach: i32,
    pub innovation: i32,
    pub leadership: i32,
    pub total_points: i32,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = activities_master)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ActivityMaster {
    pub id: i64,
    pub category: String,
    pub activity_name: String,
    pub document_evidence: String,
    pub points_type: String,
    pub min_points: i32,
    pub max_points: i32,
    pub active: bool,
}

#[derive(Insertable, AsChangeset, Debug)]
#[diesel(table_name = activities_master)]
pub struct NewActivity {
    pub category: String,
    pub activity_name: String,
    pub document_evidence: String,
    pub points_type: String,
    pub min_points: i32,
    pub max_points: i32,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = activity_levels)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ActivityLevel {
    pub id: i64,
    pub activity_id: i64,
    pub level: String,
    pub points: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = activity_levels)]
pub struct NewActivityLevel {
    pub activity_id: i64,
    pub level: String,
    pub points: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LevelPoints {
    pub level: String,
    pub points: i32,
}

/// Catalog entry with its levels flattened in stored order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActivityWithLevels {
    pub id: i64,
    pub category: String,
    pub activity_name: String,
    pub document_evidence: String,
    pub points_type: PointsType,
    pub min_points: i32,
    pub max_points: i32,
    pub active: bool,
    pub levels: Vec<LevelPoints>,
}

impl ActivityWithLevels {
    pub fn assemble(activity: ActivityMaster, levels: Vec<LevelPoints>) -> Self {
        // stored values are written through PointsType, so anything else is Fixed
        let points_type = activity.points_type.parse().unwrap_or(PointsType::Fixed);
        ActivityWithLevels {
            id: activity.id,
            category: activity.category,
            activity_name: activity.activity_name,
            document_evidence: activity.document_evidence,
            points_type,
            min_points: activity.min_points,
            max_points: activity.max_points,
            active: activity.active,
            levels,
        }
    }
}

impl ActivityMaster {
    pub fn points_type(&self) -> PointsType {
        self.points_type.parse().unwrap_or(PointsType::Fixed)
    }

    /// Builds the award scale from this activity and its level rows.
    pub fn scale(&self, levels: &[ActivityLevel]) -> PointsScale {
        match self.points_type() {
            PointsType::Fixed => PointsScale::Fixed(self.min_points),
            PointsType::Level => PointsScale::Level(
                levels
                    .iter()
                    .map(|l| (l.level.clone(), l.points))
                    .collect(),
            ),
        }
    }

    /// Levels a student may claim: the stored labels, or `Fixed`.
    pub fn level_options(&self, levels: &[ActivityLevel]) -> Vec<LevelPoints> {
        match self.points_type() {
            PointsType::Fixed => vec![LevelPoints {
                level: FIXED_LEVEL.to_string(),
                points: self.min_points,
            }],
            PointsType::Level => levels
                .iter()
                .map(|l| LevelPoints {
                    level: l.level.clone(),
                    points: l.points,
                })
                .collect(),
        }
    }
}

/// Level label used for fixed-point activities.
pub const FIXED_LEVEL: &str = "Fixed";

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(points_type: &str) -> ActivityMaster {
        ActivityMaster {
            id: 3,
            category: "A".to_string(),
            activity_name: "Hackathon".to_string(),
            document_evidence: "Participation certificate".to_string(),
            points_type: points_type.to_string(),
            min_points: 5,
            max_points: 12,
            active: true,
        }
    }

    fn level(id: i64, label: &str, points: i32) -> ActivityLevel {
        ActivityLevel {
            id,
            activity_id: 3,
            level: label.to_string(),
            points,
        }
    }

    #[test]
    fn fixed_activity_offers_single_fixed_level() {
        let options = activity("Fixed").level_options(&[]);
        assert_eq!(
            options,
            vec![LevelPoints {
                level: "Fixed".to_string(),
                points: 5
            }]
        );
        assert_eq!(activity("Fixed").scale(&[]), PointsScale::Fixed(5));
    }

    #[test]
    fn level_activity_keeps_stored_order() {
        let levels = vec![
            level(1, "College", 3),
            level(2, "State", 9),
            level(3, "National", 12),
        ];
        let labels: Vec<String> = activity("Level")
            .level_options(&levels)
            .into_iter()
            .map(|l| format!("{}={}", l.level, l.points))
            .collect();
        assert_eq!(labels, vec!["College=3", "State=9", "National=12"]);
    }
}
