use crate::compliance::{Category, CategoryProgress, Compliance, ComplianceTally};
use crate::model::principal::{CoordinatorProfile, HodProfile, StudentProfile};
use crate::model::submission::{PendingSubmission, SubmissionView};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct StudentProgress {
    pub earned_points: i64,
    pub required_points: i64,
    pub progress_percentage: f64,
    pub compliance: Compliance,
    pub total_submissions: i64,
    pub approved_submissions: i64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct StudentDashboard {
    pub student: StudentProfile,
    pub progress: StudentProgress,
    pub categories: Vec<CategoryProgress>,
    pub recent_submissions: Vec<SubmissionView>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct CoordinatorStats {
    pub total_students: i64,
    pub pending_submissions: i64,
    pub compliant: i64,
    pub in_progress: i64,
    pub at_risk: i64,
}

/// One student's position in a class listing.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StudentStanding {
    pub prn: String,
    pub name: String,
    pub programme: String,
    pub year: i32,
    pub earned_points: i64,
    pub required_points: i64,
    pub progress_percentage: f64,
    pub compliance: Compliance,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CategoryAverage {
    pub category: Category,
    pub name: String,
    pub average_progress: f64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CoordinatorDashboard {
    pub coordinator: CoordinatorProfile,
    pub stats: CoordinatorStats,
    pub students: Vec<StudentStanding>,
    pub category_averages: Vec<CategoryAverage>,
    pub recent_pending: Vec<PendingSubmission>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct StudentCertificates {
    pub student: StudentProfile,
    pub submissions: Vec<SubmissionView>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct HodStats {
    pub total_students: i64,
    pub average_progress: f64,
    pub at_risk: i64,
    pub total_points: i64,
}

/// Students of one (programme, year) class in a department.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClassRow {
    pub programme: String,
    pub year: i32,
    pub students: i64,
    pub compliant: i64,
    pub in_progress: i64,
    pub at_risk: i64,
    pub average_progress: f64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HodDashboard {
    pub hod: HodProfile,
    pub stats: HodStats,
    pub classes: Vec<ClassRow>,
    pub distribution: ComplianceTally,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct AdminStats {
    pub total_students: i64,
    pub approved_activities: i64,
    pub average_progress: f64,
    pub programmes_with_rules: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProgrammeRow {
    pub programme: String,
    pub students: i64,
    /// Students who already meet the programme requirement.
    pub eligible: i64,
    pub average_progress: f64,
    pub approved_activities: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DepartmentRow {
    pub department: String,
    pub students: i64,
    pub compliant: i64,
    pub at_risk: i64,
    pub average_progress: f64,
    pub approved_activities: i64,
}

/// Submissions and approvals in one calendar month (`YYYY-MM`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MonthlyTrend {
    pub month: String,
    pub submissions: i64,
    pub approvals: i64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AdminDashboard {
    pub stats: AdminStats,
    pub programmes: Vec<ProgrammeRow>,
    pub departments: Vec<DepartmentRow>,
    pub trends: Vec<MonthlyTrend>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TranscriptSummary {
    pub earned_points: i64,
    pub required_points: i64,
    pub progress_percentage: f64,
    pub compliance: Compliance,
    pub approved_activities: i64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Transcript {
    pub student: StudentProfile,
    pub summary: TranscriptSummary,
    pub categories: Vec<CategoryProgress>,
    pub activities: Vec<SubmissionView>,
    pub generated_at: DateTime<Utc>,
}
