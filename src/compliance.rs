//! Points aggregation and compliance classification.
//!
//! Every dashboard, the transcript and the coordinator statistics go through
//! [`Compliance::from_points`] / [`Compliance::from_progress`]; the 50/100
//! thresholds are not repeated anywhere else.

use crate::verification::SubmissionStatus;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Progress (in percent) at or above which a student is compliant.
pub const COMPLIANT_THRESHOLD: f64 = 100.0;
/// Progress (in percent) below which a student is at risk.
pub const AT_RISK_THRESHOLD: f64 = 50.0;

/// The five fixed activity domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    A,
    B,
    C,
    D,
    E,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::A,
        Category::B,
        Category::C,
        Category::D,
        Category::E,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Category::A => "A",
            Category::B => "B",
            Category::C => "C",
            Category::D => "D",
            Category::E => "E",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::A => "Technical Skills",
            Category::B => "Sports & Cultural",
            Category::C => "Community Outreach",
            Category::D => "Innovation",
            Category::E => "Leadership",
        }
    }

    fn index(&self) -> usize {
        match self {
            Category::A => 0,
            Category::B => 1,
            Category::C => 2,
            Category::D => 3,
            Category::E => 4,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Category::A),
            "B" => Ok(Category::B),
            "C" => Ok(Category::C),
            "D" => Ok(Category::D),
            "E" => Ok(Category::E),
            _ => Err(format!("Unknown category '{}', expected one of A-E", s)),
        }
    }
}

/// Compliance bucket derived from the earned/required ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compliance {
    Compliant,
    InProgress,
    AtRisk,
}

impl Compliance {
    pub fn from_progress(progress: f64) -> Self {
        if progress >= COMPLIANT_THRESHOLD {
            Compliance::Compliant
        } else if progress < AT_RISK_THRESHOLD {
            Compliance::AtRisk
        } else {
            Compliance::InProgress
        }
    }

    pub fn from_points(earned: i64, required: i64) -> Self {
        Self::from_progress(progress_percentage(earned, required))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Compliance::Compliant => "Compliant",
            Compliance::InProgress => "In Progress",
            Compliance::AtRisk => "At Risk",
        }
    }
}

/// 100 × earned / required, or 0 when nothing is required.
pub fn progress_percentage(earned: i64, required: i64) -> f64 {
    if required > 0 {
        100.0 * earned as f64 / required as f64
    } else {
        0.0
    }
}

/// Points required per category by a programme rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Requirements {
    pub technical: i32,
    pub sports_cultural: i32,
    pub community_outreach: i32,
    pub innovation: i32,
    pub leadership: i32,
    pub total_points: i32,
}

impl Requirements {
    pub fn for_category(&self, category: Category) -> i32 {
        match category {
            Category::A => self.technical,
            Category::B => self.sports_cultural,
            Category::C => self.community_outreach,
            Category::D => self.innovation,
            Category::E => self.leadership,
        }
    }

    pub fn category_sum(&self) -> i32 {
        Category::ALL.iter().map(|c| self.for_category(*c)).sum()
    }
}

/// A ledger row as seen by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerEntry {
    pub category: Category,
    pub status: SubmissionStatus,
    pub points: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryProgress {
    pub category: Category,
    pub name: String,
    pub earned: i64,
    pub required: i64,
    pub progress_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsSummary {
    pub categories: Vec<CategoryProgress>,
    pub earned_points: i64,
    pub required_points: i64,
    pub progress_percentage: f64,
    pub compliance: Compliance,
}

impl PointsSummary {
    pub fn earned_in(&self, category: Category) -> i64 {
        self.categories
            .iter()
            .find(|c| c.category == category)
            .map(|c| c.earned)
            .unwrap_or(0)
    }
}

/// Sums approved points per category and pairs them with the rule.
///
/// Pending and rejected entries never contribute. A missing rule means
/// nothing is required, which classifies as at-risk (0% progress).
pub fn summarize<'a, I>(entries: I, rule: Option<&Requirements>) -> PointsSummary
where
    I: IntoIterator<Item = &'a LedgerEntry>,
{
    let mut earned = [0i64; 5];
    for entry in entries {
        if entry.status == SubmissionStatus::Approved {
            earned[entry.category.index()] += entry.points;
        }
    }

    let requirements = rule.copied().unwrap_or_default();
    let categories: Vec<CategoryProgress> = Category::ALL
        .iter()
        .map(|category| {
            let earned = earned[category.index()];
            let required = i64::from(requirements.for_category(*category));
            CategoryProgress {
                category: *category,
                name: category.display_name().to_string(),
                earned,
                required,
                progress_percentage: progress_percentage(earned, required),
            }
        })
        .collect();

    let earned_points: i64 = earned.iter().sum();
    let required_points = i64::from(requirements.total_points);

    PointsSummary {
        categories,
        earned_points,
        required_points,
        progress_percentage: progress_percentage(earned_points, required_points),
        compliance: Compliance::from_points(earned_points, required_points),
    }
}

/// Counts of students per compliance bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComplianceTally {
    pub compliant: i64,
    pub in_progress: i64,
    pub at_risk: i64,
}

impl ComplianceTally {
    pub fn record(&mut self, compliance: Compliance) {
        match compliance {
            Compliance::Compliant => self.compliant += 1,
            Compliance::InProgress => self.in_progress += 1,
            Compliance::AtRisk => self.at_risk += 1,
        }
    }

    pub fn total(&self) -> i64 {
        self.compliant + self.in_progress + self.at_risk
    }
}

impl FromIterator<Compliance> for ComplianceTally {
    fn from_iter<T: IntoIterator<Item = Compliance>>(iter: T) -> Self {
        let mut tally = ComplianceTally::default();
        for compliance in iter {
            tally.record(compliance);
        }
        tally
    }
}

/// Mean of the given progress values, 0 for an empty set.
pub fn average_progress<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    fn entry(category: Category, status: SubmissionStatus, points: i64) -> LedgerEntry {
        LedgerEntry {
            category,
            status,
            points,
        }
    }

    fn rule(total_points: i32) -> Requirements {
        Requirements {
            technical: 45,
            sports_cultural: 10,
            community_outreach: 10,
            innovation: 25,
            leadership: 10,
            total_points,
        }
    }

    #[test]
    fn no_approved_submissions_means_zero_progress() {
        let entries = vec![
            entry(Category::A, SubmissionStatus::Pending, 20),
            entry(Category::B, SubmissionStatus::Rejected, 0),
        ];
        let summary = summarize(&entries, Some(&rule(100)));
        assert_eq!(summary.earned_points, 0);
        assert_eq!(summary.required_points, 100);
        assert!(approx_eq!(f64, summary.progress_percentage, 0.0, ulps = 2));
        assert_eq!(summary.compliance, Compliance::AtRisk);
    }

    #[test]
    fn sixty_plus_twenty_of_one_hundred_is_in_progress() {
        let entries = vec![
            entry(Category::A, SubmissionStatus::Approved, 60),
            entry(Category::B, SubmissionStatus::Approved, 20),
        ];
        let summary = summarize(&entries, Some(&rule(100)));
        assert_eq!(summary.earned_points, 80);
        assert_eq!(summary.earned_in(Category::A), 60);
        assert_eq!(summary.earned_in(Category::B), 20);
        assert!(approx_eq!(f64, summary.progress_percentage, 80.0, ulps = 2));
        assert_eq!(summary.compliance, Compliance::InProgress);
    }

    #[test]
    fn only_approved_entries_change_category_totals() {
        let mut entries = vec![entry(Category::C, SubmissionStatus::Approved, 5)];
        let before = summarize(&entries, Some(&rule(100))).earned_in(Category::C);

        entries.push(entry(Category::C, SubmissionStatus::Pending, 9));
        entries.push(entry(Category::C, SubmissionStatus::Rejected, 9));
        assert_eq!(
            summarize(&entries, Some(&rule(100))).earned_in(Category::C),
            before
        );

        entries.push(entry(Category::C, SubmissionStatus::Approved, 9));
        assert_eq!(
            summarize(&entries, Some(&rule(100))).earned_in(Category::C),
            before + 9
        );
    }

    #[test]
    fn missing_rule_treats_requirements_as_zero() {
        let entries = vec![entry(Category::D, SubmissionStatus::Approved, 30)];
        let summary = summarize(&entries, None);
        assert_eq!(summary.earned_points, 30);
        assert_eq!(summary.required_points, 0);
        assert!(approx_eq!(f64, summary.progress_percentage, 0.0, ulps = 2));
        assert_eq!(summary.compliance, Compliance::AtRisk);
        assert!(summary.categories.iter().all(|c| c.required == 0));
    }

    #[test]
    fn classification_boundaries() {
        assert_eq!(Compliance::from_points(50, 100), Compliance::InProgress);
        assert_eq!(Compliance::from_points(49, 100), Compliance::AtRisk);
        assert_eq!(Compliance::from_points(1, 2), Compliance::InProgress);
        assert_eq!(Compliance::from_points(99, 100), Compliance::InProgress);
        assert_eq!(Compliance::from_points(100, 100), Compliance::Compliant);
        assert_eq!(Compliance::from_points(7, 7), Compliance::Compliant);
        assert_eq!(Compliance::from_points(150, 100), Compliance::Compliant);
        assert_eq!(Compliance::from_points(10, 0), Compliance::AtRisk);
        assert_eq!(Compliance::from_points(0, 0), Compliance::AtRisk);
    }

    #[test]
    fn categories_are_reported_in_fixed_order() {
        let summary = summarize(&[], Some(&rule(100)));
        let codes: Vec<&str> = summary.categories.iter().map(|c| c.category.code()).collect();
        assert_eq!(codes, vec!["A", "B", "C", "D", "E"]);
        assert_eq!(summary.categories[0].name, "Technical Skills");
        assert_eq!(summary.categories[0].required, 45);
        assert_eq!(summary.categories[3].required, 25);
    }

    #[test]
    fn tally_counts_each_bucket() {
        let tally: ComplianceTally = [
            Compliance::Compliant,
            Compliance::AtRisk,
            Compliance::AtRisk,
            Compliance::InProgress,
        ]
        .into_iter()
        .collect();
        assert_eq!(tally.compliant, 1);
        assert_eq!(tally.in_progress, 1);
        assert_eq!(tally.at_risk, 2);
        assert_eq!(tally.total(), 4);
    }

    #[test]
    fn average_of_empty_set_is_zero() {
        assert!(approx_eq!(f64, average_progress(Vec::new()), 0.0, ulps = 2));
        assert!(approx_eq!(
            f64,
            average_progress(vec![50.0, 100.0]),
            75.0,
            ulps = 2
        ));
    }

    #[test]
    fn category_parsing_accepts_lowercase() {
        assert_eq!("c".parse::<Category>(), Ok(Category::C));
        assert!("F".parse::<Category>().is_err());
    }
}
