use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivitiesAction {
    GetByCategory,
    GetLevels,
}

#[derive(Deserialize, Debug)]
pub struct ActivitiesParams {
    pub action: ActivitiesAction,
    pub category: Option<String>,
    pub activity_id: Option<i64>,
}
