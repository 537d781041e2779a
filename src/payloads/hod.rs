use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HodAction {
    Dashboard,
}

#[derive(Deserialize, Debug)]
pub struct HodParams {
    pub action: HodAction,
    pub id: Option<i64>,
}
