use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptAction {
    Get,
}

#[derive(Deserialize, Debug)]
pub struct TranscriptParams {
    pub action: TranscriptAction,
    pub prn: Option<String>,
}
