use serde::Deserialize;
use std::fmt;

/// Plain-text password as received from a client. Redacted in `Debug`.
#[derive(Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

#[derive(Deserialize, Debug)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AuthPayload {
    Login(LoginPayload),
    Logout,
}

#[derive(Deserialize, Debug)]
pub struct LoginPayload {
    /// Parsed by the handler so an unknown value maps to 400 "Invalid user type".
    #[serde(rename = "userType", alias = "user_type")]
    pub user_type: String,
    pub username: String,
    pub password: Password,
}
