use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    Pending,
}

impl UserStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Pending => "pending",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "pending" => Ok(Self::Pending),
            other => Err(format!("Invalid status: {}", other)),
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct UserStats {
    pub referral_count: i64,
    pub non_referral_count: i64,
    pub rejected_count: i64,
}

/// Search form from the members page. Blank strings mean "no filter".
#[derive(Debug, Default, Deserialize)]
pub struct UserFilter {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub status: Option<UserStatus>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub level: Option<i32>,
    #[serde(default, alias = "hasReferral", deserialize_with = "blank_as_none")]
    pub has_referral: Option<bool>,
    #[serde(default, alias = "searchTerm")]
    pub search_term: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckEmailRequest {
    #[serde(alias = "emailid")]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct CheckEmailResponse {
    pub exists: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: String,
    pub phone: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub referral_code: Option<String>,
    pub referral_exchange: Option<String>,
    #[serde(deserialize_with = "number_or_string")]
    pub level: i32,
    /// Parsed by the service so an unknown value is a 400.
    pub status: String,
    pub memo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(alias = "emailid")]
    pub email: String,
    pub password: String,
    #[serde(flatten)]
    pub profile: UpdateUserRequest,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(alias = "currentPassword")]
    pub current_password: String,
    #[serde(alias = "newPassword")]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Accepts `null`, `""`, a native JSON value, or its string form (`"3"`, `"true"`).
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + serde::de::DeserializeOwned,
    T::Err: fmt::Display,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(serde_json::Value::String(s)) => s.trim().parse::<T>().map(Some).map_err(de::Error::custom),
        Some(other) => serde_json::from_value(other).map(Some).map_err(de::Error::custom),
    }
}

fn number_or_string<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    blank_as_none::<D, i32>(deserializer)?.ok_or_else(|| de::Error::custom("level is required"))
}
