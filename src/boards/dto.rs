use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct BoardRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub type_code: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteBoardResponse {
    pub message: &'static str,
    pub affected: u64,
}
