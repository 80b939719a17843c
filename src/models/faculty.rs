use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FacultyUser {
    pub id: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub display_name: Option<String>,
    pub device_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFacultyRequest {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub display_name: Option<String>,
    pub device_token: Option<String>,
}
