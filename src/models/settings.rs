use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Single-row runtime settings. `min_students` is the class validation
/// threshold; the semester labels seed archive metadata.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AppSettings {
    pub min_students: i64,
    pub semester: String,
    pub school_year: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSettingsRequest {
    pub min_students: Option<i64>,
    pub semester: Option<String>,
    pub school_year: Option<String>,
}
