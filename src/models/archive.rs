use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Archive metadata row. The snapshot payload (every schedule record at the
/// time of the reset) is stored alongside but fetched separately so listings
/// stay cheap.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ArchiveSnapshot {
    pub id: String,
    pub semester: String,
    pub school_year: String,
    pub archived_by: String,
    pub total_students: i64,
    pub reset_complete: bool,
    pub created_at: String,
}

/// Outcome of an archive-and-reset (or a resumed reset).
#[derive(Debug, Clone, Serialize)]
pub struct ResetSummary {
    pub archive_id: String,
    pub total_students: i64,
    pub deleted: u64,
    pub reset_complete: bool,
}
