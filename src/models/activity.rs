use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Append-only audit record of admin, moderation and archive actions.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityLogEntry {
    pub id: String,
    pub actor: String,
    pub action: String,
    pub detail: String,
    pub created_at: String,
}
