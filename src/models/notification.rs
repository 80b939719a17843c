use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Persisted notification record. `dedup_key` is the idempotency key for
/// notifications that must be emitted at most once (class validation);
/// broadcast records carry no key and no user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationRecord {
    pub id: String,
    pub user_id: Option<String>,
    pub kind: String,
    pub dedup_key: Option<String>,
    pub title: String,
    pub body: String,
    pub created_at: String,
}
