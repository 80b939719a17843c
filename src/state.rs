use std::sync::Arc;

use sqlx::SqlitePool;

use crate::push::PushClient;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub push: Arc<dyn PushClient>,
}
