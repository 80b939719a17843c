use std::time::Duration;

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::services::rooms::RoomService;

/// Background loop that clears vacancy overrides left over from past weeks.
/// Queries already ignore stale entries, so the sweep is pure housekeeping.
pub struct VacancySweeper {
    db: SqlitePool,
    interval: Duration,
}

impl VacancySweeper {
    pub fn new(db: SqlitePool, interval_secs: u64) -> Self {
        Self {
            db,
            interval: Duration::from_secs(interval_secs),
        }
    }

    pub async fn start(self) {
        info!("Starting vacancy sweeper (interval: {:?})", self.interval);

        loop {
            tokio::time::sleep(self.interval).await;

            match RoomService::new(self.db.clone()).prune_expired().await {
                Ok(0) => {}
                Ok(removed) => {
                    info!("Vacancy sweep cleared {} expired overrides", removed);
                }
                Err(e) => {
                    warn!("Vacancy sweep failed: {:?}", e);
                }
            }
        }
    }
}
