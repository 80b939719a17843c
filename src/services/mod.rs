pub mod announcements;
pub mod archive;
pub mod backfill;
pub mod faculty_schedule;
pub mod rooms;
pub mod sweeper;

pub use announcements::AnnouncementService;
pub use archive::ArchiveService;
pub use backfill::{BackfillService, BackfillStats};
pub use faculty_schedule::FacultyScheduleService;
pub use rooms::RoomService;
pub use sweeper::VacancySweeper;

use sqlx::SqlitePool;
use tracing::warn;

/// Audit writes never block the operation they describe.
pub(crate) async fn log_activity(db: &SqlitePool, actor: &str, action: &str, detail: &str) {
    if let Err(e) = crate::db::repository::insert_activity(db, actor, action, detail).await {
        warn!("Failed to write activity log ({}): {}", action, e);
    }
}
