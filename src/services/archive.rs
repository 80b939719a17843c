use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{ArchiveSnapshot, ResetSummary, StudentSchedule};
use crate::services::log_activity;

/// Upper bound on records mutated per delete request, to stay under backend
/// batch limits.
const DELETE_BATCH_SIZE: i64 = 400;

#[derive(Debug, Clone, Deserialize)]
pub struct ResetRequest {
    pub archived_by: String,
    pub semester: Option<String>,
    pub school_year: Option<String>,
}

/// End-of-semester rollover as an explicit two-phase operation: phase one
/// writes the immutable snapshot, phase two deletes live schedules in
/// batches and records completion on the snapshot. A failure between the
/// phases (or mid-batch) leaves `reset_complete = false`; `resume_reset`
/// re-runs phase two off that marker.
pub struct ArchiveService {
    db: SqlitePool,
}

impl ArchiveService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn archive_and_reset(&self, req: ResetRequest) -> Result<ResetSummary, AppError> {
        let settings = repository::fetch_settings(&self.db).await?;
        let semester = req.semester.unwrap_or(settings.semester);
        let school_year = req.school_year.unwrap_or(settings.school_year);

        let records = repository::fetch_schedules(&self.db).await?;
        info!(
            "Archiving {} schedules for {} {}",
            records.len(),
            semester,
            school_year
        );

        let archive = repository::insert_archive(
            &self.db,
            &semester,
            &school_year,
            &req.archived_by,
            &records,
        )
        .await?;

        log_activity(
            &self.db,
            &req.archived_by,
            "archive.reset",
            &format!("archive {} ({} schedules)", archive.id, archive.total_students),
        )
        .await;

        let deleted = self.run_delete_phase(&archive.id).await?;

        Ok(ResetSummary {
            archive_id: archive.id,
            total_students: archive.total_students,
            deleted,
            reset_complete: true,
        })
    }

    pub async fn resume_reset(&self, archive_id: &str) -> Result<ResetSummary, AppError> {
        let archive = repository::find_archive_by_id(&self.db, archive_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if archive.reset_complete {
            return Err(AppError::Conflict("Reset already complete".to_string()));
        }

        let deleted = self.run_delete_phase(&archive.id).await?;
        info!("Resumed reset for archive {}: deleted {}", archive.id, deleted);

        Ok(ResetSummary {
            archive_id: archive.id,
            total_students: archive.total_students,
            deleted,
            reset_complete: true,
        })
    }

    /// Phase two. Deletion failures propagate with the marker still unset,
    /// leaving a partially-deleted state the caller resolves via resume.
    async fn run_delete_phase(&self, archive_id: &str) -> Result<u64, AppError> {
        let mut deleted: u64 = 0;
        loop {
            let batch = repository::delete_schedules_batch(&self.db, DELETE_BATCH_SIZE).await?;
            deleted += batch;
            if batch < DELETE_BATCH_SIZE as u64 {
                break;
            }
        }

        repository::mark_archive_reset_complete(&self.db, archive_id).await?;
        Ok(deleted)
    }

    pub async fn list(&self) -> Result<Vec<ArchiveSnapshot>, AppError> {
        Ok(repository::fetch_archives(&self.db).await?)
    }

    pub async fn records(&self, archive_id: &str) -> Result<Vec<StudentSchedule>, AppError> {
        repository::fetch_archive_records(&self.db, archive_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Deleting an archive never touches live schedules.
    pub async fn delete(&self, archive_id: &str, actor: &str) -> Result<(), AppError> {
        let removed = repository::delete_archive(&self.db, archive_id).await?;
        if !removed {
            return Err(AppError::NotFound);
        }

        log_activity(
            &self.db,
            actor,
            "archive.delete",
            &format!("archive {}", archive_id),
        )
        .await;

        Ok(())
    }
}
