use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::db::repository;
use crate::error::AppError;
use crate::services::faculty_schedule::{
    NameCandidates, is_placeholder, matches_professor, normalize_name,
};
use crate::services::log_activity;

#[derive(Debug, Serialize)]
pub struct BackfillStats {
    pub scanned: usize,
    pub linked: usize,
    pub ambiguous: usize,
    pub unmatched: usize,
}

/// One-time migration aid off free-text professor fields: fill in the
/// explicit `professor_id` reference wherever the name heuristic resolves a
/// slot to exactly one faculty member. Ambiguous and unmatched slots are
/// counted and left alone.
pub struct BackfillService {
    db: SqlitePool,
}

impl BackfillService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn link_professors(&self, actor: &str) -> Result<BackfillStats, AppError> {
        let faculty = repository::fetch_faculty(&self.db).await?;
        let candidates: Vec<(String, NameCandidates)> = faculty
            .iter()
            .map(|f| (f.id.clone(), NameCandidates::for_faculty(f)))
            .collect();

        let mut stats = BackfillStats {
            scanned: 0,
            linked: 0,
            ambiguous: 0,
            unmatched: 0,
        };

        for mut schedule in repository::fetch_schedules(&self.db).await? {
            let mut changed = false;

            for slot in &mut schedule.slots {
                if slot.professor_id.is_some() || is_placeholder(&slot.professor) {
                    continue;
                }
                stats.scanned += 1;

                let text = normalize_name(&slot.professor);
                let mut hits = candidates
                    .iter()
                    .filter(|(_, names)| matches_professor(&text, names))
                    .map(|(id, _)| id);

                match (hits.next(), hits.next()) {
                    (Some(id), None) => {
                        slot.professor_id = Some(id.clone());
                        stats.linked += 1;
                        changed = true;
                    }
                    (Some(_), Some(_)) => stats.ambiguous += 1,
                    (None, _) => stats.unmatched += 1,
                }
            }

            if changed {
                repository::update_schedule_slots(&self.db, &schedule.id, &schedule.slots).await?;
            }
        }

        info!(
            "Professor link backfill: {} scanned, {} linked, {} ambiguous, {} unmatched",
            stats.scanned, stats.linked, stats.ambiguous, stats.unmatched
        );
        log_activity(
            &self.db,
            actor,
            "schedule.backfill_links",
            &format!("linked {} of {} slots", stats.linked, stats.scanned),
        )
        .await;

        Ok(stats)
    }
}
