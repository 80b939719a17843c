use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::warn;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{Announcement, NewAnnouncementRequest, UpdateAnnouncementRequest};
use crate::push::{PushClient, PushMessage};
use crate::services::log_activity;

pub struct AnnouncementService {
    db: SqlitePool,
    push: Arc<dyn PushClient>,
}

impl AnnouncementService {
    pub fn new(db: SqlitePool, push: Arc<dyn PushClient>) -> Self {
        Self { db, push }
    }

    /// Create and broadcast. The broadcast (record + push) is best-effort;
    /// a messaging hiccup never fails the create.
    pub async fn create(&self, req: NewAnnouncementRequest) -> Result<Announcement, AppError> {
        let announcement = repository::insert_announcement(&self.db, req).await?;

        let message = PushMessage {
            title: announcement.title.clone(),
            body: announcement.body.clone(),
        };
        if let Err(e) = repository::insert_notification(
            &self.db,
            None,
            "announcement",
            None,
            &message.title,
            &message.body,
        )
        .await
        {
            warn!("Failed to record announcement notification: {}", e);
        }
        if let Err(e) = self.push.broadcast(&message).await {
            warn!("Announcement broadcast failed: {}", e);
        }

        log_activity(
            &self.db,
            &announcement.author,
            "announcement.create",
            &announcement.title,
        )
        .await;

        Ok(announcement)
    }

    pub async fn list(&self, include_hidden: bool) -> Result<Vec<Announcement>, AppError> {
        Ok(repository::fetch_announcements(&self.db, include_hidden).await?)
    }

    pub async fn update(
        &self,
        id: &str,
        req: UpdateAnnouncementRequest,
    ) -> Result<Announcement, AppError> {
        repository::update_announcement(&self.db, id, req)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn set_hidden(&self, id: &str, hidden: bool, actor: &str) -> Result<(), AppError> {
        let ok = repository::set_announcement_hidden(&self.db, id, hidden).await?;
        if !ok {
            return Err(AppError::NotFound);
        }

        let action = if hidden {
            "announcement.hide"
        } else {
            "announcement.unhide"
        };
        log_activity(&self.db, actor, action, id).await;

        Ok(())
    }

    pub async fn delete(&self, id: &str, actor: &str) -> Result<(), AppError> {
        let ok = repository::delete_announcement(&self.db, id).await?;
        if !ok {
            return Err(AppError::NotFound);
        }

        log_activity(&self.db, actor, "announcement.delete", id).await;

        Ok(())
    }
}
