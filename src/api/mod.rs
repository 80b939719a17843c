use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::{delete, patch, post};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;

use crate::db::repository;
use crate::error::AppError;
use crate::models::time::normalize_hhmm;
use crate::models::*;
use crate::services::archive::ResetRequest;
use crate::services::{
    AnnouncementService, ArchiveService, BackfillService, BackfillStats, FacultyScheduleService,
    RoomService,
};
use crate::state::AppState;

#[derive(Deserialize)]
struct FacultyClassParams {
    #[serde(default)]
    include_unvalidated: bool,
}

#[derive(Deserialize)]
struct AnnouncementListParams {
    #[serde(default)]
    include_hidden: bool,
}

#[derive(Deserialize)]
struct ActorParams {
    #[serde(default = "default_actor")]
    actor: String,
}

fn default_actor() -> String {
    "admin".to_string()
}

#[derive(Deserialize)]
struct NotificationParams {
    user_id: String,
}

#[derive(Deserialize)]
struct LogParams {
    #[serde(default = "default_log_limit")]
    limit: i64,
}

fn default_log_limit() -> i64 {
    50
}

#[derive(Deserialize)]
struct NewRoomRequest {
    name: String,
}

#[derive(Deserialize)]
struct RoomPeriodRequest {
    room: String,
    day: Weekday,
    start_time: String,
    end_time: String,
}

impl RoomPeriodRequest {
    fn into_parts(self) -> (String, RoomPeriod) {
        (
            self.room,
            RoomPeriod {
                day: self.day,
                start_time: self.start_time,
                end_time: self.end_time,
            },
        )
    }
}

#[derive(Deserialize)]
struct VacantParams {
    day: String,
    time: String,
}

#[derive(Deserialize)]
struct BackfillRequest {
    #[serde(default = "default_actor")]
    actor: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/schedules", get(list_schedules).post(save_schedule))
        .route("/schedules/{student_id}", get(get_schedule).delete(delete_schedule))
        .route("/faculty", get(list_faculty).post(create_faculty))
        .route("/faculty/backfill-links", post(backfill_links))
        .route("/faculty/{id}/classes", get(faculty_classes))
        .route("/rooms", get(list_rooms).post(create_room))
        .route("/rooms/vacant", get(vacant_rooms))
        .route("/rooms/occupancy", post(add_occupancy))
        .route("/rooms/occupancy/remove", post(remove_occupancy))
        .route("/rooms/vacancies", post(add_vacancy))
        .route("/rooms/vacancies/remove", post(remove_vacancy))
        .route("/archives", get(list_archives))
        .route("/archives/reset", post(archive_and_reset))
        .route("/archives/{id}", delete(delete_archive))
        .route("/archives/{id}/records", get(archive_records))
        .route("/archives/{id}/resume", post(resume_reset))
        .route("/announcements", get(list_announcements).post(create_announcement))
        .route("/announcements/{id}", patch(update_announcement).delete(delete_announcement))
        .route("/announcements/{id}/hide", patch(hide_announcement))
        .route("/announcements/{id}/unhide", patch(unhide_announcement))
        .route("/notifications", get(list_notifications))
        .route("/settings", get(get_settings).patch(update_settings))
        .route("/logs", get(list_logs))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

// --- schedules ---

async fn list_schedules(State(state): State<AppState>) -> Result<Json<Vec<StudentSchedule>>, AppError> {
    let schedules = repository::fetch_schedules(&state.db).await?;
    Ok(Json(schedules))
}

async fn save_schedule(
    State(state): State<AppState>,
    Json(mut req): Json<SaveScheduleRequest>,
) -> Result<Json<StudentSchedule>, AppError> {
    for slot in &mut req.slots {
        slot.start_time = normalize_hhmm(&slot.start_time)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid start time: {}", slot.start_time)))?;
        slot.end_time = normalize_hhmm(&slot.end_time)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid end time: {}", slot.end_time)))?;
    }

    let schedule = repository::upsert_schedule(&state.db, req).await?;
    Ok(Json(schedule))
}

async fn get_schedule(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Json<StudentSchedule>, AppError> {
    let schedule = repository::find_schedule_by_student(&state.db, &student_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(schedule))
}

async fn delete_schedule(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let ok = repository::delete_schedule_by_student(&state.db, &student_id).await?;
    if ok {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

// --- faculty ---

async fn list_faculty(State(state): State<AppState>) -> Result<Json<Vec<FacultyUser>>, AppError> {
    let faculty = repository::fetch_faculty(&state.db).await?;
    Ok(Json(faculty))
}

async fn create_faculty(
    State(state): State<AppState>,
    Json(req): Json<NewFacultyRequest>,
) -> Result<Json<FacultyUser>, AppError> {
    let faculty = repository::insert_faculty(&state.db, req).await?;
    Ok(Json(faculty))
}

async fn faculty_classes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<FacultyClassParams>,
) -> Result<Json<Vec<DerivedFacultyClass>>, AppError> {
    let service = FacultyScheduleService::new(state.db.clone(), state.push.clone());
    let classes = service.derive(&id, params.include_unvalidated).await?;
    Ok(Json(classes))
}

async fn backfill_links(
    State(state): State<AppState>,
    Json(req): Json<BackfillRequest>,
) -> Result<Json<BackfillStats>, AppError> {
    let service = BackfillService::new(state.db.clone());
    let stats = service.link_professors(&req.actor).await?;
    Ok(Json(stats))
}

// --- rooms ---

async fn list_rooms(State(state): State<AppState>) -> Result<Json<Vec<Room>>, AppError> {
    let rooms = RoomService::new(state.db.clone()).list().await?;
    Ok(Json(rooms))
}

async fn create_room(
    State(state): State<AppState>,
    Json(req): Json<NewRoomRequest>,
) -> Result<Json<Room>, AppError> {
    let room = RoomService::new(state.db.clone()).add_room(&req.name).await?;
    Ok(Json(room))
}

async fn vacant_rooms(
    State(state): State<AppState>,
    Query(params): Query<VacantParams>,
) -> Result<Json<Vec<Room>>, AppError> {
    let day: Weekday = params
        .day
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid day: {}", params.day)))?;
    let rooms = RoomService::new(state.db.clone())
        .vacant_rooms(day, &params.time)
        .await?;
    Ok(Json(rooms))
}

async fn add_occupancy(
    State(state): State<AppState>,
    Json(req): Json<RoomPeriodRequest>,
) -> Result<Json<Vec<Room>>, AppError> {
    let (room, period) = req.into_parts();
    let rooms = RoomService::new(state.db.clone()).add_occupancy(&room, period).await?;
    Ok(Json(rooms))
}

async fn remove_occupancy(
    State(state): State<AppState>,
    Json(req): Json<RoomPeriodRequest>,
) -> Result<Json<Vec<Room>>, AppError> {
    let (room, period) = req.into_parts();
    let rooms = RoomService::new(state.db.clone()).remove_occupancy(&room, period).await?;
    Ok(Json(rooms))
}

async fn add_vacancy(
    State(state): State<AppState>,
    Json(req): Json<RoomPeriodRequest>,
) -> Result<Json<Vec<Room>>, AppError> {
    let (room, period) = req.into_parts();
    let rooms = RoomService::new(state.db.clone()).add_vacancy(&room, period).await?;
    Ok(Json(rooms))
}

async fn remove_vacancy(
    State(state): State<AppState>,
    Json(req): Json<RoomPeriodRequest>,
) -> Result<Json<Vec<Room>>, AppError> {
    let (room, period) = req.into_parts();
    let rooms = RoomService::new(state.db.clone()).remove_vacancy(&room, period).await?;
    Ok(Json(rooms))
}

// --- archives ---

async fn list_archives(State(state): State<AppState>) -> Result<Json<Vec<ArchiveSnapshot>>, AppError> {
    let archives = ArchiveService::new(state.db.clone()).list().await?;
    Ok(Json(archives))
}

async fn archive_and_reset(
    State(state): State<AppState>,
    Json(req): Json<ResetRequest>,
) -> Result<Json<ResetSummary>, AppError> {
    let summary = ArchiveService::new(state.db.clone()).archive_and_reset(req).await?;
    Ok(Json(summary))
}

async fn resume_reset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResetSummary>, AppError> {
    let summary = ArchiveService::new(state.db.clone()).resume_reset(&id).await?;
    Ok(Json(summary))
}

async fn archive_records(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StudentSchedule>>, AppError> {
    let records = ArchiveService::new(state.db.clone()).records(&id).await?;
    Ok(Json(records))
}

async fn delete_archive(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ActorParams>,
) -> Result<StatusCode, AppError> {
    ArchiveService::new(state.db.clone()).delete(&id, &params.actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- announcements ---

async fn list_announcements(
    State(state): State<AppState>,
    Query(params): Query<AnnouncementListParams>,
) -> Result<Json<Vec<Announcement>>, AppError> {
    let service = AnnouncementService::new(state.db.clone(), state.push.clone());
    let announcements = service.list(params.include_hidden).await?;
    Ok(Json(announcements))
}

async fn create_announcement(
    State(state): State<AppState>,
    Json(req): Json<NewAnnouncementRequest>,
) -> Result<Json<Announcement>, AppError> {
    let service = AnnouncementService::new(state.db.clone(), state.push.clone());
    let announcement = service.create(req).await?;
    Ok(Json(announcement))
}

async fn update_announcement(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateAnnouncementRequest>,
) -> Result<Json<Announcement>, AppError> {
    let service = AnnouncementService::new(state.db.clone(), state.push.clone());
    let announcement = service.update(&id, req).await?;
    Ok(Json(announcement))
}

async fn hide_announcement(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ActorParams>,
) -> Result<StatusCode, AppError> {
    let service = AnnouncementService::new(state.db.clone(), state.push.clone());
    service.set_hidden(&id, true, &params.actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unhide_announcement(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ActorParams>,
) -> Result<StatusCode, AppError> {
    let service = AnnouncementService::new(state.db.clone(), state.push.clone());
    service.set_hidden(&id, false, &params.actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_announcement(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ActorParams>,
) -> Result<StatusCode, AppError> {
    let service = AnnouncementService::new(state.db.clone(), state.push.clone());
    service.delete(&id, &params.actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- notifications / settings / logs ---

async fn list_notifications(
    State(state): State<AppState>,
    Query(params): Query<NotificationParams>,
) -> Result<Json<Vec<NotificationRecord>>, AppError> {
    let notifications =
        repository::fetch_notifications_for_user(&state.db, &params.user_id).await?;
    Ok(Json(notifications))
}

async fn get_settings(State(state): State<AppState>) -> Result<Json<AppSettings>, AppError> {
    let settings = repository::fetch_settings(&state.db).await?;
    Ok(Json(settings))
}

async fn update_settings(
    State(state): State<AppState>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<Json<AppSettings>, AppError> {
    let settings = repository::update_settings(&state.db, req).await?;
    Ok(Json(settings))
}

async fn list_logs(
    State(state): State<AppState>,
    Query(params): Query<LogParams>,
) -> Result<Json<Vec<ActivityLogEntry>>, AppError> {
    let entries = repository::fetch_activity_log(&state.db, params.limit).await?;
    Ok(Json(entries))
}
