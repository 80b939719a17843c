use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sqlx::SqlitePool;

use campus_backend::db::repository;
use campus_backend::error::AppError;
use campus_backend::models::{ClassSlot, NewFacultyRequest, SaveScheduleRequest, Weekday};
use campus_backend::push::{PushClient, PushMessage};
use campus_backend::services::{BackfillService, FacultyScheduleService};

async fn setup_db() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create test db");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// Push client that only counts sends.
struct CountingPushClient {
    sends: AtomicUsize,
}

impl CountingPushClient {
    fn new() -> Self {
        Self {
            sends: AtomicUsize::new(0),
        }
    }

    fn count(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushClient for CountingPushClient {
    async fn send_to_device(&self, _device_token: &str, _message: &PushMessage) -> Result<(), AppError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn broadcast(&self, _message: &PushMessage) -> Result<(), AppError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

async fn insert_cruz(pool: &SqlitePool) -> String {
    let faculty = repository::insert_faculty(
        pool,
        NewFacultyRequest {
            first_name: "Juan".to_string(),
            middle_name: Some("Dela".to_string()),
            last_name: "Cruz".to_string(),
            display_name: None,
            device_token: Some("token-cruz".to_string()),
        },
    )
    .await
    .expect("Failed to insert faculty");
    faculty.id
}

async fn insert_student_schedule(pool: &SqlitePool, student_id: &str, professor: &str) {
    let req = SaveScheduleRequest {
        student_id: student_id.to_string(),
        student_name: format!("Student {}", student_id),
        course: "BSIT".to_string(),
        year_level: "3".to_string(),
        section: "A".to_string(),
        semester: "1st Semester".to_string(),
        school_year: "2025-2026".to_string(),
        slots: vec![ClassSlot {
            subject: "Data Structures".to_string(),
            day: Weekday::Monday,
            start_time: "08:00".to_string(),
            end_time: "09:30".to_string(),
            room: "RM 9".to_string(),
            professor: professor.to_string(),
            professor_id: None,
        }],
    };
    repository::upsert_schedule(pool, req)
        .await
        .expect("Failed to insert schedule");
}

#[tokio::test]
async fn test_unknown_faculty_is_not_found() {
    let pool = setup_db().await;
    let service = FacultyScheduleService::new(pool.clone(), Arc::new(CountingPushClient::new()));

    let result = service.derive("missing-id", false).await;
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_no_matching_entries_returns_empty() {
    let pool = setup_db().await;
    let faculty_id = insert_cruz(&pool).await;
    insert_student_schedule(&pool, "s-1", "Maria Santos").await;

    let service = FacultyScheduleService::new(pool.clone(), Arc::new(CountingPushClient::new()));
    let classes = service.derive(&faculty_id, true).await.expect("derive failed");
    assert!(classes.is_empty());
}

#[tokio::test]
async fn test_five_students_validate_class() {
    let pool = setup_db().await;
    let faculty_id = insert_cruz(&pool).await;
    for i in 0..5 {
        insert_student_schedule(&pool, &format!("s-{}", i), "Juan Cruz").await;
    }

    let service = FacultyScheduleService::new(pool.clone(), Arc::new(CountingPushClient::new()));
    let classes = service.derive(&faculty_id, false).await.expect("derive failed");

    assert_eq!(classes.len(), 1);
    assert!(classes[0].validated);
    assert_eq!(classes[0].student_count, 5);
    assert_eq!(classes[0].students_needed, 0);
}

#[tokio::test]
async fn test_four_students_fall_short_by_one() {
    let pool = setup_db().await;
    let faculty_id = insert_cruz(&pool).await;
    for i in 0..4 {
        insert_student_schedule(&pool, &format!("s-{}", i), "Juan Cruz").await;
    }

    let service = FacultyScheduleService::new(pool.clone(), Arc::new(CountingPushClient::new()));

    // Default view only returns validated classes.
    let validated = service.derive(&faculty_id, false).await.expect("derive failed");
    assert!(validated.is_empty());

    let all = service.derive(&faculty_id, true).await.expect("derive failed");
    assert_eq!(all.len(), 1);
    assert!(!all[0].validated);
    assert_eq!(all[0].student_count, 4);
    assert_eq!(all[0].students_needed, 1);
}

#[tokio::test]
async fn test_validation_notifies_exactly_once() {
    let pool = setup_db().await;
    let faculty_id = insert_cruz(&pool).await;
    let push = Arc::new(CountingPushClient::new());
    let service = FacultyScheduleService::new(pool.clone(), push.clone());

    for i in 0..4 {
        insert_student_schedule(&pool, &format!("s-{}", i), "Juan Cruz").await;
    }

    // Below threshold: nothing to announce.
    service.derive(&faculty_id, true).await.expect("derive failed");
    assert_eq!(push.count(), 0);

    // Fifth student crosses the threshold.
    insert_student_schedule(&pool, "s-4", "Juan Cruz").await;
    service.derive(&faculty_id, false).await.expect("derive failed");
    service.derive(&faculty_id, false).await.expect("derive failed");
    service.derive(&faculty_id, true).await.expect("derive failed");

    assert_eq!(push.count(), 1);

    let notifications = repository::fetch_notifications_for_user(&pool, &faculty_id)
        .await
        .expect("Failed to list notifications");
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, "class_validated");
}

#[tokio::test]
async fn test_threshold_follows_settings() {
    let pool = setup_db().await;
    let faculty_id = insert_cruz(&pool).await;
    for i in 0..3 {
        insert_student_schedule(&pool, &format!("s-{}", i), "Juan Cruz").await;
    }

    repository::update_settings(
        &pool,
        campus_backend::models::UpdateSettingsRequest {
            min_students: Some(3),
            semester: None,
            school_year: None,
        },
    )
    .await
    .expect("Failed to update settings");

    let service = FacultyScheduleService::new(pool.clone(), Arc::new(CountingPushClient::new()));
    let classes = service.derive(&faculty_id, false).await.expect("derive failed");
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].student_count, 3);
}

#[tokio::test]
async fn test_backfill_links_unambiguous_slots_only() {
    let pool = setup_db().await;
    let cruz_id = insert_cruz(&pool).await;

    // A second Cruz makes bare "Cruz"-adjacent matches ambiguous.
    repository::insert_faculty(
        &pool,
        NewFacultyRequest {
            first_name: "Maria".to_string(),
            middle_name: None,
            last_name: "Cruz".to_string(),
            display_name: None,
            device_token: None,
        },
    )
    .await
    .expect("Failed to insert faculty");

    insert_student_schedule(&pool, "s-1", "Juan Cruz").await;
    insert_student_schedule(&pool, "s-2", "M. Cruz").await;
    insert_student_schedule(&pool, "s-3", "Pedro Penduko").await;
    // An initial-only entry that fits both Cruzes stays unlinked.
    insert_student_schedule(&pool, "s-4", "J. M. Cruz").await;

    let stats = BackfillService::new(pool.clone())
        .link_professors("registrar")
        .await
        .expect("backfill failed");

    assert_eq!(stats.scanned, 4);
    assert_eq!(stats.linked, 2);
    assert_eq!(stats.ambiguous, 1);
    assert_eq!(stats.unmatched, 1);

    let schedules = repository::fetch_schedules(&pool).await.expect("fetch failed");
    let juan = schedules
        .iter()
        .find(|s| s.student_id == "s-1")
        .expect("schedule missing");
    assert_eq!(juan.slots[0].professor_id.as_deref(), Some(cruz_id.as_str()));

    let pedro = schedules
        .iter()
        .find(|s| s.student_id == "s-3")
        .expect("schedule missing");
    assert!(pedro.slots[0].professor_id.is_none());
}
