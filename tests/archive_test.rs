use sqlx::SqlitePool;

use campus_backend::db::repository;
use campus_backend::error::AppError;
use campus_backend::models::{ClassSlot, SaveScheduleRequest, Weekday};
use campus_backend::services::ArchiveService;
use campus_backend::services::archive::ResetRequest;

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

async fn insert_schedules(pool: &SqlitePool, n: usize) {
    for i in 0..n {
        let req = SaveScheduleRequest {
            student_id: format!("s-{:03}", i),
            student_name: format!("Student {}", i),
            course: "BSIT".to_string(),
            year_level: "2".to_string(),
            section: "B".to_string(),
            semester: "1st Semester".to_string(),
            school_year: "2025-2026".to_string(),
            slots: vec![ClassSlot {
                subject: "Ethics".to_string(),
                day: Weekday::Friday,
                start_time: "10:00".to_string(),
                end_time: "11:30".to_string(),
                room: "RM 4".to_string(),
                professor: "TBA".to_string(),
                professor_id: None,
            }],
        };
        repository::upsert_schedule(pool, req)
            .await
            .expect("Failed to insert schedule");
    }
}

fn reset_request() -> ResetRequest {
    ResetRequest {
        archived_by: "registrar".to_string(),
        semester: Some("1st Semester".to_string()),
        school_year: Some("2025-2026".to_string()),
    }
}

#[tokio::test]
async fn test_reset_archives_everything_then_clears() {
    let pool = setup_db().await;
    insert_schedules(&pool, 3).await;

    let service = ArchiveService::new(pool.clone());
    let summary = service.archive_and_reset(reset_request()).await.expect("reset failed");

    assert_eq!(summary.total_students, 3);
    assert_eq!(summary.deleted, 3);
    assert!(summary.reset_complete);

    assert_eq!(repository::count_schedules(&pool).await.expect("count"), 0);

    let archives = service.list().await.expect("list failed");
    assert_eq!(archives.len(), 1);
    assert_eq!(archives[0].total_students, 3);
    assert!(archives[0].reset_complete);

    let records = service.records(&summary.archive_id).await.expect("records failed");
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].slots.len(), 1);
}

#[tokio::test]
async fn test_deleting_archive_leaves_live_schedules() {
    let pool = setup_db().await;
    insert_schedules(&pool, 2).await;

    let service = ArchiveService::new(pool.clone());
    let summary = service.archive_and_reset(reset_request()).await.expect("reset failed");

    // A new semester's uploads arrive after the rollover.
    insert_schedules(&pool, 4).await;

    service
        .delete(&summary.archive_id, "registrar")
        .await
        .expect("delete failed");

    assert_eq!(repository::count_schedules(&pool).await.expect("count"), 4);
    assert!(service.list().await.expect("list failed").is_empty());
}

#[tokio::test]
async fn test_resume_completes_interrupted_reset() {
    let pool = setup_db().await;
    insert_schedules(&pool, 3).await;

    // Phase one written, process died before the delete phase.
    let records = repository::fetch_schedules(&pool).await.expect("fetch");
    let archive = repository::insert_archive(&pool, "1st Semester", "2025-2026", "registrar", &records)
        .await
        .expect("insert archive");
    assert!(!archive.reset_complete);
    assert_eq!(repository::count_schedules(&pool).await.expect("count"), 3);

    let service = ArchiveService::new(pool.clone());
    let summary = service.resume_reset(&archive.id).await.expect("resume failed");
    assert_eq!(summary.deleted, 3);
    assert!(summary.reset_complete);
    assert_eq!(repository::count_schedules(&pool).await.expect("count"), 0);

    // A second resume has nothing to do.
    let again = service.resume_reset(&archive.id).await;
    assert!(matches!(again, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_reset_uses_settings_labels_when_omitted() {
    let pool = setup_db().await;
    insert_schedules(&pool, 1).await;

    let service = ArchiveService::new(pool.clone());
    let summary = service
        .archive_and_reset(ResetRequest {
            archived_by: "registrar".to_string(),
            semester: None,
            school_year: None,
        })
        .await
        .expect("reset failed");

    let archives = service.list().await.expect("list failed");
    assert_eq!(archives[0].id, summary.archive_id);
    // Labels seeded by the settings row the migration creates.
    assert_eq!(archives[0].semester, "1st Semester");
    assert_eq!(archives[0].school_year, "2025-2026");
}
