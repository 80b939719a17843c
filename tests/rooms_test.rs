use sqlx::SqlitePool;

use campus_backend::error::AppError;
use campus_backend::models::{RoomPeriod, Weekday, WeekTag};
use campus_backend::services::RoomService;

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

fn monday(start: &str, end: &str) -> RoomPeriod {
    RoomPeriod {
        day: Weekday::Monday,
        start_time: start.to_string(),
        end_time: end.to_string(),
    }
}

#[tokio::test]
async fn test_combined_room_name_updates_both_rooms() {
    let pool = setup_db().await;
    let service = RoomService::new(pool.clone());

    service.add_room("RM 9").await.expect("add room");
    service.add_room("CL3").await.expect("add room");
    service.add_room("RM 10").await.expect("add room");

    let updated = service
        .add_vacancy_tagged("RM. 9/CL3", monday("8:00", "9:30"), WeekTag { year: 2026, week: 10 })
        .await
        .expect("add vacancy");
    assert_eq!(updated.len(), 2);
    assert!(updated.iter().all(|r| r.vacancies.len() == 1));
    // Times are normalized on the way in.
    assert_eq!(updated[0].vacancies[0].start_time, "08:00");

    // The alternate spelling resolves to the same two rooms.
    let cleared = service
        .remove_vacancy("rm.9 / cl3", monday("08:00", "09:30"))
        .await
        .expect("remove vacancy");
    assert_eq!(cleared.len(), 2);
    assert!(cleared.iter().all(|r| r.vacancies.is_empty()));
}

#[tokio::test]
async fn test_unknown_room_is_not_found() {
    let pool = setup_db().await;
    let service = RoomService::new(pool.clone());

    let result = service.add_vacancy("GYM", monday("8:00", "9:30")).await;
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_duplicate_room_name_conflicts() {
    let pool = setup_db().await;
    let service = RoomService::new(pool.clone());

    service.add_room("RM 9").await.expect("add room");
    let result = service.add_room("rm.9").await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_vacancy_does_not_carry_into_next_week() {
    let pool = setup_db().await;
    let service = RoomService::new(pool.clone());

    service.add_room("RM 9").await.expect("add room");
    service
        .add_occupancy("RM 9", monday("8:00", "9:30"))
        .await
        .expect("add occupancy");

    let week10 = WeekTag { year: 2026, week: 10 };
    let week11 = WeekTag { year: 2026, week: 11 };

    service
        .add_vacancy_tagged("RM 9", monday("8:00", "9:30"), week10)
        .await
        .expect("add vacancy");

    // 8:30 on Monday: overridden vacant in week 10, booked again in week 11.
    let vacant = service
        .vacant_rooms_at(Weekday::Monday, 510, week10)
        .await
        .expect("query");
    assert_eq!(vacant.len(), 1);

    let vacant = service
        .vacant_rooms_at(Weekday::Monday, 510, week11)
        .await
        .expect("query");
    assert!(vacant.is_empty());

    // The sweeper drops the stale override.
    let removed = service.prune_expired_as_of(week11).await.expect("prune");
    assert_eq!(removed, 1);
    let rooms = service.list().await.expect("list");
    assert!(rooms[0].vacancies.is_empty());
}

#[tokio::test]
async fn test_removal_is_by_exact_key_not_overlap() {
    let pool = setup_db().await;
    let service = RoomService::new(pool.clone());

    service.add_room("RM 9").await.expect("add room");
    service
        .add_occupancy("RM 9", monday("8:00", "9:30"))
        .await
        .expect("add occupancy");
    service
        .add_occupancy("RM 9", monday("8:00", "10:00"))
        .await
        .expect("add occupancy");

    // Overlapping but non-identical periods are independent entries.
    let rooms = service
        .remove_occupancy("RM 9", monday("8:00", "9:30"))
        .await
        .expect("remove occupancy");
    assert_eq!(rooms[0].occupancy.len(), 1);
    assert_eq!(rooms[0].occupancy[0].end_time, "10:00");
}

#[tokio::test]
async fn test_rejects_inverted_period() {
    let pool = setup_db().await;
    let service = RoomService::new(pool.clone());

    service.add_room("RM 9").await.expect("add room");
    let result = service.add_occupancy("RM 9", monday("10:00", "9:00")).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
}
