use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::models::{
    ActivityLogEntry, Announcement, AppSettings, ArchiveSnapshot, ClassSlot, FacultyUser,
    NewAnnouncementRequest, NewFacultyRequest, NotificationRecord, Room, SaveScheduleRequest,
    StudentSchedule, UpdateAnnouncementRequest, UpdateSettingsRequest,
};

// Schedules and rooms keep their slot/period lists as JSON text columns;
// the row structs below carry the raw column and are decoded on the way out.

#[derive(FromRow)]
struct ScheduleRow {
    id: String,
    student_id: String,
    student_name: String,
    course: String,
    year_level: String,
    section: String,
    semester: String,
    school_year: String,
    slots: String,
    updated_at: String,
}

impl ScheduleRow {
    fn into_schedule(self) -> Result<StudentSchedule, sqlx::Error> {
        let slots = decode_json::<Vec<ClassSlot>>(&self.slots)?;
        Ok(StudentSchedule {
            id: self.id,
            student_id: self.student_id,
            student_name: self.student_name,
            course: self.course,
            year_level: self.year_level,
            section: self.section,
            semester: self.semester,
            school_year: self.school_year,
            slots,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct RoomRow {
    id: String,
    name: String,
    occupancy: String,
    vacancies: String,
}

impl RoomRow {
    fn into_room(self) -> Result<Room, sqlx::Error> {
        Ok(Room {
            id: self.id,
            name: self.name,
            occupancy: decode_json(&self.occupancy)?,
            vacancies: decode_json(&self.vacancies)?,
        })
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, sqlx::Error> {
    serde_json::from_str(raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, sqlx::Error> {
    serde_json::to_string(value).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

// --- schedules ---

pub async fn fetch_schedules(db: &SqlitePool) -> Result<Vec<StudentSchedule>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ScheduleRow>(
        "SELECT id, student_id, student_name, course, year_level, section, semester, school_year, slots, updated_at FROM schedules ORDER BY updated_at DESC"
    )
    .fetch_all(db)
    .await?;

    rows.into_iter().map(ScheduleRow::into_schedule).collect()
}

pub async fn find_schedule_by_student(
    db: &SqlitePool,
    student_id: &str,
) -> Result<Option<StudentSchedule>, sqlx::Error> {
    let row = sqlx::query_as::<_, ScheduleRow>(
        "SELECT id, student_id, student_name, course, year_level, section, semester, school_year, slots, updated_at FROM schedules WHERE student_id = ?"
    )
    .bind(student_id)
    .fetch_optional(db)
    .await?;

    row.map(ScheduleRow::into_schedule).transpose()
}

/// Insert or replace a student's schedule. One document per student; an
/// upload overwrites any previous version wholesale.
pub async fn upsert_schedule(
    db: &SqlitePool,
    req: SaveScheduleRequest,
) -> Result<StudentSchedule, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let slots_json = encode_json(&req.slots)?;

    let id = match find_schedule_by_student(db, &req.student_id).await? {
        Some(existing) => {
            sqlx::query(
                "UPDATE schedules SET student_name = ?, course = ?, year_level = ?, section = ?, semester = ?, school_year = ?, slots = ?, updated_at = ? WHERE student_id = ?"
            )
            .bind(&req.student_name)
            .bind(&req.course)
            .bind(&req.year_level)
            .bind(&req.section)
            .bind(&req.semester)
            .bind(&req.school_year)
            .bind(&slots_json)
            .bind(&now)
            .bind(&req.student_id)
            .execute(db)
            .await?;
            existing.id
        }
        None => {
            let id = Uuid::new_v4().to_string();
            sqlx::query(
                "INSERT INTO schedules (id, student_id, student_name, course, year_level, section, semester, school_year, slots, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            )
            .bind(&id)
            .bind(&req.student_id)
            .bind(&req.student_name)
            .bind(&req.course)
            .bind(&req.year_level)
            .bind(&req.section)
            .bind(&req.semester)
            .bind(&req.school_year)
            .bind(&slots_json)
            .bind(&now)
            .execute(db)
            .await?;
            id
        }
    };

    Ok(StudentSchedule {
        id,
        student_id: req.student_id,
        student_name: req.student_name,
        course: req.course,
        year_level: req.year_level,
        section: req.section,
        semester: req.semester,
        school_year: req.school_year,
        slots: req.slots,
        updated_at: now,
    })
}

pub async fn update_schedule_slots(
    db: &SqlitePool,
    schedule_id: &str,
    slots: &[ClassSlot],
) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    sqlx::query("UPDATE schedules SET slots = ?, updated_at = ? WHERE id = ?")
        .bind(encode_json(&slots)?)
        .bind(now)
        .bind(schedule_id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete_schedule_by_student(
    db: &SqlitePool,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM schedules WHERE student_id = ?")
        .bind(student_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn count_schedules(db: &SqlitePool) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM schedules")
        .fetch_one(db)
        .await?;
    Ok(count)
}

/// Delete up to `limit` schedule records. The archive reset walks this in a
/// loop until no rows remain, to stay under backend batch mutation limits.
pub async fn delete_schedules_batch(db: &SqlitePool, limit: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM schedules WHERE id IN (SELECT id FROM schedules LIMIT ?)")
        .bind(limit)
        .execute(db)
        .await?;

    Ok(result.rows_affected())
}

// --- faculty ---

pub async fn insert_faculty(
    db: &SqlitePool,
    req: NewFacultyRequest,
) -> Result<FacultyUser, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO faculty (id, first_name, middle_name, last_name, display_name, device_token) VALUES (?, ?, ?, ?, ?, ?)"
    )
    .bind(&id)
    .bind(&req.first_name)
    .bind(&req.middle_name)
    .bind(&req.last_name)
    .bind(&req.display_name)
    .bind(&req.device_token)
    .execute(db)
    .await?;

    Ok(FacultyUser {
        id,
        first_name: req.first_name,
        middle_name: req.middle_name,
        last_name: req.last_name,
        display_name: req.display_name,
        device_token: req.device_token,
    })
}

pub async fn fetch_faculty(db: &SqlitePool) -> Result<Vec<FacultyUser>, sqlx::Error> {
    sqlx::query_as::<_, FacultyUser>(
        "SELECT id, first_name, middle_name, last_name, display_name, device_token FROM faculty ORDER BY last_name, first_name"
    )
    .fetch_all(db)
    .await
}

pub async fn find_faculty_by_id(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<FacultyUser>, sqlx::Error> {
    sqlx::query_as::<_, FacultyUser>(
        "SELECT id, first_name, middle_name, last_name, display_name, device_token FROM faculty WHERE id = ?"
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

// --- rooms ---

pub async fn insert_room(db: &SqlitePool, name: &str) -> Result<Room, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query("INSERT INTO rooms (id, name, occupancy, vacancies) VALUES (?, ?, '[]', '[]')")
        .bind(&id)
        .bind(name)
        .execute(db)
        .await?;

    Ok(Room {
        id,
        name: name.to_string(),
        occupancy: Vec::new(),
        vacancies: Vec::new(),
    })
}

pub async fn fetch_rooms(db: &SqlitePool) -> Result<Vec<Room>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RoomRow>(
        "SELECT id, name, occupancy, vacancies FROM rooms ORDER BY name",
    )
    .fetch_all(db)
    .await?;

    rows.into_iter().map(RoomRow::into_room).collect()
}

pub async fn update_room_periods(db: &SqlitePool, room: &Room) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE rooms SET occupancy = ?, vacancies = ? WHERE id = ?")
        .bind(encode_json(&room.occupancy)?)
        .bind(encode_json(&room.vacancies)?)
        .bind(&room.id)
        .execute(db)
        .await?;
    Ok(())
}

// --- settings ---

pub async fn fetch_settings(db: &SqlitePool) -> Result<AppSettings, sqlx::Error> {
    let settings = sqlx::query_as::<_, AppSettings>(
        "SELECT min_students, semester, school_year FROM settings WHERE id = 1",
    )
    .fetch_optional(db)
    .await?;

    // The migration seeds the row; fall back to defaults if it was removed.
    Ok(settings.unwrap_or(AppSettings {
        min_students: 5,
        semester: String::new(),
        school_year: String::new(),
    }))
}

pub async fn update_settings(
    db: &SqlitePool,
    req: UpdateSettingsRequest,
) -> Result<AppSettings, sqlx::Error> {
    let mut current = fetch_settings(db).await?;

    if let Some(min_students) = req.min_students {
        current.min_students = min_students;
    }
    if let Some(semester) = req.semester {
        current.semester = semester;
    }
    if let Some(school_year) = req.school_year {
        current.school_year = school_year;
    }

    sqlx::query(
        "INSERT INTO settings (id, min_students, semester, school_year) VALUES (1, ?, ?, ?) ON CONFLICT(id) DO UPDATE SET min_students = excluded.min_students, semester = excluded.semester, school_year = excluded.school_year"
    )
    .bind(current.min_students)
    .bind(&current.semester)
    .bind(&current.school_year)
    .execute(db)
    .await?;

    Ok(current)
}

// --- notifications ---

pub async fn notification_exists(db: &SqlitePool, dedup_key: &str) -> Result<bool, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE dedup_key = ?")
        .bind(dedup_key)
        .fetch_one(db)
        .await?;

    Ok(count > 0)
}

pub async fn insert_notification(
    db: &SqlitePool,
    user_id: Option<&str>,
    kind: &str,
    dedup_key: Option<&str>,
    title: &str,
    body: &str,
) -> Result<NotificationRecord, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO notifications (id, user_id, kind, dedup_key, title, body, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(&id)
    .bind(user_id)
    .bind(kind)
    .bind(dedup_key)
    .bind(title)
    .bind(body)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(NotificationRecord {
        id,
        user_id: user_id.map(str::to_string),
        kind: kind.to_string(),
        dedup_key: dedup_key.map(str::to_string),
        title: title.to_string(),
        body: body.to_string(),
        created_at: now,
    })
}

/// A user's own notifications plus broadcasts, newest first.
pub async fn fetch_notifications_for_user(
    db: &SqlitePool,
    user_id: &str,
) -> Result<Vec<NotificationRecord>, sqlx::Error> {
    sqlx::query_as::<_, NotificationRecord>(
        "SELECT id, user_id, kind, dedup_key, title, body, created_at FROM notifications WHERE user_id = ? OR user_id IS NULL ORDER BY created_at DESC"
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

// --- announcements ---

pub async fn insert_announcement(
    db: &SqlitePool,
    req: NewAnnouncementRequest,
) -> Result<Announcement, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO announcements (id, title, body, author, pinned, hidden, created_at, updated_at) VALUES (?, ?, ?, ?, 0, 0, ?, ?)"
    )
    .bind(&id)
    .bind(&req.title)
    .bind(&req.body)
    .bind(&req.author)
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Announcement {
        id,
        title: req.title,
        body: req.body,
        author: req.author,
        pinned: false,
        hidden: false,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub async fn fetch_announcements(
    db: &SqlitePool,
    include_hidden: bool,
) -> Result<Vec<Announcement>, sqlx::Error> {
    let sql = if include_hidden {
        "SELECT id, title, body, author, pinned, hidden, created_at, updated_at FROM announcements ORDER BY pinned DESC, created_at DESC"
    } else {
        "SELECT id, title, body, author, pinned, hidden, created_at, updated_at FROM announcements WHERE hidden = 0 ORDER BY pinned DESC, created_at DESC"
    };

    sqlx::query_as::<_, Announcement>(sql).fetch_all(db).await
}

pub async fn find_announcement_by_id(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<Announcement>, sqlx::Error> {
    sqlx::query_as::<_, Announcement>(
        "SELECT id, title, body, author, pinned, hidden, created_at, updated_at FROM announcements WHERE id = ?"
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn update_announcement(
    db: &SqlitePool,
    id: &str,
    req: UpdateAnnouncementRequest,
) -> Result<Option<Announcement>, sqlx::Error> {
    let mut current = match find_announcement_by_id(db, id).await? {
        Some(a) => a,
        None => return Ok(None),
    };

    if let Some(title) = req.title {
        current.title = title;
    }
    if let Some(body) = req.body {
        current.body = body;
    }
    if let Some(pinned) = req.pinned {
        current.pinned = pinned;
    }
    current.updated_at = Utc::now().to_rfc3339();

    sqlx::query("UPDATE announcements SET title = ?, body = ?, pinned = ?, updated_at = ? WHERE id = ?")
        .bind(&current.title)
        .bind(&current.body)
        .bind(current.pinned)
        .bind(&current.updated_at)
        .bind(id)
        .execute(db)
        .await?;

    Ok(Some(current))
}

pub async fn set_announcement_hidden(
    db: &SqlitePool,
    id: &str,
    hidden: bool,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query("UPDATE announcements SET hidden = ?, updated_at = ? WHERE id = ?")
        .bind(hidden)
        .bind(&now)
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn delete_announcement(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM announcements WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

// --- archives ---

pub async fn insert_archive(
    db: &SqlitePool,
    semester: &str,
    school_year: &str,
    archived_by: &str,
    records: &[StudentSchedule],
) -> Result<ArchiveSnapshot, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    let total = records.len() as i64;

    sqlx::query(
        "INSERT INTO archives (id, semester, school_year, archived_by, total_students, records, reset_complete, created_at) VALUES (?, ?, ?, ?, ?, ?, 0, ?)"
    )
    .bind(&id)
    .bind(semester)
    .bind(school_year)
    .bind(archived_by)
    .bind(total)
    .bind(encode_json(&records)?)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(ArchiveSnapshot {
        id,
        semester: semester.to_string(),
        school_year: school_year.to_string(),
        archived_by: archived_by.to_string(),
        total_students: total,
        reset_complete: false,
        created_at: now,
    })
}

pub async fn fetch_archives(db: &SqlitePool) -> Result<Vec<ArchiveSnapshot>, sqlx::Error> {
    sqlx::query_as::<_, ArchiveSnapshot>(
        "SELECT id, semester, school_year, archived_by, total_students, reset_complete, created_at FROM archives ORDER BY created_at DESC"
    )
    .fetch_all(db)
    .await
}

pub async fn find_archive_by_id(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<ArchiveSnapshot>, sqlx::Error> {
    sqlx::query_as::<_, ArchiveSnapshot>(
        "SELECT id, semester, school_year, archived_by, total_students, reset_complete, created_at FROM archives WHERE id = ?"
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_archive_records(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<Vec<StudentSchedule>>, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as("SELECT records FROM archives WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?;

    row.map(|(records,)| decode_json(&records)).transpose()
}

pub async fn mark_archive_reset_complete(db: &SqlitePool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE archives SET reset_complete = 1 WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete_archive(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM archives WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

// --- activity log ---

pub async fn insert_activity(
    db: &SqlitePool,
    actor: &str,
    action: &str,
    detail: &str,
) -> Result<ActivityLogEntry, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO activity_log (id, actor, action, detail, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(actor)
    .bind(action)
    .bind(detail)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(ActivityLogEntry {
        id,
        actor: actor.to_string(),
        action: action.to_string(),
        detail: detail.to_string(),
        created_at: now,
    })
}

pub async fn fetch_activity_log(
    db: &SqlitePool,
    limit: i64,
) -> Result<Vec<ActivityLogEntry>, sqlx::Error> {
    sqlx::query_as::<_, ActivityLogEntry>(
        "SELECT id, actor, action, detail, created_at FROM activity_log ORDER BY created_at DESC LIMIT ?"
    )
    .bind(limit)
    .fetch_all(db)
    .await
}
