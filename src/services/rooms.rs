use sqlx::SqlitePool;

use crate::db::repository;
use crate::error::AppError;
use crate::models::time::{minutes_since_midnight, normalize_hhmm};
use crate::models::{Room, RoomPeriod, VacancyPeriod, Weekday, WeekTag};

/// Tracks per-room occupancy periods (recurring class bookings) and vacancy
/// overrides (room temporarily free), with vacancy entries boxed to the ISO
/// week they were recorded in.
pub struct RoomService {
    db: SqlitePool,
}

impl RoomService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn add_room(&self, name: &str) -> Result<Room, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("Room name must not be empty".to_string()));
        }

        let normalized = normalize_room_name(name);
        let rooms = repository::fetch_rooms(&self.db).await?;
        if rooms.iter().any(|r| normalize_room_name(&r.name) == normalized) {
            return Err(AppError::Conflict(format!("Room {} already exists", name)));
        }

        Ok(repository::insert_room(&self.db, name).await?)
    }

    pub async fn list(&self) -> Result<Vec<Room>, AppError> {
        Ok(repository::fetch_rooms(&self.db).await?)
    }

    pub async fn add_occupancy(&self, room_name: &str, period: RoomPeriod) -> Result<Vec<Room>, AppError> {
        let period = normalize_period(period)?;
        self.update_matched(room_name, |room| {
            if !room.occupancy.contains(&period) {
                room.occupancy.push(period.clone());
                true
            } else {
                false
            }
        })
        .await
    }

    /// Removal is by exact (day, start, end) key; an overlapping but
    /// non-identical period is a separate entry and stays.
    pub async fn remove_occupancy(&self, room_name: &str, period: RoomPeriod) -> Result<Vec<Room>, AppError> {
        let period = normalize_period(period)?;
        self.update_matched(room_name, |room| {
            let before = room.occupancy.len();
            room.occupancy.retain(|p| p != &period);
            room.occupancy.len() != before
        })
        .await
    }

    pub async fn add_vacancy(&self, room_name: &str, period: RoomPeriod) -> Result<Vec<Room>, AppError> {
        self.add_vacancy_tagged(room_name, period, WeekTag::current()).await
    }

    pub async fn add_vacancy_tagged(
        &self,
        room_name: &str,
        period: RoomPeriod,
        tag: WeekTag,
    ) -> Result<Vec<Room>, AppError> {
        let period = normalize_period(period)?;
        let vacancy = VacancyPeriod {
            day: period.day,
            start_time: period.start_time,
            end_time: period.end_time,
            year: tag.year,
            week: tag.week,
        };
        self.update_matched(room_name, |room| {
            if !room.vacancies.contains(&vacancy) {
                room.vacancies.push(vacancy.clone());
                true
            } else {
                false
            }
        })
        .await
    }

    pub async fn remove_vacancy(&self, room_name: &str, period: RoomPeriod) -> Result<Vec<Room>, AppError> {
        let period = normalize_period(period)?;
        self.update_matched(room_name, |room| {
            let before = room.vacancies.len();
            room.vacancies.retain(|v| {
                !(v.day == period.day
                    && v.start_time == period.start_time
                    && v.end_time == period.end_time)
            });
            room.vacancies.len() != before
        })
        .await
    }

    pub async fn vacant_rooms(&self, day: Weekday, time: &str) -> Result<Vec<Room>, AppError> {
        let minutes = minutes_since_midnight(time)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid time: {}", time)))?;
        self.vacant_rooms_at(day, minutes, WeekTag::current()).await
    }

    pub async fn vacant_rooms_at(
        &self,
        day: Weekday,
        minutes: u16,
        tag: WeekTag,
    ) -> Result<Vec<Room>, AppError> {
        let rooms = repository::fetch_rooms(&self.db).await?;
        Ok(rooms
            .into_iter()
            .filter(|room| room_is_vacant(room, day, minutes, tag))
            .collect())
    }

    pub async fn prune_expired(&self) -> Result<usize, AppError> {
        self.prune_expired_as_of(WeekTag::current()).await
    }

    /// Drop vacancy overrides recorded in weeks before `current`. Queries
    /// already ignore stale entries; this keeps the stored lists from
    /// growing without bound.
    pub async fn prune_expired_as_of(&self, current: WeekTag) -> Result<usize, AppError> {
        let mut removed = 0;
        for mut room in repository::fetch_rooms(&self.db).await? {
            let before = room.vacancies.len();
            room.vacancies
                .retain(|v| (v.year, v.week) >= (current.year, current.week));
            if room.vacancies.len() != before {
                removed += before - room.vacancies.len();
                repository::update_room_periods(&self.db, &room).await?;
            }
        }
        Ok(removed)
    }

    /// Apply `mutate` to every room the human-entered name resolves to
    /// ("RM. 9/CL3" names two rooms) and persist the ones that changed.
    async fn update_matched<F>(&self, room_name: &str, mut mutate: F) -> Result<Vec<Room>, AppError>
    where
        F: FnMut(&mut Room) -> bool,
    {
        let rooms = repository::fetch_rooms(&self.db).await?;
        let indices = matching_indices(&rooms, room_name);
        if indices.is_empty() {
            return Err(AppError::NotFound);
        }

        let mut rooms = rooms;
        let mut updated = Vec::new();
        for i in indices {
            if mutate(&mut rooms[i]) {
                repository::update_room_periods(&self.db, &rooms[i]).await?;
            }
            updated.push(rooms[i].clone());
        }

        Ok(updated)
    }
}

fn normalize_period(period: RoomPeriod) -> Result<RoomPeriod, AppError> {
    let start = normalize_hhmm(&period.start_time)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid start time: {}", period.start_time)))?;
    let end = normalize_hhmm(&period.end_time)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid end time: {}", period.end_time)))?;
    if start >= end {
        return Err(AppError::BadRequest(format!(
            "Period must start before it ends: {}-{}",
            start, end
        )));
    }

    Ok(RoomPeriod {
        day: period.day,
        start_time: start,
        end_time: end,
    })
}

/// Case-fold, strip whitespace and punctuation: "RM. 9" and "rm9" collapse
/// to the same key.
pub(crate) fn normalize_room_name(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// A human-entered room field may name several rooms joined by "/".
pub(crate) fn split_room_names(raw: &str) -> Vec<String> {
    raw.split('/')
        .map(normalize_room_name)
        .filter(|s| !s.is_empty())
        .collect()
}

pub(crate) fn matching_indices(rooms: &[Room], raw: &str) -> Vec<usize> {
    let wanted = split_room_names(raw);
    rooms
        .iter()
        .enumerate()
        .filter(|(_, room)| wanted.contains(&normalize_room_name(&room.name)))
        .map(|(i, _)| i)
        .collect()
}

/// A room is vacant at (day, minutes) when a same-week vacancy override
/// covers the instant, or when no occupancy period does.
pub(crate) fn room_is_vacant(room: &Room, day: Weekday, minutes: u16, tag: WeekTag) -> bool {
    let overridden = room
        .vacancies
        .iter()
        .any(|v| v.tag() == tag && v.day == day && covers(&v.start_time, &v.end_time, minutes));
    if overridden {
        return true;
    }

    !room
        .occupancy
        .iter()
        .any(|p| p.day == day && covers(&p.start_time, &p.end_time, minutes))
}

fn covers(start: &str, end: &str, minutes: u16) -> bool {
    match (minutes_since_midnight(start), minutes_since_midnight(end)) {
        (Some(s), Some(e)) => s <= minutes && minutes < e,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(name: &str) -> Room {
        Room {
            id: format!("room-{}", name),
            name: name.to_string(),
            occupancy: Vec::new(),
            vacancies: Vec::new(),
        }
    }

    #[test]
    fn test_normalize_room_name() {
        assert_eq!(normalize_room_name("RM. 9"), "rm9");
        assert_eq!(normalize_room_name("rm9"), "rm9");
        assert_eq!(normalize_room_name("CL-3"), "cl3");
    }

    #[test]
    fn test_split_combined_room_names() {
        assert_eq!(split_room_names("RM. 9/CL3"), vec!["rm9", "cl3"]);
        assert_eq!(split_room_names("rm.9 / cl3"), vec!["rm9", "cl3"]);
        assert_eq!(split_room_names("LAB 1"), vec!["lab1"]);
    }

    #[test]
    fn test_matching_indices_resolves_both_sub_rooms() {
        let rooms = vec![room("RM 9"), room("CL3"), room("RM 10")];
        assert_eq!(matching_indices(&rooms, "RM. 9/CL3"), vec![0, 1]);
        assert_eq!(matching_indices(&rooms, "rm.9 / cl3"), vec![0, 1]);
        assert_eq!(matching_indices(&rooms, "gym"), Vec::<usize>::new());
    }

    #[test]
    fn test_vacancy_override_is_week_boxed() {
        let mut r = room("RM 9");
        r.occupancy.push(RoomPeriod {
            day: Weekday::Monday,
            start_time: "08:00".to_string(),
            end_time: "09:30".to_string(),
        });
        r.vacancies.push(VacancyPeriod {
            day: Weekday::Monday,
            start_time: "08:00".to_string(),
            end_time: "09:30".to_string(),
            year: 2026,
            week: 10,
        });

        let week10 = WeekTag { year: 2026, week: 10 };
        let week11 = WeekTag { year: 2026, week: 11 };

        // Occupied slot, but overridden vacant during the recorded week.
        assert!(room_is_vacant(&r, Weekday::Monday, 510, week10));
        // The override does not carry into the next week.
        assert!(!room_is_vacant(&r, Weekday::Monday, 510, week11));
        // Outside the occupied slot the room is simply free.
        assert!(room_is_vacant(&r, Weekday::Monday, 600, week11));
        assert!(room_is_vacant(&r, Weekday::Tuesday, 510, week11));
    }

    #[test]
    fn test_covers_is_half_open() {
        assert!(covers("08:00", "09:30", 480));
        assert!(covers("08:00", "09:30", 569));
        assert!(!covers("08:00", "09:30", 570));
        assert!(!covers("08:00", "09:30", 479));
    }
}
