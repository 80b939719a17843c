use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::models::day::Weekday;

/// Canonical room record. Occupancy periods recur weekly; vacancy periods
/// are manual overrides boxed to the ISO week they were recorded in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub occupancy: Vec<RoomPeriod>,
    pub vacancies: Vec<VacancyPeriod>,
}

/// Recurring time slot during which a room is booked by a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomPeriod {
    pub day: Weekday,
    pub start_time: String,
    pub end_time: String,
}

/// Manual vacancy override, valid only within the tagged week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacancyPeriod {
    pub day: Weekday,
    pub start_time: String,
    pub end_time: String,
    pub year: i32,
    pub week: u32,
}

impl VacancyPeriod {
    pub fn tag(&self) -> WeekTag {
        WeekTag {
            year: self.year,
            week: self.week,
        }
    }
}

/// ISO year/week pair used to expire vacancy overrides at week boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekTag {
    pub year: i32,
    pub week: u32,
}

impl WeekTag {
    pub fn current() -> Self {
        let iso = Utc::now().iso_week();
        WeekTag {
            year: iso.year(),
            week: iso.week(),
        }
    }
}
