pub mod activity;
pub mod announcement;
pub mod archive;
pub mod day;
pub mod faculty;
pub mod notification;
pub mod room;
pub mod schedule;
pub mod settings;
pub mod time;

pub use activity::ActivityLogEntry;
pub use announcement::{Announcement, NewAnnouncementRequest, UpdateAnnouncementRequest};
pub use archive::{ArchiveSnapshot, ResetSummary};
pub use day::Weekday;
pub use faculty::{FacultyUser, NewFacultyRequest};
pub use notification::NotificationRecord;
pub use room::{Room, RoomPeriod, VacancyPeriod, WeekTag};
pub use schedule::{ClassSlot, DerivedFacultyClass, SaveScheduleRequest, StudentSchedule};
pub use settings::{AppSettings, UpdateSettingsRequest};
