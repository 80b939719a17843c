use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::repository;
use crate::error::AppError;
use crate::models::time::normalize_hhmm;
use crate::models::{DerivedFacultyClass, FacultyUser, StudentSchedule};
use crate::push::{PushClient, PushMessage};

/// Derives a faculty member's classes from the student schedule documents.
///
/// A slot belongs to a faculty member when it carries that faculty's
/// `professor_id`, or, for unlinked slots, when the free-text professor field
/// matches the faculty's name heuristically. Aggregates are recomputed from
/// scratch on every call; nothing derived is persisted.
pub struct FacultyScheduleService {
    db: SqlitePool,
    push: Arc<dyn PushClient>,
}

impl FacultyScheduleService {
    pub fn new(db: SqlitePool, push: Arc<dyn PushClient>) -> Self {
        Self { db, push }
    }

    pub async fn derive(
        &self,
        faculty_id: &str,
        include_unvalidated: bool,
    ) -> Result<Vec<DerivedFacultyClass>, AppError> {
        let faculty = repository::find_faculty_by_id(&self.db, faculty_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let settings = repository::fetch_settings(&self.db).await?;
        let threshold = settings.min_students.max(0) as u32;

        let schedules = repository::fetch_schedules(&self.db).await?;
        let classes = aggregate_for_faculty(&faculty, &schedules, threshold);

        info!(
            "Derived {} classes for {} {} (threshold {})",
            classes.len(),
            faculty.first_name,
            faculty.last_name,
            threshold
        );

        self.notify_newly_validated(&faculty, &classes).await;

        if include_unvalidated {
            Ok(classes)
        } else {
            Ok(classes.into_iter().filter(|c| c.validated).collect())
        }
    }

    /// Emit at most one "class validated" notification per (faculty, class).
    /// The check is a persisted lookup, not process memory, so repeated
    /// derivations and restarts never duplicate. Failures are logged and
    /// swallowed; notification delivery never blocks a schedule query.
    async fn notify_newly_validated(&self, faculty: &FacultyUser, classes: &[DerivedFacultyClass]) {
        for class in classes.iter().filter(|c| c.validated) {
            if let Err(e) = self.emit_validated(faculty, class).await {
                warn!(
                    "Failed to emit validation notification for {}: {}",
                    class.subject, e
                );
            }
        }
    }

    async fn emit_validated(
        &self,
        faculty: &FacultyUser,
        class: &DerivedFacultyClass,
    ) -> Result<(), AppError> {
        let dedup_key = format!("validated:{}:{}", faculty.id, class.class_key());
        if repository::notification_exists(&self.db, &dedup_key).await? {
            return Ok(());
        }

        let message = PushMessage {
            title: "Class validated".to_string(),
            body: format!(
                "{} ({} {}-{}) reached {} students",
                class.subject, class.day, class.start_time, class.end_time, class.student_count
            ),
        };

        repository::insert_notification(
            &self.db,
            Some(&faculty.id),
            "class_validated",
            Some(&dedup_key),
            &message.title,
            &message.body,
        )
        .await?;

        if let Some(token) = &faculty.device_token {
            if let Err(e) = self.push.send_to_device(token, &message).await {
                warn!("Push send failed for faculty {}: {}", faculty.id, e);
            }
        }

        Ok(())
    }
}

/// Pure aggregation step: scan every schedule, collect this faculty's slots,
/// group by (subject, day, start, end), apply the threshold, sort by day then
/// start time. Times are zero-padded before any comparison.
pub(crate) fn aggregate_for_faculty(
    faculty: &FacultyUser,
    schedules: &[StudentSchedule],
    threshold: u32,
) -> Vec<DerivedFacultyClass> {
    let names = NameCandidates::for_faculty(faculty);

    let mut by_key: HashMap<String, DerivedFacultyClass> = HashMap::new();
    let mut counted: HashSet<(String, String)> = HashSet::new();

    for schedule in schedules {
        for slot in &schedule.slots {
            let matched = match &slot.professor_id {
                Some(id) => id == &faculty.id,
                None => {
                    !is_placeholder(&slot.professor)
                        && matches_professor(&normalize_name(&slot.professor), &names)
                }
            };
            if !matched {
                continue;
            }

            let start = normalize_or_keep(&slot.start_time);
            let end = normalize_or_keep(&slot.end_time);
            let key = format!(
                "{}|{}|{}|{}",
                slot.subject.trim().to_lowercase(),
                slot.day,
                start,
                end
            );

            let entry = by_key.entry(key.clone()).or_insert_with(|| DerivedFacultyClass {
                subject: slot.subject.trim().to_string(),
                day: slot.day,
                start_time: start,
                end_time: end,
                room: slot.room.trim().to_string(),
                sections: Vec::new(),
                student_count: 0,
                validated: false,
                students_needed: 0,
            });

            // A concrete room wins over a placeholder seen earlier.
            if is_placeholder(&entry.room) && !is_placeholder(&slot.room) {
                entry.room = slot.room.trim().to_string();
            }

            let section = schedule.section_label();
            if !entry.sections.contains(&section) {
                entry.sections.push(section);
            }

            // Each student counts once per class even if the upload carries
            // duplicate slots.
            if counted.insert((key, schedule.student_id.clone())) {
                entry.student_count += 1;
            }
        }
    }

    let mut classes: Vec<DerivedFacultyClass> = by_key.into_values().collect();
    for class in &mut classes {
        class.validated = class.student_count >= threshold;
        class.students_needed = threshold.saturating_sub(class.student_count);
    }

    classes.sort_by(|a, b| {
        (a.day.index(), a.start_time.as_str()).cmp(&(b.day.index(), b.start_time.as_str()))
    });

    classes
}

fn normalize_or_keep(raw: &str) -> String {
    normalize_hhmm(raw).unwrap_or_else(|| raw.trim().to_string())
}

/// Canonical match strings for one faculty member, all in normalized form.
pub(crate) struct NameCandidates {
    first: String,
    last: String,
    candidates: Vec<String>,
}

impl NameCandidates {
    pub(crate) fn for_faculty(faculty: &FacultyUser) -> Self {
        let first = normalize_name(&faculty.first_name);
        let last = normalize_name(&faculty.last_name);

        let mut candidates = vec![format!("{} {}", first, last)];
        if let Some(middle) = faculty.middle_name.as_deref().filter(|m| !m.trim().is_empty()) {
            let middle = normalize_name(middle);
            candidates.push(format!("{} {} {}", first, middle, last));
            if let Some(initial) = middle.chars().next() {
                candidates.push(format!("{} {} {}", first, initial, last));
            }
        }
        if let Some(display) = faculty.display_name.as_deref().filter(|d| !d.trim().is_empty()) {
            let display = normalize_name(display);
            if !candidates.contains(&display) {
                candidates.push(display);
            }
        }

        Self { first, last, candidates }
    }
}

/// Tiered name heuristic over a normalized professor string: exact candidate
/// match, then last name plus first-name-or-initial tokens, then first and
/// last name appearing anywhere in the text.
pub(crate) fn matches_professor(text: &str, names: &NameCandidates) -> bool {
    if names.first.is_empty() || names.last.is_empty() {
        return false;
    }

    if names.candidates.iter().any(|c| c == text) {
        return true;
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    let first_initial = names.first.chars().next();
    if tokens.iter().any(|t| *t == names.last) {
        let first_hit = tokens.iter().any(|t| {
            *t == names.first || (t.len() == 1 && t.chars().next() == first_initial)
        });
        if first_hit {
            return true;
        }
    }

    text.contains(&names.first) && text.contains(&names.last)
}

/// Lowercase, drop dots and commas, collapse whitespace.
pub(crate) fn normalize_name(raw: &str) -> String {
    raw.to_lowercase()
        .replace(['.', ','], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Values the clients use when a professor or room is unknown.
pub(crate) fn is_placeholder(raw: &str) -> bool {
    let squashed: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    matches!(squashed.as_str(), "" | "tba" | "na" | "none")
}
