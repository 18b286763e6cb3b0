//! Master timetable files -> schedule entries.
//!
//! Teaching timetables arrive as a JSON array (or CSV) of rows keyed by the
//! column headers of the published timetable. Exam timetables nest weeks,
//! days and sessions. Rows that cannot be understood are skipped and counted.

use super::{PersistenceError, PersistenceResult, TimetableStore};
use crate::course_code::{normalize_course_code, parse_course_string};
use crate::entry::{EventType, ScheduleEntry, title_case_day};
use crate::entry_validation;
use crate::source::{SourceStatus, TimetableType};
use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const EXAM_DURATION_HOURS: i64 = 3;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeachingRecord {
    #[serde(rename = "Day", default)]
    pub day: String,
    #[serde(rename = "Time", default)]
    pub time: String,
    #[serde(rename = "Course", default)]
    pub course: String,
    #[serde(rename = "Venue", default)]
    pub venue: String,
    #[serde(rename = "Instructor(s)", default)]
    pub instructors: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExamTimetable {
    #[serde(default)]
    pub schedule: Vec<ExamWeek>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExamWeek {
    #[serde(default)]
    pub days: Vec<ExamDay>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExamDay {
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub sessions: Vec<ExamSession>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExamSession {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub exams: Vec<ExamGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExamGroup {
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub courses: Vec<String>,
}

/// Parsed entries plus the number of rows that were skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOutcome {
    pub entries: Vec<ScheduleEntry>,
    pub skipped: usize,
}

impl ImportOutcome {
    fn push(&mut self, entry: ScheduleEntry) {
        if entry_validation::validate_entry(&entry).is_ok() {
            self.entries.push(entry);
        } else {
            self.skipped += 1;
        }
    }
}

/// Parses `"7:00a"`, `"7:00AM"`, `"9:00 pm"` or `"14:30"`.
pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    let (clock, meridiem) = if let Some(rest) = compact.strip_suffix("am") {
        (rest, Some(false))
    } else if let Some(rest) = compact.strip_suffix("pm") {
        (rest, Some(true))
    } else if let Some(rest) = compact.strip_suffix('a') {
        (rest, Some(false))
    } else if let Some(rest) = compact.strip_suffix('p') {
        (rest, Some(true))
    } else {
        (compact.as_str(), None)
    };

    let (hour, minute) = match clock.split_once(':') {
        Some((h, m)) => (h.parse::<u32>().ok()?, m.parse::<u32>().ok()?),
        None => (clock.parse::<u32>().ok()?, 0),
    };

    let hour = match meridiem {
        Some(pm) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            }
        }
        None => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Parses a range such as `"7:00a - 9:55a"`.
pub fn parse_time_range(value: &str) -> Option<(NaiveTime, NaiveTime)> {
    let (start, end) = value.split_once(" - ").or_else(|| value.split_once('-'))?;
    Some((parse_clock(start)?, parse_clock(end)?))
}

/// Exam sessions only publish a start; every paper is assumed to run three hours.
pub fn parse_exam_time(value: &str) -> Option<(NaiveTime, NaiveTime)> {
    let lowered = value.trim().to_ascii_lowercase();
    if !(lowered.contains("am") || lowered.contains("pm")) {
        return None;
    }
    let start = parse_clock(&lowered)?;
    let (end, wrapped) = start.overflowing_add_signed(Duration::hours(EXAM_DURATION_HOURS));
    if wrapped != 0 {
        return None;
    }
    Some((start, end))
}

pub fn parse_teaching_timetable(records: &[TeachingRecord]) -> ImportOutcome {
    let mut outcome = ImportOutcome::default();
    for record in records {
        let Some((start, end)) = parse_time_range(&record.time) else {
            outcome.skipped += 1;
            continue;
        };
        if record.course.trim().is_empty() {
            outcome.skipped += 1;
            continue;
        }
        let parsed = parse_course_string(record.course.trim());
        let details = (!parsed.details.is_empty()).then_some(parsed.details);
        let event_type = EventType::infer(details.as_deref(), false);
        let mut entry = ScheduleEntry::new(
            parsed.display_code,
            event_type,
            title_case_day(&record.day),
            start,
            end,
        )
        .with_location(record.venue.trim());
        entry.normalized_code = parsed.normalized_code;
        entry.details = details;
        if !record.instructors.trim().is_empty() {
            entry.lecturer = Some(record.instructors.trim().to_string());
        }
        outcome.push(entry);
    }
    outcome
}

pub fn parse_exam_timetable(timetable: &ExamTimetable) -> ImportOutcome {
    let mut outcome = ImportOutcome::default();
    for week in &timetable.schedule {
        for day in &week.days {
            let day_name = title_case_day(&day.day);
            for session in &day.sessions {
                let Some((start, end)) = parse_exam_time(&session.time) else {
                    tracing::warn!(
                        day = %day_name,
                        time = %session.time,
                        "skipping exam session without a usable start time or running past midnight"
                    );
                    outcome.skipped += 1;
                    continue;
                };
                for group in &session.exams {
                    for course in &group.courses {
                        let course = course.trim();
                        if course.is_empty() {
                            continue;
                        }
                        let mut entry =
                            ScheduleEntry::new(course, EventType::Exam, day_name.clone(), start, end)
                                .with_details(format!(
                                    "Level: {}, Date: {}",
                                    group.level, day.date
                                ));
                        entry.normalized_code = normalize_course_code(course);
                        outcome.push(entry);
                    }
                }
            }
        }
    }
    outcome
}

pub fn parse_teaching_csv<R: Read>(reader: R) -> PersistenceResult<ImportOutcome> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let mut records = Vec::new();
    for record in csv_reader.deserialize::<TeachingRecord>() {
        records.push(record?);
    }
    Ok(parse_teaching_timetable(&records))
}

/// Parses a master timetable file; `.csv` is read as a teaching timetable,
/// anything else as JSON in the layout matching `timetable_type`.
pub fn load_timetable_file<P: AsRef<Path>>(
    path: P,
    timetable_type: TimetableType,
) -> PersistenceResult<ImportOutcome> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let file = File::open(path)?;
    if is_csv {
        return parse_teaching_csv(file);
    }

    let value: serde_json::Value = serde_json::from_reader(file)?;
    if timetable_type.is_exam() && value.get("schedule").is_some() {
        let timetable: ExamTimetable = serde_json::from_value(value)?;
        return Ok(parse_exam_timetable(&timetable));
    }
    if !value.is_array() {
        return Err(PersistenceError::InvalidData(format!(
            "{} is not a list of timetable rows",
            path.display()
        )));
    }
    let records: Vec<TeachingRecord> = serde_json::from_value(value)?;
    Ok(parse_teaching_timetable(&records))
}

/// Parses a file for an existing source and stores its events.
///
/// On success the source becomes `COMPLETED`; on any failure it is marked
/// `FAILED` and the error is returned.
pub fn ingest_timetable_file<P: AsRef<Path>>(
    store: &dyn TimetableStore,
    source_id: i64,
    path: P,
) -> PersistenceResult<ImportOutcome> {
    let source = store
        .find_source(source_id)?
        .ok_or(PersistenceError::SourceNotFound(source_id))?;

    let result = load_timetable_file(path.as_ref(), source.timetable_type)
        .and_then(|outcome| store.replace_events(source_id, &outcome.entries).map(|_| outcome));

    match result {
        Ok(outcome) => {
            store.set_status(source_id, SourceStatus::Completed)?;
            tracing::info!(
                source_id,
                events = outcome.entries.len(),
                skipped = outcome.skipped,
                "stored master timetable events"
            );
            Ok(outcome)
        }
        Err(err) => {
            tracing::error!(source_id, error = %err, "failed to parse master timetable");
            store.set_status(source_id, SourceStatus::Failed)?;
            Err(err)
        }
    }
}
