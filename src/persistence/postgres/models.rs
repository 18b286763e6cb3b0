use chrono::{DateTime, NaiveTime, Utc};
use diesel::prelude::*;
use std::str::FromStr;

use super::schema::{timetable_events, timetable_sources};
use crate::entry::{EventType, ScheduleEntry};
use crate::persistence::{PersistenceError, PersistenceResult};
use crate::source::{NewTimetableSource, SourceStatus, TimetableSource, TimetableType};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = timetable_sources)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SourceRow {
    pub id: i64,
    pub academic_year: String,
    pub semester: String,
    pub display_name: String,
    pub timetable_type: String,
    pub description: Option<String>,
    pub status: String,
    pub events_parsed: bool,
    pub total_events: i64,
    pub created_at: DateTime<Utc>,
}

impl SourceRow {
    pub fn into_source(self) -> PersistenceResult<TimetableSource> {
        Ok(TimetableSource {
            id: self.id,
            academic_year: self.academic_year,
            semester: self.semester,
            display_name: self.display_name,
            timetable_type: TimetableType::from_str(&self.timetable_type)
                .map_err(PersistenceError::InvalidData)?,
            description: self.description,
            status: SourceStatus::from_str(&self.status).map_err(PersistenceError::InvalidData)?,
            events_parsed: self.events_parsed,
            total_events: self.total_events,
            created_at: self.created_at,
        })
    }
}

/// Row for a freshly registered source; the id comes from the sequence.
#[derive(Debug, Insertable)]
#[diesel(table_name = timetable_sources)]
pub struct NewSourceRow<'a> {
    pub academic_year: &'a str,
    pub semester: &'a str,
    pub display_name: &'a str,
    pub timetable_type: &'a str,
    pub description: Option<&'a str>,
    pub status: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewSourceRow<'a> {
    pub fn new(source: &'a NewTimetableSource, created_at: DateTime<Utc>) -> Self {
        Self {
            academic_year: &source.academic_year,
            semester: &source.semester,
            display_name: &source.display_name,
            timetable_type: source.timetable_type.as_str(),
            description: source.description.as_deref(),
            status: SourceStatus::Processing.as_str(),
            created_at,
        }
    }
}

/// Full row written under an explicit id.
#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = timetable_sources)]
#[diesel(treat_none_as_null = true)]
pub struct SourceRecord<'a> {
    pub id: i64,
    pub academic_year: &'a str,
    pub semester: &'a str,
    pub display_name: &'a str,
    pub timetable_type: &'a str,
    pub description: Option<&'a str>,
    pub status: &'a str,
    pub events_parsed: bool,
    pub total_events: i64,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a TimetableSource> for SourceRecord<'a> {
    fn from(source: &'a TimetableSource) -> Self {
        Self {
            id: source.id,
            academic_year: &source.academic_year,
            semester: &source.semester,
            display_name: &source.display_name,
            timetable_type: source.timetable_type.as_str(),
            description: source.description.as_deref(),
            status: source.status.as_str(),
            events_parsed: source.events_parsed,
            total_events: source.total_events,
            created_at: source.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = timetable_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EventRow {
    pub day: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: String,
    pub course_code: String,
    pub normalized_code: String,
    pub event_type: String,
    pub details: Option<String>,
    pub lecturer: Option<String>,
}

impl EventRow {
    pub fn into_entry(self) -> PersistenceResult<ScheduleEntry> {
        Ok(ScheduleEntry {
            event_type: EventType::from_str(&self.event_type)
                .map_err(PersistenceError::InvalidData)?,
            course_code: self.course_code,
            normalized_code: self.normalized_code,
            day: self.day,
            start_time: self.start_time,
            end_time: self.end_time,
            location: self.location,
            lecturer: self.lecturer,
            details: self.details,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = timetable_events)]
pub struct NewEventRow<'a> {
    pub source_id: i64,
    pub day: &'a str,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: &'a str,
    pub course_code: &'a str,
    pub normalized_code: &'a str,
    pub event_type: &'a str,
    pub details: Option<&'a str>,
    pub lecturer: Option<&'a str>,
}

impl<'a> NewEventRow<'a> {
    pub fn new(source_id: i64, entry: &'a ScheduleEntry) -> Self {
        Self {
            source_id,
            day: &entry.day,
            start_time: entry.start_time,
            end_time: entry.end_time,
            location: &entry.location,
            course_code: &entry.course_code,
            normalized_code: &entry.normalized_code,
            event_type: entry.event_type.as_str(),
            details: entry.details.as_deref(),
            lecturer: entry.lecturer.as_deref(),
        }
    }
}
