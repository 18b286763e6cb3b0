//! Seed data in Django `dumpdata` layout:
//! `[{"model": "core.timetablesource", "pk": 1, "fields": {...}}, ...]`.
//!
//! Only timetable sources and events are loaded. Records of other models
//! (users, registration history) are counted and skipped.

use super::{PersistenceError, PersistenceResult, TimetableStore};
use crate::course_code::normalize_course_code;
use crate::entry::{EventType, ScheduleEntry};
use crate::source::{SourceStatus, TimetableSource, TimetableType};
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(tag = "model")]
enum FixtureRecord {
    #[serde(rename = "core.timetablesource")]
    Source { pk: i64, fields: SourceFields },
    #[serde(rename = "core.timetableevent")]
    Event { fields: EventFields },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct SourceFields {
    #[serde(default)]
    academic_year: String,
    #[serde(default)]
    semester: String,
    display_name: String,
    #[serde(default)]
    timetable_type: TimetableType,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: SourceStatus,
    #[serde(default)]
    events_parsed: bool,
    #[serde(default)]
    total_events: i64,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct EventFields {
    source: i64,
    day: String,
    start_time: NaiveTime,
    end_time: NaiveTime,
    #[serde(default)]
    location: String,
    course_code: String,
    #[serde(default)]
    normalized_code: Option<String>,
    #[serde(default)]
    event_type: Option<EventType>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    lecturer: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FixtureSummary {
    pub sources: usize,
    pub events: usize,
    pub skipped: usize,
}

pub fn load_fixture_file<P: AsRef<Path>>(
    store: &dyn TimetableStore,
    path: P,
) -> PersistenceResult<FixtureSummary> {
    let file = File::open(path)?;
    let records: Vec<FixtureRecord> = serde_json::from_reader(BufReader::new(file))?;
    apply(store, records)
}

pub fn load_fixture(store: &dyn TimetableStore, json: &str) -> PersistenceResult<FixtureSummary> {
    let records: Vec<FixtureRecord> = serde_json::from_str(json)?;
    apply(store, records)
}

fn apply(store: &dyn TimetableStore, records: Vec<FixtureRecord>) -> PersistenceResult<FixtureSummary> {
    let mut summary = FixtureSummary::default();
    let mut sources = Vec::new();
    let mut events: BTreeMap<i64, Vec<EventFields>> = BTreeMap::new();

    for record in records {
        match record {
            FixtureRecord::Source { pk, fields } => sources.push((pk, fields)),
            FixtureRecord::Event { fields } => {
                events.entry(fields.source).or_default().push(fields);
            }
            FixtureRecord::Other => summary.skipped += 1,
        }
    }

    let mut types = BTreeMap::new();
    for (pk, fields) in sources {
        let source = TimetableSource {
            id: pk,
            academic_year: fields.academic_year,
            semester: fields.semester,
            display_name: fields.display_name,
            timetable_type: fields.timetable_type,
            description: fields.description,
            status: fields.status,
            events_parsed: fields.events_parsed,
            total_events: fields.total_events,
            created_at: fields.created_at.unwrap_or_else(Utc::now),
        };
        types.insert(pk, source.timetable_type);
        store.upsert_source(&source)?;
        summary.sources += 1;
    }

    for (source_id, rows) in events {
        let timetable_type = match types.get(&source_id) {
            Some(kind) => *kind,
            None => store
                .find_source(source_id)?
                .map(|source| source.timetable_type)
                .ok_or_else(|| {
                    PersistenceError::InvalidData(format!(
                        "fixture event references unknown source {source_id}"
                    ))
                })?,
        };
        let entries: Vec<ScheduleEntry> = rows
            .into_iter()
            .map(|fields| into_entry(fields, timetable_type))
            .collect();
        summary.events += store.replace_events(source_id, &entries)?;
    }

    tracing::info!(
        sources = summary.sources,
        events = summary.events,
        skipped = summary.skipped,
        "loaded fixture"
    );
    Ok(summary)
}

fn into_entry(fields: EventFields, timetable_type: TimetableType) -> ScheduleEntry {
    let normalized_code = fields
        .normalized_code
        .filter(|code| !code.trim().is_empty())
        .unwrap_or_else(|| normalize_course_code(&fields.course_code));
    let event_type = fields
        .event_type
        .unwrap_or_else(|| EventType::infer(fields.details.as_deref(), timetable_type.is_exam()));
    ScheduleEntry {
        course_code: fields.course_code,
        normalized_code,
        event_type,
        day: fields.day,
        start_time: fields.start_time,
        end_time: fields.end_time,
        location: fields.location,
        lecturer: fields.lecturer.filter(|l| !l.trim().is_empty()),
        details: fields.details.filter(|d| !d.trim().is_empty()),
    }
}
