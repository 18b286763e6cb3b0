use super::{PersistenceError, PersistenceResult, TimetableStore};
use crate::entry::{EventType, ScheduleEntry};
use crate::source::{NewTimetableSource, SourceStatus, TimetableSource, TimetableType};
use chrono::{DateTime, NaiveTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::str::FromStr;

const TIME_FORMAT: &str = "%H:%M:%S";

const SOURCE_COLUMNS: &str = "id, academic_year, semester, display_name, timetable_type, \
     description, status, events_parsed, total_events, created_at";

pub struct SqliteTimetableStore {
    connection: Mutex<Connection>,
}

impl SqliteTimetableStore {
    /// Opens (or creates) the database file and brings the schema up to date.
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS timetable_sources (
                id INTEGER PRIMARY KEY,
                academic_year TEXT NOT NULL,
                semester TEXT NOT NULL,
                display_name TEXT NOT NULL,
                timetable_type TEXT NOT NULL DEFAULT 'teaching',
                description TEXT,
                status TEXT NOT NULL DEFAULT 'PROCESSING',
                events_parsed INTEGER NOT NULL DEFAULT 0,
                total_events INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS timetable_events (
                id INTEGER PRIMARY KEY,
                source_id INTEGER NOT NULL REFERENCES timetable_sources(id) ON DELETE CASCADE,
                day TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                location TEXT NOT NULL DEFAULT '',
                course_code TEXT NOT NULL,
                normalized_code TEXT NOT NULL,
                event_type TEXT NOT NULL DEFAULT 'lecture',
                details TEXT,
                lecturer TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_events_source_code
                ON timetable_events (source_id, normalized_code);
            CREATE INDEX IF NOT EXISTS idx_events_day_start
                ON timetable_events (day, start_time);
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn source_exists(connection: &Connection, id: i64) -> PersistenceResult<bool> {
        let found: Option<i64> = connection
            .query_row(
                "SELECT id FROM timetable_sources WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

struct SourceRow {
    id: i64,
    academic_year: String,
    semester: String,
    display_name: String,
    timetable_type: String,
    description: Option<String>,
    status: String,
    events_parsed: bool,
    total_events: i64,
    created_at: String,
}

impl SourceRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            academic_year: row.get(1)?,
            semester: row.get(2)?,
            display_name: row.get(3)?,
            timetable_type: row.get(4)?,
            description: row.get(5)?,
            status: row.get(6)?,
            events_parsed: row.get(7)?,
            total_events: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    fn into_source(self) -> PersistenceResult<TimetableSource> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|err| {
                PersistenceError::InvalidData(format!(
                    "source {} has invalid created_at '{}': {err}",
                    self.id, self.created_at
                ))
            })?
            .with_timezone(&Utc);
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
            created_at,
        })
    }
}

struct EventRow {
    day: String,
    start_time: String,
    end_time: String,
    location: String,
    course_code: String,
    normalized_code: String,
    event_type: String,
    details: Option<String>,
    lecturer: Option<String>,
}

impl EventRow {
    fn into_entry(self) -> PersistenceResult<ScheduleEntry> {
        Ok(ScheduleEntry {
            start_time: parse_time(&self.start_time)?,
            end_time: parse_time(&self.end_time)?,
            event_type: EventType::from_str(&self.event_type)
                .map_err(PersistenceError::InvalidData)?,
            course_code: self.course_code,
            normalized_code: self.normalized_code,
            day: self.day,
            location: self.location,
            lecturer: self.lecturer,
            details: self.details,
        })
    }
}

fn parse_time(value: &str) -> PersistenceResult<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .map_err(|err| PersistenceError::InvalidData(format!("invalid time '{value}': {err}")))
}

impl TimetableStore for SqliteTimetableStore {
    fn insert_source(&self, source: NewTimetableSource) -> PersistenceResult<TimetableSource> {
        let conn = self.connection.lock();
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO timetable_sources \
             (academic_year, semester, display_name, timetable_type, description, status, \
              events_parsed, total_events, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0, ?7)",
            params![
                source.academic_year,
                source.semester,
                source.display_name,
                source.timetable_type.as_str(),
                source.description,
                SourceStatus::Processing.as_str(),
                created_at.to_rfc3339(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        Ok(source.into_source(id, created_at))
    }

    fn upsert_source(&self, source: &TimetableSource) -> PersistenceResult<()> {
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO timetable_sources (id, academic_year, semester, display_name, \
              timetable_type, description, status, events_parsed, total_events, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
             ON CONFLICT(id) DO UPDATE SET \
               academic_year = excluded.academic_year, \
               semester = excluded.semester, \
               display_name = excluded.display_name, \
               timetable_type = excluded.timetable_type, \
               description = excluded.description, \
               status = excluded.status, \
               events_parsed = excluded.events_parsed, \
               total_events = excluded.total_events, \
               created_at = excluded.created_at",
            params![
                source.id,
                source.academic_year,
                source.semester,
                source.display_name,
                source.timetable_type.as_str(),
                source.description,
                source.status.as_str(),
                source.events_parsed,
                source.total_events,
                source.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn find_source(&self, id: i64) -> PersistenceResult<Option<TimetableSource>> {
        let conn = self.connection.lock();
        let sql = format!("SELECT {SOURCE_COLUMNS} FROM timetable_sources WHERE id = ?1");
        let row = conn
            .query_row(&sql, params![id], SourceRow::read)
            .optional()?;
        row.map(SourceRow::into_source).transpose()
    }

    fn list_sources(&self, status: Option<SourceStatus>) -> PersistenceResult<Vec<TimetableSource>> {
        let conn = self.connection.lock();
        let sql = format!(
            "SELECT {SOURCE_COLUMNS} FROM timetable_sources \
             WHERE ?1 IS NULL OR status = ?1 ORDER BY created_at DESC, id DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![status.map(|s| s.as_str())], SourceRow::read)?;
        let mut sources = Vec::new();
        for row in rows {
            sources.push(row?.into_source()?);
        }
        // RFC 3339 strings with differing offsets do not sort lexically.
        super::sort_sources(&mut sources);
        Ok(sources)
    }

    fn set_status(&self, id: i64, status: SourceStatus) -> PersistenceResult<()> {
        let conn = self.connection.lock();
        let changed = conn.execute(
            "UPDATE timetable_sources SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            return Err(PersistenceError::SourceNotFound(id));
        }
        Ok(())
    }

    fn replace_events(&self, source_id: i64, entries: &[ScheduleEntry]) -> PersistenceResult<usize> {
        super::validate_entries(entries)?;
        let mut conn = self.connection.lock();
        if !Self::source_exists(&conn, source_id)? {
            return Err(PersistenceError::SourceNotFound(source_id));
        }
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM timetable_events WHERE source_id = ?1",
            params![source_id],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO timetable_events (source_id, day, start_time, end_time, location, \
                  course_code, normalized_code, event_type, details, lecturer) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for entry in entries {
                stmt.execute(params![
                    source_id,
                    entry.day,
                    entry.start_time.format(TIME_FORMAT).to_string(),
                    entry.end_time.format(TIME_FORMAT).to_string(),
                    entry.location,
                    entry.course_code,
                    entry.normalized_code,
                    entry.event_type.as_str(),
                    entry.details,
                    entry.lecturer,
                ])?;
            }
        }
        tx.execute(
            "UPDATE timetable_sources SET total_events = ?1, events_parsed = 1 WHERE id = ?2",
            params![entries.len() as i64, source_id],
        )?;
        tx.commit()?;
        Ok(entries.len())
    }

    fn events_for_source(&self, source_id: i64) -> PersistenceResult<Vec<ScheduleEntry>> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare(
            "SELECT day, start_time, end_time, location, course_code, normalized_code, \
              event_type, details, lecturer \
             FROM timetable_events WHERE source_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![source_id], |row| {
            Ok(EventRow {
                day: row.get(0)?,
                start_time: row.get(1)?,
                end_time: row.get(2)?,
                location: row.get(3)?,
                course_code: row.get(4)?,
                normalized_code: row.get(5)?,
                event_type: row.get(6)?,
                details: row.get(7)?,
                lecturer: row.get(8)?,
            })
        })?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_entry()?);
        }
        Ok(entries)
    }

    fn delete_source(&self, id: i64) -> PersistenceResult<bool> {
        let mut conn = self.connection.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM timetable_events WHERE source_id = ?1",
            params![id],
        )?;
        let removed = tx.execute("DELETE FROM timetable_sources WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(removed > 0)
    }
}
