use crate::entry::ScheduleEntry;
use crate::entry_validation;
use crate::source::{NewTimetableSource, SourceStatus, TimetableSource};
use serde_json::Error as SerdeJsonError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] SerdeJsonError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[cfg(feature = "postgres")]
    #[error("postgres error: {0}")]
    Postgres(#[from] diesel::result::Error),
    #[cfg(feature = "postgres")]
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("migration failed: {0}")]
    Migration(String),
    #[error("the {0} storage backend is not compiled in; rebuild with `--features {0}`")]
    BackendDisabled(&'static str),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("timetable source {0} not found")]
    SourceNotFound(i64),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Storage for timetable sources and their events.
///
/// Implementations are shared across request handlers, hence `Send + Sync`.
pub trait TimetableStore: Send + Sync {
    fn insert_source(&self, source: NewTimetableSource) -> PersistenceResult<TimetableSource>;

    /// Insert or overwrite a source under its own id. Used by fixture loading.
    fn upsert_source(&self, source: &TimetableSource) -> PersistenceResult<()>;

    fn find_source(&self, id: i64) -> PersistenceResult<Option<TimetableSource>>;

    /// Newest first. `None` lists every status.
    fn list_sources(&self, status: Option<SourceStatus>) -> PersistenceResult<Vec<TimetableSource>>;

    fn set_status(&self, id: i64, status: SourceStatus) -> PersistenceResult<()>;

    /// Replace all events of a source; updates `total_events` and `events_parsed`.
    fn replace_events(&self, source_id: i64, entries: &[ScheduleEntry]) -> PersistenceResult<usize>;

    fn events_for_source(&self, source_id: i64) -> PersistenceResult<Vec<ScheduleEntry>>;

    /// Removes the source and its events. Returns false when nothing was stored.
    fn delete_source(&self, id: i64) -> PersistenceResult<bool>;
}

pub fn validate_entries(entries: &[ScheduleEntry]) -> PersistenceResult<()> {
    entry_validation::validate_entry_collection(entries)
        .map_err(|err| PersistenceError::InvalidData(err.to_string()))
}

/// Newest first, ties broken by the higher id.
pub(crate) fn sort_sources(sources: &mut [TimetableSource]) {
    sources.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

pub mod factory;
pub mod fixture;
pub mod import;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use factory::open_store;

pub use fixture::{FixtureSummary, load_fixture, load_fixture_file};
pub use import::{
    ImportOutcome, ingest_timetable_file, load_timetable_file, parse_exam_timetable,
    parse_teaching_csv, parse_teaching_timetable,
};
pub use memory::MemoryTimetableStore;
