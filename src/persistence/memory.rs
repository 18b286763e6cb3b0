use super::{PersistenceError, PersistenceResult, TimetableStore};
use crate::entry::ScheduleEntry;
use crate::source::{NewTimetableSource, SourceStatus, TimetableSource};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Default)]
struct Tables {
    sources: BTreeMap<i64, TimetableSource>,
    events: BTreeMap<i64, Vec<ScheduleEntry>>,
}

/// Process-local store for tests and embedding without a database.
#[derive(Default)]
pub struct MemoryTimetableStore {
    tables: RwLock<Tables>,
}

impl MemoryTimetableStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimetableStore for MemoryTimetableStore {
    fn insert_source(&self, source: NewTimetableSource) -> PersistenceResult<TimetableSource> {
        let mut tables = self.tables.write();
        let id = tables.sources.keys().next_back().copied().unwrap_or(0) + 1;
        let stored = source.into_source(id, Utc::now());
        tables.sources.insert(id, stored.clone());
        Ok(stored)
    }

    fn upsert_source(&self, source: &TimetableSource) -> PersistenceResult<()> {
        self.tables
            .write()
            .sources
            .insert(source.id, source.clone());
        Ok(())
    }

    fn find_source(&self, id: i64) -> PersistenceResult<Option<TimetableSource>> {
        Ok(self.tables.read().sources.get(&id).cloned())
    }

    fn list_sources(&self, status: Option<SourceStatus>) -> PersistenceResult<Vec<TimetableSource>> {
        let mut sources: Vec<TimetableSource> = self
            .tables
            .read()
            .sources
            .values()
            .filter(|source| status.is_none_or(|wanted| source.status == wanted))
            .cloned()
            .collect();
        super::sort_sources(&mut sources);
        Ok(sources)
    }

    fn set_status(&self, id: i64, status: SourceStatus) -> PersistenceResult<()> {
        let mut tables = self.tables.write();
        let source = tables
            .sources
            .get_mut(&id)
            .ok_or(PersistenceError::SourceNotFound(id))?;
        source.status = status;
        Ok(())
    }

    fn replace_events(&self, source_id: i64, entries: &[ScheduleEntry]) -> PersistenceResult<usize> {
        super::validate_entries(entries)?;
        let mut tables = self.tables.write();
        let source = tables
            .sources
            .get_mut(&source_id)
            .ok_or(PersistenceError::SourceNotFound(source_id))?;
        source.total_events = entries.len() as i64;
        source.events_parsed = true;
        tables.events.insert(source_id, entries.to_vec());
        Ok(entries.len())
    }

    fn events_for_source(&self, source_id: i64) -> PersistenceResult<Vec<ScheduleEntry>> {
        Ok(self
            .tables
            .read()
            .events
            .get(&source_id)
            .cloned()
            .unwrap_or_default())
    }

    fn delete_source(&self, id: i64) -> PersistenceResult<bool> {
        let mut tables = self.tables.write();
        tables.events.remove(&id);
        Ok(tables.sources.remove(&id).is_some())
    }
}
