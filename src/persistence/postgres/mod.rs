//! PostgreSQL store built on Diesel.
//!
//! Connections come from an r2d2 pool. Pending migrations under
//! `migrations/postgres` are applied once when the store connects, so
//! `cli migrate` is enough to prepare a fresh database.

use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use std::time::Duration;

use super::{PersistenceError, PersistenceResult, TimetableStore};
use crate::entry::ScheduleEntry;
use crate::source::{NewTimetableSource, SourceStatus, TimetableSource};

mod models;
mod schema;

use models::{EventRow, NewEventRow, NewSourceRow, SourceRecord, SourceRow};
use schema::{timetable_events, timetable_sources};

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/postgres");

/// Rows per INSERT; keeps statements well under the bind parameter limit.
const INSERT_CHUNK: usize = 1000;

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub database_url: String,
    pub max_pool_size: u32,
    pub connection_timeout_sec: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            connection_timeout_sec: 30,
        }
    }
}

impl PostgresConfig {
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

pub struct PostgresTimetableStore {
    pool: PgPool,
}

impl PostgresTimetableStore {
    /// Builds the pool and runs pending migrations.
    pub fn connect(config: &PostgresConfig) -> PersistenceResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);
        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .test_on_check_out(true)
            .build(manager)?;

        {
            let mut conn = pool.get()?;
            let applied = conn
                .run_pending_migrations(MIGRATIONS)
                .map_err(|err| PersistenceError::Migration(err.to_string()))?;
            tracing::info!(applied = applied.len(), "postgres migrations up to date");
        }

        Ok(Self { pool })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut PgConnection) -> PersistenceResult<T>,
    ) -> PersistenceResult<T> {
        let mut conn = self.pool.get()?;
        f(&mut conn)
    }
}

impl TimetableStore for PostgresTimetableStore {
    fn insert_source(&self, source: NewTimetableSource) -> PersistenceResult<TimetableSource> {
        let created_at = Utc::now();
        let id = self.with_conn(|conn| {
            let id = diesel::insert_into(timetable_sources::table)
                .values(&NewSourceRow::new(&source, created_at))
                .returning(timetable_sources::id)
                .get_result::<i64>(conn)?;
            Ok(id)
        })?;
        Ok(source.into_source(id, created_at))
    }

    fn upsert_source(&self, source: &TimetableSource) -> PersistenceResult<()> {
        let record = SourceRecord::from(source);
        self.with_conn(|conn| {
            conn.transaction::<_, PersistenceError, _>(|tx| {
                diesel::insert_into(timetable_sources::table)
                    .values(&record)
                    .on_conflict(timetable_sources::id)
                    .do_update()
                    .set(&record)
                    .execute(tx)?;
                // Explicit ids bypass the sequence; move it past them.
                sql_query(
                    "SELECT setval(pg_get_serial_sequence('timetable_sources', 'id'), \
                     (SELECT MAX(id) FROM timetable_sources))",
                )
                .execute(tx)?;
                Ok(())
            })
        })
    }

    fn find_source(&self, id: i64) -> PersistenceResult<Option<TimetableSource>> {
        let row = self.with_conn(|conn| {
            Ok(timetable_sources::table
                .find(id)
                .select(SourceRow::as_select())
                .first::<SourceRow>(conn)
                .optional()?)
        })?;
        row.map(SourceRow::into_source).transpose()
    }

    fn list_sources(&self, status: Option<SourceStatus>) -> PersistenceResult<Vec<TimetableSource>> {
        let rows = self.with_conn(|conn| {
            let mut query = timetable_sources::table
                .select(SourceRow::as_select())
                .order((
                    timetable_sources::created_at.desc(),
                    timetable_sources::id.desc(),
                ))
                .into_boxed();
            if let Some(status) = status {
                query = query.filter(timetable_sources::status.eq(status.as_str()));
            }
            Ok(query.load::<SourceRow>(conn)?)
        })?;
        rows.into_iter().map(SourceRow::into_source).collect()
    }

    fn set_status(&self, id: i64, status: SourceStatus) -> PersistenceResult<()> {
        let changed = self.with_conn(|conn| {
            Ok(diesel::update(timetable_sources::table.find(id))
                .set(timetable_sources::status.eq(status.as_str()))
                .execute(conn)?)
        })?;
        if changed == 0 {
            return Err(PersistenceError::SourceNotFound(id));
        }
        Ok(())
    }

    fn replace_events(&self, source_id: i64, entries: &[ScheduleEntry]) -> PersistenceResult<usize> {
        super::validate_entries(entries)?;
        let rows: Vec<NewEventRow<'_>> = entries
            .iter()
            .map(|entry| NewEventRow::new(source_id, entry))
            .collect();

        self.with_conn(|conn| {
            conn.transaction::<_, PersistenceError, _>(|tx| {
                let exists = timetable_sources::table
                    .find(source_id)
                    .select(timetable_sources::id)
                    .first::<i64>(tx)
                    .optional()?
                    .is_some();
                if !exists {
                    return Err(PersistenceError::SourceNotFound(source_id));
                }

                diesel::delete(
                    timetable_events::table.filter(timetable_events::source_id.eq(source_id)),
                )
                .execute(tx)?;
                for chunk in rows.chunks(INSERT_CHUNK) {
                    diesel::insert_into(timetable_events::table)
                        .values(chunk)
                        .execute(tx)?;
                }
                diesel::update(timetable_sources::table.find(source_id))
                    .set((
                        timetable_sources::total_events.eq(rows.len() as i64),
                        timetable_sources::events_parsed.eq(true),
                    ))
                    .execute(tx)?;
                Ok(rows.len())
            })
        })
    }

    fn events_for_source(&self, source_id: i64) -> PersistenceResult<Vec<ScheduleEntry>> {
        let rows = self.with_conn(|conn| {
            Ok(timetable_events::table
                .filter(timetable_events::source_id.eq(source_id))
                .order(timetable_events::id.asc())
                .select(EventRow::as_select())
                .load::<EventRow>(conn)?)
        })?;
        rows.into_iter().map(EventRow::into_entry).collect()
    }

    fn delete_source(&self, id: i64) -> PersistenceResult<bool> {
        self.with_conn(|conn| {
            conn.transaction::<_, PersistenceError, _>(|tx| {
                diesel::delete(timetable_events::table.filter(timetable_events::source_id.eq(id)))
                    .execute(tx)?;
                let removed =
                    diesel::delete(timetable_sources::table.find(id)).execute(tx)?;
                Ok(removed > 0)
            })
        })
    }
}
