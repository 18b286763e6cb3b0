//! Opens the store named by a [`DatabaseTarget`].

use std::sync::Arc;

use super::{PersistenceResult, TimetableStore};
use crate::config::DatabaseTarget;

/// Backends left out of the build yield [`super::PersistenceError::BackendDisabled`].
pub fn open_store(target: &DatabaseTarget) -> PersistenceResult<Arc<dyn TimetableStore>> {
    tracing::debug!(backend = target.backend(), database = %target, "opening timetable store");
    match target {
        DatabaseTarget::Sqlite(path) => {
            #[cfg(feature = "sqlite")]
            {
                let store = super::sqlite::SqliteTimetableStore::new(path)?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "sqlite"))]
            {
                let _ = path;
                Err(super::PersistenceError::BackendDisabled("sqlite"))
            }
        }
        DatabaseTarget::Postgres(url) => {
            #[cfg(feature = "postgres")]
            {
                let config = super::postgres::PostgresConfig::with_url(url.as_str());
                let store = super::postgres::PostgresTimetableStore::connect(&config)?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "postgres"))]
            {
                let _ = url;
                Err(super::PersistenceError::BackendDisabled("postgres"))
            }
        }
    }
}
