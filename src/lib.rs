pub mod config;
pub mod context;
pub mod course_code;
pub mod entry;
pub mod entry_validation;
pub mod logging;
pub mod palette;
pub mod persistence;
pub mod registry;
pub mod render;
pub mod source;

#[cfg(feature = "http_api")]
pub mod http_api;

pub use config::{AppConfig, ConfigError, DatabaseTarget};
pub use context::{EntryView, RenderContext, SourceInfo, build_context, select_entries};
pub use course_code::{normalize_course_code, parse_course_codes};
pub use entry::{EventType, ScheduleEntry};
pub use entry_validation::EntryValidationError;
pub use palette::{ColorScheme, ColorStrategy, Theme};
pub use persistence::{
    MemoryTimetableStore, PersistenceError, PersistenceResult, TimetableStore,
    ingest_timetable_file, load_fixture_file, open_store,
};
#[cfg(feature = "postgres")]
pub use persistence::postgres::{PostgresConfig, PostgresTimetableStore};
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteTimetableStore;
pub use registry::{RegistryError, TemplateDescriptor, TemplateKind, TemplateRegistry};
pub use render::{
    DocumentConverter, DocumentFormat, RenderConfig, RenderError, RenderedDocument,
    TimetableRenderer, WkhtmlConverter,
};
pub use source::{NewTimetableSource, SourceStatus, TimetableSource, TimetableType};
