//! Runtime configuration read from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `TIMELI_HTTP_ADDR` | `0.0.0.0:3000` |
//! | `DATABASE_URL` | `db.sqlite3` (a `postgres://` url selects PostgreSQL) |
//! | `TIMELI_TEMPLATE_DIR` | embedded templates |
//! | `TIMELI_WKHTMLTOPDF` | `wkhtmltopdf` |
//! | `TIMELI_WKHTMLTOIMAGE` | `wkhtmltoimage` |

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

use crate::render::{RenderConfig, WkhtmlConverter};

pub const HTTP_ADDR_VAR: &str = "TIMELI_HTTP_ADDR";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const TEMPLATE_DIR_VAR: &str = "TIMELI_TEMPLATE_DIR";
pub const WKHTMLTOPDF_VAR: &str = "TIMELI_WKHTMLTOPDF";
pub const WKHTMLTOIMAGE_VAR: &str = "TIMELI_WKHTMLTOIMAGE";

pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_DATABASE: &str = "db.sqlite3";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {var} '{value}': {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("unsupported database url '{0}': expected a sqlite path or a postgres url")]
    UnsupportedDatabase(String),
}

/// Where timetable data lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    Sqlite(PathBuf),
    /// Full connection string, credentials included.
    Postgres(String),
}

impl DatabaseTarget {
    pub fn backend(&self) -> &'static str {
        match self {
            DatabaseTarget::Sqlite(_) => "sqlite",
            DatabaseTarget::Postgres(_) => "postgres",
        }
    }
}

/// Prints the SQLite path, or the postgres url with its password masked.
impl fmt::Display for DatabaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseTarget::Sqlite(path) => write!(f, "{}", path.display()),
            DatabaseTarget::Postgres(url) => f.write_str(&redact_password(url)),
        }
    }
}

fn redact_password(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    let Some(at) = rest[..authority_end].rfind('@') else {
        return url.to_string();
    };
    match rest[..at].split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***{}", &rest[at..]),
        None => url.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub database: DatabaseTarget,
    pub template_dir: Option<PathBuf>,
    pub wkhtmltopdf: PathBuf,
    pub wkhtmltoimage: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let addr = get(HTTP_ADDR_VAR).unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());
        let http_addr = addr
            .trim()
            .parse::<SocketAddr>()
            .map_err(|err| ConfigError::InvalidValue {
                var: HTTP_ADDR_VAR,
                value: addr.clone(),
                reason: err.to_string(),
            })?;

        let database = match get(DATABASE_URL_VAR) {
            Some(url) => parse_database_url(&url)?,
            None => DatabaseTarget::Sqlite(PathBuf::from(DEFAULT_DATABASE)),
        };

        Ok(Self {
            http_addr,
            database,
            template_dir: get(TEMPLATE_DIR_VAR).map(PathBuf::from),
            wkhtmltopdf: get(WKHTMLTOPDF_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("wkhtmltopdf")),
            wkhtmltoimage: get(WKHTMLTOIMAGE_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("wkhtmltoimage")),
        })
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            template_dir: self.template_dir.clone(),
        }
    }

    pub fn converter(&self) -> WkhtmlConverter {
        WkhtmlConverter::new(&self.wkhtmltopdf, &self.wkhtmltoimage)
    }
}

/// Accepts `postgres://` or `postgresql://` urls, and `sqlite://path`,
/// `sqlite:path`, `file:path` or a bare path for SQLite.
pub fn parse_database_url(url: &str) -> Result<DatabaseTarget, ConfigError> {
    let url = url.trim();
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        return Ok(DatabaseTarget::Postgres(url.to_string()));
    }
    let path = ["sqlite://", "sqlite:", "file:"]
        .iter()
        .find_map(|prefix| url.strip_prefix(prefix));
    let path = match path {
        Some(path) => path,
        None if url.contains("://") => {
            return Err(ConfigError::UnsupportedDatabase(url.to_string()));
        }
        None => url,
    };
    // Query parameters such as `?mode=rwc` are not forwarded to SQLite.
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() {
        return Err(ConfigError::InvalidValue {
            var: DATABASE_URL_VAR,
            value: url.to_string(),
            reason: "missing database path".to_string(),
        });
    }
    Ok(DatabaseTarget::Sqlite(PathBuf::from(path)))
}
