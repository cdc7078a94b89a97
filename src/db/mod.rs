//! Local store adapters backed by SQLite.

mod category_repo;
mod event_repo;
mod habit_repo;
mod log_repo;
mod rule_repo;

pub use category_repo::LocalCategoryRepository;
pub use event_repo::LocalEventRepository;
pub use habit_repo::LocalHabitRepository;
pub use log_repo::LocalLogRepository;
pub use rule_repo::LocalRuleRepository;

use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::repository::{RepositoryError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Initialize the database connection pool and run migrations
pub async fn init_db(path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
        }
    }

    let db_url = format!("sqlite:{}?mode=rwc", path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .foreign_keys(true)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::debug!("Opened local store at {}", path.display());
    Ok(pool)
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| RepositoryError::SchemaMismatch(format!("invalid stored date '{}'", value)))
}
