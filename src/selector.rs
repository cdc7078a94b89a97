//! Chooses, per entity family, the adapter that backs each repository contract.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::config::{Config, ConfigError};
use crate::db::{
    init_db, LocalCategoryRepository, LocalEventRepository, LocalHabitRepository,
    LocalLogRepository, LocalRuleRepository,
};
use crate::remote::{
    HttpTransport, RemoteCategoryRepository, RemoteClient, RemoteEventRepository,
    RemoteHabitRepository, RemoteLogRepository, RemoteRuleRepository,
};
use crate::repository::{
    CategoryRepository, EventRepository, HabitRepository, LogRepository, RepositoryError,
    RuleRepository,
};

/// Entity family names, as used in config keys and env vars.
pub const FAMILIES: [&str; 5] = ["habits", "events", "categories", "rules", "logs"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Local,
    Remote,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Local => write!(f, "local"),
            Backend::Remote => write!(f, "remote"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Backend::Local),
            "remote" => Ok(Backend::Remote),
            _ => Err(format!(
                "Invalid backend '{}'. Valid options: local, remote",
                s
            )),
        }
    }
}

/// The backend chosen for each entity family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BackendSelection {
    pub habits: Backend,
    pub events: Backend,
    pub categories: Backend,
    pub rules: Backend,
    pub logs: Backend,
}

impl BackendSelection {
    /// Every family on the same backend.
    pub fn all(backend: Backend) -> Self {
        Self {
            habits: backend,
            events: backend,
            categories: backend,
            rules: backend,
            logs: backend,
        }
    }

    fn slot(&mut self, family: &str) -> Option<&mut Backend> {
        match family {
            "habits" => Some(&mut self.habits),
            "events" => Some(&mut self.events),
            "categories" => Some(&mut self.categories),
            "rules" => Some(&mut self.rules),
            "logs" => Some(&mut self.logs),
            _ => None,
        }
    }

    /// Sets the backend of `family`; unknown family names are ignored.
    pub fn set(&mut self, family: &str, backend: Backend) {
        if let Some(slot) = self.slot(family) {
            *slot = backend;
        }
    }

    fn entries(&self) -> [(&'static str, Backend); 5] {
        [
            ("habits", self.habits),
            ("events", self.events),
            ("categories", self.categories),
            ("rules", self.rules),
            ("logs", self.logs),
        ]
    }

    pub fn first_remote(&self) -> Option<&'static str> {
        self.entries()
            .into_iter()
            .find(|(_, b)| *b == Backend::Remote)
            .map(|(family, _)| family)
    }

    fn first_local(&self) -> Option<&'static str> {
        self.entries()
            .into_iter()
            .find(|(_, b)| *b == Backend::Local)
            .map(|(family, _)| family)
    }
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Backend for {0} is local but no database was opened")]
    MissingDatabase(&'static str),
}

/// The active adapter of every repository contract.
///
/// Adapters are chosen once at construction; consumers only see the contracts.
#[derive(Clone)]
pub struct Repositories {
    habits: Arc<dyn HabitRepository>,
    events: Arc<dyn EventRepository>,
    categories: Arc<dyn CategoryRepository>,
    rules: Arc<dyn RuleRepository>,
    logs: Arc<dyn LogRepository>,
}

static REPOSITORIES: OnceCell<Repositories> = OnceCell::const_new();

fn pick<T: ?Sized>(
    family: &'static str,
    backend: Backend,
    pool: &Option<SqlitePool>,
    remote: &Option<RemoteClient>,
    local: impl FnOnce(SqlitePool) -> Arc<T>,
    remote_adapter: impl FnOnce(RemoteClient) -> Arc<T>,
) -> Result<Arc<T>, SetupError> {
    tracing::info!("Using {} store for {}", backend, family);
    match backend {
        Backend::Local => pool
            .clone()
            .map(local)
            .ok_or(SetupError::MissingDatabase(family)),
        Backend::Remote => remote
            .clone()
            .map(remote_adapter)
            .ok_or(SetupError::Config(ConfigError::RemoteNotConfigured(family))),
    }
}

impl Repositories {
    /// Builds one adapter per family from an already opened pool and client.
    pub fn build(
        selection: BackendSelection,
        pool: Option<SqlitePool>,
        remote: Option<RemoteClient>,
    ) -> Result<Self, SetupError> {
        Ok(Self {
            habits: pick(
                "habits",
                selection.habits,
                &pool,
                &remote,
                |p| Arc::new(LocalHabitRepository::new(p)) as Arc<dyn HabitRepository>,
                |c| Arc::new(RemoteHabitRepository::new(c)) as Arc<dyn HabitRepository>,
            )?,
            events: pick(
                "events",
                selection.events,
                &pool,
                &remote,
                |p| Arc::new(LocalEventRepository::new(p)) as Arc<dyn EventRepository>,
                |c| Arc::new(RemoteEventRepository::new(c)) as Arc<dyn EventRepository>,
            )?,
            categories: pick(
                "categories",
                selection.categories,
                &pool,
                &remote,
                |p| Arc::new(LocalCategoryRepository::new(p)) as Arc<dyn CategoryRepository>,
                |c| Arc::new(RemoteCategoryRepository::new(c)) as Arc<dyn CategoryRepository>,
            )?,
            rules: pick(
                "rules",
                selection.rules,
                &pool,
                &remote,
                |p| Arc::new(LocalRuleRepository::new(p)) as Arc<dyn RuleRepository>,
                |c| Arc::new(RemoteRuleRepository::new(c)) as Arc<dyn RuleRepository>,
            )?,
            logs: pick(
                "logs",
                selection.logs,
                &pool,
                &remote,
                |p| Arc::new(LocalLogRepository::new(p)) as Arc<dyn LogRepository>,
                |c| Arc::new(RemoteLogRepository::new(c)) as Arc<dyn LogRepository>,
            )?,
        })
    }

    /// Opens only what the selection needs: the database if any family is
    /// local, the HTTP transport if any family is remote.
    pub async fn from_config(config: &Config) -> Result<Self, SetupError> {
        let selection = config.backends;

        let pool = match selection.first_local() {
            Some(_) => Some(init_db(&config.database_path.value).await?),
            None => None,
        };

        let remote = match selection.first_remote() {
            Some(family) => {
                let (Some(base_url), Some(user)) = (&config.remote.base_url, &config.remote.user)
                else {
                    return Err(ConfigError::RemoteNotConfigured(family).into());
                };
                let transport = Arc::new(HttpTransport::new(base_url.clone()));
                Some(RemoteClient::new(transport, user.clone()))
            }
            None => None,
        };

        Self::build(selection, pool, remote)
    }

    /// Process-wide repositories, built on first use from `config`.
    ///
    /// Later calls return the same adapters whatever config they pass.
    pub async fn global(config: &Config) -> Result<&'static Repositories, SetupError> {
        REPOSITORIES
            .get_or_try_init(|| Self::from_config(config))
            .await
    }

    pub fn habits(&self) -> Arc<dyn HabitRepository> {
        self.habits.clone()
    }

    pub fn events(&self) -> Arc<dyn EventRepository> {
        self.events.clone()
    }

    pub fn categories(&self) -> Arc<dyn CategoryRepository> {
        self.categories.clone()
    }

    pub fn rules(&self) -> Arc<dyn RuleRepository> {
        self.rules.clone()
    }

    pub fn logs(&self) -> Arc<dyn LogRepository> {
        self.logs.clone()
    }
}
