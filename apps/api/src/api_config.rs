use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use contractdesk_application::{ActivityWriterConfig, RetentionSweeperConfig};
use contractdesk_core::AppError;
use contractdesk_domain::RetentionWindow;
use tracing_subscriber::EnvFilter;

const MIN_ADMIN_TOKEN_LENGTH: usize = 32;

/// Where activity events are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityLogBackend {
    /// PostgreSQL log store at the given URL.
    Postgres { database_url: String },
    /// Process-local store, lost on restart.
    Memory,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub activity_log_backend: ActivityLogBackend,
    pub admin_api_token: String,
    pub api_host: String,
    pub api_port: u16,
    pub writer: ActivityWriterConfig,
    pub writer_drain_timeout: Duration,
    pub sweeper: RetentionSweeperConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
        Self::from_lookup(migrate_only, |name| env::var(name).ok())
    }

    pub fn from_lookup<F>(migrate_only: bool, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };

        let database_url = env.required_non_empty("DATABASE_URL")?;
        let log_database_url = env
            .optional("LOG_DATABASE_URL")
            .unwrap_or_else(|| database_url.clone());

        let activity_log_backend = match env
            .optional("ACTIVITY_LOG_BACKEND")
            .unwrap_or_else(|| "postgres".to_owned())
            .as_str()
        {
            "postgres" => ActivityLogBackend::Postgres {
                database_url: log_database_url,
            },
            "memory" => ActivityLogBackend::Memory,
            other => {
                return Err(AppError::Validation(format!(
                    "ACTIVITY_LOG_BACKEND must be either 'postgres' or 'memory', got '{other}'"
                )));
            }
        };

        let admin_api_token = if migrate_only {
            env.optional("ADMIN_API_TOKEN").unwrap_or_default()
        } else {
            let token = env.required_non_empty("ADMIN_API_TOKEN")?;
            if token.len() < MIN_ADMIN_TOKEN_LENGTH {
                return Err(AppError::Validation(format!(
                    "ADMIN_API_TOKEN must be at least {MIN_ADMIN_TOKEN_LENGTH} characters"
                )));
            }
            token
        };

        let api_host = env
            .optional("API_HOST")
            .unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = env.parse_or("API_PORT", 3001_u16)?;

        let writer_defaults = ActivityWriterConfig::default();
        let writer = ActivityWriterConfig {
            queue_capacity: env.parse_or("ACTIVITY_QUEUE_CAPACITY", writer_defaults.queue_capacity)?,
            max_attempts: env.parse_or("ACTIVITY_WRITER_MAX_ATTEMPTS", writer_defaults.max_attempts)?,
            initial_backoff: Duration::from_millis(env.parse_or(
                "ACTIVITY_WRITER_BACKOFF_MS",
                duration_millis(writer_defaults.initial_backoff),
            )?),
            max_backoff: Duration::from_millis(env.parse_or(
                "ACTIVITY_WRITER_MAX_BACKOFF_MS",
                duration_millis(writer_defaults.max_backoff),
            )?),
        };
        writer.validate()?;

        let writer_drain_timeout =
            Duration::from_millis(env.parse_or("ACTIVITY_WRITER_DRAIN_TIMEOUT_MS", 5_000_u64)?);

        let sweeper_defaults = RetentionSweeperConfig::default();
        let sweeper = RetentionSweeperConfig {
            window: RetentionWindow::from_days(
                env.parse_or("RETENTION_DAYS", sweeper_defaults.window.days())?,
            )?,
            field_history_window: RetentionWindow::from_days(env.parse_or(
                "FIELD_HISTORY_RETENTION_DAYS",
                sweeper_defaults.field_history_window.days(),
            )?)?,
            interval: Duration::from_secs(env.parse_or(
                "RETENTION_SWEEP_INTERVAL_SECONDS",
                sweeper_defaults.interval.as_secs(),
            )?),
            batch_size: env.parse_or("RETENTION_SWEEP_BATCH_SIZE", sweeper_defaults.batch_size)?,
            run_on_start: env.flag("RETENTION_SWEEP_ON_START", sweeper_defaults.run_on_start),
        };
        sweeper.validate()?;

        Ok(Self {
            migrate_only,
            database_url,
            activity_log_backend,
            admin_api_token,
            api_host,
            api_port,
            writer,
            writer_drain_timeout,
            sweeper,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Validation(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|value| !value.trim().is_empty())
    }

    fn required_non_empty(&self, name: &str) -> Result<String, AppError> {
        self.optional(name)
            .ok_or_else(|| AppError::Validation(format!("{name} is required")))
    }

    fn parse_or<T>(&self, name: &str, default: T) -> Result<T, AppError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            Some(value) => value
                .trim()
                .parse::<T>()
                .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
            None => Ok(default),
        }
    }

    fn flag(&self, name: &str, default: bool) -> bool {
        self.optional(name)
            .map(|value| value.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(default)
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
