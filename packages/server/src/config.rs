use common::worker::JOB_TIMEOUT_SECS;
use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, ConfigError};
use queue::QueueConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub sslmode: String,
    /// Pool ceiling. Verdict ingestion, timers, and the facade share it.
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Render the connection URL understood by the database driver.
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.user, self.password, self.host, self.port, self.name, self.sslmode
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Port the JSON facade listens on.
    pub http_port: u16,
    /// Reserved for an RPC gateway in front of the facade.
    pub grpc_port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContestConfig {
    /// Admission bound on simultaneously active contests.
    pub max_concurrent_contests: usize,
    /// Duration of newly created contests, in seconds.
    pub duration_seconds: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JudgingConfig {
    /// Leased jobs without a result after this long are reaped as
    /// judgement failures.
    pub job_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

impl LoggingConfig {
    /// SQL statement logging follows the verbose levels only; judging load
    /// at `info` would drown the contest logs in queries.
    pub fn sql_logging(&self) -> bool {
        matches!(self.level.as_str(), "debug" | "trace")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
    pub server: ServerConfig,
    pub contest: ContestConfig,
    pub judging: JudgingConfig,
    pub logging: LoggingConfig,
}

/// Recognized environment variables, mapped onto config keys. The names are
/// flat (shared with the other deployable pieces of the platform), so each
/// is applied as an explicit override rather than a prefixed source.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_USER", "database.user"),
    ("DB_PASSWORD", "database.password"),
    ("DB_NAME", "database.name"),
    ("DB_SSLMODE", "database.sslmode"),
    ("REDIS_ADDR", "queue.addr"),
    ("REDIS_PASSWORD", "queue.password"),
    ("REDIS_DB", "queue.db"),
    ("GRPC_PORT", "server.grpc_port"),
    ("HTTP_PORT", "server.http_port"),
    ("MAX_CONCURRENT_CONTESTS", "contest.max_concurrent_contests"),
    ("CONTEST_DURATION_SECONDS", "contest.duration_seconds"),
    ("WORKER_JOB_TIMEOUT", "judging.job_timeout_seconds"),
    ("LOG_LEVEL", "logging.level"),
];

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("database.host", "localhost")?
            .set_default("database.port", 5432_i64)?
            .set_default("database.user", "contestmanager")?
            .set_default("database.password", "")?
            .set_default("database.name", "contestmanager")?
            .set_default("database.sslmode", "disable")?
            .set_default("database.max_connections", 20_i64)?
            .set_default("database.min_connections", 2_i64)?
            .set_default("database.connect_timeout_secs", 10_i64)?
            .set_default("database.idle_timeout_secs", 300_i64)?
            .set_default("queue.addr", "localhost:6379")?
            .set_default("queue.password", "")?
            .set_default("queue.db", 0_i64)?
            .set_default("server.http_port", 8080_i64)?
            .set_default("server.grpc_port", 50051_i64)?
            .set_default("contest.max_concurrent_contests", 3_i64)?
            .set_default("contest.duration_seconds", 300_i64)?
            .set_default("judging.job_timeout_seconds", JOB_TIMEOUT_SECS)?
            .set_default("logging.level", "info")?;

        builder = apply_env_overrides(builder)?;
        builder.build()?.try_deserialize()
    }
}

fn apply_env_overrides(
    mut builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    for (var, key) in ENV_OVERRIDES {
        if let Ok(value) = std::env::var(var) {
            builder = builder.set_override(*key, value)?;
        }
    }
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_url() {
        let db = DatabaseConfig {
            host: "db.internal".into(),
            port: 5433,
            user: "judge".into(),
            password: "pw".into(),
            name: "contests".into(),
            sslmode: "require".into(),
            max_connections: 20,
            min_connections: 2,
            connect_timeout_secs: 10,
            idle_timeout_secs: 300,
        };
        assert_eq!(
            db.url(),
            "postgres://judge:pw@db.internal:5433/contests?sslmode=require"
        );
    }

    #[test]
    fn test_sql_logging_follows_verbose_levels() {
        let logging = |level: &str| LoggingConfig {
            level: level.into(),
        };
        assert!(!logging("info").sql_logging());
        assert!(!logging("warn").sql_logging());
        assert!(logging("debug").sql_logging());
        assert!(logging("trace").sql_logging());
    }
}
