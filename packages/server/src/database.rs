use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

use crate::config::{DatabaseConfig, LoggingConfig};

/// Connect to the contest database, sizing the pool from configuration, and
/// sync the entity schema.
pub async fn init_db(
    config: &DatabaseConfig,
    logging: &LoggingConfig,
) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.url());

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(logging.sql_logging());

    let db = Database::connect(opt).await?;
    db.get_schema_registry("server::entity::*")
        .sync(&db)
        .await?;

    Ok(db)
}
