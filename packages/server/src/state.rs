use std::sync::Arc;

use queue::ExecutionQueue;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::coordinator::ContestCoordinator;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub queue: Arc<ExecutionQueue>,
    pub coordinator: Arc<ContestCoordinator>,
}
