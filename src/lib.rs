pub mod config;
pub mod db;
pub mod dispatch;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod matching;
pub mod middleware;
pub mod notify;
pub mod queries;
pub mod routes;
pub mod store;
pub mod utils;

use sea_orm::DatabaseConnection;

pub use config::Config;
pub use error::{AppError, AppResult};

use notify::Notifier;

/// Shared application state, passed to handlers as `Arc<AppState>` so the
/// database handle is shared rather than cloned.
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    pub notifier: Notifier,
}
