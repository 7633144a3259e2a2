use sea_orm::DbErr;
use thiserror::Error;

use crate::config::ConfigError;

/// Failures while bringing up a [`QuillCore`](crate::QuillCore).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to load config")]
    Config(#[from] ConfigError),

    #[error("database unavailable")]
    Db(#[from] DbErr),

    #[error("telemetry: {0}")]
    Telemetry(String),
}
