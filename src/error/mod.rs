use crate::config::ConfigError;
use crate::session::SessionError;
use crate::state::StateError;
use crate::storage::StorageError;
use crate::surface::SurfaceError;
use crate::tools::ToolError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
