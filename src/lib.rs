//! Raster canvas editing core: pixel surfaces, tools, selections and a
//! bounded undo history, driven through an [`session::EditSession`].

pub mod config;
pub mod error;
pub mod geometry;
pub mod history;
pub mod logging;
pub mod selection;
pub mod session;
pub mod state;
pub mod storage;
pub mod surface;
pub mod tools;

use std::path::{Path, PathBuf};

use config::Settings;
use storage::{load_surface, save_surface, SaveOptions};
use surface::PixelSurface;
use tools::ToolOperation;

pub use error::{AppError, AppResult};
pub use session::EditSession;

/// Where an edit job gets its starting pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanvasSource {
    Open(PathBuf),
    /// Blank canvas; missing dimensions come from the settings.
    Blank {
        width: Option<u32>,
        height: Option<u32>,
    },
}

/// Entrypoint used by the command line: opens or creates a canvas, replays
/// `operations`, and writes the result to `output`.
pub fn run(
    source: &CanvasSource,
    operations: &[ToolOperation],
    output: &Path,
    settings: &Settings,
) -> AppResult<EditSession> {
    let mut session = match source {
        CanvasSource::Open(path) => {
            let surface = load_surface(path)?;
            let mut session = EditSession::from_surface(surface, settings.history_limits());
            session.set_disabled_tools(settings.disabled_tools.clone())?;
            session
        }
        CanvasSource::Blank { width, height } => {
            let surface = PixelSurface::new(
                width.unwrap_or(settings.default_width),
                height.unwrap_or(settings.default_height),
                settings.default_rgba,
            )?;
            let mut session = EditSession::from_surface(surface, settings.history_limits());
            session.set_disabled_tools(settings.disabled_tools.clone())?;
            session
        }
    };
    tracing::info!(
        width = session.surface().width(),
        height = session.surface().height(),
        operations = operations.len(),
        "starting edit"
    );

    let changed = session.apply_script(operations)?;
    session.apply_selection()?;
    let kind = save_surface(session.surface(), output, &SaveOptions::from_settings(settings))?;
    session.mark_saved();

    tracing::info!(changed, ?kind, ?output, "saved result");
    Ok(session)
}
