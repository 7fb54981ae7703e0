use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use drawing::config::{FileSettingsStore, Settings, SettingsStore, APP_ID};
use drawing::tools::ToolOperation;
use drawing::CanvasSource;

#[derive(Parser)]
#[command(name = "drawing")]
#[command(version)]
#[command(about = "Open or create a raster image, replay edit operations, and save it")]
#[command(long_about = None)]
struct Cli {
    /// Image to open (PNG, JPEG or BMP); a blank canvas is used when omitted
    #[arg(value_name = "INPUT", conflicts_with = "new")]
    input: Option<PathBuf>,

    /// Size of the blank canvas, e.g. 640x480
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    new: Option<(u32, u32)>,

    /// JSON file holding a list of operations to replay
    #[arg(short, long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Where to write the result; the extension picks the format
    #[arg(short, long, value_name = "OUTPUT")]
    output: PathBuf,

    /// Settings file to use instead of the per-user one
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,
}

fn parse_size(value: &str) -> std::result::Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value:?}"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|err| format!("invalid dimension {part:?}: {err}"))
    };
    Ok((parse(width)?, parse(height)?))
}

fn load_settings(path: Option<PathBuf>) -> Settings {
    let store = match path {
        Some(path) => FileSettingsStore::new(path),
        None => match FileSettingsStore::from_env(APP_ID) {
            Ok(store) => store,
            Err(err) => {
                tracing::warn!(%err, "cannot locate settings; using defaults");
                return Settings::default();
            }
        },
    };
    store.load()
}

fn load_script(path: Option<&PathBuf>) -> Result<Vec<ToolOperation>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse script {}", path.display()))
}

fn main() -> Result<()> {
    drawing::logging::init();
    let cli = Cli::parse();

    let settings = load_settings(cli.settings);
    let operations = load_script(cli.script.as_ref())?;
    let source = match (cli.input, cli.new) {
        (Some(path), _) => CanvasSource::Open(path),
        (None, Some((width, height))) => CanvasSource::Blank {
            width: Some(width),
            height: Some(height),
        },
        (None, None) => CanvasSource::Blank {
            width: None,
            height: None,
        },
    };

    drawing::run(&source, &operations, &cli.output, &settings)
        .with_context(|| format!("failed to produce {}", cli.output.display()))?;
    Ok(())
}
