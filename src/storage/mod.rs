use std::fs;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, RgbaImage};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::{ReplaceAlpha, Settings};
use crate::geometry::Color;
use crate::surface::{BlendOperator, PixelSurface, SurfaceError};

const CHECKBOARD_CELL: u32 = 16;
const CHECKBOARD_LIGHT: Color = Color::rgb(153, 153, 153);
const CHECKBOARD_DARK: Color = Color::rgb(102, 102, 102);

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("unsupported image format for {path}")]
    UnsupportedFormat { path: PathBuf },
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("image codec error: {0}")]
    Codec(#[from] image::ImageError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Interchange formats, resolved from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormatKind {
    /// Lossless, keeps transparency.
    Png,
    /// Lossy, no transparency.
    Jpeg,
    /// Uncompressed, no transparency.
    Bmp,
}

impl ImageFormatKind {
    pub fn from_path(path: &Path) -> StorageResult<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("png") => Ok(Self::Png),
            Some("jpg" | "jpeg") => Ok(Self::Jpeg),
            Some("bmp") => Ok(Self::Bmp),
            _ => Err(StorageError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    pub const fn supports_alpha(self) -> bool {
        matches!(self, Self::Png)
    }

    const fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Bmp => ImageFormat::Bmp,
        }
    }
}

/// How pixels are written to formats without an alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    pub replace_alpha: ReplaceAlpha,
    /// Used by [`ReplaceAlpha::Initial`].
    pub background: Color,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl SaveOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            replace_alpha: settings.replace_alpha,
            background: settings.default_rgba,
        }
    }
}

pub fn load_surface(path: &Path) -> StorageResult<PixelSurface> {
    let kind = ImageFormatKind::from_path(path)?;
    let bytes = fs::read(path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = image::load_from_memory_with_format(&bytes, kind.image_format())?;
    let surface = PixelSurface::from_image(decoded.to_rgba8())?;
    tracing::debug!(
        ?path,
        ?kind,
        width = surface.width(),
        height = surface.height(),
        "loaded image"
    );
    Ok(surface)
}

pub fn save_surface(
    surface: &PixelSurface,
    path: &Path,
    options: &SaveOptions,
) -> StorageResult<ImageFormatKind> {
    let kind = ImageFormatKind::from_path(path)?;
    let encoded = if kind.supports_alpha() {
        DynamicImage::ImageRgba8(surface.as_image().clone())
    } else {
        DynamicImage::ImageRgb8(flatten_alpha(
            surface.as_image(),
            options.replace_alpha,
            options.background,
        ))
    };
    let io_error = |source: io::Error| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };
    // Staged next to the target and renamed over it; a failed save leaves the
    // target untouched.
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let staged = NamedTempFile::new_in(dir).map_err(io_error)?;
    let mut writer = BufWriter::new(staged);
    encoded.write_to(&mut writer, kind.image_format())?;
    let staged = writer
        .into_inner()
        .map_err(|err| io_error(err.into_error()))?;
    staged.persist(path).map_err(|err| io_error(err.error))?;
    tracing::debug!(?path, ?kind, "saved image");
    Ok(kind)
}

/// Drops the alpha channel, compositing over the background chosen by
/// `policy` first.
pub fn flatten_alpha(image: &RgbaImage, policy: ReplaceAlpha, background: Color) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let pixel = Color::from_rgba(*image.get_pixel(x, y));
        let under = match policy {
            ReplaceAlpha::Nothing => return Rgb([pixel.r, pixel.g, pixel.b]),
            ReplaceAlpha::Initial => background.with_alpha(255),
            ReplaceAlpha::White => Color::WHITE,
            ReplaceAlpha::Black => Color::BLACK,
            ReplaceAlpha::Checkboard => checkboard_at(x, y),
        };
        let out = BlendOperator::Over.composite(under, pixel);
        Rgb([out.r, out.g, out.b])
    })
}

fn checkboard_at(x: u32, y: u32) -> Color {
    if (x / CHECKBOARD_CELL + y / CHECKBOARD_CELL) % 2 == 0 {
        CHECKBOARD_LIGHT
    } else {
        CHECKBOARD_DARK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn half_transparent() -> PixelSurface {
        let mut surface = PixelSurface::new(32, 32, Color::TRANSPARENT).expect("surface");
        for y in 0..32 {
            for x in 16..32 {
                surface.put_pixel(x, y, Color::rgb(200, 10, 10));
            }
        }
        surface
    }

    #[test]
    fn format_is_resolved_from_extension_case_insensitively() {
        assert_eq!(
            ImageFormatKind::from_path(Path::new("a/b.PNG")).expect("png"),
            ImageFormatKind::Png
        );
        assert_eq!(
            ImageFormatKind::from_path(Path::new("photo.jpeg")).expect("jpeg"),
            ImageFormatKind::Jpeg
        );
        assert!(matches!(
            ImageFormatKind::from_path(Path::new("drawing.webp")),
            Err(StorageError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            ImageFormatKind::from_path(Path::new("no-extension")),
            Err(StorageError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn png_round_trip_keeps_alpha() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("image.png");
        let surface = half_transparent();

        let kind = save_surface(&surface, &path, &SaveOptions::default()).expect("save");
        assert_eq!(kind, ImageFormatKind::Png);
        assert_eq!(load_surface(&path).expect("load"), surface);
    }

    #[test]
    fn bmp_export_flattens_alpha_per_policy() {
        let dir = tempfile::tempdir().expect("tempdir");
        let surface = half_transparent();
        let cases = [
            (ReplaceAlpha::White, Color::WHITE),
            (ReplaceAlpha::Black, Color::BLACK),
            (ReplaceAlpha::Initial, Color::rgb(1, 2, 3)),
            (ReplaceAlpha::Nothing, Color::BLACK),
        ];
        for (policy, expected) in cases {
            let path = dir.path().join(format!("{policy:?}.bmp"));
            let options = SaveOptions {
                replace_alpha: policy,
                background: Color::rgba(1, 2, 3, 50),
            };
            save_surface(&surface, &path, &options).expect("save");
            let loaded = load_surface(&path).expect("load");
            assert_eq!(loaded.pixel(0, 0), Some(expected), "{policy:?}");
            assert_eq!(loaded.pixel(20, 0), Some(Color::rgb(200, 10, 10)), "{policy:?}");
        }
    }

    #[test]
    fn checkboard_alternates_cells() {
        let image = RgbaImage::new(40, 40);
        let flat = flatten_alpha(&image, ReplaceAlpha::Checkboard, Color::WHITE);
        assert_eq!(flat.get_pixel(0, 0), &Rgb([153, 153, 153]));
        assert_eq!(flat.get_pixel(16, 0), &Rgb([102, 102, 102]));
        assert_eq!(flat.get_pixel(16, 16), &Rgb([153, 153, 153]));
    }

    #[test]
    fn jpeg_export_is_opaque() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("image.jpg");
        save_surface(&half_transparent(), &path, &SaveOptions::default()).expect("save");
        let loaded = load_surface(&path).expect("load");
        assert!(loaded
            .as_image()
            .pixels()
            .all(|pixel| pixel[3] == 255));
        let corner = loaded.pixel(0, 0).expect("pixel");
        assert!(corner.distance(Color::WHITE) <= 8, "{corner:?}");
    }

    #[test]
    fn saving_replaces_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("image.png");
        fs::write(&path, b"stale").expect("write");

        let surface = half_transparent();
        save_surface(&surface, &path, &SaveOptions::default()).expect("save");
        assert_eq!(load_surface(&path).expect("load"), surface);
        assert_eq!(fs::read_dir(dir.path()).expect("read dir").count(), 1);
    }

    #[test]
    fn failed_save_leaves_no_partial_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("taken.png");
        fs::create_dir(&path).expect("mkdir");

        let error = save_surface(&half_transparent(), &path, &SaveOptions::default())
            .unwrap_err();
        assert!(matches!(error, StorageError::Io { .. }));
        assert!(path.is_dir());
        assert_eq!(fs::read_dir(dir.path()).expect("read dir").count(), 1);
    }

    #[test]
    fn loading_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = load_surface(&dir.path().join("missing.png")).unwrap_err();
        assert!(matches!(error, StorageError::Io { .. }));
    }
}
