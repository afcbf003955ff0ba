//! PNG/HEIC to JPEG conversion.

use crate::error::{ErrorKind, Result};
use crate::tool::Tool;
use exn::ResultExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba};
use shoebox_config::ToolsConfig;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

/// Anything that can turn an image file into a JPEG file.
pub trait ImageConverter: Send + Sync {
    /// Writes a JPEG rendition of `source` to `destination`, replacing any
    /// existing file there.
    fn convert_to_jpeg(&self, source: &Path, destination: &Path) -> Result<()>;
}

/// The production converter: PNG is handled in-process, HEIC is handed off
/// to ImageMagick.
pub struct JpegConverter {
    magick: Tool,
    timeout: Duration,
}
impl JpegConverter {
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            magick: Tool::discover("magick", config.magick.as_deref(), &["magick"]),
            timeout: config.convert_timeout(),
        }
    }

    fn convert_png(&self, source: &Path, destination: &Path) -> Result<()> {
        let image = image::open(source).or_raise(|| ErrorKind::Conversion)?;
        flatten_onto_white(image).save_with_format(destination, ImageFormat::Jpeg).or_raise(|| ErrorKind::Conversion)
    }

    fn convert_heic(&self, source: &Path, destination: &Path) -> Result<()> {
        let args = [OsStr::new("convert"), source.as_os_str(), destination.as_os_str()];
        self.magick.run(args, self.timeout)?;
        if !destination.is_file() {
            // Exit code zero without an output file... ImageMagick, why.
            exn::bail!(ErrorKind::Conversion);
        }
        Ok(())
    }
}
impl ImageConverter for JpegConverter {
    #[instrument(skip_all, fields(source = %source.display()))]
    fn convert_to_jpeg(&self, source: &Path, destination: &Path) -> Result<()> {
        let extension = source.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("png") => self.convert_png(source, destination),
            Some("heic") => self.convert_heic(source, destination),
            other => Err(exn::Exn::from(ErrorKind::Unsupported(other.unwrap_or_default().to_string()))),
        }
        .or_raise(|| ErrorKind::Conversion)
    }
}

/// JPEG has no alpha channel; composite transparent pixels over white rather
/// than letting the encoder turn them black.
fn flatten_onto_white(image: DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let alpha = u32::from(a);
        let blend = |channel: u8| ((u32::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}
