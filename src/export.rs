//! Rasterizing a composition and encoding the downloadable JPEG.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};

use crate::composition::Composition;
use crate::data_url::DataUrl;
use crate::error::ExportError;
use crate::geometry::SizePx;

/// Device pixels per CSS pixel in exported images.
pub const EXPORT_SCALE: f32 = 4.0;

pub const EXPORT_QUALITY: u8 = 100;

pub const EXPORT_FILE_NAME: &str = "code-monumei.jpg";

/// Output size and device scale of one rasterization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterRequest {
    pub size: SizePx,
    pub scale: f32,
}

impl RasterRequest {
    pub fn new(size: SizePx, scale: f32) -> Self {
        Self { size, scale }
    }

    /// The composition's frame at the given device scale.
    pub fn for_frame(composition: &Composition, scale: f32) -> Self {
        Self::new(composition.frame.scaled(scale), scale)
    }
}

/// Turns a composition into pixels.
pub trait Rasterizer {
    fn rasterize(
        &mut self,
        composition: &Composition,
        request: RasterRequest,
    ) -> Result<RgbaImage, ExportError>;
}

/// An encoded export ready to be saved or handed to a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedImage {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl ExportedImage {
    pub fn mime(&self) -> &'static str {
        "image/jpeg"
    }

    /// The encoded image as a `data:image/jpeg;base64,` URL.
    pub fn to_data_url(&self) -> DataUrl {
        DataUrl::encode(self.mime(), &self.bytes)
    }

    /// Writes the image into `dir` under its file name.
    pub fn save_in(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.bytes).map_err(|source| ExportError::Write {
            path: path.clone(),
            source,
        })?;
        log::info!("saved {}x{} export to {}", self.width, self.height, path.display());
        Ok(path)
    }
}

/// Renders the composition at [`EXPORT_SCALE`] and encodes it as JPEG.
pub fn export_jpeg(
    rasterizer: &mut impl Rasterizer,
    composition: &Composition,
) -> Result<ExportedImage, ExportError> {
    let request = RasterRequest::for_frame(composition, EXPORT_SCALE);
    let frame = rasterizer.rasterize(composition, request)?;
    let (width, height) = frame.dimensions();

    // JPEG has no alpha; the frame is opaque wherever the backdrop drew
    let rgb = DynamicImage::ImageRgba8(frame).to_rgb8();
    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, EXPORT_QUALITY).encode_image(&rgb)?;

    let bytes = out.into_inner();
    log::info!("encoded {width}x{height} export ({} bytes)", bytes.len());
    Ok(ExportedImage {
        file_name: EXPORT_FILE_NAME.to_string(),
        width,
        height,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::Layout;
    use image::Rgba;

    /// Fills the requested frame with one color.
    struct Flat;

    impl Rasterizer for Flat {
        fn rasterize(
            &mut self,
            _composition: &Composition,
            request: RasterRequest,
        ) -> Result<RgbaImage, ExportError> {
            Ok(RgbaImage::from_pixel(
                request.size.width,
                request.size.height,
                Rgba([30, 60, 90, 255]),
            ))
        }
    }

    struct Failing;

    impl Rasterizer for Failing {
        fn rasterize(&mut self, _: &Composition, _: RasterRequest) -> Result<RgbaImage, ExportError> {
            Err(ExportError::NothingRendered)
        }
    }

    #[test]
    fn export_is_four_times_the_frame() {
        let composition = Composition::new(Layout::Plain, 48, "", &[]);
        let exported = export_jpeg(&mut Flat, &composition).unwrap();

        assert_eq!(exported.file_name, "code-monumei.jpg");
        assert_eq!(exported.width, composition.frame.width * 4);
        assert_eq!(exported.height, composition.frame.height * 4);

        let decoded = image::load_from_memory(&exported.bytes).unwrap();
        assert_eq!(decoded.width(), exported.width);
        assert_eq!(exported.to_data_url().mime(), "image/jpeg");
    }

    #[test]
    fn rasterizer_errors_propagate() {
        let composition = Composition::new(Layout::Plain, 48, "", &[]);
        assert!(matches!(
            export_jpeg(&mut Failing, &composition),
            Err(ExportError::NothingRendered)
        ));
    }

    #[test]
    fn save_in_writes_fixed_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let composition = Composition::new(Layout::Plain, 0, "", &[]);
        let exported = export_jpeg(&mut Flat, &composition).unwrap();

        let path = exported.save_in(dir.path()).unwrap();
        assert_eq!(path, dir.path().join(EXPORT_FILE_NAME));
        assert_eq!(std::fs::read(path).unwrap(), exported.bytes);
    }

    #[test]
    fn save_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let composition = Composition::new(Layout::Plain, 0, "", &[]);
        let exported = export_jpeg(&mut Flat, &composition).unwrap();
        let result = exported.save_in(&dir.path().join("missing"));
        assert!(matches!(result, Err(ExportError::Write { .. })));
    }
}
