/// Mask rasterization for region edits
///
/// The service reads the mask as a strict inclusion map: white pixels may
/// be regenerated, black pixels must be kept. The mask has to match the base
/// image's native resolution, so the base is decoded first to learn its size.

use image::{GrayImage, ImageFormat, Luma};
use std::io::Cursor;

use crate::codec::{self, EncodedImage, ImageAsset};
use crate::error::RasterizationError;
use crate::selection::NormalizedRegion;

/// Pixels the service must leave untouched
pub const EXCLUDED: Luma<u8> = Luma([0]);
/// Pixels the service may regenerate
pub const INCLUDED: Luma<u8> = Luma([255]);

/// Largest surface we agree to allocate (matches a 64 MP photo)
const MAX_SURFACE_PIXELS: u64 = 64 * 1024 * 1024;

/// Source of blank raster surfaces
pub trait SurfaceProvider: Send + Sync {
    /// A `width × height` surface filled with `fill`
    fn acquire(&self, width: u32, height: u32, fill: Luma<u8>) -> Result<GrayImage, RasterizationError>;
}

/// In-memory grayscale surfaces from the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct GrayscaleSurfaces;

impl SurfaceProvider for GrayscaleSurfaces {
    fn acquire(&self, width: u32, height: u32, fill: Luma<u8>) -> Result<GrayImage, RasterizationError> {
        let pixels = width as u64 * height as u64;
        if pixels == 0 || pixels > MAX_SURFACE_PIXELS {
            return Err(RasterizationError::Surface { width, height });
        }
        Ok(GrayImage::from_pixel(width, height, fill))
    }
}

/// Native pixel size of an uploaded or generated image
pub fn image_dimensions(asset: &ImageAsset) -> Result<(u32, u32), RasterizationError> {
    let bytes = asset
        .encoded
        .bytes()
        .map_err(|e| RasterizationError::BaseImage(e.to_string()))?;

    // Only the header is parsed; the pixels are never needed here
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| RasterizationError::BaseImage(e.to_string()))?
        .into_dimensions()
        .map_err(|e| RasterizationError::BaseImage(e.to_string()))
}

/// Pixel rectangle covered by a region, as half-open `[x0, x1) × [y0, y1)`
///
/// The start edge rounds down and the end edge rounds up, so any pixel the
/// region touches is included.
pub fn pixel_rect(region: &NormalizedRegion, width: u32, height: u32) -> (u32, u32, u32, u32) {
    let start = |percent: f32, extent: u32| -> u32 {
        ((percent / 100.0) * extent as f32).floor().clamp(0.0, extent as f32) as u32
    };
    let end = |percent: f32, extent: u32| -> u32 {
        ((percent / 100.0) * extent as f32).ceil().clamp(0.0, extent as f32) as u32
    };

    let x0 = start(region.x, width);
    let y0 = start(region.y, height);
    let x1 = end(region.x + region.width, width).max(x0);
    let y1 = end(region.y + region.height, height).max(y0);
    (x0, y0, x1, y1)
}

/// Draw the two-tone mask without encoding it
pub fn render(
    region: &NormalizedRegion,
    width: u32,
    height: u32,
    surfaces: &(impl SurfaceProvider + ?Sized),
) -> Result<GrayImage, RasterizationError> {
    let mut mask = surfaces.acquire(width, height, EXCLUDED)?;

    let (x0, y0, x1, y1) = pixel_rect(region, width, height);
    if x0 == x1 || y0 == y1 {
        return Err(RasterizationError::EmptyRegion);
    }
    for y in y0..y1 {
        for x in x0..x1 {
            mask.put_pixel(x, y, INCLUDED);
        }
    }

    Ok(mask)
}

/// Rasterize a region into a PNG mask, base64-encoded for transport
pub fn rasterize(
    region: &NormalizedRegion,
    width: u32,
    height: u32,
    surfaces: &(impl SurfaceProvider + ?Sized),
) -> Result<EncodedImage, RasterizationError> {
    let mask = render(region, width, height, surfaces)?;

    let mut png = Vec::new();
    mask.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

    tracing::debug!("🎭 Mask {}x{} encoded ({} bytes)", width, height, png.len());

    Ok(codec::encode_tagged(&png, "image/png"))
}

/// Build the mask for a base image: decode its size, then rasterize
pub fn mask_for(
    base: &ImageAsset,
    region: &NormalizedRegion,
    surfaces: &(impl SurfaceProvider + ?Sized),
) -> Result<EncodedImage, RasterizationError> {
    let (width, height) = image_dimensions(base)?;
    rasterize(region, width, height, surfaces)
}
