//! Reading annotation regions out of a rendered page and preparing them for
//! recognition.

use image::{Rgba, RgbaImage, imageops};
use thiserror::Error;

use crate::constants::contrast;
use crate::transform::CanvasRect;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("No pixel context available")]
    ContextUnavailable,

    #[error("Region {rect:?} lies outside the {width}x{height} surface")]
    OutOfBounds {
        rect: PixelRect,
        width: u32,
        height: u32,
    },

    #[error("Region is empty")]
    EmptyRegion,
}

/// Integer rectangle in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest device-pixel rectangle covering `rect` at `dpr`.
    ///
    /// Edges left of or above the origin are clamped to zero.
    pub fn from_canvas_rect(rect: &CanvasRect, dpr: f64) -> Self {
        let left = (rect.left * dpr).floor().max(0.0);
        let top = (rect.top * dpr).floor().max(0.0);
        let right = ((rect.left + rect.width) * dpr).ceil().max(left);
        let bottom = ((rect.top + rect.height) * dpr).ceil().max(top);
        Self {
            x: left as u32,
            y: top as u32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x.checked_add(self.width).is_some_and(|r| r <= width)
            && self.y.checked_add(self.height).is_some_and(|b| b <= height)
    }
}

/// Anything pixels can be read back from.
pub trait PixelSource {
    /// Size in device pixels, `None` when there is no readable context.
    fn pixel_dimensions(&self) -> Option<(u32, u32)>;

    /// Copy the pixels under `rect`.
    fn read_pixels(&self, rect: PixelRect) -> Result<RgbaImage, ExtractError>;
}

impl PixelSource for RgbaImage {
    fn pixel_dimensions(&self) -> Option<(u32, u32)> {
        Some(self.dimensions())
    }

    fn read_pixels(&self, rect: PixelRect) -> Result<RgbaImage, ExtractError> {
        if rect.is_empty() {
            return Err(ExtractError::EmptyRegion);
        }
        let (width, height) = self.dimensions();
        if !rect.fits_within(width, height) {
            return Err(ExtractError::OutOfBounds {
                rect,
                width,
                height,
            });
        }
        Ok(imageops::crop_imm(self, rect.x, rect.y, rect.width, rect.height).to_image())
    }
}

/// Read the pixels under `rect`.
pub fn try_extract_region(
    source: &dyn PixelSource,
    rect: PixelRect,
) -> Result<RgbaImage, ExtractError> {
    if source.pixel_dimensions().is_none() {
        return Err(ExtractError::ContextUnavailable);
    }
    source.read_pixels(rect)
}

/// Like [`try_extract_region`], but a failed read means "nothing to
/// recognise" and yields `None`.
pub fn extract_region(source: &dyn PixelSource, rect: PixelRect) -> Option<RgbaImage> {
    match try_extract_region(source, rect) {
        Ok(region) => Some(region),
        Err(e) => {
            log::warn!("Region extraction failed: {}", e);
            None
        }
    }
}

fn stretch(value: f32) -> u8 {
    ((value - contrast::MIDPOINT) * contrast::SLOPE + contrast::MIDPOINT)
        .round()
        .clamp(0.0, 255.0) as u8
}

/// Grayscale (channel average) followed by a contrast stretch around the
/// midpoint. Alpha is kept. Returns a new buffer.
pub fn preprocess(image: &RgbaImage) -> RgbaImage {
    let mut out = RgbaImage::new(image.width(), image.height());
    for (src, dst) in image.pixels().zip(out.pixels_mut()) {
        let Rgba([r, g, b, a]) = *src;
        let gray = (f32::from(r) + f32::from(g) + f32::from(b)) / 3.0;
        let v = stretch(gray);
        *dst = Rgba([v, v, v, a]);
    }
    out
}
