//! Page geometry supplied by the page source.

use serde::{Deserialize, Serialize};

/// Right-angle page rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(&self) -> f64 {
        match self {
            Rotation::Deg0 => 0.0,
            Rotation::Deg90 => 90.0,
            Rotation::Deg180 => 180.0,
            Rotation::Deg270 => 270.0,
        }
    }

    /// Snap an arbitrary angle to the nearest right angle.
    pub fn from_degrees(degrees: f64) -> Self {
        if !degrees.is_finite() {
            return Rotation::Deg0;
        }
        let quarter = (degrees / 90.0).round().rem_euclid(4.0) as u8;
        match quarter {
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            3 => Rotation::Deg270,
            _ => Rotation::Deg0,
        }
    }

    pub fn clockwise(&self) -> Self {
        Self::from_degrees(self.degrees() + 90.0)
    }

    pub fn counter_clockwise(&self) -> Self {
        Self::from_degrees(self.degrees() - 90.0)
    }

    /// Whether width and height trade places under this rotation.
    pub fn swaps_axes(&self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// Size and orientation of the page being annotated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageDimensions {
    /// Width after rotation.
    pub width: f64,
    /// Height after rotation.
    pub height: f64,
    pub rotation: Rotation,
    /// Whether the natural (unrotated) page is portrait.
    pub is_portrait: bool,
}

impl PageDimensions {
    /// Orient a page from its natural size: portrait pages are turned by 90°
    /// so drawings are always laid out landscape.
    pub fn from_natural(width: f64, height: f64) -> Self {
        let is_portrait = width < height;
        let rotation = if is_portrait {
            Rotation::Deg90
        } else {
            Rotation::Deg0
        };
        let dims = Self::with_rotation(width, height, rotation);
        log::debug!("Calculated page dimensions: {:?}", dims);
        dims
    }

    /// Page with an explicit rotation hint.
    pub fn with_rotation(width: f64, height: f64, rotation: Rotation) -> Self {
        let (width, height) = if rotation.swaps_axes() {
            (height, width)
        } else {
            (width, height)
        };
        Self {
            width,
            height,
            rotation,
            is_portrait: if rotation.swaps_axes() {
                width > height
            } else {
                width < height
            },
        }
    }

    /// Canvas size of the page at `scale`.
    pub fn scaled(&self, scale: f64) -> (f64, f64) {
        (self.width * scale, self.height * scale)
    }
}
