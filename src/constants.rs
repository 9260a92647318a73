//! Global constants for planmark.

/// Minimum canvas-space width and height a drawn box must exceed to be kept.
pub const MIN_DRAW_SIZE: f64 = 5.0;

/// Default number of seconds an inline recognition error stays visible.
pub const TRANSIENT_ERROR_SECS: u64 = 3;

/// Zoom limits and step for the document viewer.
pub mod zoom {
    /// Smallest zoom scale a document may be viewed at.
    pub const MIN: f64 = 0.25;
    /// Largest zoom scale a document may be viewed at.
    pub const MAX: f64 = 4.0;
    /// Multiplicative step used by zoom in/out.
    pub const FACTOR: f64 = 1.2;
}

/// Contrast stretch applied before recognition.
pub mod contrast {
    /// Slope of the linear stretch around the midpoint.
    pub const SLOPE: f32 = 1.2;
    /// Pivot of the stretch.
    pub const MIDPOINT: f32 = 128.0;
}

/// Default look of annotation boxes.
pub mod style {
    pub const FILL: &str = "rgba(37, 99, 235, 0.1)";
    pub const STROKE: &str = "#2563eb";
    /// Stroke width at scale 1, divided by the active scale.
    pub const STROKE_WIDTH: f64 = 2.0;
    /// Corner handle size at scale 1, divided by the active scale.
    pub const CORNER_SIZE: f64 = 8.0;
}

/// Tesseract page segmentation modes.
pub mod psm {
    /// Treat the image as a single text line.
    pub const SINGLE_LINE: u8 = 7;
    /// Fully automatic page segmentation.
    pub const AUTO: u8 = 3;
}
