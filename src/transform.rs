//! Coordinate transforms between document, canvas and device-pixel space.
//!
//! Document space is intrinsic to the page. Canvas space is document space
//! multiplied by the zoom scale. The viewport matrix then pivots rotation and
//! extra zoom around the visual centre and finally applies the device pixel
//! ratio.

use serde::{Deserialize, Serialize};

/// A point in document (page) space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DocPoint {
    pub x: f64,
    pub y: f64,
}

impl DocPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A point in canvas space (document space times scale).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CanvasPoint {
    pub x: f64,
    pub y: f64,
}

impl CanvasPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A box in document space. This is the persisted annotation position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DocRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation of the box in degrees.
    #[serde(default)]
    pub angle: f64,
}

impl DocRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
            angle: 0.0,
        }
    }

    pub fn top_left(&self) -> DocPoint {
        DocPoint::new(self.left, self.top)
    }
}

/// A box in canvas space, the geometry of a live shape.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CanvasRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub angle: f64,
}

impl CanvasRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
            angle: 0.0,
        }
    }

    /// Normalised box spanned by two corners, in either order.
    pub fn from_corners(a: CanvasPoint, b: CanvasPoint) -> Self {
        Self::new(
            a.x.min(b.x),
            a.y.min(b.y),
            (b.x - a.x).abs(),
            (b.y - a.y).abs(),
        )
    }

    pub fn top_left(&self) -> CanvasPoint {
        CanvasPoint::new(self.left, self.top)
    }
}

#[track_caller]
fn assert_scale(scale: f64) {
    assert!(
        scale > 0.0 && scale.is_finite(),
        "scale must be a positive finite number, got {scale}"
    );
}

/// Map a document point into canvas space.
///
/// # Panics
/// If `scale` is not a positive finite number.
#[track_caller]
pub fn to_canvas_point(point: DocPoint, scale: f64) -> CanvasPoint {
    assert_scale(scale);
    CanvasPoint::new(point.x * scale, point.y * scale)
}

/// Map a canvas point back into document space.
///
/// # Panics
/// If `scale` is not a positive finite number.
#[track_caller]
pub fn to_document_point(point: CanvasPoint, scale: f64) -> DocPoint {
    assert_scale(scale);
    DocPoint::new(point.x / scale, point.y / scale)
}

#[track_caller]
pub fn to_canvas_rect(rect: &DocRect, scale: f64) -> CanvasRect {
    let origin = to_canvas_point(rect.top_left(), scale);
    CanvasRect {
        left: origin.x,
        top: origin.y,
        width: rect.width * scale,
        height: rect.height * scale,
        angle: rect.angle,
    }
}

#[track_caller]
pub fn to_document_rect(rect: &CanvasRect, scale: f64) -> DocRect {
    let origin = to_document_point(rect.top_left(), scale);
    DocRect {
        left: origin.x,
        top: origin.y,
        width: rect.width / scale,
        height: rect.height / scale,
        angle: rect.angle,
    }
}

pub fn scale_dimensions(dimensions: Dimensions, scale: f64) -> Dimensions {
    Dimensions::new(dimensions.width * scale, dimensions.height * scale)
}

/// Rotate `point` by `angle` degrees around `center`.
pub fn rotate_point(point: CanvasPoint, angle: f64, center: CanvasPoint) -> CanvasPoint {
    let (sin, cos) = angle.to_radians().sin_cos();
    let dx = point.x - center.x;
    let dy = point.y - center.y;
    CanvasPoint::new(
        center.x + (dx * cos - dy * sin),
        center.y + (dx * sin + dy * cos),
    )
}

/// Axis-aligned bounds of a point set, `None` when empty.
pub fn bounding_box(points: &[CanvasPoint]) -> Option<CanvasRect> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(CanvasRect::new(min_x, min_y, max_x - min_x, max_y - min_y))
}

/// 2x3 affine matrix `[a, b, c, d, e, f]`, mapping `(x, y)` to
/// `(a·x + c·y + e, b·x + d·y + f)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix6 {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix6 {
    pub const IDENTITY: Matrix6 = Matrix6 {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn from_array([a, b, c, d, e, f]: [f64; 6]) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn to_array(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        }
    }

    /// Clockwise rotation (y axis pointing down) by `degrees`.
    pub fn rotation(degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::from_array([cos, sin, -sin, cos, 0.0, 0.0])
    }

    /// `self · other`: `other` is applied to a point first.
    pub fn multiply(&self, other: &Matrix6) -> Matrix6 {
        Matrix6 {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Inverse matrix, `None` when singular.
    pub fn invert(&self) -> Option<Matrix6> {
        let det = self.determinant();
        if det.abs() < f64::EPSILON || !det.is_finite() {
            return None;
        }
        Some(Matrix6 {
            a: self.d / det,
            b: -self.b / det,
            c: -self.c / det,
            d: self.a / det,
            e: (self.c * self.f - self.d * self.e) / det,
            f: (self.b * self.e - self.a * self.f) / det,
        })
    }
}

impl Default for Matrix6 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Scale/rotation matrix about the canvas origin.
///
/// # Panics
/// If `scale` is not a positive finite number.
#[track_caller]
pub fn build_matrix(scale: f64, rotation_degrees: f64) -> Matrix6 {
    assert_scale(scale);
    let (sin, cos) = rotation_degrees.to_radians().sin_cos();
    Matrix6::from_array([cos * scale, sin * scale, -sin * scale, cos * scale, 0.0, 0.0])
}

/// Inputs of a viewport transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportDimensions {
    pub width: f64,
    pub height: f64,
    pub scale: f64,
    pub rotation: f64,
    /// Device pixel ratio.
    pub dpr: f64,
}

impl ViewportDimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            scale: 1.0,
            rotation: 0.0,
            dpr: 1.0,
        }
    }
}

/// Partial update for [`ViewportTransform::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewportUpdate {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub scale: Option<f64>,
    pub rotation: Option<f64>,
    pub dpr: Option<f64>,
}

/// Viewport matrix pivoting zoom and rotation on the visual centre.
///
/// The matrices are never mutated in place: every update recomputes them.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportTransform {
    dimensions: ViewportDimensions,
    /// CSS-pixel matrix: `T(c) · R(θ) · S(s) · T(-c)`.
    css: Matrix6,
    css_inverse: Matrix6,
}

impl ViewportTransform {
    /// # Panics
    /// If `scale` or `dpr` is not a positive finite number.
    #[track_caller]
    pub fn new(dimensions: ViewportDimensions) -> Self {
        assert_scale(dimensions.scale);
        assert_scale(dimensions.dpr);
        let (css, css_inverse) = Self::compute(&dimensions);
        log::trace!("Viewport transform built: {:?} -> {:?}", dimensions, css);
        Self {
            dimensions,
            css,
            css_inverse,
        }
    }

    /// Identity viewport for a canvas of the given size.
    pub fn identity(width: f64, height: f64) -> Self {
        Self::new(ViewportDimensions::new(width, height))
    }

    fn compute(dim: &ViewportDimensions) -> (Matrix6, Matrix6) {
        let (cx, cy) = (dim.width / 2.0, dim.height / 2.0);
        let css = Matrix6::translation(cx, cy)
            .multiply(&Matrix6::rotation(dim.rotation))
            .multiply(&Matrix6::scaling(dim.scale, dim.scale))
            .multiply(&Matrix6::translation(-cx, -cy));
        let inverse = Matrix6::translation(cx, cy)
            .multiply(&Matrix6::scaling(1.0 / dim.scale, 1.0 / dim.scale))
            .multiply(&Matrix6::rotation(-dim.rotation))
            .multiply(&Matrix6::translation(-cx, -cy));
        (css, inverse)
    }

    pub fn dimensions(&self) -> &ViewportDimensions {
        &self.dimensions
    }

    /// Device matrix: the CSS matrix followed by the device pixel ratio.
    pub fn matrix(&self) -> Matrix6 {
        Matrix6::scaling(self.dimensions.dpr, self.dimensions.dpr).multiply(&self.css)
    }

    /// Matrix in CSS pixels, without the device pixel ratio.
    pub fn css_matrix(&self) -> Matrix6 {
        self.css
    }

    /// Canvas point to device pixels.
    pub fn to_viewport_point(&self, x: f64, y: f64) -> (f64, f64) {
        self.matrix().apply(x, y)
    }

    /// Device pixels back to a canvas point.
    pub fn from_viewport_point(&self, x: f64, y: f64) -> (f64, f64) {
        let dpr = self.dimensions.dpr;
        self.css_inverse.apply(x / dpr, y / dpr)
    }

    /// Element-local CSS pixel position (a pointer event) to canvas space.
    pub fn pointer_to_canvas(&self, x: f64, y: f64) -> CanvasPoint {
        let (cx, cy) = self.css_inverse.apply(x, y);
        CanvasPoint::new(cx, cy)
    }

    /// Replace the transform with one built from the merged dimensions.
    #[track_caller]
    pub fn update(&mut self, update: ViewportUpdate) {
        let merged = ViewportDimensions {
            width: update.width.unwrap_or(self.dimensions.width),
            height: update.height.unwrap_or(self.dimensions.height),
            scale: update.scale.unwrap_or(self.dimensions.scale),
            rotation: update.rotation.unwrap_or(self.dimensions.rotation),
            dpr: update.dpr.unwrap_or(self.dimensions.dpr),
        };
        *self = Self::new(merged);
    }
}
