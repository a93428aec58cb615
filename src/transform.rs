//! Coordinate conversion between screen, canvas and image space.
//!
//! Three spaces are involved:
//! - image space: pixels of the original chart screenshot; the persisted unit
//! - canvas space: image space reduced by the fixed display scale
//! - screen space: canvas space after the user's zoom/pan viewport transform

use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_ZOOM: f64 = 0.1;
pub const DEFAULT_MAX_ZOOM: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Axis-aligned rectangle given by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Smallest rectangle containing every point.
    pub fn enclosing(points: &[Point]) -> Self {
        if points.is_empty() {
            return Self::default();
        }
        let min_x = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let max_x = points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let min_y = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_y = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        Self {
            left: min_x,
            top: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }

    /// Rectangle spanned by two opposite corners in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.left + self.width, self.top + self.height)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left
            && p.x <= self.left + self.width
            && p.y >= self.top
            && p.y <= self.top + self.height
    }
}

/// User-controlled zoom/pan affine mapping canvas space to screen space.
///
/// Only the diagonal scale and translation of the 2x3 matrix are used;
/// skew and rotation never occur.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportTransform {
    pub scale_x: f64,
    pub scale_y: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl ViewportTransform {
    pub const fn identity() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }

    pub fn new(zoom: f64, translate_x: f64, translate_y: f64) -> Self {
        Self {
            scale_x: zoom,
            scale_y: zoom,
            translate_x,
            translate_y,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.scale_x
    }

    /// Canvas → screen.
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            p.x * self.scale_x + self.translate_x,
            p.y * self.scale_y + self.translate_y,
        )
    }

    /// Screen → canvas.
    pub fn invert(&self, p: Point) -> Point {
        let sx = if self.scale_x == 0.0 { 1.0 } else { self.scale_x };
        let sy = if self.scale_y == 0.0 { 1.0 } else { self.scale_y };
        Point::new((p.x - self.translate_x) / sx, (p.y - self.translate_y) / sy)
    }

    /// Multiply the zoom by `factor` about a screen-space anchor, keeping the
    /// canvas point under the anchor fixed. The result is clamped to
    /// `[min_zoom, max_zoom]`.
    pub fn zoom_at(&mut self, factor: f64, anchor: Point, min_zoom: f64, max_zoom: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let canvas_anchor = self.invert(anchor);
        let zoom = (self.zoom() * factor).clamp(min_zoom, max_zoom);
        self.scale_x = zoom;
        self.scale_y = zoom;
        self.translate_x = anchor.x - canvas_anchor.x * zoom;
        self.translate_y = anchor.y - canvas_anchor.y * zoom;
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.translate_x += dx;
        self.translate_y += dy;
    }

    pub fn reset(&mut self) {
        *self = Self::identity();
    }
}

/// Scale mapping image pixels to unzoomed canvas pixels, never above 1.
pub fn display_scale(image_width: f64, max_display_width: f64) -> f64 {
    if image_width <= 0.0 || !image_width.is_finite() {
        return 1.0;
    }
    (max_display_width / image_width).min(1.0)
}

/// Converts points between image space and screen space for one chart.
///
/// The display scale is fixed for the lifetime of a canvas; the viewport is
/// passed in on every call so conversions always see the live zoom/pan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateTransformer {
    pub image_width: f64,
    pub image_height: f64,
    pub display_scale: f64,
}

impl CoordinateTransformer {
    pub fn new(image_width: f64, image_height: f64, max_display_width: f64) -> Self {
        Self {
            image_width,
            image_height,
            display_scale: display_scale(image_width, max_display_width),
        }
    }

    pub fn with_scale(image_width: f64, image_height: f64, display_scale: f64) -> Self {
        Self {
            image_width,
            image_height,
            display_scale,
        }
    }

    pub fn canvas_width(&self) -> f64 {
        self.image_width * self.display_scale
    }

    pub fn canvas_height(&self) -> f64 {
        self.image_height * self.display_scale
    }

    pub fn to_image_space(&self, screen: Point, viewport: &ViewportTransform) -> Point {
        self.canvas_to_image(viewport.invert(screen))
    }

    pub fn to_screen_space(&self, image: Point, viewport: &ViewportTransform) -> Point {
        viewport.apply(self.image_to_canvas(image))
    }

    pub fn canvas_to_image(&self, canvas: Point) -> Point {
        Point::new(canvas.x / self.display_scale, canvas.y / self.display_scale)
    }

    pub fn image_to_canvas(&self, image: Point) -> Point {
        Point::new(image.x * self.display_scale, image.y * self.display_scale)
    }

    pub fn canvas_len_to_image(&self, len: f64) -> f64 {
        len / self.display_scale
    }

    pub fn image_len_to_canvas(&self, len: f64) -> f64 {
        len * self.display_scale
    }

    pub fn clamp_x(&self, x: f64) -> f64 {
        x.clamp(0.0, self.image_width.max(0.0))
    }

    pub fn clamp_y(&self, y: f64) -> f64 {
        y.clamp(0.0, self.image_height.max(0.0))
    }

    pub fn clamp_to_image(&self, p: Point) -> Point {
        Point::new(self.clamp_x(p.x), self.clamp_y(p.y))
    }

    /// Screen-space bounds → clamped image-space bounds.
    ///
    /// Both corners are converted and clamped independently so a box dragged
    /// past an edge keeps only its in-image part.
    pub fn bounds_to_image(&self, screen: Bounds, viewport: &ViewportTransform) -> Bounds {
        let a = self.clamp_to_image(self.to_image_space(screen.top_left(), viewport));
        let b = self.clamp_to_image(self.to_image_space(screen.bottom_right(), viewport));
        Bounds::from_corners(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn display_scale_never_exceeds_one() {
        assert_eq!(display_scale(800.0, 1200.0), 1.0);
        assert!(close(display_scale(2400.0, 1200.0), 0.5));
        assert_eq!(display_scale(0.0, 1200.0), 1.0);
    }

    #[test]
    fn screen_to_image_divides_out_viewport_then_scale() {
        let t = CoordinateTransformer::with_scale(2000.0, 1000.0, 0.5);
        let vp = ViewportTransform::new(2.0, 10.0, 20.0);
        let img = t.to_image_space(Point::new(210.0, 220.0), &vp);
        // canvas = (100, 100), image = (200, 200)
        assert!(close(img.x, 200.0));
        assert!(close(img.y, 200.0));
        let back = t.to_screen_space(img, &vp);
        assert!(close(back.x, 210.0));
        assert!(close(back.y, 220.0));
    }

    #[test]
    fn zoom_at_keeps_anchor_fixed() {
        let mut vp = ViewportTransform::identity();
        let anchor = Point::new(300.0, 150.0);
        let before = vp.invert(anchor);
        vp.zoom_at(1.5, anchor, DEFAULT_MIN_ZOOM, DEFAULT_MAX_ZOOM);
        let after = vp.invert(anchor);
        assert!(close(before.x, after.x));
        assert!(close(before.y, after.y));
        assert!(close(vp.zoom(), 1.5));
    }

    #[test]
    fn zoom_is_clamped() {
        let mut vp = ViewportTransform::identity();
        vp.zoom_at(100.0, Point::default(), DEFAULT_MIN_ZOOM, DEFAULT_MAX_ZOOM);
        assert!(close(vp.zoom(), DEFAULT_MAX_ZOOM));
        vp.zoom_at(1e-6, Point::default(), DEFAULT_MIN_ZOOM, DEFAULT_MAX_ZOOM);
        assert!(close(vp.zoom(), DEFAULT_MIN_ZOOM));
        vp.reset();
        assert_eq!(vp, ViewportTransform::identity());
    }

    #[test]
    fn bounds_are_clamped_per_corner() {
        let t = CoordinateTransformer::with_scale(1000.0, 500.0, 1.0);
        let b = t.bounds_to_image(
            Bounds {
                left: -50.0,
                top: 450.0,
                width: 100.0,
                height: 100.0,
            },
            &ViewportTransform::identity(),
        );
        assert_eq!(b.left, 0.0);
        assert_eq!(b.top, 450.0);
        assert_eq!(b.width, 50.0);
        assert_eq!(b.height, 50.0);
    }
}
