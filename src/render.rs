//! Renderer-facing representation of shapes.
//!
//! A rendered shape is a group: a canvas-space origin holding the geometric
//! primitive and an optional label, both in group-local coordinates. Geometry
//! extraction always goes through the group origin and never looks at the
//! label, so a label sitting above a box does not leak into its bounds.

use crate::shapes::{Geometry, Shape, Stroke};
use crate::transform::{Bounds, Point, ViewportTransform};

/// Vertical space reserved above a primitive for its label.
pub const LABEL_HEIGHT: f64 = 16.0;

const DASH_LEN: f64 = 6.0;
const GAP_LEN: f64 = 4.0;
const CIRCLE_SEGMENTS: usize = 48;

/// Group-local geometric part of a rendered shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Rect { left: f64, top: f64, width: f64, height: f64 },
    Segment { x1: f64, y1: f64, x2: f64, y2: f64 },
    Circle { cx: f64, cy: f64, radius: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelPart {
    pub text: String,
    pub left: f64,
    pub top: f64,
}

/// A group maps a local point `(x, y)` to canvas `(left + x * scale_x,
/// top + y * scale_y)`. Circles take `scale_x` for their radius, so a circle
/// group is only meaningful when scaled uniformly.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderGroup {
    pub left: f64,
    pub top: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub primitive: Primitive,
    pub label: Option<LabelPart>,
}

impl RenderGroup {
    /// Lay out a shape as a group. The group origin is the top-left of the
    /// primitive and label together.
    pub fn from_shape(shape: &Shape) -> Self {
        let label = shape.label_text();
        let label_room = if label.is_some() { LABEL_HEIGHT } else { 0.0 };
        match shape.geometry {
            Geometry::Box(b) => {
                let left = b.left;
                let top = b.top - label_room;
                Self {
                    left,
                    top,
                    scale_x: 1.0,
                    scale_y: 1.0,
                    primitive: Primitive::Rect {
                        left: 0.0,
                        top: label_room,
                        width: b.width,
                        height: b.height,
                    },
                    label: label.map(|text| LabelPart {
                        text,
                        left: 0.0,
                        top: 0.0,
                    }),
                }
            }
            Geometry::Line { start, end } => {
                let left = start.x.min(end.x);
                let top = start.y.min(end.y) - label_room;
                Self {
                    left,
                    top,
                    scale_x: 1.0,
                    scale_y: 1.0,
                    primitive: Primitive::Segment {
                        x1: start.x - left,
                        y1: start.y - top,
                        x2: end.x - left,
                        y2: end.y - top,
                    },
                    label: label.map(|text| LabelPart {
                        text,
                        left: end.x - left,
                        top: 0.0,
                    }),
                }
            }
            Geometry::Circle { center, radius } => Self {
                left: center.x - radius,
                top: center.y - radius,
                scale_x: 1.0,
                scale_y: 1.0,
                primitive: Primitive::Circle {
                    cx: radius,
                    cy: radius,
                    radius,
                },
                label: None,
            },
        }
    }

    /// The same group stretched about its origin.
    pub fn scaled(mut self, scale_x: f64, scale_y: f64) -> Self {
        self.scale_x *= scale_x;
        self.scale_y *= scale_y;
        self
    }

    fn to_absolute(&self, x: f64, y: f64) -> Point {
        Point::new(self.left + x * self.scale_x, self.top + y * self.scale_y)
    }

    /// Canvas-space geometry of the primitive, label ignored.
    pub fn absolute_geometry(&self) -> Geometry {
        match self.primitive {
            Primitive::Rect {
                left,
                top,
                width,
                height,
            } => {
                let tl = self.to_absolute(left, top);
                Geometry::Box(Bounds {
                    left: tl.x,
                    top: tl.y,
                    width: width * self.scale_x,
                    height: height * self.scale_y,
                })
            }
            Primitive::Segment { x1, y1, x2, y2 } => Geometry::Line {
                start: self.to_absolute(x1, y1),
                end: self.to_absolute(x2, y2),
            },
            Primitive::Circle { cx, cy, radius } => Geometry::Circle {
                center: self.to_absolute(cx, cy),
                radius: radius * self.scale_x,
            },
        }
    }

    /// Primitive geometry after the viewport transform.
    pub fn screen_geometry(&self, viewport: &ViewportTransform) -> Geometry {
        self.absolute_geometry()
            .mapped(|p| viewport.apply(p), viewport.scale_x)
    }

    /// Axis-aligned screen bounds of the primitive only.
    pub fn screen_bounds(&self, viewport: &ViewportTransform) -> Bounds {
        self.screen_geometry(viewport).bounds()
    }

    /// Screen position of the label's top-left, if the group has one.
    pub fn screen_label(&self, viewport: &ViewportTransform) -> Option<(String, Point)> {
        self.label.as_ref().map(|l| {
            let anchor = viewport.apply(self.to_absolute(l.left, l.top));
            (l.text.clone(), anchor)
        })
    }
}

/// SVG-style path commands outlining a screen-space geometry.
pub fn outline_commands(geometry: &Geometry, stroke: Stroke) -> String {
    let segments = outline_segments(geometry);
    match stroke {
        Stroke::Solid => solid_path(&segments),
        Stroke::Dashed => dashed_path(&segments),
    }
}

fn outline_segments(geometry: &Geometry) -> Vec<(Point, Point)> {
    match *geometry {
        Geometry::Box(b) => {
            let tl = b.top_left();
            let tr = Point::new(b.left + b.width, b.top);
            let br = b.bottom_right();
            let bl = Point::new(b.left, b.top + b.height);
            vec![(tl, tr), (tr, br), (br, bl), (bl, tl)]
        }
        Geometry::Line { start, end } => vec![(start, end)],
        Geometry::Circle { center, radius } => {
            let at = |i: usize| {
                let a = i as f64 / CIRCLE_SEGMENTS as f64 * std::f64::consts::TAU;
                Point::new(center.x + radius * a.cos(), center.y + radius * a.sin())
            };
            (0..CIRCLE_SEGMENTS).map(|i| (at(i), at(i + 1))).collect()
        }
    }
}

fn solid_path(segments: &[(Point, Point)]) -> String {
    let mut commands = String::new();
    let mut pen: Option<Point> = None;
    for (a, b) in segments {
        if pen != Some(*a) {
            commands.push_str(&format!("M {:.2} {:.2} ", a.x, a.y));
        }
        commands.push_str(&format!("L {:.2} {:.2} ", b.x, b.y));
        pen = Some(*b);
    }
    commands.trim_end().to_string()
}

fn dashed_path(segments: &[(Point, Point)]) -> String {
    let mut commands = String::new();
    // Distance into the current dash+gap period, carried across segments so
    // dashes flow around corners.
    let mut phase = 0.0;
    let period = DASH_LEN + GAP_LEN;
    for (a, b) in segments {
        let len = a.distance(*b);
        if len == 0.0 {
            continue;
        }
        let at = |t: f64| Point::new(a.x + (b.x - a.x) * t / len, a.y + (b.y - a.y) * t / len);
        let mut t = 0.0;
        while t < len {
            let in_dash = phase < DASH_LEN;
            let remaining = if in_dash { DASH_LEN - phase } else { period - phase };
            let step = remaining.min(len - t);
            if in_dash {
                let p0 = at(t);
                let p1 = at(t + step);
                commands.push_str(&format!(
                    "M {:.2} {:.2} L {:.2} {:.2} ",
                    p0.x, p0.y, p1.x, p1.y
                ));
            }
            t += step;
            phase = (phase + step) % period;
        }
    }
    commands.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Metadata, Style};

    fn boxed(left: f64, top: f64, width: f64, height: f64) -> Shape {
        Shape::new(
            Geometry::Box(Bounds {
                left,
                top,
                width,
                height,
            }),
            Style::solid("#ff0000"),
            Metadata::default(),
        )
    }

    #[test]
    fn label_does_not_leak_into_box_geometry() {
        let shape = boxed(100.0, 100.0, 80.0, 60.0);
        let group = RenderGroup::from_shape(&shape);
        assert_eq!(group.top, 100.0 - LABEL_HEIGHT);
        assert_eq!(group.absolute_geometry(), shape.geometry);
        let b = group.screen_bounds(&ViewportTransform::identity());
        assert_eq!((b.left, b.top, b.width, b.height), (100.0, 100.0, 80.0, 60.0));
    }

    #[test]
    fn line_endpoints_survive_group_offset() {
        let shape = Shape::new(
            Geometry::Line {
                start: Point::new(300.0, 40.0),
                end: Point::new(120.0, 90.0),
            },
            Style::solid("#00ff00"),
            Metadata {
                price: 1.2,
                label: String::new(),
            },
        );
        let group = RenderGroup::from_shape(&shape);
        assert_eq!(group.left, 120.0);
        assert_eq!(group.absolute_geometry(), shape.geometry);
    }

    #[test]
    fn screen_geometry_follows_viewport() {
        let shape = boxed(10.0, 20.0, 30.0, 40.0);
        let group = RenderGroup::from_shape(&shape);
        let vp = ViewportTransform::new(2.0, 5.0, -5.0);
        let b = group.screen_bounds(&vp);
        assert_eq!((b.left, b.top, b.width, b.height), (25.0, 35.0, 60.0, 80.0));
    }

    #[test]
    fn scaled_group_keeps_label_out_of_bounds() {
        let mut shape = boxed(100.0, 100.0, 80.0, 60.0);
        shape.metadata.price = 1.0842;
        let group = RenderGroup::from_shape(&shape).scaled(1.5, 2.0);

        let (_, anchor) = group.screen_label(&ViewportTransform::identity()).unwrap();
        assert_eq!((anchor.x, anchor.y), (100.0, 84.0));

        // the label row above the box is stretched too
        let b = group.screen_bounds(&ViewportTransform::identity());
        assert_eq!((b.left, b.top, b.width, b.height), (100.0, 116.0, 120.0, 120.0));
    }

    #[test]
    fn circle_group_scales_its_radius() {
        let shape = Shape::new(
            Geometry::Circle {
                center: Point::new(50.0, 50.0),
                radius: 10.0,
            },
            Style::solid("#0000ff"),
            Metadata::default(),
        );
        let group = RenderGroup::from_shape(&shape);
        assert_eq!(group.absolute_geometry(), shape.geometry);
        assert_eq!(
            group.scaled(2.0, 2.0).absolute_geometry(),
            Geometry::Circle {
                center: Point::new(60.0, 60.0),
                radius: 20.0
            }
        );
    }

    #[test]
    fn solid_box_path_is_one_closed_run() {
        let g = Geometry::Box(Bounds {
            left: 0.0,
            top: 0.0,
            width: 10.0,
            height: 5.0,
        });
        let path = outline_commands(&g, Stroke::Solid);
        assert_eq!(path.matches('M').count(), 1);
        assert_eq!(path.matches('L').count(), 4);
    }

    #[test]
    fn dashed_line_splits_into_dashes() {
        let g = Geometry::Line {
            start: Point::new(0.0, 0.0),
            end: Point::new(100.0, 0.0),
        };
        let path = outline_commands(&g, Stroke::Dashed);
        assert_eq!(path.matches('M').count(), 10);
    }
}
