//! Annotation shapes and the arena that owns them.
//!
//! Shapes live in canvas space. Each one is a tagged union of a kind and its
//! geometry plus style and metadata; the arena hands out stable [`ShapeId`]s
//! and keeps insertion order per kind so persistence is deterministic.

use crate::transform::{Bounds, Point};
use std::collections::{BTreeMap, HashMap};

/// Grab distance (canvas px) for grips and line proximity.
pub const GRIP_RADIUS: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Poi,
    Bos,
    Circle,
}

impl ShapeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Poi => "poi",
            ShapeKind::Bos => "bos",
            ShapeKind::Circle => "circle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    Box(Bounds),
    Line { start: Point, end: Point },
    Circle { center: Point, radius: f64 },
}

impl Geometry {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Geometry::Box(_) => ShapeKind::Poi,
            Geometry::Line { .. } => ShapeKind::Bos,
            Geometry::Circle { .. } => ShapeKind::Circle,
        }
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Geometry {
        let shift = |p: Point| Point::new(p.x + dx, p.y + dy);
        match *self {
            Geometry::Box(b) => Geometry::Box(Bounds {
                left: b.left + dx,
                top: b.top + dy,
                ..b
            }),
            Geometry::Line { start, end } => Geometry::Line {
                start: shift(start),
                end: shift(end),
            },
            Geometry::Circle { center, radius } => Geometry::Circle {
                center: shift(center),
                radius,
            },
        }
    }

    /// Map every anchor point through `f`; lengths are multiplied by `scale`.
    pub fn mapped(&self, f: impl Fn(Point) -> Point, scale: f64) -> Geometry {
        match *self {
            Geometry::Box(b) => {
                Geometry::Box(Bounds::from_corners(f(b.top_left()), f(b.bottom_right())))
            }
            Geometry::Line { start, end } => Geometry::Line {
                start: f(start),
                end: f(end),
            },
            Geometry::Circle { center, radius } => Geometry::Circle {
                center: f(center),
                radius: radius * scale,
            },
        }
    }

    pub fn bounds(&self) -> Bounds {
        match *self {
            Geometry::Box(b) => b,
            Geometry::Line { start, end } => Bounds::enclosing(&[start, end]),
            Geometry::Circle { center, radius } => Bounds {
                left: center.x - radius,
                top: center.y - radius,
                width: radius * 2.0,
                height: radius * 2.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stroke {
    #[default]
    Solid,
    Dashed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub color: String,
    pub stroke: Stroke,
}

impl Style {
    pub fn solid(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            stroke: Stroke::Solid,
        }
    }

    pub fn dashed(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            stroke: Stroke::Dashed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metadata {
    pub price: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub kind: ShapeKind,
    pub geometry: Geometry,
    pub style: Style,
    pub metadata: Metadata,
    pub selected: bool,
    /// Selectable and movable; false while a drawing tool is armed.
    pub interactive: bool,
}

impl Shape {
    pub fn new(geometry: Geometry, style: Style, metadata: Metadata) -> Self {
        Self {
            kind: geometry.kind(),
            geometry,
            style,
            metadata,
            selected: false,
            interactive: true,
        }
    }

    /// Text shown next to the shape; `None` when it has no label part.
    pub fn label_text(&self) -> Option<String> {
        let price = self.metadata.price;
        match self.kind {
            ShapeKind::Poi => {
                let name = if self.metadata.label.is_empty() {
                    "POI"
                } else {
                    self.metadata.label.as_str()
                };
                if price != 0.0 {
                    Some(format!("{name} @ {}", format_price(price)))
                } else {
                    Some(name.to_string())
                }
            }
            ShapeKind::Bos => {
                if price != 0.0 {
                    Some(format!("BOS @ {}", format_price(price)))
                } else {
                    Some("BOS".to_string())
                }
            }
            ShapeKind::Circle => None,
        }
    }
}

fn format_price(price: f64) -> String {
    let text = format!("{price:.5}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Parse user price input. Anything unparsable becomes 0.
pub fn parse_price(text: &str) -> f64 {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .unwrap_or(0.0)
}

/// Part of a shape grabbed by the pointer in cursor mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grip {
    Body,
    CornerTopLeft,
    CornerTopRight,
    CornerBottomLeft,
    CornerBottomRight,
    EdgeTop,
    EdgeRight,
    EdgeBottom,
    EdgeLeft,
    LineStart,
    LineEnd,
    Rim,
}

impl Shape {
    /// Which part of the shape (if any) lies under `p`.
    pub fn hit(&self, p: Point) -> Option<Grip> {
        match self.geometry {
            Geometry::Box(b) => box_grip(b, p),
            Geometry::Line { start, end } => {
                if p.distance(start) <= GRIP_RADIUS {
                    Some(Grip::LineStart)
                } else if p.distance(end) <= GRIP_RADIUS {
                    Some(Grip::LineEnd)
                } else if distance_to_segment(p, start, end) <= GRIP_RADIUS {
                    Some(Grip::Body)
                } else {
                    None
                }
            }
            Geometry::Circle { center, radius } => {
                let d = p.distance(center);
                if (d - radius).abs() <= GRIP_RADIUS {
                    Some(Grip::Rim)
                } else if d < radius {
                    Some(Grip::Body)
                } else {
                    None
                }
            }
        }
    }

    /// Geometry after dragging `grip` from `original` to pointer `p`.
    ///
    /// Box grips keep the opposite side fixed. Lines only move endpoints.
    pub fn dragged(original: Geometry, grip: Grip, from: Point, p: Point) -> Geometry {
        match (original, grip) {
            (g, Grip::Body) => g.translated(p.x - from.x, p.y - from.y),
            (Geometry::Box(b), grip) => Geometry::Box(resize_box(b, grip, p)),
            (Geometry::Line { end, .. }, Grip::LineStart) => Geometry::Line { start: p, end },
            (Geometry::Line { start, .. }, Grip::LineEnd) => Geometry::Line { start, end: p },
            (Geometry::Circle { center, .. }, Grip::Rim) => Geometry::Circle {
                center,
                radius: center.distance(p),
            },
            (g, _) => g,
        }
    }
}

fn box_grip(b: Bounds, p: Point) -> Option<Grip> {
    let right = b.left + b.width;
    let bottom = b.top + b.height;
    let near = |a: f64, v: f64| (a - v).abs() <= GRIP_RADIUS;
    let within_x = p.x >= b.left - GRIP_RADIUS && p.x <= right + GRIP_RADIUS;
    let within_y = p.y >= b.top - GRIP_RADIUS && p.y <= bottom + GRIP_RADIUS;
    if !within_x || !within_y {
        return None;
    }
    let grip = match (
        near(p.x, b.left),
        near(p.x, right),
        near(p.y, b.top),
        near(p.y, bottom),
    ) {
        (true, _, true, _) => Grip::CornerTopLeft,
        (_, true, true, _) => Grip::CornerTopRight,
        (true, _, _, true) => Grip::CornerBottomLeft,
        (_, true, _, true) => Grip::CornerBottomRight,
        (_, _, true, _) => Grip::EdgeTop,
        (_, true, _, _) => Grip::EdgeRight,
        (_, _, _, true) => Grip::EdgeBottom,
        (true, _, _, _) => Grip::EdgeLeft,
        _ if b.contains(p) => Grip::Body,
        _ => return None,
    };
    Some(grip)
}

fn resize_box(b: Bounds, grip: Grip, p: Point) -> Bounds {
    let right = b.left + b.width;
    let bottom = b.top + b.height;
    match grip {
        Grip::CornerTopLeft => Bounds::from_corners(p, Point::new(right, bottom)),
        Grip::CornerTopRight => Bounds::from_corners(Point::new(b.left, bottom), p),
        Grip::CornerBottomLeft => Bounds::from_corners(Point::new(right, b.top), p),
        Grip::CornerBottomRight => Bounds::from_corners(b.top_left(), p),
        Grip::EdgeTop => Bounds::from_corners(Point::new(b.left, p.y), Point::new(right, bottom)),
        Grip::EdgeBottom => Bounds::from_corners(b.top_left(), Point::new(right, p.y)),
        Grip::EdgeLeft => Bounds::from_corners(Point::new(p.x, b.top), Point::new(right, bottom)),
        Grip::EdgeRight => Bounds::from_corners(b.top_left(), Point::new(p.x, bottom)),
        _ => b,
    }
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

/// Owns every committed shape on a canvas.
///
/// Ids are never reused within an arena. `handles` is the side table a
/// renderer uses to find its own object for a shape.
#[derive(Debug, Default)]
pub struct ShapeArena {
    shapes: BTreeMap<ShapeId, Shape>,
    handles: HashMap<ShapeId, usize>,
    next_id: u32,
}

impl ShapeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, shape: Shape) -> ShapeId {
        let id = ShapeId(self.next_id);
        self.next_id += 1;
        self.shapes.insert(id, shape);
        id
    }

    pub fn remove(&mut self, id: ShapeId) -> Option<Shape> {
        self.handles.remove(&id);
        self.shapes.remove(&id)
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
        self.handles.clear();
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    pub fn get_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// All shapes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ShapeId, &Shape)> {
        self.shapes.iter().map(|(id, s)| (*id, s))
    }

    /// The collection for one kind, in insertion order.
    pub fn of_kind(&self, kind: ShapeKind) -> impl Iterator<Item = (ShapeId, &Shape)> {
        self.iter().filter(move |(_, s)| s.kind == kind)
    }

    pub fn count(&self, kind: ShapeKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn selected(&self) -> Vec<ShapeId> {
        self.iter()
            .filter(|(_, s)| s.selected)
            .map(|(id, _)| id)
            .collect()
    }

    /// Topmost interactive shape under `p`, i.e. the most recently inserted.
    pub fn hit_test(&self, p: Point) -> Option<(ShapeId, Grip)> {
        self.shapes
            .iter()
            .rev()
            .filter(|(_, s)| s.interactive)
            .find_map(|(id, s)| s.hit(p).map(|g| (*id, g)))
    }

    pub fn set_interactive(&mut self, interactive: bool) {
        for shape in self.shapes.values_mut() {
            shape.interactive = interactive;
            if !interactive {
                shape.selected = false;
            }
        }
    }

    pub fn deselect_all(&mut self) {
        for shape in self.shapes.values_mut() {
            shape.selected = false;
        }
    }

    pub fn bind_handle(&mut self, id: ShapeId, handle: usize) {
        if self.shapes.contains_key(&id) {
            self.handles.insert(id, handle);
        }
    }

    pub fn handle(&self, id: ShapeId) -> Option<usize> {
        self.handles.get(&id).copied()
    }

    /// Bound row for every shape in iteration order, or `None` when some shape
    /// is unbound or the rows are not exactly `0..len`. A `None` means the
    /// renderer has to rebuild its rows before it can update them in place.
    pub fn bound_rows(&self) -> Option<Vec<usize>> {
        let mut seen = vec![false; self.shapes.len()];
        let mut rows = Vec::with_capacity(self.shapes.len());
        for id in self.shapes.keys() {
            let row = self.handle(*id)?;
            match seen.get_mut(row) {
                Some(slot) if !*slot => *slot = true,
                _ => return None,
            }
            rows.push(row);
        }
        Some(rows)
    }
}
