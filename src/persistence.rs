//! Annotation record wire format and the load/save mapping.
//!
//! Every persisted coordinate is in image space. Saving extracts each
//! shape's primitive through the live viewport and inverts it, so the same
//! shapes produce the same payload at any zoom/pan.

use crate::error::{AnnotatorError, AnnotatorResult};
use crate::render::RenderGroup;
use crate::shapes::{Geometry, Metadata, Shape, ShapeKind, Style};
use crate::state::{PageSession, SharedSession, lock_session};
use crate::transform::{Bounds, CoordinateTransformer, Point, ViewportTransform};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

/// Treat an explicit `null` the same as a missing field.
pub(crate) fn default_if_null<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PoiBox {
    #[serde(default, deserialize_with = "default_if_null")]
    pub left: f64,
    #[serde(default, deserialize_with = "default_if_null")]
    pub top: f64,
    #[serde(default, deserialize_with = "default_if_null")]
    pub width: f64,
    #[serde(default, deserialize_with = "default_if_null")]
    pub height: f64,
    #[serde(default, deserialize_with = "default_if_null")]
    pub color: String,
    #[serde(default, deserialize_with = "default_if_null")]
    pub price: f64,
    #[serde(default, deserialize_with = "default_if_null")]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BosLine {
    #[serde(default, deserialize_with = "default_if_null")]
    pub x1: f64,
    #[serde(default, deserialize_with = "default_if_null")]
    pub y1: f64,
    #[serde(default, deserialize_with = "default_if_null")]
    pub x2: f64,
    #[serde(default, deserialize_with = "default_if_null")]
    pub y2: f64,
    #[serde(default, deserialize_with = "default_if_null")]
    pub color: String,
    #[serde(default, deserialize_with = "default_if_null")]
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CircleMark {
    #[serde(default, deserialize_with = "default_if_null")]
    pub x: f64,
    #[serde(default, deserialize_with = "default_if_null")]
    pub y: f64,
    #[serde(default, deserialize_with = "default_if_null")]
    pub radius: f64,
    #[serde(default, deserialize_with = "default_if_null")]
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnnotationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "default_if_null")]
    pub trade_id: i64,
    #[serde(default, deserialize_with = "default_if_null")]
    pub image_width: f64,
    #[serde(default, deserialize_with = "default_if_null")]
    pub image_height: f64,
    #[serde(default, deserialize_with = "default_if_null")]
    pub pois: Vec<PoiBox>,
    #[serde(default, deserialize_with = "default_if_null")]
    pub bos_lines: Vec<BosLine>,
    #[serde(default, deserialize_with = "default_if_null")]
    pub circles: Vec<CircleMark>,
    #[serde(default, deserialize_with = "default_if_null")]
    pub notes: String,
    #[serde(default, deserialize_with = "default_if_null")]
    pub ai_detected: bool,
    #[serde(default, deserialize_with = "default_if_null")]
    pub user_corrected: bool,
}

/// The backend may answer with one record or a list; only the first counts.
pub fn first_record(value: serde_json::Value) -> AnnotatorResult<Option<AnnotationRecord>> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Array(items) => match items.into_iter().next() {
            Some(item) => Ok(Some(serde_json::from_value(item)?)),
            None => Ok(None),
        },
        other => Ok(Some(serde_json::from_value(other)?)),
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn color_or(color: &str, fallback: &str) -> String {
    if color.is_empty() {
        fallback.to_string()
    } else {
        color.to_string()
    }
}

/// Image-space geometry of a rendered shape under the live viewport.
///
/// Boxes use the axis-aligned screen bounds of the primitive; lines keep
/// their two endpoints; circles keep center and radius. Every coordinate is
/// clamped into the image.
pub fn extract_image_geometry(
    shape: &Shape,
    transformer: &CoordinateTransformer,
    viewport: &ViewportTransform,
) -> Geometry {
    let group = RenderGroup::from_shape(shape);
    match group.screen_geometry(viewport) {
        Geometry::Box(_) => {
            Geometry::Box(transformer.bounds_to_image(group.screen_bounds(viewport), viewport))
        }
        Geometry::Line { start, end } => Geometry::Line {
            start: transformer.clamp_to_image(transformer.to_image_space(start, viewport)),
            end: transformer.clamp_to_image(transformer.to_image_space(end, viewport)),
        },
        Geometry::Circle { center, radius } => {
            let zoom = if viewport.scale_x == 0.0 { 1.0 } else { viewport.scale_x };
            let radius = transformer.canvas_len_to_image(radius / zoom);
            Geometry::Circle {
                center: transformer.clamp_to_image(transformer.to_image_space(center, viewport)),
                radius: radius.clamp(0.0, transformer.image_width.max(0.0)),
            }
        }
    }
}

/// Image-space geometry → canvas-space geometry, display scale only.
pub fn image_to_canvas_geometry(geometry: &Geometry, transformer: &CoordinateTransformer) -> Geometry {
    geometry.mapped(|p| transformer.image_to_canvas(p), transformer.display_scale)
}

pub fn poi_geometry(poi: &PoiBox) -> Geometry {
    Geometry::Box(Bounds {
        left: poi.left,
        top: poi.top,
        width: poi.width,
        height: poi.height,
    })
}

pub fn bos_geometry(bos: &BosLine) -> Geometry {
    Geometry::Line {
        start: Point::new(bos.x1, bos.y1),
        end: Point::new(bos.x2, bos.y2),
    }
}

pub fn circle_geometry(circle: &CircleMark) -> Geometry {
    Geometry::Circle {
        center: Point::new(circle.x, circle.y),
        radius: circle.radius,
    }
}

/// Build canvas-space shapes from a record, in record order.
pub fn record_shapes(
    record: &AnnotationRecord,
    transformer: &CoordinateTransformer,
    fallback_color: &str,
    style: impl Fn(String) -> Style,
) -> Vec<Shape> {
    let mut shapes = Vec::new();
    for poi in &record.pois {
        shapes.push(Shape::new(
            image_to_canvas_geometry(&poi_geometry(poi), transformer),
            style(color_or(&poi.color, fallback_color)),
            Metadata {
                price: poi.price,
                label: poi.label.clone(),
            },
        ));
    }
    for bos in &record.bos_lines {
        shapes.push(Shape::new(
            image_to_canvas_geometry(&bos_geometry(bos), transformer),
            style(color_or(&bos.color, fallback_color)),
            Metadata {
                price: bos.price,
                label: String::new(),
            },
        ));
    }
    for circle in &record.circles {
        shapes.push(Shape::new(
            image_to_canvas_geometry(&circle_geometry(circle), transformer),
            style(color_or(&circle.color, fallback_color)),
            Metadata::default(),
        ));
    }
    shapes
}

/// Replace the session's shapes with those from `record`.
///
/// Runs before any zoom/pan, so only the display scale is applied.
pub fn load_record(session: &mut PageSession, record: &AnnotationRecord) {
    let interactive = !session.tool().is_drawing();
    let shapes = record_shapes(record, &session.transformer, &session.color, |c| Style::solid(c));
    session.shapes.clear();
    for mut shape in shapes {
        shape.interactive = interactive;
        session.shapes.insert(shape);
    }
    session.record_id = record.id;
    session.notes = record.notes.clone();
    session.ai_detected = record.ai_detected;
    session.user_corrected = record.user_corrected;
}

/// Serialize the session's shapes into an image-space record.
pub fn build_record(session: &PageSession) -> AnnotationRecord {
    let t = &session.transformer;
    let vp = &session.viewport;
    let mut record = AnnotationRecord {
        id: session.record_id,
        trade_id: session.trade_id,
        image_width: t.image_width,
        image_height: t.image_height,
        notes: session.notes.clone(),
        ai_detected: session.ai_detected,
        user_corrected: session.user_corrected || session.ai_detected,
        ..Default::default()
    };
    for (_, shape) in session.shapes.of_kind(ShapeKind::Poi) {
        if let Geometry::Box(b) = extract_image_geometry(shape, t, vp) {
            record.pois.push(PoiBox {
                left: round2(b.left),
                top: round2(b.top),
                width: round2(b.width),
                height: round2(b.height),
                color: shape.style.color.clone(),
                price: shape.metadata.price,
                label: shape.metadata.label.clone(),
            });
        }
    }
    for (_, shape) in session.shapes.of_kind(ShapeKind::Bos) {
        if let Geometry::Line { start, end } = extract_image_geometry(shape, t, vp) {
            record.bos_lines.push(BosLine {
                x1: round2(start.x),
                y1: round2(start.y),
                x2: round2(end.x),
                y2: round2(end.y),
                color: shape.style.color.clone(),
                price: shape.metadata.price,
            });
        }
    }
    for (_, shape) in session.shapes.of_kind(ShapeKind::Circle) {
        if let Geometry::Circle { center, radius } = extract_image_geometry(shape, t, vp) {
            record.circles.push(CircleMark {
                x: round2(center.x),
                y: round2(center.y),
                radius: round2(radius),
                color: shape.style.color.clone(),
            });
        }
    }
    record
}

/// Backend operations on annotation records.
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    async fn fetch(&self, trade_id: i64) -> AnnotatorResult<Option<AnnotationRecord>>;
    async fn create(&self, record: &AnnotationRecord) -> AnnotatorResult<AnnotationRecord>;
    async fn update(&self, id: i64, record: &AnnotationRecord) -> AnnotatorResult<AnnotationRecord>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMethod {
    Post,
    Put,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub method: SaveMethod,
    pub record_id: Option<i64>,
    pub record: AnnotationRecord,
}

/// Fetch the trade's record and load it into the session.
///
/// Returns whether a record existed.
pub async fn load(session: &SharedSession, store: &dyn AnnotationStore) -> AnnotatorResult<bool> {
    let trade_id = lock_session(session)?.trade_id;
    let Some(record) = store.fetch(trade_id).await? else {
        info!("No annotations stored for trade {trade_id}");
        return Ok(false);
    };
    let mut guard = lock_session(session)?;
    load_record(&mut guard, &record);
    info!(
        "Loaded {} POI, {} BOS, {} circle(s) for trade {trade_id}",
        record.pois.len(),
        record.bos_lines.len(),
        record.circles.len()
    );
    Ok(true)
}

/// Persist the session's shapes: PUT when a record id is cached, else POST.
///
/// The session is locked only to build the payload and to store the returned
/// id. Concurrent saves race; whichever finishes last sets the cached id. On
/// error nothing in the session changes. Refused until the chart is ready,
/// since the payload would otherwise be sized against the placeholder.
pub async fn save(session: &SharedSession, store: &dyn AnnotationStore) -> AnnotatorResult<SaveOutcome> {
    let (payload, cached) = {
        let guard = lock_session(session)?;
        if !guard.chart_ready() {
            return Err(AnnotatorError::ChartNotReady);
        }
        (build_record(&guard), guard.record_id)
    };

    let (method, saved) = match cached {
        Some(id) => (SaveMethod::Put, store.update(id, &payload).await?),
        None => (SaveMethod::Post, store.create(&payload).await?),
    };

    let record_id = saved.id.or(cached);
    match record_id {
        Some(id) => lock_session(session)?.record_id = Some(id),
        None => warn!("Save response carried no record id"),
    }
    info!("Saved annotations for trade {} via {:?}", payload.trade_id, method);
    Ok(SaveOutcome {
        method,
        record_id,
        record: payload,
    })
}
