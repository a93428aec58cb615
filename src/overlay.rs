//! AI overlay for the teach page.
//!
//! Model-proposed shapes are shown dashed and editable next to the user's
//! own annotations, which stay read-only. Edits are captured as
//! `{original, corrected}` pairs in image space and sent as a lesson record;
//! they never touch the trade's annotation record.

use crate::config::CanvasConfig;
use crate::error::{AnnotatorError, AnnotatorResult};
use crate::persistence::{
    AnnotationRecord, BosLine, CircleMark, PoiBox, bos_geometry, circle_geometry, default_if_null,
    extract_image_geometry, image_to_canvas_geometry, poi_geometry, record_shapes,
};
use crate::shapes::{Geometry, Metadata, Shape, ShapeId, ShapeKind, Style};
use crate::state::PageSession;
use crate::transform::CoordinateTransformer;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct AiAnalysis {
    #[serde(default, deserialize_with = "default_if_null")]
    pub pois: Vec<PoiBox>,
    #[serde(default, deserialize_with = "default_if_null")]
    pub bos_lines: Vec<BosLine>,
    #[serde(default, deserialize_with = "default_if_null")]
    pub circles: Vec<CircleMark>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Image-space geometry as it appears in a lesson payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageGeometry {
    Box {
        left: f64,
        top: f64,
        width: f64,
        height: f64,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    },
    Circle {
        x: f64,
        y: f64,
        radius: f64,
    },
}

impl From<Geometry> for ImageGeometry {
    fn from(g: Geometry) -> Self {
        let r = |v: f64| (v * 100.0).round() / 100.0;
        match g {
            Geometry::Box(b) => ImageGeometry::Box {
                left: r(b.left),
                top: r(b.top),
                width: r(b.width),
                height: r(b.height),
            },
            Geometry::Line { start, end } => ImageGeometry::Line {
                x1: r(start.x),
                y1: r(start.y),
                x2: r(end.x),
                y2: r(end.y),
            },
            Geometry::Circle { center, radius } => ImageGeometry::Circle {
                x: r(center.x),
                y: r(center.y),
                radius: r(radius),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub kind: String,
    pub original: ImageGeometry,
    /// `None` when the user deleted the proposal.
    pub corrected: Option<ImageGeometry>,
}

impl Correction {
    pub fn is_change(&self) -> bool {
        self.corrected != Some(self.original)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonRecord {
    pub trade_id: i64,
    pub corrections: Vec<Correction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

struct Proposal {
    kind: ShapeKind,
    original: Geometry,
}

/// Teach-page state: the AI shapes are the editable session, the user's own
/// shapes ride along for comparison.
pub struct TeachSession {
    pub page: PageSession,
    pub reference: Vec<Shape>,
    pub reasoning: Option<String>,
    proposals: BTreeMap<ShapeId, Proposal>,
    ai_color: String,
}

impl TeachSession {
    pub fn new(trade_id: i64, transformer: CoordinateTransformer, canvas: &CanvasConfig) -> Self {
        Self {
            page: PageSession::new(trade_id, transformer, canvas),
            reference: Vec::new(),
            reasoning: None,
            proposals: BTreeMap::new(),
            ai_color: canvas.ai_color.clone(),
        }
    }

    /// Teach session opened before its chart has loaded.
    pub fn awaiting_chart(trade_id: i64, canvas: &CanvasConfig) -> Self {
        Self {
            page: PageSession::awaiting_chart(trade_id, canvas),
            reference: Vec::new(),
            reasoning: None,
            proposals: BTreeMap::new(),
            ai_color: canvas.ai_color.clone(),
        }
    }

    /// Show the trade's saved annotations read-only.
    pub fn load_reference(&mut self, record: &AnnotationRecord) {
        let fallback = self.page.color.clone();
        self.reference = record_shapes(record, &self.page.transformer, &fallback, |c| Style::solid(c))
            .into_iter()
            .map(|mut s| {
                s.interactive = false;
                s
            })
            .collect();
    }

    /// Replace the overlay with a fresh inference result.
    ///
    /// Proposals are placed through the display scale, so this is refused
    /// until the chart is ready.
    pub fn load_analysis(&mut self, analysis: &AiAnalysis) -> AnnotatorResult<()> {
        if !self.page.chart_ready() {
            return Err(AnnotatorError::ChartNotReady);
        }
        self.page.shapes.clear();
        self.proposals.clear();
        self.reasoning = analysis.reasoning.clone();

        let proposals = analysis
            .pois
            .iter()
            .map(|p| (poi_geometry(p), p.price, p.label.clone()))
            .chain(analysis.bos_lines.iter().map(|b| (bos_geometry(b), b.price, String::new())))
            .chain(analysis.circles.iter().map(|c| (circle_geometry(c), 0.0, String::new())));

        for (original, price, label) in proposals {
            let canvas = image_to_canvas_geometry(&original, &self.page.transformer);
            let shape = Shape::new(canvas, Style::dashed(self.ai_color.clone()), Metadata { price, label });
            let kind = shape.kind;
            let id = self.page.shapes.insert(shape);
            self.proposals.insert(id, Proposal { kind, original });
        }
        info!("Overlaying {} AI proposal(s)", self.proposals.len());
        Ok(())
    }

    pub fn proposal_count(&self) -> usize {
        self.proposals.len()
    }

    /// Pair every proposal with its current image-space geometry.
    pub fn corrections(&self) -> Vec<Correction> {
        let t = &self.page.transformer;
        let vp = &self.page.viewport;
        self.proposals
            .iter()
            .map(|(id, proposal)| Correction {
                kind: proposal.kind.as_str().to_string(),
                original: proposal.original.into(),
                corrected: self
                    .page
                    .shapes
                    .get(*id)
                    .map(|shape| extract_image_geometry(shape, t, vp).into()),
            })
            .collect()
    }

    /// Build the lesson payload. A non-blank `reasoning_override` replaces the
    /// model's own reasoning.
    pub fn lesson(&self, reasoning_override: Option<&str>) -> LessonRecord {
        let reasoning = reasoning_override
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .or_else(|| self.reasoning.clone());
        LessonRecord {
            trade_id: self.page.trade_id,
            corrections: self.corrections(),
            reasoning,
        }
    }
}

/// Backend calls used by the teach page.
#[async_trait]
pub trait TeachingBackend: Send + Sync {
    async fn analyze_chart(&self, trade_id: i64) -> AnnotatorResult<AiAnalysis>;
    async fn submit_lesson(&self, lesson: &LessonRecord) -> AnnotatorResult<serde_json::Value>;
}
