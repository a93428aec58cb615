//! Per-page session context.
//!
//! Everything a chart page mutates lives here: the drawing state, committed
//! shapes, the live viewport and the cached annotation record id. Handlers
//! receive the session explicitly instead of closing over globals.

use crate::config::CanvasConfig;
use crate::drawing::{DrawContext, DrawEvent, DrawState, Effect, Gates, Tool, reduce};
use crate::shapes::{Geometry, ShapeArena, ShapeId};
use crate::transform::{CoordinateTransformer, Point, ViewportTransform};
use crate::error::{AnnotatorError, AnnotatorResult};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Session shared between UI callbacks and spawned network tasks.
///
/// Locks are held only for synchronous work, never across an await.
pub type SharedSession = Arc<Mutex<PageSession>>;

pub fn lock_session(session: &SharedSession) -> AnnotatorResult<MutexGuard<'_, PageSession>> {
    session.lock().map_err(|_| AnnotatorError::SessionPoisoned)
}

#[derive(Debug)]
pub struct PageSession {
    pub trade_id: i64,
    state: DrawState,
    /// Color used for the next shape.
    pub color: String,
    pub shapes: ShapeArena,
    pub viewport: ViewportTransform,
    pub transformer: CoordinateTransformer,
    pub gates: Gates,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Server id of this trade's annotation record, once known.
    pub record_id: Option<i64>,
    pub notes: String,
    /// Flags carried by the loaded record.
    pub ai_detected: bool,
    pub user_corrected: bool,
    /// Transient shape shown while a drawing gesture is in progress.
    pub preview: Option<Geometry>,
    /// Shape awaiting a price from the user.
    pub pending_price: Option<ShapeId>,
    /// False until the chart's natural size is known and any saved record
    /// has been placed. Gestures and saves wait for it.
    chart_ready: bool,
}

impl PageSession {
    pub fn new(trade_id: i64, transformer: CoordinateTransformer, canvas: &CanvasConfig) -> Self {
        Self {
            trade_id,
            state: DrawState::Idle,
            color: canvas.poi_color.clone(),
            shapes: ShapeArena::new(),
            viewport: ViewportTransform::identity(),
            transformer,
            gates: Gates {
                min_box_size: canvas.min_box_size,
                min_circle_radius: canvas.min_circle_radius,
            },
            min_zoom: canvas.min_zoom,
            max_zoom: canvas.max_zoom,
            record_id: None,
            notes: String::new(),
            ai_detected: false,
            user_corrected: false,
            preview: None,
            pending_price: None,
            chart_ready: true,
        }
    }

    /// Session opened before its chart has loaded. Drawing and saving stay
    /// disabled until [`PageSession::install_chart`] and
    /// [`PageSession::mark_chart_ready`] have run.
    pub fn awaiting_chart(trade_id: i64, canvas: &CanvasConfig) -> Self {
        let placeholder = CoordinateTransformer::new(1.0, 1.0, canvas.max_display_width);
        Self {
            chart_ready: false,
            ..Self::new(trade_id, placeholder, canvas)
        }
    }

    /// Swap in the transformer for the chart's real dimensions.
    pub fn install_chart(&mut self, transformer: CoordinateTransformer) {
        self.transformer = transformer;
    }

    pub fn mark_chart_ready(&mut self) {
        self.chart_ready = true;
    }

    pub fn chart_ready(&self) -> bool {
        self.chart_ready
    }

    pub fn shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    pub fn state(&self) -> &DrawState {
        &self.state
    }

    pub fn tool(&self) -> Tool {
        self.state.tool()
    }

    /// Run one event through the reducer and apply its effects.
    pub fn dispatch(&mut self, event: DrawEvent) -> Vec<Effect> {
        let gesture = matches!(
            event,
            DrawEvent::PointerDown(_)
                | DrawEvent::PointerMove(_)
                | DrawEvent::PointerUp(_)
                | DrawEvent::DoubleClick(_)
        );
        if gesture && !self.chart_ready {
            return Vec::new();
        }
        let ctx = DrawContext {
            shapes: &self.shapes,
            gates: self.gates,
        };
        let state = std::mem::take(&mut self.state);
        let (next, effects) = reduce(state, &event, &ctx);
        self.state = next;
        for effect in &effects {
            self.apply(effect);
        }
        effects
    }

    fn apply(&mut self, effect: &Effect) {
        match effect {
            Effect::ShowPreview(g) | Effect::UpdatePreview(g) => self.preview = Some(*g),
            Effect::HidePreview => self.preview = None,
            Effect::Commit(shape) => {
                let id = self.shapes.insert(shape.clone());
                debug!("Committed {} shape {:?}", shape.kind.as_str(), id);
            }
            Effect::Remove(ids) => {
                for id in ids {
                    self.shapes.remove(*id);
                }
                debug!("Removed {} shape(s)", ids.len());
            }
            Effect::Select(id) => {
                if let Some(shape) = self.shapes.get_mut(*id) {
                    shape.selected = true;
                }
            }
            Effect::DeselectAll => self.shapes.deselect_all(),
            Effect::SetInteractive(on) => self.shapes.set_interactive(*on),
            Effect::Reshape { id, geometry } => {
                if let Some(shape) = self.shapes.get_mut(*id) {
                    shape.geometry = *geometry;
                }
            }
            Effect::PromptPrice { id, .. } => self.pending_price = Some(*id),
            Effect::SetPrice { id, price } => {
                if let Some(shape) = self.shapes.get_mut(*id) {
                    shape.metadata.price = *price;
                }
                if self.pending_price == Some(*id) {
                    self.pending_price = None;
                }
            }
            Effect::ClearAll => {
                self.shapes.clear();
                self.pending_price = None;
            }
        }
    }

    pub fn select_tool(&mut self, tool: Tool) -> Vec<Effect> {
        let color = self.color.clone();
        self.dispatch(DrawEvent::SelectTool { tool, color })
    }

    /// Screen point → canvas point under the live viewport.
    pub fn to_canvas(&self, screen: Point) -> Point {
        self.viewport.invert(screen)
    }

    pub fn pointer_down(&mut self, screen: Point) -> Vec<Effect> {
        let p = self.to_canvas(screen);
        self.dispatch(DrawEvent::PointerDown(p))
    }

    pub fn pointer_move(&mut self, screen: Point) -> Vec<Effect> {
        let p = self.to_canvas(screen);
        self.dispatch(DrawEvent::PointerMove(p))
    }

    pub fn pointer_up(&mut self, screen: Point) -> Vec<Effect> {
        let p = self.to_canvas(screen);
        self.dispatch(DrawEvent::PointerUp(p))
    }

    pub fn double_click(&mut self, screen: Point) -> Vec<Effect> {
        let p = self.to_canvas(screen);
        self.dispatch(DrawEvent::DoubleClick(p))
    }

    pub fn zoom_at(&mut self, factor: f64, anchor: Point) {
        self.viewport
            .zoom_at(factor, anchor, self.min_zoom, self.max_zoom);
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.viewport.pan(dx, dy);
    }

    pub fn reset_zoom(&mut self) {
        self.viewport.reset();
    }
}
