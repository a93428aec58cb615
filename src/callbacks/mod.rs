//! Callback handlers for the annotator window.
//!
//! This module contains all UI callback implementations organized by functionality:
//! - `navigation` - Viewport zoom, pan and reset
//! - `drawing` - Pointer gestures, tool and color selection
//! - `selection` - Delete, price prompt and clear all
//! - `backend` - Chart/annotation loading and saving
//! - `teach` - AI analysis and correction capture

pub mod backend;
pub mod drawing;
pub mod navigation;
pub mod selection;
pub mod teach;

use crate::utils::parse_color;
use crate::{AppWindow, UiShape};
use slint::{Model, ModelRc, VecModel, Weak};
use std::sync::{Arc, Mutex};
use tracing::error;
use trade_annotator::client::JournalClient;
use trade_annotator::config::CanvasConfig;
use trade_annotator::error::{AnnotatorError, AnnotatorResult};
use trade_annotator::overlay::TeachSession;
use trade_annotator::render::{RenderGroup, outline_commands};
use trade_annotator::shapes::{Shape, ShapeKind, Stroke};
use trade_annotator::state::{PageSession, SharedSession, lock_session};
use trade_annotator::transform::ViewportTransform;

pub type SharedTeachSession = Arc<Mutex<TeachSession>>;

/// The session behind the open page.
#[derive(Clone)]
pub enum PageHandle {
    Annotate(SharedSession),
    Teach(SharedTeachSession),
}

impl PageHandle {
    /// Run `f` against the page session under its lock.
    pub fn with_page<R>(&self, f: impl FnOnce(&mut PageSession) -> R) -> AnnotatorResult<R> {
        match self {
            PageHandle::Annotate(session) => {
                let mut guard = lock_session(session)?;
                Ok(f(&mut guard))
            }
            PageHandle::Teach(teach) => {
                let mut guard = teach.lock().map_err(|_| AnnotatorError::SessionPoisoned)?;
                Ok(f(&mut guard.page))
            }
        }
    }

    /// Push the session's shapes and viewport into the window.
    pub fn refresh(&self, ui: &AppWindow) -> AnnotatorResult<()> {
        match self {
            PageHandle::Annotate(session) => {
                let mut guard = lock_session(session)?;
                render_page(ui, &mut guard, &[]);
            }
            PageHandle::Teach(teach) => {
                let mut guard = teach.lock().map_err(|_| AnnotatorError::SessionPoisoned)?;
                let teach = &mut *guard;
                render_page(ui, &mut teach.page, &teach.reference);
            }
        }
        Ok(())
    }
}

/// Everything the callbacks need, cloned into each closure.
#[derive(Clone)]
pub struct AppContext {
    pub trade_id: i64,
    pub page: PageHandle,
    pub client: Arc<JournalClient>,
    pub canvas: Arc<CanvasConfig>,
}

/// Sets up all callbacks on the UI.
pub fn register_all(ui: &AppWindow, ctx: &AppContext) {
    navigation::setup_navigation_callbacks(ui, ctx.page.clone(), ctx.canvas.zoom_step);
    drawing::setup_drawing_callbacks(ui, ctx.page.clone(), ctx.canvas.clone());
    selection::setup_selection_callbacks(ui, ctx.page.clone());
    match &ctx.page {
        PageHandle::Annotate(session) => {
            backend::setup_backend_callbacks(ui, session.clone(), ctx.client.clone());
        }
        PageHandle::Teach(teach) => teach::setup_teach_callbacks(ui, ctx, teach.clone()),
    }
}

/// Apply `f` to the page and redraw, alerting on a poisoned session.
pub fn update_page<R>(
    ui: &AppWindow,
    page: &PageHandle,
    f: impl FnOnce(&mut PageSession) -> R,
) -> Option<R> {
    let result = page.with_page(f).and_then(|r| page.refresh(ui).map(|_| r));
    match result {
        Ok(r) => Some(r),
        Err(e) => {
            error!("Page update failed: {e}");
            show_alert(ui, &e.user_message());
            None
        }
    }
}

pub fn show_alert(ui: &AppWindow, message: &str) {
    ui.set_alert_text(message.into());
    ui.set_show_alert(true);
}

/// Alert from a background task.
pub fn show_alert_later(ui_weak: &Weak<AppWindow>, message: String) {
    let _ = ui_weak.upgrade_in_event_loop(move |ui| {
        ui.set_busy(false);
        show_alert(&ui, &message);
    });
}

fn ui_shape(shape: &Shape, viewport: &ViewportTransform) -> UiShape {
    let group = RenderGroup::from_shape(shape);
    let screen = group.screen_geometry(viewport);
    let (label, label_x, label_y) = match group.screen_label(viewport) {
        Some((text, anchor)) => (text, anchor.x as f32, anchor.y as f32),
        None => (String::new(), 0.0, 0.0),
    };
    UiShape {
        commands: outline_commands(&screen, shape.style.stroke).into(),
        color: parse_color(&shape.style.color).unwrap_or(slint::Color::from_rgb_u8(255, 255, 255)),
        label: label.into(),
        label_x,
        label_y,
        selected: shape.selected,
    }
}

fn summary(page: &PageSession) -> String {
    let record = match page.record_id {
        Some(id) => format!("Record #{id}"),
        None => "Not saved yet".to_string(),
    };
    format!(
        "POI {} | BOS {} | Circles {}\n{record}",
        page.shapes.count(ShapeKind::Poi),
        page.shapes.count(ShapeKind::Bos),
        page.shapes.count(ShapeKind::Circle),
    )
}

/// Update shape rows in place when every shape still owns its row; otherwise
/// rebuild the model and rebind each shape to its new row.
fn render_shapes(ui: &AppWindow, page: &mut PageSession, viewport: &ViewportTransform) {
    let model = ui.get_shapes();
    if let Some(rows) = page.shapes.bound_rows() {
        if model.row_count() == rows.len() {
            for ((_, shape), row) in page.shapes.iter().zip(rows) {
                model.set_row_data(row, ui_shape(shape, viewport));
            }
            return;
        }
    }

    let mut rows = Vec::with_capacity(page.shapes.len());
    let mut ids = Vec::with_capacity(page.shapes.len());
    for (id, shape) in page.shapes.iter() {
        rows.push(ui_shape(shape, viewport));
        ids.push(id);
    }
    for (row, id) in ids.into_iter().enumerate() {
        page.shapes.bind_handle(id, row);
    }
    ui.set_shapes(ModelRc::new(VecModel::from(rows)));
}

fn render_page(ui: &AppWindow, page: &mut PageSession, reference: &[Shape]) {
    let viewport = page.viewport;
    render_shapes(ui, page, &viewport);
    let reference_rows: Vec<UiShape> = reference.iter().map(|s| ui_shape(s, &viewport)).collect();

    let preview = page
        .preview
        .map(|g| {
            let screen = g.mapped(|p| viewport.apply(p), viewport.scale_x);
            outline_commands(&screen, Stroke::Dashed)
        })
        .unwrap_or_default();

    ui.set_reference_shapes(ModelRc::new(VecModel::from(reference_rows)));
    ui.set_preview_commands(preview.into());
    if let Some(color) = parse_color(&page.color) {
        ui.set_preview_color(color);
    }
    ui.set_zoom(viewport.zoom() as f32);
    ui.set_pan_x(viewport.translate_x as f32);
    ui.set_pan_y(viewport.translate_y as f32);
    ui.set_chart_width(page.transformer.canvas_width() as f32);
    ui.set_chart_height(page.transformer.canvas_height() as f32);
    ui.set_current_tool(page.tool().as_str().into());
    ui.set_current_color(page.color.as_str().into());
    ui.set_show_price_prompt(page.pending_price.is_some());
    ui.set_summary_text(summary(page).into());
}

#[cfg(test)]
mod tests {
    use super::*;
    use trade_annotator::transform::CoordinateTransformer;

    fn chart() -> CoordinateTransformer {
        CoordinateTransformer::new(2000.0, 1000.0, 1000.0)
    }

    #[test]
    fn with_page_reaches_both_page_kinds() {
        let canvas = CanvasConfig::default();
        let annotate = PageHandle::Annotate(PageSession::new(5, chart(), &canvas).shared());
        let teach = PageHandle::Teach(Arc::new(Mutex::new(TeachSession::new(6, chart(), &canvas))));

        assert_eq!(annotate.with_page(|p| p.trade_id).unwrap(), 5);
        assert_eq!(teach.with_page(|p| p.trade_id).unwrap(), 6);

        annotate.with_page(|p| p.notes = "swept".into()).unwrap();
        assert_eq!(annotate.with_page(|p| p.notes.clone()).unwrap(), "swept");
    }

    #[test]
    fn with_page_reports_a_poisoned_session() {
        let session = PageSession::new(5, chart(), &CanvasConfig::default()).shared();
        let poisoner = session.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the session");
        })
        .join();

        let result = PageHandle::Annotate(session).with_page(|p| p.trade_id);
        assert!(matches!(result, Err(AnnotatorError::SessionPoisoned)));
    }
}
