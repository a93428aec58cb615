//! Viewport callbacks.
//!
//! Handles: zoom_by (scroll wheel), pan_by (middle drag / space drag), reset_zoom

use super::{PageHandle, update_page};
use crate::AppWindow;
use slint::ComponentHandle;
use trade_annotator::transform::Point;

/// Sets up all viewport-related callbacks on the UI.
pub fn setup_navigation_callbacks(ui: &AppWindow, page: PageHandle, zoom_step: f64) {
    setup_zoom_by(ui, page.clone(), zoom_step);
    setup_pan_by(ui, page.clone());
    setup_reset_zoom(ui, page);
}

/// Scroll zoom factor: positive wheel delta zooms in.
pub fn wheel_factor(delta: f32, zoom_step: f64) -> Option<f64> {
    if delta > 0.0 {
        Some(zoom_step)
    } else if delta < 0.0 {
        Some(1.0 / zoom_step)
    } else {
        None
    }
}

fn setup_zoom_by(ui: &AppWindow, page: PageHandle, zoom_step: f64) {
    let ui_weak = ui.as_weak();
    ui.on_zoom_by(move |delta, x, y| {
        let Some(factor) = wheel_factor(delta, zoom_step) else { return };
        let Some(ui) = ui_weak.upgrade() else { return };
        let anchor = Point::new(x as f64, y as f64);
        update_page(&ui, &page, |p| p.zoom_at(factor, anchor));
    });
}

fn setup_pan_by(ui: &AppWindow, page: PageHandle) {
    let ui_weak = ui.as_weak();
    ui.on_pan_by(move |dx, dy| {
        let Some(ui) = ui_weak.upgrade() else { return };
        update_page(&ui, &page, |p| p.pan(dx as f64, dy as f64));
    });
}

fn setup_reset_zoom(ui: &AppWindow, page: PageHandle) {
    let ui_weak = ui.as_weak();
    ui.on_reset_zoom(move || {
        let Some(ui) = ui_weak.upgrade() else { return };
        update_page(&ui, &page, |p| p.reset_zoom());
    });
}
