//! Drawing callbacks.
//!
//! Handles: pointer_down, pointer_move, pointer_up, double_click, select_tool, select_color

use super::{PageHandle, update_page};
use crate::{AppWindow, PaletteEntry, ToolEntry};
use crate::utils::parse_color;
use slint::{ComponentHandle, ModelRc, VecModel};
use std::sync::Arc;
use tracing::{debug, warn};
use trade_annotator::config::CanvasConfig;
use trade_annotator::drawing::{Effect, Tool};
use trade_annotator::transform::Point;

/// Sets up all drawing-related callbacks on the UI.
pub fn setup_drawing_callbacks(ui: &AppWindow, page: PageHandle, canvas: Arc<CanvasConfig>) {
    setup_pointer_down(ui, page.clone());
    setup_pointer_move(ui, page.clone());
    setup_pointer_up(ui, page.clone());
    setup_double_click(ui, page.clone());
    setup_select_tool(ui, page.clone(), canvas);
    setup_select_color(ui, page);
}

/// Toolbar entries. The teach page only edits existing proposals.
pub fn tool_entries(teach_mode: bool) -> ModelRc<ToolEntry> {
    let tools: &[(Tool, &str)] = if teach_mode {
        &[(Tool::Cursor, "Select"), (Tool::Delete, "Delete")]
    } else {
        &[
            (Tool::Cursor, "Select"),
            (Tool::Poi, "POI"),
            (Tool::Ifvg, "IFVG"),
            (Tool::Bos, "BOS"),
            (Tool::Circle, "Circle"),
            (Tool::Delete, "Delete"),
        ]
    };
    let entries: Vec<ToolEntry> = tools
        .iter()
        .map(|(tool, title)| ToolEntry {
            name: tool.as_str().into(),
            title: (*title).into(),
        })
        .collect();
    ModelRc::new(VecModel::from(entries))
}

pub fn palette_entries(canvas: &CanvasConfig) -> ModelRc<PaletteEntry> {
    let mut hexes = vec![
        canvas.poi_color.clone(),
        canvas.ifvg_color.clone(),
        canvas.bos_color.clone(),
        canvas.circle_color.clone(),
        "#f1c40f".to_string(),
        "#ffffff".to_string(),
    ];
    hexes.dedup();
    let entries: Vec<PaletteEntry> = hexes
        .into_iter()
        .filter_map(|hex| {
            let swatch = parse_color(&hex)?;
            Some(PaletteEntry {
                hex: hex.into(),
                swatch,
            })
        })
        .collect();
    ModelRc::new(VecModel::from(entries))
}

fn screen_point(x: f32, y: f32) -> Point {
    Point::new(x as f64, y as f64)
}

fn setup_pointer_down(ui: &AppWindow, page: PageHandle) {
    let ui_weak = ui.as_weak();
    ui.on_pointer_down(move |x, y| {
        let Some(ui) = ui_weak.upgrade() else { return };
        update_page(&ui, &page, |p| p.pointer_down(screen_point(x, y)));
    });
}

fn setup_pointer_move(ui: &AppWindow, page: PageHandle) {
    let ui_weak = ui.as_weak();
    ui.on_pointer_move(move |x, y| {
        let Some(ui) = ui_weak.upgrade() else { return };
        update_page(&ui, &page, |p| p.pointer_move(screen_point(x, y)));
    });
}

fn setup_pointer_up(ui: &AppWindow, page: PageHandle) {
    let ui_weak = ui.as_weak();
    ui.on_pointer_up(move |x, y| {
        let Some(ui) = ui_weak.upgrade() else { return };
        let effects = update_page(&ui, &page, |p| p.pointer_up(screen_point(x, y)));
        if let Some(effects) = effects {
            if effects.iter().any(|e| matches!(e, Effect::Commit(_))) {
                debug!("Shape committed");
            }
        }
    });
}

fn setup_double_click(ui: &AppWindow, page: PageHandle) {
    let ui_weak = ui.as_weak();
    ui.on_double_click(move |x, y| {
        let Some(ui) = ui_weak.upgrade() else { return };
        let Some(effects) = update_page(&ui, &page, |p| p.double_click(screen_point(x, y))) else {
            return;
        };
        for effect in effects {
            if let Effect::PromptPrice { current, .. } = effect {
                let text = if current == 0.0 { String::new() } else { current.to_string() };
                ui.set_price_text(text.into());
            }
        }
    });
}

fn setup_select_tool(ui: &AppWindow, page: PageHandle, canvas: Arc<CanvasConfig>) {
    let ui_weak = ui.as_weak();
    ui.on_select_tool(move |name| {
        let Some(ui) = ui_weak.upgrade() else { return };
        let Some(tool) = Tool::from_name(&name) else {
            warn!("Unknown tool {name}");
            return;
        };
        update_page(&ui, &page, |p| {
            if tool.is_drawing() {
                p.color = canvas.color_for(tool).to_string();
            }
            p.select_tool(tool);
        });
        ui.set_status_text(format!("Tool: {}", tool.as_str()).into());
    });
}

fn setup_select_color(ui: &AppWindow, page: PageHandle) {
    let ui_weak = ui.as_weak();
    ui.on_select_color(move |hex| {
        let Some(ui) = ui_weak.upgrade() else { return };
        update_page(&ui, &page, |p| {
            p.color = hex.to_string();
            // Re-arm so the next shape picks up the new color.
            let tool = p.tool();
            if tool.is_drawing() {
                p.select_tool(tool);
            }
        });
    });
}
