//! Selection callbacks for shape management.
//!
//! Handles: delete_selected, price_entered, price_cancelled, clear_all, dismiss_alert

use super::{PageHandle, update_page};
use crate::AppWindow;
use slint::ComponentHandle;
use trade_annotator::drawing::DrawEvent;

/// Sets up all selection-related callbacks on the UI.
pub fn setup_selection_callbacks(ui: &AppWindow, page: PageHandle) {
    setup_delete_selected(ui, page.clone());
    setup_price_entered(ui, page.clone());
    setup_price_cancelled(ui, page.clone());
    setup_clear_all(ui, page);
    setup_dismiss_alert(ui);
}

fn setup_delete_selected(ui: &AppWindow, page: PageHandle) {
    let ui_weak = ui.as_weak();
    ui.on_delete_selected(move || {
        let Some(ui) = ui_weak.upgrade() else { return };
        // Keys typed into the price prompt never reach the canvas.
        if ui.get_show_price_prompt() {
            return;
        }
        update_page(&ui, &page, |p| p.dispatch(DrawEvent::DeleteKey));
    });
}

fn setup_price_entered(ui: &AppWindow, page: PageHandle) {
    let ui_weak = ui.as_weak();
    ui.on_price_entered(move |text| {
        let Some(ui) = ui_weak.upgrade() else { return };
        update_page(&ui, &page, |p| {
            if let Some(id) = p.pending_price {
                p.dispatch(DrawEvent::PriceEntered {
                    id,
                    text: text.to_string(),
                });
            }
        });
        ui.set_price_text("".into());
    });
}

fn setup_price_cancelled(ui: &AppWindow, page: PageHandle) {
    let ui_weak = ui.as_weak();
    ui.on_price_cancelled(move || {
        let Some(ui) = ui_weak.upgrade() else { return };
        update_page(&ui, &page, |p| p.pending_price = None);
        ui.set_price_text("".into());
    });
}

fn setup_clear_all(ui: &AppWindow, page: PageHandle) {
    let ui_weak = ui.as_weak();
    ui.on_clear_all(move || {
        let Some(ui) = ui_weak.upgrade() else { return };
        update_page(&ui, &page, |p| p.dispatch(DrawEvent::ClearAll));
        ui.set_status_text("Cleared all shapes (not saved)".into());
    });
}

fn setup_dismiss_alert(ui: &AppWindow) {
    let ui_weak = ui.as_weak();
    ui.on_dismiss_alert(move || {
        if let Some(ui) = ui_weak.upgrade() {
            ui.set_show_alert(false);
        }
    });
}
