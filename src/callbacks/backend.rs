//! Backend callbacks.
//!
//! Handles: initial chart + annotation load, save

use super::{AppContext, PageHandle, SharedTeachSession, show_alert, show_alert_later};
use crate::AppWindow;
use crate::utils::decode_chart;
use slint::ComponentHandle;
use std::sync::Arc;
use tracing::{error, info, warn};
use trade_annotator::client::JournalClient;
use trade_annotator::error::{AnnotatorError, AnnotatorResult};
use trade_annotator::persistence::{self, AnnotationRecord, SaveMethod};
use trade_annotator::state::{SharedSession, lock_session};
use trade_annotator::transform::CoordinateTransformer;

/// Sets up save on the annotate page.
pub fn setup_backend_callbacks(ui: &AppWindow, session: SharedSession, client: Arc<JournalClient>) {
    setup_save(ui, session, client);
}

fn load_reference(teach: &SharedTeachSession, record: &AnnotationRecord) -> AnnotatorResult<usize> {
    let mut guard = teach.lock().map_err(|_| AnnotatorError::SessionPoisoned)?;
    guard.load_reference(record);
    Ok(guard.reference.len())
}

/// Fetch trade metadata, the chart image and existing annotations.
///
/// Annotations are only placed once the chart's natural size is known, since
/// canvas positions depend on the display scale. The page stays not ready when
/// the chart fails, and on the annotate page when saved annotations fail to
/// load, so a save can never overwrite the stored record with a blank canvas.
pub fn load_page(ui: &AppWindow, ctx: &AppContext) {
    let ui_weak = ui.as_weak();
    let ctx = ctx.clone();
    ui.set_busy(true);
    ui.set_status_text(format!("Loading trade {}", ctx.trade_id).into());

    tokio::spawn(async move {
        match ctx.client.get_trade(ctx.trade_id).await {
            Ok(trade) => {
                let title = format!("Trade #{} {} {}", trade.id, trade.symbol, trade.direction);
                let _ = ui_weak.upgrade_in_event_loop(move |ui| ui.set_trade_title(title.trim().into()));
            }
            Err(e) => warn!("Trade metadata unavailable: {e}"),
        }

        let chart = match ctx.client.chart_bytes(ctx.trade_id).await {
            Ok(bytes) => decode_chart(&bytes),
            Err(e) => Err(e),
        };
        let chart = match chart {
            Ok(chart) => chart,
            Err(e) => {
                error!("Chart load failed: {e}");
                show_alert_later(&ui_weak, format!("Could not load chart: {}", e.user_message()));
                return;
            }
        };
        info!("Chart is {}x{}", chart.width, chart.height);
        let transformer = CoordinateTransformer::new(
            chart.width as f64,
            chart.height as f64,
            ctx.canvas.max_display_width,
        );
        if let Err(e) = ctx.page.with_page(|p| p.install_chart(transformer)) {
            show_alert_later(&ui_weak, e.user_message());
            return;
        }

        let status = match &ctx.page {
            PageHandle::Annotate(session) => {
                match persistence::load(session, ctx.client.as_ref()).await {
                    Ok(true) => Ok("Loaded saved annotations".to_string()),
                    Ok(false) => Ok("No saved annotations yet".to_string()),
                    Err(e) => Err(e),
                }
            }
            PageHandle::Teach(teach) => match ctx.client.get_annotation(ctx.trade_id).await {
                Ok(Some(record)) => load_reference(teach, &record)
                    .map(|n| format!("{n} annotation(s) shown for reference. Run Analyze.")),
                Ok(None) => Ok("No saved annotations. Run Analyze.".to_string()),
                Err(e) => Err(e),
            },
        };

        let ready = match (&ctx.page, &status) {
            (PageHandle::Annotate(_), Err(_)) => false,
            _ => ctx.page.with_page(|p| p.mark_chart_ready()).is_ok(),
        };

        let page = ctx.page.clone();
        let _ = ui_weak.upgrade_in_event_loop(move |ui| {
            ui.set_busy(false);
            ui.set_chart_ready(ready);
            ui.set_chart(slint::Image::from_rgba8(chart.pixels));
            if let Ok(notes) = page.with_page(|p| p.notes.clone()) {
                ui.set_notes(notes.into());
            }
            match status {
                Ok(text) => ui.set_status_text(text.into()),
                Err(e) => {
                    error!("Annotation load failed: {e}");
                    show_alert(&ui, &format!("Could not load annotations: {}", e.user_message()));
                }
            }
            if let Err(e) = page.refresh(&ui) {
                show_alert(&ui, &e.user_message());
            }
        });
    });
}

fn setup_save(ui: &AppWindow, session: SharedSession, client: Arc<JournalClient>) {
    let ui_weak = ui.as_weak();
    ui.on_save(move || {
        let Some(ui) = ui_weak.upgrade() else { return };
        match lock_session(&session) {
            Ok(mut s) => s.notes = ui.get_notes().to_string(),
            Err(e) => {
                show_alert(&ui, &e.user_message());
                return;
            }
        }
        ui.set_busy(true);
        ui.set_status_text("Saving".into());

        let session = session.clone();
        let client = client.clone();
        let ui_weak = ui.as_weak();
        tokio::spawn(async move {
            let result = persistence::save(&session, client.as_ref()).await;
            let _ = ui_weak.upgrade_in_event_loop(move |ui| {
                ui.set_busy(false);
                match result {
                    Ok(outcome) => {
                        let verb = match outcome.method {
                            SaveMethod::Post => "Created",
                            SaveMethod::Put => "Updated",
                        };
                        let id = outcome
                            .record_id
                            .map(|id| format!(" #{id}"))
                            .unwrap_or_default();
                        ui.set_status_text(format!("{verb} annotation record{id}").into());
                    }
                    Err(e) => {
                        error!("Save failed: {e}");
                        show_alert(&ui, &format!("Save failed: {}", e.user_message()));
                    }
                }
                if let Err(e) = PageHandle::Annotate(session).refresh(&ui) {
                    show_alert(&ui, &e.user_message());
                }
            });
        });
    });
}
