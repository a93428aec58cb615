//! Teach page callbacks.
//!
//! Handles: analyze, save_corrections

use super::{AppContext, PageHandle, SharedTeachSession, show_alert, show_alert_later};
use crate::AppWindow;
use slint::ComponentHandle;
use std::sync::Arc;
use tracing::{error, info};
use trade_annotator::client::JournalClient;
use trade_annotator::error::{AnnotatorError, AnnotatorResult};
use trade_annotator::overlay::{AiAnalysis, LessonRecord, TeachingBackend};

/// Sets up all teach-related callbacks on the UI.
pub fn setup_teach_callbacks(ui: &AppWindow, ctx: &AppContext, teach: SharedTeachSession) {
    setup_analyze(ui, ctx.trade_id, ctx.client.clone(), teach.clone());
    setup_save_corrections(ui, ctx.client.clone(), teach);
}

fn apply_analysis(teach: &SharedTeachSession, analysis: &AiAnalysis) -> AnnotatorResult<(usize, String)> {
    let mut guard = teach.lock().map_err(|_| AnnotatorError::SessionPoisoned)?;
    guard.load_analysis(analysis)?;
    Ok((guard.proposal_count(), guard.reasoning.clone().unwrap_or_default()))
}

fn chart_ready(teach: &SharedTeachSession) -> AnnotatorResult<bool> {
    let guard = teach.lock().map_err(|_| AnnotatorError::SessionPoisoned)?;
    Ok(guard.page.chart_ready())
}

fn build_lesson(teach: &SharedTeachSession, reasoning_override: &str) -> AnnotatorResult<LessonRecord> {
    let guard = teach.lock().map_err(|_| AnnotatorError::SessionPoisoned)?;
    Ok(guard.lesson(Some(reasoning_override)))
}

fn setup_analyze(ui: &AppWindow, trade_id: i64, client: Arc<JournalClient>, teach: SharedTeachSession) {
    let ui_weak = ui.as_weak();
    ui.on_analyze(move || {
        let Some(ui) = ui_weak.upgrade() else { return };
        match chart_ready(&teach) {
            Ok(true) => {}
            Ok(false) => return show_alert(&ui, &AnnotatorError::ChartNotReady.user_message()),
            Err(e) => return show_alert(&ui, &e.user_message()),
        }
        ui.set_busy(true);
        ui.set_status_text("Asking the model to analyze the chart".into());

        let client = client.clone();
        let teach = teach.clone();
        let ui_weak = ui.as_weak();
        tokio::spawn(async move {
            let analysis = match client.analyze_chart(trade_id).await {
                Ok(analysis) => analysis,
                Err(e) => {
                    error!("Analysis failed: {e}");
                    show_alert_later(&ui_weak, format!("Analysis failed: {}", e.user_message()));
                    return;
                }
            };
            let applied = apply_analysis(&teach, &analysis);
            let _ = ui_weak.upgrade_in_event_loop(move |ui| {
                ui.set_busy(false);
                match applied {
                    Ok((count, reasoning)) => {
                        info!("Showing {count} AI proposal(s)");
                        ui.set_reasoning(reasoning.into());
                        ui.set_status_text(
                            format!("{count} proposal(s). Drag, resize or delete to correct them.").into(),
                        );
                    }
                    Err(e) => show_alert(&ui, &e.user_message()),
                }
                if let Err(e) = PageHandle::Teach(teach).refresh(&ui) {
                    show_alert(&ui, &e.user_message());
                }
            });
        });
    });
}

fn setup_save_corrections(ui: &AppWindow, client: Arc<JournalClient>, teach: SharedTeachSession) {
    let ui_weak = ui.as_weak();
    ui.on_save_corrections(move || {
        let Some(ui) = ui_weak.upgrade() else { return };
        let lesson = match build_lesson(&teach, &ui.get_reasoning_override()) {
            Ok(lesson) => lesson,
            Err(e) => {
                show_alert(&ui, &e.user_message());
                return;
            }
        };
        if lesson.corrections.is_empty() {
            show_alert(&ui, "Nothing to save yet. Run Analyze first.");
            return;
        }
        let changed = lesson.corrections.iter().filter(|c| c.is_change()).count();
        ui.set_busy(true);
        ui.set_status_text("Saving corrections".into());

        let client = client.clone();
        let ui_weak = ui.as_weak();
        tokio::spawn(async move {
            let total = lesson.corrections.len();
            let result = client.submit_lesson(&lesson).await;
            let _ = ui_weak.upgrade_in_event_loop(move |ui| {
                ui.set_busy(false);
                match result {
                    Ok(_) => ui.set_status_text(
                        format!("Saved {total} correction(s), {changed} changed").into(),
                    ),
                    Err(e) => {
                        error!("Lesson submit failed: {e}");
                        show_alert(&ui, &format!("Could not save corrections: {}", e.user_message()));
                    }
                }
            });
        });
    });
}
