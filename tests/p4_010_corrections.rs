// P4-010: Teach page correction capture
// Test: Overlay AI proposals next to the saved annotations, edit some, build the lesson
// Expected: Each proposal pairs its original with the edited image geometry; reference is untouched


use test_helpers::{IMAGE_HEIGHT, IMAGE_WIDTH, MAX_DISPLAY_WIDTH, TRADE_ID, create_basic_record};
use trade_annotator::client::parse_analysis;
use trade_annotator::config::CanvasConfig;
use trade_annotator::drawing::{DrawEvent, Tool};
use trade_annotator::error::AnnotatorError;
use trade_annotator::overlay::{ImageGeometry, TeachSession};
use trade_annotator::shapes::{ShapeKind, Stroke};
use trade_annotator::transform::{CoordinateTransformer, Point};

fn teach_session() -> TeachSession {
    let mut teach = TeachSession::new(
        TRADE_ID,
        CoordinateTransformer::new(IMAGE_WIDTH, IMAGE_HEIGHT, MAX_DISPLAY_WIDTH),
        &CanvasConfig::default(),
    );
    teach.load_reference(&create_basic_record());
    let analysis = parse_analysis(serde_json::json!({
        "annotations": {
            "pois": [{"left": 400, "top": 100, "width": 200, "height": 100, "price": 1.09}],
            "bos_lines": [],
            "circles": [{"x": 1200, "y": 600, "radius": 50}]
        },
        "reasoning": "Sweep of the Asian high"
    }))
    .unwrap();
    teach.load_analysis(&analysis).unwrap();
    teach
}

#[test]
fn proposals_are_dashed_and_reference_is_read_only() {
    let teach = teach_session();
    assert_eq!(teach.proposal_count(), 2);
    assert_eq!(teach.reasoning.as_deref(), Some("Sweep of the Asian high"));
    assert!(teach.page.shapes.iter().all(|(_, s)| s.style.stroke == Stroke::Dashed));

    assert_eq!(teach.reference.len(), 3);
    assert!(teach.reference.iter().all(|s| !s.interactive));
    assert!(teach.reference.iter().all(|s| s.style.stroke == Stroke::Solid));
}

#[test]
fn clicking_reference_shapes_selects_nothing() {
    let mut teach = teach_session();
    teach.page.select_tool(Tool::Cursor);
    // reference POI sits at canvas (100,100)-(180,160)
    teach.page.pointer_down(Point::new(140.0, 130.0));
    teach.page.pointer_up(Point::new(140.0, 130.0));
    assert!(teach.page.shapes.selected().is_empty());
    teach.page.dispatch(DrawEvent::DeleteKey);
    assert_eq!(teach.reference.len(), 3);
}

#[test]
fn zoomed_edit_and_delete_are_reported_in_image_space() {
    let mut teach = teach_session();
    teach.page.zoom_at(2.0, Point::new(0.0, 0.0));

    // proposal box at canvas (200,50)-(300,100) is screen (400,100)-(600,200)
    teach.page.pointer_down(Point::new(500.0, 150.0));
    teach.page.pointer_move(Point::new(520.0, 170.0));
    teach.page.pointer_up(Point::new(520.0, 170.0));

    // circle at canvas (600,300) is screen (1200,600)
    teach.page.pointer_down(Point::new(1200.0, 600.0));
    teach.page.pointer_up(Point::new(1200.0, 600.0));
    teach.page.dispatch(DrawEvent::DeleteKey);

    let lesson = teach.lesson(None);
    assert_eq!(lesson.trade_id, TRADE_ID);
    assert_eq!(lesson.reasoning.as_deref(), Some("Sweep of the Asian high"));

    let poi = lesson.corrections.iter().find(|c| c.kind == "poi").unwrap();
    assert_eq!(
        poi.original,
        ImageGeometry::Box {
            left: 400.0,
            top: 100.0,
            width: 200.0,
            height: 100.0
        }
    );
    assert_eq!(
        poi.corrected,
        Some(ImageGeometry::Box {
            left: 420.0,
            top: 120.0,
            width: 200.0,
            height: 100.0
        })
    );
    assert!(poi.is_change());

    let circle = lesson.corrections.iter().find(|c| c.kind == "circle").unwrap();
    assert_eq!(circle.corrected, None);
    assert_eq!(teach.page.shapes.count(ShapeKind::Circle), 0);
}

#[test]
fn lesson_serializes_deletions_as_null() {
    let mut teach = teach_session();
    teach.page.pointer_down(Point::new(600.0, 300.0));
    teach.page.pointer_up(Point::new(600.0, 300.0));
    teach.page.dispatch(DrawEvent::DeleteKey);

    let json = serde_json::to_value(teach.lesson(Some("price swept, then displaced"))).unwrap();
    assert_eq!(json["trade_id"], TRADE_ID);
    assert_eq!(json["reasoning"], "price swept, then displaced");
    let corrections = json["corrections"].as_array().unwrap();
    assert_eq!(corrections.len(), 2);
    assert_eq!(corrections[0]["corrected"]["left"], 400.0);
    assert!(corrections[1]["corrected"].is_null());
    assert_eq!(corrections[1]["original"]["radius"], 50.0);
}

#[test]
fn new_analysis_replaces_previous_overlay() {
    let mut teach = teach_session();
    teach.load_analysis(&Default::default()).unwrap();
    assert_eq!(teach.proposal_count(), 0);
    assert!(teach.page.shapes.is_empty());
    assert!(teach.lesson(None).corrections.is_empty());
    assert_eq!(teach.reference.len(), 3);
}

#[test]
fn analysis_before_chart_load_is_refused() {
    let mut teach = TeachSession::awaiting_chart(TRADE_ID, &CanvasConfig::default());
    let analysis = parse_analysis(serde_json::json!({
        "pois": [{"left": 400, "top": 100, "width": 200, "height": 100}]
    }))
    .unwrap();
    let err = teach.load_analysis(&analysis).unwrap_err();
    assert!(matches!(err, AnnotatorError::ChartNotReady));
    assert!(teach.page.shapes.is_empty());

    teach.page.install_chart(CoordinateTransformer::new(IMAGE_WIDTH, IMAGE_HEIGHT, MAX_DISPLAY_WIDTH));
    teach.page.mark_chart_ready();
    teach.load_analysis(&analysis).unwrap();

    // Untouched proposals come back exactly as proposed.
    let lesson = teach.lesson(None);
    assert_eq!(lesson.corrections.len(), 1);
    assert!(!lesson.corrections[0].is_change());
    assert_eq!(
        lesson.corrections[0].corrected,
        Some(ImageGeometry::Box {
            left: 400.0,
            top: 100.0,
            width: 200.0,
            height: 100.0
        })
    );
}

#[test]
fn null_shape_lists_in_analysis_default_to_empty() {
    let analysis = parse_analysis(serde_json::json!({
        "pois": [{"left": 400, "top": 100, "width": 200, "height": 100}],
        "bos_lines": null,
        "circles": null,
        "reasoning": "only one zone"
    }))
    .unwrap();
    assert_eq!(analysis.pois.len(), 1);
    assert!(analysis.bos_lines.is_empty());
    assert!(analysis.circles.is_empty());
    assert_eq!(analysis.reasoning.as_deref(), Some("only one zone"));
}
