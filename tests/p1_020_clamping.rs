// P1-020: Saved coordinates stay inside the image
// Test: Shapes drawn or dragged past the chart edges
// Expected: Every persisted coordinate is clamped to [0, width] x [0, height]


use test_helpers::{IMAGE_HEIGHT, IMAGE_WIDTH, create_session, drag, draw};
use trade_annotator::drawing::Tool;
use trade_annotator::persistence::build_record;

#[test]
fn box_past_top_left_keeps_in_image_part() {
    let mut s = create_session();
    // canvas (-50,-30)..(60,40) is image (-100,-60)..(120,80)
    draw(&mut s, Tool::Poi, (-50.0, -30.0), (60.0, 40.0));
    let poi = &build_record(&s).pois[0];
    assert_eq!((poi.left, poi.top, poi.width, poi.height), (0.0, 0.0, 120.0, 80.0));
}

#[test]
fn box_dragged_off_bottom_right_is_clamped() {
    let mut s = create_session();
    draw(&mut s, Tool::Poi, (900.0, 400.0), (980.0, 480.0));
    s.select_tool(Tool::Cursor);
    drag(&mut s, (940.0, 440.0), (1040.0, 540.0));

    let poi = &build_record(&s).pois[0];
    assert_eq!(poi.left, 2000.0);
    assert_eq!(poi.top, 1000.0);
    assert_eq!(poi.width, 0.0);
    assert_eq!(poi.height, 0.0);
    assert!(poi.left + poi.width <= IMAGE_WIDTH);
    assert!(poi.top + poi.height <= IMAGE_HEIGHT);
}

#[test]
fn line_endpoints_and_circle_centers_are_clamped() {
    let mut s = create_session();
    draw(&mut s, Tool::Bos, (-20.0, 100.0), (1200.0, 100.0));
    draw(&mut s, Tool::Circle, (1005.0, 520.0), (1025.0, 520.0));

    let record = build_record(&s);
    let bos = &record.bos_lines[0];
    assert_eq!((bos.x1, bos.x2), (0.0, IMAGE_WIDTH));
    assert_eq!(bos.y1, 200.0);
    let circle = &record.circles[0];
    assert_eq!((circle.x, circle.y), (IMAGE_WIDTH, IMAGE_HEIGHT));
    assert_eq!(circle.radius, 40.0);
}

#[test]
fn clamping_applies_under_zoom() {
    let mut s = create_session();
    s.zoom_at(4.0, trade_annotator::transform::Point::new(0.0, 0.0));
    s.pan(-3000.0, -1500.0);
    // screen (3000,1500)..(3200,1700) is canvas (1500,750)..(1550,800), past the image
    draw(&mut s, Tool::Poi, (3000.0, 1500.0), (3200.0, 1700.0));
    let poi = &build_record(&s).pois[0];
    assert_eq!((poi.left, poi.top), (IMAGE_WIDTH, IMAGE_HEIGHT));
}
