// P1-010: Saved geometry is independent of zoom and pan
// Test: Draw and save the same shapes under many viewports
// Expected: Identical image-space payloads every time


use test_helpers::{create_session, draw};
use trade_annotator::drawing::Tool;
use trade_annotator::persistence::build_record;
use trade_annotator::transform::{Point, ViewportTransform};

const ZOOMS: [f64; 6] = [0.1, 0.25, 1.0, 1.7, 3.0, 5.0];
const PANS: [(f64, f64); 3] = [(0.0, 0.0), (-300.0, 120.0), (45.5, -80.25)];

fn screen(vp: &ViewportTransform, x: f64, y: f64) -> (f64, f64) {
    let p = vp.apply(Point::new(x, y));
    (p.x, p.y)
}

#[test]
fn shapes_drawn_under_any_viewport_save_identically() {
    for zoom in ZOOMS {
        for (tx, ty) in PANS {
            let mut s = create_session();
            let vp = ViewportTransform::new(zoom, tx, ty);
            s.viewport = vp;
            draw(&mut s, Tool::Poi, screen(&vp, 100.0, 100.0), screen(&vp, 180.0, 160.0));
            draw(&mut s, Tool::Bos, screen(&vp, 50.0, 300.0), screen(&vp, 450.0, 300.0));
            draw(&mut s, Tool::Circle, screen(&vp, 750.0, 200.0), screen(&vp, 770.0, 200.0));

            let record = build_record(&s);
            let poi = &record.pois[0];
            assert_eq!(
                (poi.left, poi.top, poi.width, poi.height),
                (200.0, 200.0, 160.0, 120.0),
                "zoom {zoom} pan ({tx}, {ty})"
            );
            let bos = &record.bos_lines[0];
            assert_eq!((bos.x1, bos.y1, bos.x2, bos.y2), (100.0, 600.0, 900.0, 600.0));
            let circle = &record.circles[0];
            assert_eq!((circle.x, circle.y, circle.radius), (1500.0, 400.0, 40.0));
        }
    }
}

#[test]
fn zooming_after_drawing_does_not_move_saved_shapes() {
    let mut s = create_session();
    draw(&mut s, Tool::Poi, (100.0, 100.0), (180.0, 160.0));
    let before = build_record(&s);

    s.zoom_at(2.5, Point::new(333.0, 127.0));
    s.pan(-90.0, 40.0);
    s.zoom_at(0.3, Point::new(12.0, 480.0));
    let after = build_record(&s);

    assert_eq!(before.pois, after.pois);
}

#[test]
fn zoom_keeps_point_under_cursor_fixed() {
    let mut s = create_session();
    s.pan(20.0, -15.0);
    let anchor = Point::new(400.0, 250.0);
    let before = s.to_canvas(anchor);
    s.zoom_at(1.1, anchor);
    s.zoom_at(1.1, anchor);
    let after = s.to_canvas(anchor);
    assert!((before.x - after.x).abs() < 1e-9);
    assert!((before.y - after.y).abs() < 1e-9);
}

#[test]
fn zoom_is_clamped_between_limits() {
    let mut s = create_session();
    for _ in 0..100 {
        s.zoom_at(1.1, Point::new(0.0, 0.0));
    }
    assert_eq!(s.viewport.zoom(), 5.0);
    for _ in 0..200 {
        s.zoom_at(1.0 / 1.1, Point::new(0.0, 0.0));
    }
    assert_eq!(s.viewport.zoom(), 0.1);
    s.reset_zoom();
    assert_eq!(s.viewport, ViewportTransform::identity());
}
