// P2-020: Drawing tools suspend selection
// Test: Click existing shapes while a drawing tool is armed, then switch to cursor
// Expected: No selection while armed; selection works again right after switching


use test_helpers::{click, create_session, draw};
use trade_annotator::drawing::{DrawState, Tool};
use trade_annotator::shapes::ShapeKind;

#[test]
fn armed_bos_does_not_select_existing_shapes() {
    let mut s = create_session();
    draw(&mut s, Tool::Poi, (100.0, 100.0), (180.0, 160.0));
    s.select_tool(Tool::Cursor);
    click(&mut s, (140.0, 130.0));
    assert_eq!(s.shapes.selected().len(), 1);

    s.select_tool(Tool::Bos);
    assert!(s.shapes.selected().is_empty());
    assert!(s.shapes.iter().all(|(_, shape)| !shape.interactive));

    // Clicking the box draws a zero-length line instead of selecting it.
    click(&mut s, (140.0, 130.0));
    assert!(s.shapes.selected().is_empty());
    assert_eq!(s.shapes.count(ShapeKind::Bos), 1);
    assert!(matches!(s.state(), DrawState::Armed { tool: Tool::Bos, .. }));
}

#[test]
fn switching_to_cursor_reenables_every_shape() {
    let mut s = create_session();
    draw(&mut s, Tool::Poi, (100.0, 100.0), (180.0, 160.0));
    draw(&mut s, Tool::Circle, (400.0, 300.0), (430.0, 300.0));
    assert!(s.shapes.iter().all(|(_, shape)| !shape.interactive));

    s.select_tool(Tool::Cursor);
    assert!(s.shapes.iter().all(|(_, shape)| shape.interactive));
    click(&mut s, (400.0, 300.0));
    let selected = s.shapes.selected();
    assert_eq!(selected.len(), 1);
    assert_eq!(s.shapes.get(selected[0]).unwrap().kind, ShapeKind::Circle);
}

#[test]
fn only_one_tool_is_current() {
    let mut s = create_session();
    for tool in [Tool::Poi, Tool::Ifvg, Tool::Bos, Tool::Circle, Tool::Cursor] {
        s.select_tool(tool);
        assert_eq!(s.tool(), tool);
    }
    s.select_tool(Tool::Delete);
    assert_eq!(s.tool(), Tool::Cursor);
}

#[test]
fn tool_switch_mid_gesture_discards_preview() {
    let mut s = create_session();
    s.select_tool(Tool::Poi);
    s.pointer_down(trade_annotator::transform::Point::new(10.0, 10.0));
    s.pointer_move(trade_annotator::transform::Point::new(90.0, 90.0));
    assert!(s.preview.is_some());
    s.select_tool(Tool::Circle);
    assert_eq!(s.preview, None);
    assert!(s.shapes.is_empty());
}
