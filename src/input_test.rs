#![allow(clippy::float_cmp)]

use std::sync::Arc;

use super::*;
use crate::stage::{MemoryStage, Stage};
use crate::viewport::{Rect, Size, ZoomLimits};

fn viewport() -> (ViewportTransform, Arc<MemoryStage>) {
    let stage = Arc::new(MemoryStage::new(Size::new(400.0, 300.0)));
    let mut viewport = ViewportTransform::new(Arc::clone(&stage) as Arc<dyn Stage>, ZoomLimits::default());
    viewport.set_drawing(Rect::new(0.0, 0.0, 100.0, 50.0), None);
    (viewport, stage)
}

fn wheel(dy: f64) -> WheelDelta {
    WheelDelta { dx: 0.0, dy }
}

// --- WheelDelta ---

#[test]
fn wheel_direction_follows_dy_sign() {
    assert_eq!(wheel(-3.0).direction(), Some(ZoomDirection::In));
    assert_eq!(wheel(120.0).direction(), Some(ZoomDirection::Out));
    assert_eq!(wheel(0.0).direction(), None);
    assert_eq!(WheelDelta { dx: 50.0, dy: 0.0 }.direction(), None);
}

// --- Drag ---

#[test]
fn starts_idle() {
    let input = InteractionController::new();
    assert!(!input.drag().active);
}

#[test]
fn pointer_down_starts_drag_at_position() {
    let mut input = InteractionController::new();
    input.pointer_down(Point::new(10.0, 20.0));
    assert_eq!(input.drag(), DragState { active: true, last_pointer: Point::new(10.0, 20.0) });
}

#[test]
fn drag_pans_by_pointer_delta() {
    let (mut vp, _) = viewport();
    let mut input = InteractionController::new();
    input.pointer_down(Point::new(0.0, 0.0));
    let handled = input.pointer_move(Point::new(10.0, 5.0), &mut vp);
    assert_eq!(handled.transform, Some(Transform { x: 10.0, y: 5.0, scale: 1.0 }));
    assert!(!handled.prevent_default);
}

#[test]
fn move_after_release_does_nothing() {
    let (mut vp, _) = viewport();
    let mut input = InteractionController::new();
    input.pointer_down(Point::new(0.0, 0.0));
    input.pointer_move(Point::new(10.0, 5.0), &mut vp);
    input.pointer_up();
    let handled = input.pointer_move(Point::new(20.0, 10.0), &mut vp);
    assert_eq!(handled.transform, None);
    assert_eq!(vp.transform(), Transform { x: 10.0, y: 5.0, scale: 1.0 });
}

#[test]
fn move_without_press_does_nothing() {
    let (mut vp, stage) = viewport();
    let mut input = InteractionController::new();
    input.pointer_move(Point::new(50.0, 50.0), &mut vp);
    assert_eq!(vp.transform(), Transform::IDENTITY);
    assert!(stage.snapshot().applied.is_empty());
}

#[test]
fn drag_deltas_are_incremental() {
    let (mut vp, _) = viewport();
    let mut input = InteractionController::new();
    input.pointer_down(Point::new(100.0, 100.0));
    input.pointer_move(Point::new(110.0, 100.0), &mut vp);
    input.pointer_move(Point::new(130.0, 90.0), &mut vp);
    input.pointer_move(Point::new(125.0, 95.0), &mut vp);
    // Net movement from the press position, not the sum of absolute offsets.
    assert_eq!(vp.transform(), Transform { x: 25.0, y: -5.0, scale: 1.0 });
    assert_eq!(input.drag().last_pointer, Point::new(125.0, 95.0));
}

#[test]
fn pointer_leave_ends_drag() {
    let (mut vp, _) = viewport();
    let mut input = InteractionController::new();
    input.pointer_down(Point::new(0.0, 0.0));
    input.pointer_leave();
    assert!(!input.drag().active);
    assert_eq!(input.pointer_move(Point::new(5.0, 5.0), &mut vp).transform, None);
}

#[test]
fn drag_without_drawing_tracks_pointer_but_does_not_pan() {
    let stage = Arc::new(MemoryStage::new(Size::new(400.0, 300.0)));
    let mut vp = ViewportTransform::new(stage, ZoomLimits::default());
    let mut input = InteractionController::new();
    input.pointer_down(Point::new(0.0, 0.0));
    let handled = input.pointer_move(Point::new(10.0, 10.0), &mut vp);
    assert_eq!(handled.transform, None);
    assert_eq!(input.drag().last_pointer, Point::new(10.0, 10.0));
}

// --- Wheel ---

#[test]
fn wheel_always_prevents_default() {
    let (mut vp, _) = viewport();
    let mut input = InteractionController::new();
    assert!(input.wheel(wheel(-1.0), &mut vp).prevent_default);
    assert!(input.wheel(wheel(1.0), &mut vp).prevent_default);
    assert!(input.wheel(wheel(0.0), &mut vp).prevent_default);
}

#[test]
fn wheel_zooms_one_step_regardless_of_magnitude() {
    let (mut small, _) = viewport();
    let (mut large, _) = viewport();
    let mut input = InteractionController::new();
    let a = input.wheel(wheel(-1.0), &mut small).transform.unwrap();
    let b = input.wheel(wheel(-500.0), &mut large).transform.unwrap();
    assert_eq!(a, b);
    assert!((a.scale - 1.1).abs() < 1e-9);
}

#[test]
fn wheel_down_zooms_out() {
    let (mut vp, _) = viewport();
    let mut input = InteractionController::new();
    let t = input.wheel(wheel(3.0), &mut vp).transform.unwrap();
    assert!((t.scale - 0.9).abs() < 1e-9);
}

#[test]
fn zero_wheel_leaves_transform_alone() {
    let (mut vp, stage) = viewport();
    let mut input = InteractionController::new();
    let handled = input.wheel(wheel(0.0), &mut vp);
    assert_eq!(handled.transform, None);
    assert!(stage.snapshot().applied.is_empty());
}

#[test]
fn wheel_does_not_disturb_drag() {
    let (mut vp, _) = viewport();
    let mut input = InteractionController::new();
    input.pointer_down(Point::new(0.0, 0.0));
    input.wheel(wheel(-1.0), &mut vp);
    assert!(input.drag().active);
}
