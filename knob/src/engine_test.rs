#![allow(clippy::float_cmp)]

use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::angle::degrees_to_radians;
use crate::host::Rect;

// =============================================================
// Helpers
// =============================================================

type Log = Rc<RefCell<Vec<String>>>;

/// Records cursor calls as `"grabbing"` / `"hidden"`.
struct RecordingCursor(Log);

impl CursorOverlay for RecordingCursor {
    fn show(&mut self, style: CursorStyle) {
        self.0.borrow_mut().push(style.as_css().to_string());
    }

    fn hide(&mut self) {
        self.0.borrow_mut().push("hidden".to_string());
    }
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// 0..270 degrees onto 0..1, published from 225 degrees, starting at 0.3.
fn dial() -> KnobOptions {
    KnobOptions::default().with_angle_range(0.0, 270.0).with_start_angle(225.0).with_default_value(0.3)
}

/// Knob attached to a 100x100 rect at the origin (pivot 50,50).
fn knob(options: KnobOptions) -> (Knob, Log) {
    let cursor = Log::default();
    let mut knob = Knob::with_cursor(options, Box::new(RecordingCursor(Rc::clone(&cursor)))).unwrap();
    knob.attach(Box::new(Rect::new(0.0, 0.0, 100.0, 100.0)));
    (knob, cursor)
}

/// Point 40px from the pivot at `deg` degrees.
fn at(deg: f64) -> Point {
    let r = degrees_to_radians(deg);
    Point::new(50.0 + 40.0 * r.cos(), 50.0 + 40.0 * r.sin())
}

fn statuses(events: &[KnobEvent]) -> Vec<RotationStatus> {
    events
        .iter()
        .filter_map(|e| match e {
            KnobEvent::StatusChanged { status } => Some(*status),
            _ => None,
        })
        .collect()
}

fn values(events: &[KnobEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            KnobEvent::ValueChanged { value, .. } => Some(*value),
            _ => None,
        })
        .collect()
}

/// Drag from `from` through each angle in `path`, without releasing.
fn drag(knob: &mut Knob, from: f64, path: &[f64]) -> Vec<KnobEvent> {
    let mut events = knob.pointer_down(at(from));
    for deg in path {
        events.extend(knob.pointer_move(at(*deg)));
    }
    events
}

fn release(knob: &mut Knob) -> Vec<KnobEvent> {
    let mut events = knob.pointer_up(Point::default());
    events.extend(knob.tick());
    events
}

// =============================================================
// Construction
// =============================================================

#[test]
fn publishes_default_value_and_angle() {
    let (knob, _) = knob(dial());
    assert!(approx(knob.value(), 0.3));
    assert!(approx(knob.angle(), 306.0));
    assert!(approx(knob.normalized_angle(), 306.0));
    assert_eq!(knob.status(), RotationStatus::Idle);
}

#[test]
fn invalid_options_fail_construction() {
    let err = Knob::new(KnobOptions::default().with_angle_range(0.0, 270.0).with_value_range(1.0, 0.0)).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValueRange { .. }));
}

#[test]
fn attach_registers_three_listeners_and_detach_is_idempotent() {
    let (mut knob, _) = knob(dial());
    assert!(knob.is_attached());
    assert_eq!(knob.engine().listeners().len(), 3);

    assert!(knob.detach().is_some());
    assert!(knob.engine().listeners().is_empty());
    assert!(knob.detach().is_none());
    assert!(knob.engine().listeners().is_empty());
}

// =============================================================
// Gesture flow
// =============================================================

#[test]
fn drag_reports_status_sequence() {
    let (mut knob, _) = knob(dial());
    let mut events = drag(&mut knob, 0.0, &[10.0, 20.0]);
    events.extend(release(&mut knob));
    assert_eq!(
        statuses(&events),
        vec![
            RotationStatus::Begin,
            RotationStatus::Rotating,
            RotationStatus::Rotating,
            RotationStatus::End,
            RotationStatus::Idle,
        ]
    );
}

#[test]
fn end_and_idle_are_separate_calls() {
    let (mut knob, _) = knob(dial());
    drag(&mut knob, 0.0, &[10.0]);
    let up = knob.pointer_up(Point::default());
    assert_eq!(statuses(&up), vec![RotationStatus::End]);
    assert_eq!(knob.status(), RotationStatus::End);
    assert_eq!(statuses(&knob.tick()), vec![RotationStatus::Idle]);
    assert!(knob.tick().is_empty());
}

#[test]
fn rotation_tick_emits_value_then_delta_then_status() {
    let (mut knob, _) = knob(dial());
    knob.pointer_down(at(0.0));
    let events = knob.pointer_move(at(27.0));
    assert_eq!(events.len(), 3);
    let KnobEvent::ValueChanged { value, rotation } = events[0] else {
        panic!("expected value change first, got {:?}", events[0]);
    };
    assert!(approx(value, 0.4));
    assert!(approx(rotation.delta_degrees, 27.0));
    assert!(matches!(events[1], KnobEvent::DeltaChanged { rotation } if approx(rotation.delta_degrees, 27.0)));
    assert_eq!(events[2], KnobEvent::StatusChanged { status: RotationStatus::Rotating });
    assert!(approx(knob.angle(), 333.0));
}

#[test]
fn observers_see_events_in_order() {
    let (mut knob, _) = knob(dial());
    let log = Log::default();
    let (v, d, s) = (Rc::clone(&log), Rc::clone(&log), Rc::clone(&log));
    knob.observe(
        KnobObservers::new()
            .on_value_change(move |value, _| v.borrow_mut().push(format!("value {value:.1}")))
            .on_delta_change(move |rotation| d.borrow_mut().push(format!("delta {:.0}", rotation.delta_degrees)))
            .on_status_change(move |status| s.borrow_mut().push(format!("status {status:?}"))),
    );
    drag(&mut knob, 0.0, &[27.0]);
    release(&mut knob);
    assert_eq!(
        *log.borrow(),
        vec!["status Begin", "value 0.4", "delta 27", "status Rotating", "status End", "status Idle"]
    );
}

#[test]
fn moves_inside_a_step_do_not_change_value() {
    let (mut knob, _) = knob(dial().with_step_value(0.1));
    knob.pointer_down(at(0.0));
    let events = knob.pointer_move(at(5.0));
    assert!(values(&events).is_empty());
    assert!(matches!(events[0], KnobEvent::DeltaChanged { .. }));
    assert!(approx(knob.value(), 0.3));
}

#[test]
fn winding_past_the_bound_holds_then_winds_back() {
    let (mut knob, _) = knob(dial());
    let path: Vec<f64> = (1..=10).map(|k| f64::from(k) * 20.0).collect();
    drag(&mut knob, 0.0, &path);
    // 81 + 200 degrees is past 270.
    assert_eq!(knob.value(), 1.0);
    assert!(approx(knob.angle(), 495.0));
    assert!(approx(radians_to_degrees(knob.snapshot().runtime.internal_radians), 281.0));

    for deg in [180.0, 160.0, 140.0] {
        knob.pointer_move(at(deg));
    }
    assert!(approx(knob.value(), 221.0 / 270.0));
}

#[test]
fn gesture_end_clamps_the_accumulator() {
    let (mut knob, _) = knob(dial());
    let path: Vec<f64> = (1..=10).map(|k| f64::from(k) * 20.0).collect();
    drag(&mut knob, 0.0, &path);
    release(&mut knob);
    assert!(approx(radians_to_degrees(knob.snapshot().runtime.internal_radians), 270.0));

    // Winding back starts from the bound, not from 281.
    drag(&mut knob, 0.0, &[-27.0]);
    assert!(approx(knob.value(), 0.9));
}

#[test]
fn down_with_pending_idle_flushes_it_first() {
    let (mut knob, _) = knob(dial());
    drag(&mut knob, 0.0, &[10.0]);
    knob.pointer_up(Point::default());
    let events = knob.pointer_down(at(0.0));
    assert_eq!(statuses(&events), vec![RotationStatus::Idle, RotationStatus::Begin]);
}

#[test]
fn detach_after_end_leaves_idle_for_tick() {
    let (mut knob, _) = knob(dial());
    let log = Log::default();
    let s = Rc::clone(&log);
    knob.observe(KnobObservers::new().on_status_change(move |status| s.borrow_mut().push(format!("{status:?}"))));
    drag(&mut knob, 0.0, &[27.0]);
    knob.pointer_up(Point::default());
    assert!(knob.detach().is_some());
    assert_eq!(knob.status(), RotationStatus::End);

    assert_eq!(statuses(&knob.tick()), vec![RotationStatus::Idle]);
    assert_eq!(*log.borrow(), vec!["Begin", "Rotating", "End", "Idle"]);
}

#[test]
fn events_before_attach_are_ignored() {
    let mut knob = Knob::with_cursor(dial(), Box::new(crate::cursor::NoopCursor)).unwrap();
    assert!(knob.pointer_down(at(0.0)).is_empty());
    assert!(knob.pointer_move(at(20.0)).is_empty());
    assert!(approx(knob.value(), 0.3));
}

// =============================================================
// Cursor overlay
// =============================================================

#[test]
fn cursor_shows_grabbing_during_drag() {
    let (mut knob, cursor) = knob(dial());
    knob.pointer_down(at(0.0));
    assert_eq!(*cursor.borrow(), vec!["grabbing"]);
    knob.pointer_move(at(10.0));
    release(&mut knob);
    assert_eq!(*cursor.borrow(), vec!["grabbing", "hidden"]);
}

#[test]
fn detach_mid_drag_hides_cursor_without_end() {
    let (mut knob, cursor) = knob(dial());
    let log = Log::default();
    let s = Rc::clone(&log);
    knob.observe(KnobObservers::new().on_status_change(move |status| s.borrow_mut().push(format!("{status:?}"))));
    drag(&mut knob, 0.0, &[27.0]);
    assert!(knob.detach().is_some());
    assert_eq!(*cursor.borrow(), vec!["grabbing", "hidden"]);
    assert_eq!(*log.borrow(), vec!["Begin", "Rotating"]);
    assert_eq!(knob.status(), RotationStatus::Idle);
    assert!(approx(knob.value(), 0.4));
}

// =============================================================
// Values from outside
// =============================================================

#[test]
fn uncontrolled_set_value_moves_the_knob() {
    let (mut knob, _) = knob(dial());
    let events = knob.set_value(0.75);
    assert_eq!(values(&events).len(), 1);
    assert!(approx(knob.value(), 0.75));
    assert!(approx(knob.angle(), 427.5));

    knob.set_value(5.0);
    assert_eq!(knob.value(), 1.0);
}

#[test]
fn uncontrolled_set_value_is_stepped() {
    let (mut knob, _) = knob(dial().with_step_value(0.25));
    knob.set_value(0.6);
    assert!(approx(knob.value(), 0.5));
}

#[test]
fn non_finite_set_value_is_skipped() {
    let (mut knob, _) = knob(dial());
    assert!(knob.set_value(f64::NAN).is_empty());
    assert!(knob.set_value(f64::INFINITY).is_empty());
    assert!(approx(knob.value(), 0.3));
    assert!(knob.angle().is_finite());
}

#[test]
fn controlled_push_while_idle_updates_angle() {
    let (mut knob, _) = knob(dial().controlled(0.3));
    let events = knob.set_value(0.8);
    assert_eq!(events.len(), 1);
    let values = values(&events);
    assert!(approx(values[0], 0.8));
    assert!(approx(knob.angle(), 441.0));
    assert!(approx(knob.normalized_angle(), 81.0));
    assert!(approx(knob.value(), 0.8));
}

#[test]
fn controlled_drag_reports_value_but_renders_controlled_angle() {
    let (mut knob, _) = knob(dial().controlled(0.3));
    let events = drag(&mut knob, 0.0, &[27.0]);
    assert!(approx(values(&events)[0], 0.4));
    // Rendering waits for the owner.
    assert!(approx(knob.angle(), 306.0));

    knob.set_value(0.4);
    assert!(approx(knob.angle(), 333.0));
}

#[test]
fn controlled_push_mid_gesture_realigns_without_step() {
    let (mut knob, _) = knob(dial().controlled(0.3));
    drag(&mut knob, 0.0, &[27.0]);
    knob.set_value(0.6);
    assert!(!knob.engine().has_deferred_realign());
    assert!(approx(radians_to_degrees(knob.snapshot().runtime.internal_radians), 162.0));
    assert!(approx(knob.value(), 0.6));
}

#[test]
fn controlled_push_mid_gesture_with_step_waits_for_idle() {
    let (mut knob, _) = knob(dial().with_step_value(0.1).controlled(0.3));
    drag(&mut knob, 0.0, &[27.0]);
    assert!(approx(knob.value(), 0.4));

    knob.set_value(0.5);
    assert!(knob.engine().has_deferred_realign());
    // Rendered angle follows at once; the accumulator does not.
    assert!(approx(knob.angle(), 360.0));
    assert!(approx(radians_to_degrees(knob.snapshot().runtime.internal_radians), 108.0));
    assert!(approx(knob.value(), 0.4));

    let up = knob.pointer_up(Point::default());
    assert_eq!(statuses(&up), vec![RotationStatus::End]);
    assert!(knob.engine().has_deferred_realign());

    let idle = knob.tick();
    assert_eq!(statuses(&idle), vec![RotationStatus::Idle]);
    assert!(matches!(idle[0], KnobEvent::StatusChanged { .. }));
    assert!(approx(values(&idle)[0], 0.5));
    assert!(!knob.engine().has_deferred_realign());
    assert!(approx(radians_to_degrees(knob.snapshot().runtime.internal_radians), 135.0));
}

#[test]
fn detach_applies_deferred_realign() {
    let (mut knob, _) = knob(dial().with_step_value(0.1).controlled(0.3));
    drag(&mut knob, 0.0, &[27.0]);
    knob.set_value(0.5);
    knob.detach();
    assert!(!knob.engine().has_deferred_realign());
    assert!(approx(knob.value(), 0.5));
}

#[test]
fn detach_after_end_realigns_at_idle() {
    let (mut knob, _) = knob(dial().with_step_value(0.1).controlled(0.3));
    drag(&mut knob, 0.0, &[27.0]);
    knob.set_value(0.5);
    knob.pointer_up(Point::default());
    knob.detach();
    assert!(knob.engine().has_deferred_realign());

    let idle = knob.tick();
    assert_eq!(statuses(&idle), vec![RotationStatus::Idle]);
    assert!(approx(values(&idle)[0], 0.5));
    assert!(!knob.engine().has_deferred_realign());
}

#[test]
fn uncontrolled_push_mid_gesture_with_step_moves_at_once() {
    let (mut knob, _) = knob(dial().with_step_value(0.1));
    drag(&mut knob, 0.0, &[27.0]);
    assert!(approx(knob.value(), 0.4));

    let events = knob.set_value(0.6);
    assert!(approx(values(&events)[0], 0.6));
    assert!(!knob.engine().has_deferred_realign());
    assert!(approx(radians_to_degrees(knob.snapshot().runtime.internal_radians), 162.0));

    // The drag continues from the pushed value and nothing snaps back.
    knob.pointer_move(at(54.0));
    assert!(approx(knob.value(), 0.7));
    release(&mut knob);
    assert!(approx(knob.value(), 0.7));
}

#[test]
fn value_changes_are_seen_on_a_tiny_range() {
    let options = KnobOptions::default().with_angle_range(0.0, 270.0).with_value_range(0.0, 1e-13).controlled(3e-14);
    let (mut knob, _) = knob(options);
    let events = drag(&mut knob, 0.0, &[27.0]);
    let values = values(&events);
    assert_eq!(values.len(), 1);
    assert!(approx(values[0] * 1e13, 0.4));
}

// =============================================================
// Reversal and infinite knobs
// =============================================================

#[test]
fn reversed_knob_mirrors_reported_value_only() {
    let (mut knob, _) = knob(dial().reversed(true));
    assert!(approx(knob.value(), 0.3));
    // Internal 0.7 sits at 189 degrees.
    assert!(approx(knob.angle(), 414.0));

    let events = drag(&mut knob, 0.0, &[27.0]);
    assert!(approx(values(&events)[0], 0.2));
}

#[test]
fn infinite_knob_reports_angle_and_ignores_value() {
    let (mut knob, _) = knob(KnobOptions::default().with_start_angle(90.0));
    assert_eq!(knob.value(), 0.0);
    assert!(approx(knob.angle(), 90.0));

    let events = drag(&mut knob, 0.0, &[30.0]);
    assert_eq!(values(&events), vec![0.0]);
    assert!(approx(knob.angle(), 120.0));

    assert!(knob.set_value(0.5).is_empty());
    assert_eq!(knob.value(), 0.0);
}

#[test]
fn infinite_knob_turns_past_a_full_revolution() {
    let (mut knob, _) = knob(KnobOptions::default());
    let path: Vec<f64> = (1..=45).map(|k| f64::from(k) * 10.0).collect();
    drag(&mut knob, 0.0, &path);
    release(&mut knob);
    assert!(approx(knob.angle(), 450.0));
    assert!(approx(knob.normalized_angle(), 90.0));
}

#[test]
fn infinite_knob_steps_angle() {
    let (mut knob, _) = knob(KnobOptions::default().with_start_angle(90.0).with_step_angle(15.0));
    drag(&mut knob, 0.0, &[20.0]);
    assert!(approx(knob.angle(), 105.0));
    knob.pointer_move(at(23.0));
    assert!(approx(knob.angle(), 120.0));
}

// =============================================================
// Reconfiguration
// =============================================================

#[test]
fn set_options_carries_value_and_stays_attached() {
    let (mut knob, _) = knob(dial());
    knob.set_value(0.6);
    knob.set_options(&KnobOptions::default().with_step_value(0.25)).unwrap();
    assert_eq!(knob.config().version(), 2);
    assert!(knob.is_attached());
    assert_eq!(knob.engine().listeners().len(), 3);
    assert!(approx(knob.value(), 0.5));
}

#[test]
fn set_options_takes_patched_default_value() {
    let (mut knob, _) = knob(dial());
    knob.set_options(&KnobOptions::default().with_default_value(0.9)).unwrap();
    assert!(approx(knob.value(), 0.9));
}

#[test]
fn set_options_keeps_observers() {
    let (mut knob, _) = knob(dial());
    let log = Log::default();
    let s = Rc::clone(&log);
    knob.observe(KnobObservers::new().on_status_change(move |status| s.borrow_mut().push(format!("{status:?}"))));
    knob.set_options(&KnobOptions::default().with_start_angle(0.0)).unwrap();
    knob.pointer_down(at(0.0));
    assert_eq!(*log.borrow(), vec!["Begin"]);
    assert!(approx(knob.angle(), 81.0));
}

#[test]
fn failed_set_options_leaves_knob_unchanged() {
    let (mut knob, _) = knob(dial());
    let err = knob.set_options(&KnobOptions::default().with_step_value(-1.0)).unwrap_err();
    assert!(matches!(err, ConfigError::NonPositiveStep { .. }));
    assert_eq!(knob.config().version(), 1);
    assert!(knob.is_attached());
    assert!(approx(knob.value(), 0.3));
}

#[test]
fn set_options_carries_controlled_value() {
    let (mut knob, _) = knob(dial().controlled(0.3));
    knob.set_value(0.8);
    knob.set_options(&KnobOptions::default().with_start_angle(0.0)).unwrap();
    assert!(approx(knob.value(), 0.8));
    assert!(approx(knob.angle(), 216.0));
}

#[test]
fn set_options_after_end_delivers_idle_first() {
    let (mut knob, _) = knob(dial());
    let log = Log::default();
    let s = Rc::clone(&log);
    knob.observe(KnobObservers::new().on_status_change(move |status| s.borrow_mut().push(format!("{status:?}"))));
    drag(&mut knob, 0.0, &[27.0]);
    knob.pointer_up(Point::default());
    knob.set_options(&KnobOptions::default().with_start_angle(0.0)).unwrap();
    assert_eq!(knob.status(), RotationStatus::Idle);
    assert!(knob.tick().is_empty());
    assert_eq!(*log.borrow(), vec!["Begin", "Rotating", "End", "Idle"]);
    assert!(approx(knob.value(), 0.4));
}

#[test]
fn set_options_with_target_moves_to_new_target() {
    let (mut knob, _) = knob(dial());
    let previous = knob
        .set_options_with_target(&KnobOptions::default(), Box::new(Rect::new(100.0, 100.0, 20.0, 20.0)))
        .unwrap();
    assert_eq!(previous.map(|t| t.bounding_rect()), Some(Rect::new(0.0, 0.0, 100.0, 100.0)));

    // New pivot is (110, 110).
    knob.pointer_down(Point::new(120.0, 110.0));
    knob.pointer_move(Point::new(110.0, 120.0));
    assert!(approx(knob.value(), 0.3 + 90.0 / 270.0));
}

// =============================================================
// Serialization
// =============================================================

#[test]
fn events_serialize_with_tag() {
    let json = serde_json::to_value(KnobEvent::StatusChanged { status: RotationStatus::Begin }).unwrap();
    assert_eq!(json, serde_json::json!({ "event": "status_changed", "status": "begin" }));
}

#[test]
fn snapshot_serializes_flat() {
    let (knob, _) = knob(dial());
    let json = serde_json::to_value(knob.snapshot()).unwrap();
    assert_eq!(json["status"], "idle");
    assert!(json.get("committed_value").is_some());
    assert!(json.get("internal_radians").is_some());
}
