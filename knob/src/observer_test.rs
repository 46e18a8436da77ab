use std::rc::{Rc, Weak};

use super::*;

type Log = Rc<RefCell<Vec<String>>>;

fn status(status: RotationStatus) -> KnobEvent {
    KnobEvent::StatusChanged { status }
}

fn value(value: f64) -> KnobEvent {
    KnobEvent::ValueChanged { value, rotation: AngleSample::default() }
}

// =============================================================
// KnobObservers
// =============================================================

#[test]
fn notify_routes_each_event_to_its_handler() {
    let log = Log::default();
    let (v, d, s) = (Rc::clone(&log), Rc::clone(&log), Rc::clone(&log));
    let mut observers = KnobObservers::new()
        .on_value_change(move |value, _| v.borrow_mut().push(format!("value {value}")))
        .on_delta_change(move |_| d.borrow_mut().push("delta".to_string()))
        .on_status_change(move |status| s.borrow_mut().push(format!("status {status:?}")));
    observers.notify(&value(0.25));
    observers.notify(&KnobEvent::DeltaChanged { rotation: AngleSample::default() });
    observers.notify(&status(RotationStatus::Rotating));
    assert_eq!(*log.borrow(), vec!["value 0.25", "delta", "status Rotating"]);
}

#[test]
fn missing_handlers_are_skipped() {
    let mut observers = KnobObservers::new();
    observers.notify(&value(1.0));
    observers.notify(&status(RotationStatus::Idle));
}

// =============================================================
// ObserverQueue
// =============================================================

#[test]
fn events_raised_inside_a_handler_run_after_it() {
    let log = Log::default();
    let queue = Rc::new(ObserverQueue::default());
    let weak: Weak<ObserverQueue> = Rc::downgrade(&queue);
    let (v, s) = (Rc::clone(&log), Rc::clone(&log));
    assert!(queue.replace(
        KnobObservers::new()
            .on_value_change(move |value, _| v.borrow_mut().push(format!("value {value}")))
            .on_status_change(move |status| {
                s.borrow_mut().push(format!("status {status:?}"));
                if status == RotationStatus::End {
                    if let Some(queue) = weak.upgrade() {
                        queue.deliver(&[value(0.5)]);
                    }
                }
                s.borrow_mut().push(format!("after {status:?}"));
            }),
    ));

    queue.deliver(&[status(RotationStatus::End), status(RotationStatus::Idle)]);
    assert_eq!(*log.borrow(), vec!["status End", "after End", "status Idle", "after Idle", "value 0.5"]);

    // The queue is drained and usable again.
    queue.deliver(&[value(0.75)]);
    assert_eq!(log.borrow().last().map(String::as_str), Some("value 0.75"));
}

#[test]
fn replace_from_inside_a_handler_is_refused() {
    let refused = Rc::new(Cell::new(false));
    let queue = Rc::new(ObserverQueue::default());
    let (weak, flag) = (Rc::downgrade(&queue), Rc::clone(&refused));
    queue.replace(KnobObservers::new().on_status_change(move |_| {
        if let Some(queue) = weak.upgrade() {
            flag.set(!queue.replace(KnobObservers::new()));
        }
    }));
    queue.deliver(&[status(RotationStatus::Begin)]);
    assert!(refused.get());
}
