//! Input dispatch behavior: clamping, clearing, slow typing, and the
//! corner failsafe.

mod common;

use std::sync::Arc;

use cabas::input::ActionDriver;
use cabas::{AutomationError, KeyPress, Point};

use common::{fast_timing, MockEngine};

#[test]
fn clicks_are_clamped_into_the_screen() {
    let engine = Arc::new(MockEngine::new(1280, 800));
    let driver = ActionDriver::new(engine.clone(), fast_timing(), true);

    driver.click(Point::new(-5, 9999)).unwrap();
    driver.click(Point::new(640, 400)).unwrap();

    assert_eq!(
        engine.click_points(),
        vec![Point::new(0, 799), Point::new(640, 400)]
    );
}

#[test]
fn corner_cursor_aborts_before_any_dispatch() {
    let engine = Arc::new(MockEngine::new(1280, 800));
    let driver = ActionDriver::new(engine.clone(), fast_timing(), true);

    for corner in [
        Point::new(0, 0),
        Point::new(1279, 0),
        Point::new(0, 799),
        Point::new(1279, 799),
    ] {
        engine.set_cursor(corner);
        let result = driver.click(Point::new(640, 400));
        assert!(
            matches!(result, Err(AutomationError::InputAborted(_))),
            "cursor at {corner:?} did not abort"
        );
    }
    assert!(engine.clicks.lock().unwrap().is_empty());

    // Typing goes through the same gate.
    engine.set_cursor(Point::new(0, 0));
    let result = driver.type_text("secret", false, false);
    assert!(matches!(result, Err(AutomationError::InputAborted(_))));
    assert!(engine.typed.lock().unwrap().is_empty());
}

#[test]
fn failsafe_can_be_disabled() {
    let engine = Arc::new(MockEngine::new(1280, 800));
    engine.set_cursor(Point::new(0, 0));
    let driver = ActionDriver::new(engine.clone(), fast_timing(), false);

    driver.click(Point::new(640, 400)).unwrap();
    assert_eq!(engine.click_points(), vec![Point::new(640, 400)]);
}

#[test]
fn clearing_precedes_typing() {
    let engine = Arc::new(MockEngine::new(1280, 800));
    let driver = ActionDriver::new(engine.clone(), fast_timing(), true);

    driver.type_text("abc", true, false).unwrap();

    assert_eq!(
        *engine.chords.lock().unwrap(),
        vec![vec![KeyPress::Control, KeyPress::Char('a')]]
    );
    assert_eq!(
        *engine.keys.lock().unwrap(),
        vec![KeyPress::Delete, KeyPress::Backspace]
    );
    assert_eq!(*engine.typed.lock().unwrap(), vec!["abc".to_string()]);
}

#[test]
fn slow_typing_emits_one_character_per_keystroke() {
    let engine = Arc::new(MockEngine::new(1280, 800));
    let driver = ActionDriver::new(engine.clone(), fast_timing(), true);

    driver.type_text("abc", false, true).unwrap();

    assert_eq!(
        *engine.typed.lock().unwrap(),
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
}
