//! Polling find helpers of the high-level proxy.

mod common;

use std::rc::Rc;
use std::time::Duration;

use serde_json::json;

use common::FakePlugin;
use dm_facade::{ConfigStore, CoreEngine, FindOutcome, HighLevelProxy, Region};

const NOT_FOUND: &str = "-1|-1|-1";

fn proxy(plugin: &Rc<FakePlugin>) -> HighLevelProxy {
    let core = Rc::new(CoreEngine::new(plugin.clone()));
    HighLevelProxy::new(core, ConfigStore::new())
        .with_poll_interval(Duration::from_millis(1), Duration::from_millis(2))
}

fn region() -> Region {
    Region::new(0, 0, 800, 600)
}

#[test]
fn test_find_text_reports_position() {
    let plugin = Rc::new(FakePlugin::new().answering("FindStrE", "0|120|45"));
    let outcome = proxy(&plugin)
        .find_text(region(), "OK", "ffffff-000000", Duration::ZERO)
        .unwrap();

    assert_eq!(
        outcome,
        FindOutcome {
            found: true,
            x: 120,
            y: 45
        }
    );
    assert!(plugin.calls_to("MoveTo").is_empty());
}

#[test]
fn test_zero_timeout_probes_once() {
    let plugin = Rc::new(FakePlugin::new().answering("FindStrE", NOT_FOUND));
    let outcome = proxy(&plugin)
        .find_text(region(), "OK", "ffffff-000000", Duration::ZERO)
        .unwrap();

    assert!(!outcome.found);
    assert_eq!(plugin.calls_to("FindStrE").len(), 1);
}

#[test]
fn test_find_text_retries_until_seen() {
    let plugin = Rc::new(FakePlugin::new().answering("FindStrE", "0|10|20"));
    plugin.queue("FindStrE", NOT_FOUND);
    plugin.queue("FindStrE", NOT_FOUND);

    let outcome = proxy(&plugin)
        .find_text(region(), "OK", "ffffff-000000", Duration::from_secs(5))
        .unwrap();

    assert!(outcome.found);
    assert_eq!(plugin.calls_to("FindStrE").len(), 3);
}

#[test]
fn test_find_text_click_clicks_found_position() {
    let plugin = Rc::new(
        FakePlugin::new()
            .answering("FindStrE", "0|300|200")
            .answering("MoveTo", 1)
            .answering("LeftClick", 1),
    );

    let outcome = proxy(&plugin)
        .find_text_click(region(), "OK", "ffffff-000000", Duration::ZERO, false)
        .unwrap();

    assert!(outcome.found);
    assert_eq!(plugin.calls_to("MoveTo"), vec![vec![json!(300), json!(200)]]);
    assert_eq!(plugin.calls_to("LeftClick").len(), 1);
}

#[test]
fn test_click_until_gone_stops_when_target_disappears() {
    let plugin = Rc::new(
        FakePlugin::new()
            .answering("FindPicE", NOT_FOUND)
            .answering("MoveTo", 1)
            .answering("LeftClick", 1),
    );
    plugin.queue("FindPicE", "0|50|60");
    plugin.queue("FindPicE", "0|50|60");

    let outcome = proxy(&plugin)
        .find_pic_click_until_gone(region(), "close.bmp", Duration::from_secs(5), 0, false)
        .unwrap();

    assert_eq!(
        outcome,
        FindOutcome {
            found: true,
            x: 50,
            y: 60
        }
    );
    assert_eq!(plugin.calls_to("LeftClick").len(), 2);
    assert_eq!(plugin.calls_to("FindPicE").len(), 3);
}

#[test]
fn test_ocr_returns_first_non_empty_read() {
    let plugin = Rc::new(FakePlugin::new().answering("Ocr", "hello"));
    plugin.queue("Ocr", "");

    let text = proxy(&plugin)
        .ocr(region(), "ffffff-000000", None, Duration::from_secs(5))
        .unwrap();

    assert_eq!(text.as_deref(), Some("hello"));
}

#[test]
fn test_ocr_times_out_to_none() {
    let plugin = Rc::new(FakePlugin::new().answering("Ocr", ""));
    let text = proxy(&plugin)
        .ocr(region(), "ffffff-000000", Some(0.8), Duration::ZERO)
        .unwrap();
    assert_eq!(text, None);
}

#[test]
fn test_circle_search_clicks_when_shape_appears() {
    let plugin = Rc::new(
        FakePlugin::new()
            .answering("MoveTo", 1)
            .answering("LeftClick", 1)
            .answering("GetCursorShape", "hand"),
    );
    plugin.queue("GetCursorShape", "arrow");
    plugin.queue("GetCursorShape", "arrow");

    assert!(proxy(&plugin)
        .circle_search_cursor(500, 400, "hand", 1.0, 1.0, 6)
        .unwrap());
    assert_eq!(plugin.calls_to("MoveTo").len(), 3);
    assert_eq!(plugin.calls_to("LeftClick").len(), 1);
}

#[test]
fn test_square_search_gives_up_after_one_ring() {
    let plugin = Rc::new(
        FakePlugin::new()
            .answering("MoveTo", 1)
            .answering("GetCursorShape", "arrow"),
    );

    assert!(!proxy(&plugin)
        .square_search_cursor(500, 400, "hand", 10, 1)
        .unwrap());
    assert_eq!(plugin.calls_to("MoveTo").len(), 14);
    assert!(plugin.calls_to("LeftClick").is_empty());
}

#[test]
fn test_scatter_search_starts_near_origin() {
    let plugin = Rc::new(
        FakePlugin::new()
            .answering("MoveTo", 1)
            .answering("LeftClick", 1)
            .answering("GetCursorShape", "hand"),
    );

    assert!(proxy(&plugin)
        .scatter_search_cursor(500, 400, "hand", 0.0, 0.6, 80)
        .unwrap());
    assert_eq!(plugin.calls_to("MoveTo"), vec![vec![json!(501), json!(400)]]);
}
