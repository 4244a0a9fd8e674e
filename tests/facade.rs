//! Facade construction, name resolution and the binding lifecycle, driven
//! through a scripted plugin.

mod common;

use std::rc::Rc;

use serde_json::json;

use common::{builder, count, facade, FakePlugin, RecordingRegistrar};
use dm_facade::config::DEFAULT_PUBLIC;
use dm_facade::credentials::{Credential, CredentialResolver, PlainFileBackend};
use dm_facade::{BindConfig, BindOverrides, FacadeBuilder, FacadeError, Settings};

// ============================================================================
// Construction & activation
// ============================================================================

#[test]
fn test_build_registers_and_activates() {
    let plugin = Rc::new(FakePlugin::new());
    let (registrar, events) = RecordingRegistrar::new(Rc::clone(&plugin));

    let facade = builder()
        .plugin_path("/opt/dm")
        .build(Box::new(registrar))
        .unwrap();

    assert_eq!(events.borrow().as_slice(), ["register /opt/dm/dm.dll"]);
    assert_eq!(plugin.calls_to("Reg"), vec![vec![json!("test-code"), json!("test-ver")]]);
    assert!(!facade.is_closed());
}

#[test]
fn test_plugin_path_may_name_the_library() {
    let plugin = Rc::new(FakePlugin::new());
    let (registrar, events) = RecordingRegistrar::new(Rc::clone(&plugin));

    let _facade = builder()
        .plugin_path("/opt/dm/custom.DLL")
        .build(Box::new(registrar))
        .unwrap();

    assert_eq!(events.borrow()[0], "register /opt/dm/custom.DLL");
}

#[test]
fn test_rejected_activation_unregisters() {
    let plugin = Rc::new(FakePlugin::new().answering("Reg", -2));
    let (registrar, events) = RecordingRegistrar::new(Rc::clone(&plugin));

    let err = builder().build(Box::new(registrar)).err().unwrap();

    match err {
        FacadeError::ActivationFailed { status, message } => {
            assert_eq!(status, -2);
            assert!(message.contains("administrator"));
        }
        other => panic!("expected ActivationFailed, got {:?}", other),
    }
    assert_eq!(count(&events, "register"), 1);
    assert_eq!(count(&events, "unregister"), 1);
}

#[test]
fn test_resolved_credential_used_without_override() {
    let dir = tempfile::TempDir::new().unwrap();
    let plain = dir.path().join("dm_conf.json");
    std::fs::write(&plain, r#"{"dm_reg_code": "file-code", "dm_ver_info": "file-ver"}"#).unwrap();

    let plugin = Rc::new(FakePlugin::new());
    let (registrar, _events) = RecordingRegistrar::new(Rc::clone(&plugin));
    let _facade = FacadeBuilder::with_settings(Settings::with_config_dir(dir.path()))
        .resolver(CredentialResolver::with_backends(vec![Box::new(
            PlainFileBackend::new(plain),
        )]))
        .build(Box::new(registrar))
        .unwrap();

    assert_eq!(
        plugin.calls_to("Reg"),
        vec![vec![json!("file-code"), json!("file-ver")]]
    );
}

#[test]
fn test_placeholder_credential_when_nothing_stored() {
    let plugin = Rc::new(FakePlugin::new());
    let (registrar, _events) = RecordingRegistrar::new(Rc::clone(&plugin));
    let _facade = FacadeBuilder::with_settings(Settings::with_config_dir("/nonexistent/dm"))
        .resolver(CredentialResolver::with_backends(Vec::new()))
        .build(Box::new(registrar))
        .unwrap();

    let placeholder = Credential::placeholder();
    assert_eq!(
        plugin.calls_to("Reg"),
        vec![vec![json!(placeholder.reg_code), json!(placeholder.ver_info)]]
    );
}

#[test]
fn test_describe() {
    let plugin = Rc::new(FakePlugin::new().answering("GetID", 3));
    let (facade, _events) = facade(&plugin);
    assert_eq!(facade.describe().unwrap(), "version 7.2107, id 3");
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn test_close_then_drop_unregisters_once() {
    let plugin = Rc::new(FakePlugin::new());
    let (mut facade, events) = facade(&plugin);

    facade.close();
    facade.close();
    assert!(facade.is_closed());
    drop(facade);

    assert_eq!(count(&events, "unregister"), 1);
}

#[test]
fn test_call_after_close_is_rejected() {
    let plugin = Rc::new(FakePlugin::new().answering("SetDict", 1));
    let (mut facade, _events) = facade(&plugin);
    facade.close();
    plugin.clear_calls();

    let err = facade.call("SetDict", &[json!(0), json!("font.txt")]).unwrap_err();
    assert!(matches!(err, FacadeError::Closed(ref name) if name == "SetDict"));
    assert!(matches!(facade.call("KeyPress", &[json!(13)]), Err(FacadeError::Closed(_))));
    assert!(plugin.calls().is_empty());
}

#[test]
fn test_drop_alone_unregisters_once() {
    let plugin = Rc::new(FakePlugin::new());
    let (facade, events) = facade(&plugin);
    drop(facade);
    assert_eq!(count(&events, "unregister"), 1);
}

// ============================================================================
// Name resolution
// ============================================================================

#[test]
fn test_resolution_order() {
    let plugin = Rc::new(FakePlugin::new().answering("SetDict", 1));
    let (facade, _events) = facade(&plugin);

    assert_eq!(facade.resolve("BindWindow"), Some("HighLevelProxy"));
    assert_eq!(facade.resolve("UnBindWindow"), Some("HighLevelProxy"));
    assert_eq!(facade.resolve("FindText"), Some("HighLevelProxy"));
    assert_eq!(facade.resolve("ver"), Some("CoreEngine"));
    assert_eq!(facade.resolve("GetColor"), Some("CoreEngine"));
    assert_eq!(facade.resolve("KeyPress"), Some("KeyComponent"));
    assert_eq!(facade.resolve("MoveTo"), Some("MouseComponent"));
    assert_eq!(facade.resolve("SetDict"), Some("Plugin"));
    assert_eq!(facade.resolve("NoSuchMethod"), None);
}

#[test]
fn test_unknown_method_is_method_not_found() {
    let plugin = Rc::new(FakePlugin::new());
    let (facade, _events) = facade(&plugin);

    let err = facade.call("NoSuchMethod", &[]).unwrap_err();
    assert!(matches!(err, FacadeError::MethodNotFound(ref name) if name == "NoSuchMethod"));
    assert!(plugin.calls().is_empty());
}

#[test]
fn test_raw_plugin_fallback_passes_arguments_through() {
    let plugin = Rc::new(FakePlugin::new().answering("SetDict", 1));
    let (facade, _events) = facade(&plugin);

    let value = facade.call("SetDict", &[json!(0), json!("font.txt")]).unwrap();
    assert_eq!(value, json!(1));
    assert_eq!(plugin.calls_to("SetDict"), vec![vec![json!(0), json!("font.txt")]]);
}

#[test]
fn test_component_call_through_facade() {
    let plugin = Rc::new(FakePlugin::new().answering("KeyPress", 1));
    let (facade, _events) = facade(&plugin);

    assert_eq!(facade.call("KeyPress", &[json!(13)]).unwrap(), json!(1));
    assert_eq!(plugin.calls_to("KeyPress"), vec![vec![json!(13)]]);
}

#[test]
fn test_bad_argument_is_reported_before_plugin_call() {
    let plugin = Rc::new(FakePlugin::new().answering("KeyPress", 1));
    let (facade, _events) = facade(&plugin);

    let err = facade.call("KeyPress", &[json!("enter")]).unwrap_err();
    assert!(matches!(err, FacadeError::InvalidArgument { index: 0, .. }));
    assert!(plugin.calls().is_empty());
}

#[test]
fn test_oversized_timeout_is_invalid_argument() {
    let plugin = Rc::new(FakePlugin::new().answering("FindStrFastE", "-1|-1|-1"));
    let (facade, _events) = facade(&plugin);
    plugin.clear_calls();

    let args = [json!(0), json!(0), json!(10), json!(10), json!("ok"), json!("ffffff"), json!(1e300)];
    let err = facade.call("FindText", &args).unwrap_err();
    assert!(matches!(err, FacadeError::InvalidArgument { index: 6, .. }));

    let err = facade.call("ClickLeftAt", &[json!(5), json!(5), json!(f64::MAX)]).unwrap_err();
    assert!(matches!(err, FacadeError::InvalidArgument { index: 2, .. }));
    assert!(plugin.calls().is_empty());
}

// ============================================================================
// Binding
// ============================================================================

#[test]
fn test_bind_zero_handle_never_reaches_plugin() {
    let plugin = Rc::new(FakePlugin::new());
    let (facade, _events) = facade(&plugin);

    let err = facade.call("BindWindow", &[json!(0)]).unwrap_err();
    assert!(matches!(err, FacadeError::InvalidHandle(0)));
    assert!(plugin.calls().is_empty());
    assert!(!facade.proxy().is_bound());
}

#[test]
fn test_bind_with_defaults() {
    let plugin = Rc::new(FakePlugin::new());
    let (facade, _events) = facade(&plugin);

    let config = facade.proxy().bind_window(1234, &BindOverrides::new()).unwrap();

    assert_eq!(config, BindConfig::default());
    assert_eq!(
        plugin.calls_to("BindWindowEx"),
        vec![vec![
            json!(1234),
            json!("gdi"),
            json!("windows3"),
            json!("windows"),
            json!(DEFAULT_PUBLIC),
            json!(101),
        ]]
    );
    assert_eq!(facade.proxy().bound_handle(), Some(1234));
}

#[test]
fn test_bind_with_overrides_through_call() {
    let plugin = Rc::new(FakePlugin::new());
    let (facade, _events) = facade(&plugin);

    let value = facade
        .call(
            "BindWindow",
            &[json!(77), json!("dx"), json!(null), json!(null), json!(null), json!(0)],
        )
        .unwrap();

    assert_eq!(value["display"], json!("dx"));
    assert_eq!(value["mouse"], json!("windows3"));
    assert_eq!(value["mode"], json!(0));
    assert_eq!(plugin.calls_to("BindWindowEx")[0][1], json!("dx"));
}

#[test]
fn test_invalid_override_never_reaches_plugin() {
    let plugin = Rc::new(FakePlugin::new());
    let (facade, _events) = facade(&plugin);

    let err = facade
        .proxy()
        .bind_window(1234, &BindOverrides::new().display("opengl"))
        .unwrap_err();

    assert!(matches!(err, FacadeError::InvalidOptionValue { field: "display", .. }));
    assert!(plugin.calls_to("BindWindowEx").is_empty());
}

#[test]
fn test_bind_failure_carries_details() {
    let plugin = Rc::new(FakePlugin::new().answering("BindWindowEx", 0));
    let (facade, _events) = facade(&plugin);

    let err = facade
        .proxy()
        .bind_window(1234, &BindOverrides::new().mode(1))
        .unwrap_err();

    match err {
        FacadeError::BindFailed {
            hwnd,
            status,
            message,
            config,
        } => {
            assert_eq!(hwnd, 1234);
            assert_eq!(status, 0);
            assert_eq!(message, "Failure (unknown error)");
            assert_eq!(config.mode, 1);
            assert_eq!(config.display, "gdi");
        }
        other => panic!("expected BindFailed, got {:?}", other),
    }
    assert!(!facade.proxy().is_bound());
}

#[test]
fn test_unbind_is_idempotent() {
    let plugin = Rc::new(FakePlugin::new());
    let (facade, _events) = facade(&plugin);

    assert!(!facade.proxy().unbind_window().unwrap());
    assert!(plugin.calls_to("UnBindWindow").is_empty());

    facade.proxy().bind_window(1234, &BindOverrides::new()).unwrap();
    assert!(facade.proxy().unbind_window().unwrap());
    assert!(!facade.proxy().unbind_window().unwrap());

    assert_eq!(plugin.calls_to("UnBindWindow").len(), 1);
    assert_eq!(facade.proxy().bound_handle(), None);
}

#[test]
fn test_rebind_supersedes_previous_handle() {
    let plugin = Rc::new(FakePlugin::new());
    let (facade, _events) = facade(&plugin);

    facade.proxy().bind_window(1, &BindOverrides::new()).unwrap();
    facade.proxy().bind_window(2, &BindOverrides::new()).unwrap();

    assert_eq!(facade.proxy().bound_handle(), Some(2));
    assert!(plugin.calls_to("UnBindWindow").is_empty());
}

#[test]
fn test_bound_window_title() {
    let plugin = Rc::new(FakePlugin::new().answering("GetWindowTitle", "Notepad"));
    let (facade, _events) = facade(&plugin);

    assert_eq!(facade.proxy().window_title().unwrap(), None);
    facade.proxy().bind_window(42, &BindOverrides::new()).unwrap();
    assert_eq!(
        facade.proxy().window_title().unwrap().as_deref(),
        Some("Notepad")
    );
    assert_eq!(plugin.calls_to("GetWindowTitle"), vec![vec![json!(42)]]);
}
