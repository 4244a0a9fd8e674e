//! Scripted stand-ins for the automation plugin and its registrar.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::Value;

use dm_facade::credentials::{Credential, CredentialResolver};
use dm_facade::{AutomationPlugin, Facade, FacadeBuilder, PluginError, PluginRegistrar, Settings};

/// Records every call and answers from per-method scripts. A method with a
/// queued answer uses it first, then falls back to its fixed answer.
#[derive(Default)]
pub struct FakePlugin {
    answers: RefCell<HashMap<String, Value>>,
    queued: RefCell<HashMap<String, VecDeque<Value>>>,
    calls: RefCell<Vec<(String, Vec<Value>)>>,
}

impl FakePlugin {
    /// Accepts activation and binding.
    pub fn new() -> Self {
        Self::default()
            .answering("Reg", 1)
            .answering("BindWindowEx", 1)
            .answering("UnBindWindow", 1)
            .answering("ver", "7.2107")
            .answering("GetID", 0)
    }

    pub fn answering(self, method: &str, value: impl Into<Value>) -> Self {
        self.answers
            .borrow_mut()
            .insert(method.to_string(), value.into());
        self
    }

    pub fn queue(&self, method: &str, value: impl Into<Value>) {
        self.queued
            .borrow_mut()
            .entry(method.to_string())
            .or_default()
            .push_back(value.into());
    }

    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.borrow().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Vec<Value>> {
        self.calls
            .borrow()
            .iter()
            .filter(|(name, _)| name == method)
            .map(|(_, args)| args.clone())
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl AutomationPlugin for FakePlugin {
    fn has_method(&self, name: &str) -> bool {
        self.answers.borrow().contains_key(name) || self.queued.borrow().contains_key(name)
    }

    fn invoke(&self, name: &str, args: &[Value]) -> Result<Value, PluginError> {
        self.calls
            .borrow_mut()
            .push((name.to_string(), args.to_vec()));

        let queued = self
            .queued
            .borrow_mut()
            .get_mut(name)
            .and_then(VecDeque::pop_front);
        queued
            .or_else(|| self.answers.borrow().get(name).cloned())
            .ok_or_else(|| PluginError::Call {
                method: name.to_string(),
                reason: "no scripted answer".to_string(),
            })
    }
}

/// Hands out a shared [`FakePlugin`] and logs register/unregister events.
pub struct RecordingRegistrar {
    plugin: Rc<FakePlugin>,
    events: Rc<RefCell<Vec<String>>>,
}

impl RecordingRegistrar {
    pub fn new(plugin: Rc<FakePlugin>) -> (Self, Rc<RefCell<Vec<String>>>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                plugin,
                events: Rc::clone(&events),
            },
            events,
        )
    }
}

impl PluginRegistrar for RecordingRegistrar {
    fn register(&self, dll_path: &Path) -> dm_facade::Result<Rc<dyn AutomationPlugin>> {
        self.events
            .borrow_mut()
            .push(format!("register {}", dll_path.display()));
        Ok(self.plugin.clone())
    }

    fn unregister(&self, dll_path: &Path) {
        self.events
            .borrow_mut()
            .push(format!("unregister {}", dll_path.display()));
    }
}

pub fn count(events: &Rc<RefCell<Vec<String>>>, prefix: &str) -> usize {
    events
        .borrow()
        .iter()
        .filter(|e| e.starts_with(prefix))
        .count()
}

/// Builder with a fixed plugin location and an explicit credential, so no
/// test touches the real environment, vault or config directory.
pub fn builder() -> FacadeBuilder {
    FacadeBuilder::with_settings(Settings::with_config_dir(PathBuf::from("/nonexistent/dm")))
        .resolver(CredentialResolver::with_backends(Vec::new()))
        .credential(Credential::new("test-code", "test-ver"))
}

pub fn facade(plugin: &Rc<FakePlugin>) -> (Facade, Rc<RefCell<Vec<String>>>) {
    let (registrar, events) = RecordingRegistrar::new(Rc::clone(plugin));
    let facade = builder()
        .build(Box::new(registrar))
        .expect("facade should activate");
    plugin.clear_calls();
    (facade, events)
}
