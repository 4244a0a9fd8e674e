//! Boundary to the external automation plugin.
//!
//! The plugin is an opaque, late-bound object: callers name a method and pass
//! loosely-typed arguments, the plugin answers with an integer status, a
//! string, or a tuple encoded as an array. Everything above this module talks
//! to it through [`AutomationPlugin`] and converts the answers with the typed
//! `call_*` helpers.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::Value;
use thiserror::Error;

use crate::error::Result;

/// File name of the plugin library inside a plugin directory.
pub const PLUGIN_DLL: &str = "dm.dll";

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Plugin call `{method}` failed: {reason}")]
    Call { method: String, reason: String },

    #[error("Plugin call `{method}` returned an unexpected value: {value}")]
    UnexpectedReturn { method: String, value: Value },
}

/// Late-bound method surface of the plugin instance.
pub trait AutomationPlugin {
    /// Whether the plugin exposes a method with this exact name.
    fn has_method(&self, name: &str) -> bool;

    /// Invoke a plugin method by name.
    fn invoke(&self, name: &str, args: &[Value]) -> std::result::Result<Value, PluginError>;
}

/// Creates and tears down plugin instances for a given library path.
pub trait PluginRegistrar {
    fn register(&self, dll_path: &Path) -> Result<Rc<dyn AutomationPlugin>>;

    /// Failures are the registrar's to log; teardown never fails the caller.
    fn unregister(&self, dll_path: &Path);
}

/// Registrar for a plugin instance the caller already created.
pub struct PreloadedRegistrar {
    plugin: Rc<dyn AutomationPlugin>,
}

impl PreloadedRegistrar {
    pub fn new(plugin: Rc<dyn AutomationPlugin>) -> Self {
        Self { plugin }
    }
}

impl PluginRegistrar for PreloadedRegistrar {
    fn register(&self, _dll_path: &Path) -> Result<Rc<dyn AutomationPlugin>> {
        Ok(Rc::clone(&self.plugin))
    }

    fn unregister(&self, _dll_path: &Path) {}
}

/// An active plugin registration. Unwinds exactly once.
pub struct Registration {
    registrar: Box<dyn PluginRegistrar>,
    dll_path: PathBuf,
    registered: bool,
}

impl Registration {
    pub fn register(
        registrar: Box<dyn PluginRegistrar>,
        dll_path: PathBuf,
    ) -> Result<(Self, Rc<dyn AutomationPlugin>)> {
        let plugin = registrar.register(&dll_path)?;
        tracing::info!("Registered automation plugin from {:?}", dll_path);
        Ok((
            Self {
                registrar,
                dll_path,
                registered: true,
            },
            plugin,
        ))
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn dll_path(&self) -> &Path {
        &self.dll_path
    }

    /// Unregister the plugin. Calling this again is a no-op.
    pub fn unregister(&mut self) {
        if !self.registered {
            return;
        }
        self.registered = false;
        self.registrar.unregister(&self.dll_path);
        tracing::info!("Unregistered automation plugin at {:?}", self.dll_path);
    }
}

/// Resolve a plugin location: a path ending in `.dll` is taken as the library
/// itself, anything else is treated as the directory containing [`PLUGIN_DLL`].
pub fn resolve_dll_path(location: &Path) -> PathBuf {
    let is_dll = location
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dll"));
    if is_dll {
        location.to_path_buf()
    } else {
        location.join(PLUGIN_DLL)
    }
}

// ============ Typed result conversion ============

pub(crate) fn call(
    plugin: &dyn AutomationPlugin,
    method: &str,
    args: &[Value],
) -> std::result::Result<Value, PluginError> {
    tracing::trace!(method, ?args, "plugin call");
    plugin.invoke(method, args)
}

pub(crate) fn call_int(
    plugin: &dyn AutomationPlugin,
    method: &str,
    args: &[Value],
) -> std::result::Result<i32, PluginError> {
    let value = call(plugin, method, args)?;
    as_int(&value).ok_or_else(|| unexpected(method, value))
}

pub(crate) fn call_string(
    plugin: &dyn AutomationPlugin,
    method: &str,
    args: &[Value],
) -> std::result::Result<String, PluginError> {
    match call(plugin, method, args)? {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        other => Err(unexpected(method, other)),
    }
}

/// For calls that answer `(status, x, y)` through by-reference out parameters.
pub(crate) fn call_triple(
    plugin: &dyn AutomationPlugin,
    method: &str,
    args: &[Value],
) -> std::result::Result<(i32, i32, i32), PluginError> {
    let value = call(plugin, method, args)?;
    let parsed = match &value {
        Value::Array(items) if items.len() == 3 => {
            match (as_int(&items[0]), as_int(&items[1]), as_int(&items[2])) {
                (Some(a), Some(b), Some(c)) => Some((a, b, c)),
                _ => None,
            }
        }
        _ => None,
    };
    parsed.ok_or_else(|| unexpected(method, value))
}

fn as_int(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|n| i32::try_from(n).ok()),
        Value::Bool(b) => Some(i32::from(*b)),
        _ => None,
    }
}

fn unexpected(method: &str, value: Value) -> PluginError {
    PluginError::UnexpectedReturn {
        method: method.to_string(),
        value,
    }
}
